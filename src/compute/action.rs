// Copyright 2025 Dmitry Tantsur <dtantsur@protonmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Server actions: the closed set of invokable actions, the envelope they
//! are posted in and the classification of their responses.

use std::fmt;

use serde_json::{Map, Value};

use crate::transport::RawResponse;

protocol_enum! {
    #[doc = "A server action that takes no arguments."]
    enum Action ? Unrecognized {
        #[doc = "Pause the server."]
        Pause = "PAUSE",
        #[doc = "Unpause a paused server."]
        Unpause = "UNPAUSE",
        #[doc = "Lock the server against changes by non-admin users."]
        Lock = "LOCK",
        #[doc = "Unlock a locked server."]
        Unlock = "UNLOCK",
        #[doc = "Power on the server."]
        Start = "START",
        #[doc = "Power off the server."]
        Stop = "STOP",
        #[doc = "Resume a suspended server."]
        Resume = "RESUME",
        #[doc = "Put the server into rescue mode."]
        Rescue = "RESCUE",
        #[doc = "Leave rescue mode."]
        Unrescue = "UNRESCUE",
        #[doc = "Suspend the server."]
        Suspend = "SUSPEND",
        #[doc = "Shelve the server."]
        Shelve = "SHELVE",
        #[doc = "Remove a shelved server from its compute host."]
        ShelveOffload = "SHELVE_OFFLOAD",
        #[doc = "Unshelve a shelved server."]
        Unshelve = "UNSHELVE",
        #[doc = "Any value that cannot be invoked."]
        Unrecognized = "UNRECOGNIZED"
    }
}

/// Invokable actions and the keys they are posted under.
const ACTIONS: &[(Action, &str)] = &[
    (Action::Pause, "pause"),
    (Action::Unpause, "unpause"),
    (Action::Lock, "lock"),
    (Action::Unlock, "unlock"),
    (Action::Start, "os-start"),
    (Action::Stop, "os-stop"),
    (Action::Resume, "resume"),
    (Action::Rescue, "rescue"),
    (Action::Unrescue, "unrescue"),
    (Action::Suspend, "suspend"),
    (Action::Shelve, "shelve"),
    (Action::ShelveOffload, "shelveOffload"),
    (Action::Unshelve, "unshelve"),
];

impl Action {
    /// Key of this action in the request body.
    ///
    /// Returns `None` for actions that cannot be invoked.
    pub fn endpoint_key(self) -> Option<&'static str> {
        ACTIONS
            .iter()
            .find(|(action, _)| *action == self)
            .map(|(_, key)| *key)
    }
}

/// Outcome of an operation that does not return an entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionResult {
    /// The request was accepted.
    Success,
    /// The request failed.
    Failure {
        /// Human-readable reason.
        reason: String,
        /// HTTP status code, if a request was made.
        code: Option<u16>,
    },
}

impl ActionResult {
    /// A failure that did not involve an HTTP request.
    pub fn failure<S: Into<String>>(reason: S) -> ActionResult {
        ActionResult::Failure {
            reason: reason.into(),
            code: None,
        }
    }

    /// Whether the operation succeeded.
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success)
    }

    /// Failure reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ActionResult::Success => None,
            ActionResult::Failure { reason, .. } => Some(reason),
        }
    }

    /// HTTP status code of a failure, if known.
    pub fn code(&self) -> Option<u16> {
        match self {
            ActionResult::Success => None,
            ActionResult::Failure { code, .. } => *code,
        }
    }

    /// Build a result for an action that cannot be invoked.
    pub(crate) fn not_invokable(action: Action) -> ActionResult {
        ActionResult::failure(format!(
            "Action {} was not found in the list of invokable actions",
            action
        ))
    }
}

impl fmt::Display for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionResult::Success => f.write_str("success"),
            ActionResult::Failure { reason, .. } => write!(f, "failure: {}", reason),
        }
    }
}

/// Build the `{"<action>": <inner>}` envelope.
///
/// A missing inner payload is encoded as `null`.
pub fn envelope(action: &str, inner: Option<Value>) -> Value {
    let mut body = Map::with_capacity(1);
    let _ = body.insert(action.to_string(), inner.unwrap_or(Value::Null));
    Value::Object(body)
}

/// Extract the message from a `{"<faultKey>": {"message": "..."}}` body.
pub(crate) fn fault_message(body: &str) -> Option<String> {
    match serde_json::from_str::<Value>(body).ok()? {
        Value::Object(root) => root.values().find_map(|fault| {
            fault
                .get("message")
                .and_then(Value::as_str)
                .map(String::from)
        }),
        _ => None,
    }
}

/// Convert a response into an `ActionResult`.
///
/// The action name is only used to synthesize a message when the response
/// carries no explanation.
pub fn classify(response: &RawResponse, action: &str) -> ActionResult {
    if response.is_success() {
        return ActionResult::Success;
    }

    let code = response.status.as_u16();
    let reason = if let Some(message) = fault_message(&response.body) {
        message
    } else if !response.body.trim().is_empty() {
        response.body.clone()
    } else {
        format!("Action {} failed with HTTP {}", action, code)
    };

    debug!("Action {} failed with HTTP {}: {}", action, code, reason);
    ActionResult::Failure {
        reason,
        code: Some(code),
    }
}
