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

//! Foundation bits exposing the servers part of the Compute API.
//!
//! Every function here issues exactly one request. Precondition checks and
//! the mapping to `ActionResult` are done by the service.

use std::collections::HashMap;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::action::{envelope, fault_message};
use super::protocol::*;
use crate::transport::{RawResponse, Request, Transport};
use crate::{Error, ErrorKind, Result};

/// Convert a non-2xx response into an error.
pub(crate) fn check(response: RawResponse) -> Result<RawResponse> {
    if response.is_success() {
        return Ok(response);
    }

    let kind = match response.status {
        StatusCode::UNAUTHORIZED => ErrorKind::AuthenticationFailed,
        StatusCode::FORBIDDEN => ErrorKind::AccessDenied,
        StatusCode::NOT_FOUND | StatusCode::GONE => ErrorKind::ResourceNotFound,
        StatusCode::NOT_ACCEPTABLE => ErrorKind::IncompatibleApiVersion,
        StatusCode::CONFLICT => ErrorKind::Conflict,
        c if c.is_client_error() => ErrorKind::InvalidInput,
        c if c.is_server_error() => ErrorKind::InternalServerError,
        _ => ErrorKind::InvalidResponse,
    };
    let message = fault_message(&response.body)
        .or_else(|| Some(response.body.trim().to_string()).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| format!("HTTP {}", response.status));
    Err(Error::new(kind, message))
}

async fn fetch<T, R>(transport: &T, request: Request) -> Result<R>
where
    T: Transport + ?Sized,
    R: DeserializeOwned,
{
    check(transport.send(request).await?)?.json()
}

/// Wrap a server creation request into `{"server": ...}` unless it is wrapped.
pub fn wrap_server_create(value: Value) -> Value {
    let wrapped = matches!(&value, Value::Object(obj) if obj.len() == 1 && obj.contains_key("server"));
    if wrapped {
        value
    } else {
        json!({ "server": value })
    }
}

/// Extract the image ID from the `Location` header of a `createImage` response.
///
/// Only HTTP 202 responses are considered. Returns the last non-empty path
/// segment, or `None` if the header is missing or has no slashes.
pub fn image_id_from_location(response: &RawResponse) -> Option<String> {
    if response.status != StatusCode::ACCEPTED {
        return None;
    }

    let location = response.header("location")?;
    if !location.contains('/') {
        return None;
    }

    location
        .split('/')
        .rev()
        .find(|segment| !segment.is_empty())
        .map(String::from)
}

/// List servers, optionally with details.
pub async fn list_servers<T: Transport + ?Sized>(
    transport: &T,
    detail: bool,
    query: Vec<(String, String)>,
) -> Result<Vec<Server>> {
    let path: &[&str] = if detail {
        &["servers", "detail"]
    } else {
        &["servers"]
    };
    let mut request = Request::new(Method::GET, path.iter().copied());
    request.query = query;
    trace!("Listing compute servers with {:?}", request.query);
    let root: ServersRoot = fetch(transport, request).await?;
    trace!("Received servers: {:?}", root.servers);
    Ok(root.servers)
}

/// Get a server.
pub async fn get_server<T: Transport + ?Sized>(transport: &T, id: &str) -> Result<Server> {
    trace!("Get compute server {}", id);
    let root: ServerRoot = fetch(transport, Request::new(Method::GET, ["servers", id])).await?;
    trace!("Received {:?}", root.server);
    Ok(root.server)
}

/// Create a server from an already wrapped request body.
pub async fn create_server<T: Transport + ?Sized>(transport: &T, body: Value) -> Result<Server> {
    trace!("Creating a server with {:?}", body);
    let request = Request::new(Method::POST, ["servers"]).with_body(body);
    let root: ServerRoot = fetch(transport, request).await?;
    debug!("Requested creation of server {}", root.server.id);
    Ok(root.server)
}

/// Delete a server.
pub async fn delete_server<T: Transport + ?Sized>(transport: &T, id: &str) -> Result<RawResponse> {
    trace!("Deleting server {}", id);
    transport
        .send(Request::new(Method::DELETE, ["servers", id]))
        .await
}

/// Post an action envelope to the server.
pub async fn server_action<T: Transport + ?Sized>(
    transport: &T,
    id: &str,
    action: &str,
    inner: Option<Value>,
) -> Result<RawResponse> {
    trace!("Running {} on server {} with {:?}", action, id, inner);
    let request =
        Request::new(Method::POST, ["servers", id, "action"]).with_body(envelope(action, inner));
    let response = transport.send(request).await?;
    trace!("Action {} on server {} returned HTTP {}", action, id, response.status);
    Ok(response)
}

/// Get the last lines of the server console log.
pub async fn get_console_output<T: Transport + ?Sized>(
    transport: &T,
    id: &str,
    length: u32,
) -> Result<Option<String>> {
    trace!("Fetching {} lines of console output of server {}", length, id);
    let body = envelope("os-getConsoleOutput", Some(json!({ "length": length })));
    let request = Request::new(Method::POST, ["servers", id, "action"]).with_body(body);
    let result: ConsoleOutput = fetch(transport, request).await?;
    Ok(result.output)
}

/// Get a VNC console of the server.
pub async fn get_vnc_console<T: Transport + ?Sized>(
    transport: &T,
    id: &str,
    console_type: VncConsoleType,
) -> Result<VncConsole> {
    trace!("Requesting {} console of server {}", console_type, id);
    let body = envelope("os-getVNCConsole", Some(json!({ "type": console_type })));
    let request = Request::new(Method::POST, ["servers", id, "action"]).with_body(body);
    let root: VncConsoleRoot = fetch(transport, request).await?;
    trace!("Received {:?}", root.console);
    Ok(root.console)
}

/// Get server diagnostics.
pub async fn get_diagnostics<T: Transport + ?Sized>(
    transport: &T,
    id: &str,
) -> Result<HashMap<String, Value>> {
    trace!("Fetching diagnostics of server {}", id);
    fetch(
        transport,
        Request::new(Method::GET, ["servers", id, "diagnostics"]),
    )
    .await
}

/// Get server metadata.
pub async fn get_metadata<T: Transport + ?Sized>(
    transport: &T,
    id: &str,
) -> Result<HashMap<String, String>> {
    trace!("Fetching metadata of server {}", id);
    let root: MetadataRoot = fetch(
        transport,
        Request::new(Method::GET, ["servers", id, "metadata"]),
    )
    .await?;
    Ok(root.metadata)
}

/// Replace server metadata.
pub async fn update_metadata<T: Transport + ?Sized>(
    transport: &T,
    id: &str,
    metadata: HashMap<String, String>,
) -> Result<HashMap<String, String>> {
    trace!("Replacing metadata of server {} with {:?}", id, metadata);
    let request = Request::new(Method::PUT, ["servers", id, "metadata"])
        .with_json(&MetadataRoot { metadata })?;
    let root: MetadataRoot = fetch(transport, request).await?;
    debug!("Updated metadata of server {}", id);
    Ok(root.metadata)
}

/// Delete one metadata item.
pub async fn delete_metadata_item<T: Transport + ?Sized>(
    transport: &T,
    id: &str,
    key: &str,
) -> Result<RawResponse> {
    trace!("Deleting metadata item {} of server {}", key, id);
    transport
        .send(Request::new(Method::DELETE, ["servers", id, "metadata", key]))
        .await
}

/// Attach a volume to the server.
pub async fn attach_volume<T: Transport + ?Sized>(
    transport: &T,
    id: &str,
    volume_id: &str,
) -> Result<VolumeAttachment> {
    trace!("Attaching volume {} to server {}", volume_id, id);
    let body = VolumeAttachmentCreateRoot {
        volume_attachment: VolumeAttachmentCreate {
            volume_id: volume_id.to_string(),
        },
    };
    let request =
        Request::new(Method::POST, ["servers", id, "os-volume_attachments"]).with_json(&body)?;
    let root: VolumeAttachmentRoot = fetch(transport, request).await?;
    debug!(
        "Attached volume {} to server {} as {}",
        volume_id, id, root.volume_attachment.id
    );
    Ok(root.volume_attachment)
}

/// Detach a volume from the server.
pub async fn detach_volume<T: Transport + ?Sized>(
    transport: &T,
    id: &str,
    attachment_id: &str,
) -> Result<RawResponse> {
    trace!("Detaching volume attachment {} from server {}", attachment_id, id);
    transport
        .send(Request::new(
            Method::DELETE,
            ["servers", id, "os-volume_attachments", attachment_id],
        ))
        .await
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{check, image_id_from_location, wrap_server_create};
    use crate::transport::test::{response, response_with_location};
    use crate::ErrorKind;

    #[test]
    fn test_image_id_from_location() {
        let resp = response_with_location(202, "https://nova/v2/images/abc-123");
        assert_eq!(image_id_from_location(&resp).as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_image_id_trailing_slash() {
        let resp = response_with_location(202, "http://x/images/9aa-bb/");
        assert_eq!(image_id_from_location(&resp).as_deref(), Some("9aa-bb"));
    }

    #[test]
    fn test_image_id_no_slash() {
        let resp = response_with_location(202, "noslash");
        assert_eq!(image_id_from_location(&resp), None);
    }

    #[test]
    fn test_image_id_missing_header() {
        assert_eq!(image_id_from_location(&response(202, "")), None);
    }

    #[test]
    fn test_image_id_wrong_status() {
        let resp = response_with_location(200, "http://x/images/9aa-bb");
        assert_eq!(image_id_from_location(&resp), None);
    }

    #[test]
    fn test_wrap_server_create() {
        assert_eq!(
            wrap_server_create(json!({"name": "a", "flavorRef": "1"})),
            json!({"server": {"name": "a", "flavorRef": "1"}})
        );
        let wrapped = json!({"server": {"name": "a", "flavorRef": "1"}});
        assert_eq!(wrap_server_create(wrapped.clone()), wrapped);
    }

    #[test]
    fn test_check_maps_status() {
        let cases = [
            (401, ErrorKind::AuthenticationFailed),
            (403, ErrorKind::AccessDenied),
            (404, ErrorKind::ResourceNotFound),
            (409, ErrorKind::Conflict),
            (400, ErrorKind::InvalidInput),
            (503, ErrorKind::InternalServerError),
        ];
        for (status, kind) in cases {
            assert_eq!(check(response(status, "")).unwrap_err().kind(), kind);
        }
        assert!(check(response(204, "")).is_ok());
    }

    #[test]
    fn test_check_uses_fault_message() {
        let body = r#"{"itemNotFound": {"code": 404, "message": "Instance abc could not be found."}}"#;
        let err = check(response(404, body)).unwrap_err();
        assert!(err.to_string().contains("Instance abc could not be found."));
    }
}
