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

//! Waiting for a server to reach a status.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use super::protocol::{Server, ServerStatus};
use crate::Result;

/// Default delay between two polls.
pub(crate) const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Wait for a server to reach a status.
///
/// `ERROR` always ends the wait, whatever the target is.
#[derive(Debug, Clone)]
pub(crate) struct StatusWaiter {
    target: ServerStatus,
    wait_timeout: Duration,
    delay: Duration,
}

impl StatusWaiter {
    pub(crate) fn new(target: ServerStatus, wait_timeout: Duration, delay: Duration) -> StatusWaiter {
        StatusWaiter {
            target,
            wait_timeout,
            delay,
        }
    }

    /// Poll with `fetch` until the status matches, the server vanishes or
    /// the timeout is reached.
    ///
    /// Time is accounted in whole delays: at most `ceil(timeout / delay)`
    /// polls are made. On timeout the last fetched server is returned. The
    /// wait is cancelled by dropping the returned future.
    pub(crate) async fn wait<F, Fut>(&self, server_id: &str, mut fetch: F) -> Result<Option<Server>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<Server>>>,
    {
        let mut elapsed = Duration::ZERO;
        let mut current = None;

        while elapsed < self.wait_timeout {
            let server = match fetch().await? {
                Some(server) => server,
                None => {
                    debug!("Server {} no longer exists", server_id);
                    return Ok(None);
                }
            };

            if server.status == self.target || server.status == ServerStatus::Error {
                debug!("Server {} reached status {}", server_id, server.status);
                return Ok(Some(server));
            }

            trace!(
                "Still waiting for server {} to get to status {}, current is {}",
                server_id,
                self.target,
                server.status
            );
            current = Some(server);
            sleep(self.delay).await;
            elapsed += self.delay;
        }

        debug!(
            "Timeout waiting for server {} to reach status {}",
            server_id, self.target
        );
        Ok(current)
    }
}

#[cfg(test)]
mod test {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use tokio::time::Instant;

    use super::{StatusWaiter, DEFAULT_POLL_INTERVAL};
    use crate::compute::protocol::{Server, ServerStatus};
    use crate::Result;

    fn server(status: &str) -> Server {
        serde_json::from_value(serde_json::json!({"id": "s1", "status": status})).unwrap()
    }

    struct Script {
        states: Mutex<VecDeque<Option<Server>>>,
        polls: Mutex<usize>,
    }

    impl Script {
        fn new(states: Vec<Option<Server>>) -> Script {
            Script {
                states: Mutex::new(states.into()),
                polls: Mutex::new(0),
            }
        }

        async fn fetch(&self) -> Result<Option<Server>> {
            *self.polls.lock().unwrap() += 1;
            let mut states = self.states.lock().unwrap();
            Ok(if states.len() > 1 {
                states.pop_front().unwrap()
            } else {
                states.front().cloned().unwrap()
            })
        }

        fn polls(&self) -> usize {
            *self.polls.lock().unwrap()
        }
    }

    fn waiter(target: ServerStatus, secs: u64) -> StatusWaiter {
        StatusWaiter::new(target, Duration::from_secs(secs), DEFAULT_POLL_INTERVAL)
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaches_target() {
        let script = Script::new(vec![
            Some(server("BUILD")),
            Some(server("BUILD")),
            Some(server("ACTIVE")),
        ]);
        let start = Instant::now();
        let result = waiter(ServerStatus::Active, 10)
            .wait("s1", || script.fetch())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.status, ServerStatus::Active);
        assert_eq!(script.polls(), 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_short_circuits() {
        let script = Script::new(vec![Some(server("BUILD")), Some(server("ERROR"))]);
        let result = waiter(ServerStatus::Active, 10)
            .wait("s1", || script.fetch())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.status, ServerStatus::Error);
        assert_eq!(script.polls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_last_server() {
        let script = Script::new(vec![Some(server("BUILD"))]);
        let start = Instant::now();
        let result = waiter(ServerStatus::Active, 3)
            .wait("s1", || script.fetch())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.status, ServerStatus::Building);
        assert_eq!(script.polls(), 3);
        assert!(start.elapsed() <= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_not_multiple_of_delay() {
        let script = Script::new(vec![Some(server("SHUTOFF"))]);
        let waiter = StatusWaiter::new(
            ServerStatus::Active,
            Duration::from_millis(2500),
            DEFAULT_POLL_INTERVAL,
        );
        let _ = waiter.wait("s1", || script.fetch()).await.unwrap();
        assert_eq!(script.polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_vanishes() {
        let script = Script::new(vec![Some(server("BUILD")), None]);
        let result = waiter(ServerStatus::Active, 10)
            .wait("s1", || script.fetch())
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(script.polls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout() {
        let script = Script::new(vec![Some(server("ACTIVE"))]);
        let result = waiter(ServerStatus::Active, 0)
            .wait("s1", || script.fetch())
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(script.polls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_propagate() {
        let waiter = waiter(ServerStatus::Active, 10);
        let result = waiter
            .wait("s1", || async {
                Err(crate::Error::new(crate::ErrorKind::InternalServerError, "boom"))
            })
            .await;
        assert_eq!(
            result.unwrap_err().kind(),
            crate::ErrorKind::InternalServerError
        );
    }
}
