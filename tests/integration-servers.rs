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

use std::collections::HashMap;
use std::env;
use std::sync::{Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, LOCATION};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use nova_servers::compute::{Action, ServerCreate, ServerService, ServerStatus};
use nova_servers::transport::{RawResponse, Request, Transport};

static INIT: Once = Once::new();

fn set_up_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// In-memory Nova that builds servers in two polls.
#[derive(Debug, Default)]
struct FakeNova {
    servers: Mutex<HashMap<String, (String, u32)>>,
    counter: Mutex<u32>,
}

fn reply(status: StatusCode, body: Value) -> RawResponse {
    let text = if body.is_null() {
        String::new()
    } else {
        body.to_string()
    };
    RawResponse::new(status, HeaderMap::new(), text)
}

fn not_found(id: &str) -> RawResponse {
    reply(
        StatusCode::NOT_FOUND,
        json!({"itemNotFound": {"code": 404, "message": format!("Instance {} could not be found.", id)}}),
    )
}

impl FakeNova {
    fn server_json(id: &str, name: &str, status: &str) -> Value {
        json!({"server": {"id": id, "name": name, "status": status}})
    }

    fn create(&self, body: &Value) -> RawResponse {
        let name = body["server"]["name"].as_str().unwrap_or_default().to_string();
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        let id = format!("srv-{}", counter);
        let _ = self
            .servers
            .lock()
            .unwrap()
            .insert(id.clone(), (name.clone(), 0));
        reply(
            StatusCode::ACCEPTED,
            FakeNova::server_json(&id, &name, "BUILD"),
        )
    }

    fn get(&self, id: &str) -> RawResponse {
        let mut servers = self.servers.lock().unwrap();
        match servers.get_mut(id) {
            Some((name, polls)) => {
                *polls += 1;
                let status = match *polls {
                    1 => "BUILD",
                    p if p < 100 => "ACTIVE",
                    _ => "PAUSED",
                };
                reply(StatusCode::OK, FakeNova::server_json(id, name, status))
            }
            None => not_found(id),
        }
    }

    fn action(&self, id: &str, body: &Value) -> RawResponse {
        let mut servers = self.servers.lock().unwrap();
        let server = match servers.get_mut(id) {
            Some(server) => server,
            None => return not_found(id),
        };
        if body.get("pause").is_some() {
            server.1 = 100;
            return reply(StatusCode::ACCEPTED, Value::Null);
        }
        if body.get("createImage").is_some() {
            let mut headers = HeaderMap::new();
            let _ = headers.insert(
                LOCATION,
                HeaderValue::from_static("http://fake/v2/images/img-42"),
            );
            return RawResponse::new(StatusCode::ACCEPTED, headers, "");
        }
        reply(
            StatusCode::BAD_REQUEST,
            json!({"badRequest": {"code": 400, "message": "Unsupported action"}}),
        )
    }

    fn delete(&self, id: &str) -> RawResponse {
        match self.servers.lock().unwrap().remove(id) {
            Some(_) => reply(StatusCode::NO_CONTENT, Value::Null),
            None => not_found(id),
        }
    }
}

#[async_trait]
impl Transport for FakeNova {
    async fn send(&self, request: Request) -> nova_servers::Result<RawResponse> {
        let path: Vec<&str> = request.path.iter().map(String::as_str).collect();
        let body = request.body.clone().unwrap_or(Value::Null);
        let method = &request.method;
        Ok(match path.as_slice() {
            ["servers"] if method == Method::POST => self.create(&body),
            ["servers", id] if method == Method::GET => self.get(id),
            ["servers", id] if method == Method::DELETE => self.delete(id),
            ["servers", id, "action"] if method == Method::POST => self.action(id, &body),
            _ => reply(StatusCode::NOT_FOUND, Value::Null),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_server_lifecycle() {
    set_up_logging();
    let service = ServerService::new(FakeNova::default());

    let request = ServerCreate::new("lifecycle", "m1.tiny").with_image("cirros");
    let server = service
        .boot_and_wait_active(&request, Duration::from_secs(30))
        .await
        .expect("Failed to boot a server")
        .expect("Server disappeared");
    assert_eq!(server.id, "srv-1");
    assert_eq!(server.name, "lifecycle");
    assert_eq!(server.status, ServerStatus::Active);

    let result = service
        .action(&server.id, Action::Pause)
        .await
        .expect("Failed to pause");
    assert!(result.is_success());
    let paused = service
        .wait_for_server_status(&server.id, ServerStatus::Paused, Duration::from_secs(5))
        .await
        .expect("Failed to wait")
        .expect("Server disappeared");
    assert_eq!(paused.status, ServerStatus::Paused);

    let image = service
        .create_snapshot(&server.id, "lifecycle-snap")
        .await
        .expect("Failed to snapshot");
    assert_eq!(image.as_deref(), Some("img-42"));

    let result = service
        .action(&server.id, Action::Lock)
        .await
        .expect("Failed to request lock");
    assert_eq!(result.reason(), Some("Unsupported action"));
    assert_eq!(result.code(), Some(400));

    assert!(service.delete(&server.id).await.unwrap().is_success());
    assert!(service.get(&server.id).await.unwrap().is_none());
    let gone = service
        .wait_for_server_status(&server.id, ServerStatus::Active, Duration::from_secs(5))
        .await
        .unwrap();
    assert!(gone.is_none());

    let result = service.delete(&server.id).await.unwrap();
    assert_eq!(result.reason(), Some("Instance srv-1 could not be found."));
}

#[tokio::test]
async fn test_unrecognized_action_parsed() {
    set_up_logging();
    let service = ServerService::new(FakeNova::default());
    let action: Action = "REBOOT_EVERYTHING".parse().unwrap();
    assert_eq!(action, Action::Unrecognized);
    let result = service.action("srv-1", action).await.unwrap();
    assert!(!result.is_success());
    assert_eq!(result.code(), None);
}

#[tokio::test]
#[ignore = "requires a real cloud"]
async fn test_boot_delete_real_server() {
    set_up_logging();
    let image_id = env::var("NOVA_SERVERS_IMAGE").expect("Missing NOVA_SERVERS_IMAGE");
    let flavor_id = env::var("NOVA_SERVERS_FLAVOR").expect("Missing NOVA_SERVERS_FLAVOR");
    let network_id = env::var("NOVA_SERVERS_NETWORK").expect("Missing NOVA_SERVERS_NETWORK");

    let service = ServerService::from_env()
        .await
        .expect("Failed to create an identity provider from the environment");

    let request = ServerCreate::new("nova-servers-integration", flavor_id)
        .with_image(image_id)
        .with_network(network_id)
        .with_metadata("created-by", "nova-servers");
    let server = service
        .boot_and_wait_active(&request, Duration::from_secs(600))
        .await
        .expect("Failed to boot a server")
        .expect("Server disappeared while booting");
    assert_eq!(server.status, ServerStatus::Active);

    let metadata = service.metadata(&server.id).await.expect("No metadata");
    assert_eq!(
        metadata.get("created-by").map(String::as_str),
        Some("nova-servers")
    );

    let output = service
        .console_output(&server.id, Some(10))
        .await
        .expect("Failed to get console output");
    assert!(output.is_some());

    let result = service
        .delete(&server.id)
        .await
        .expect("Failed to request deletion");
    assert!(result.is_success());
    let gone = service
        .wait_for_server_status(&server.id, ServerStatus::Deleted, Duration::from_secs(300))
        .await
        .expect("Failed to wait for deletion");
    assert!(gone.map_or(true, |s| s.status == ServerStatus::Deleted));
}
