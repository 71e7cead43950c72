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

//! Transport binding used by the compute services.
//!
//! A [Transport](trait.Transport.html) sends a [Request](struct.Request.html)
//! to the Compute endpoint and returns the [RawResponse](struct.RawResponse.html)
//! regardless of its status code. Decoding and status interpretation happen
//! in the callers.
//!
//! The implementation for `osauth::Session` takes care of authentication,
//! endpoint discovery and URL-encoding of the path segments.

use std::sync::Arc;

use async_trait::async_trait;
use osauth::services::COMPUTE;
use osauth::Session;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Error, ErrorKind, Result};

/// A request to the Compute API.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Path segments relative to the endpoint, not encoded.
    pub path: Vec<String>,
    /// Query parameters in the order they were added.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
}

/// A response with its status, headers and body.
#[derive(Clone, Debug)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body as text (may be empty).
    pub body: String,
}

/// Something that can send requests to the Compute API.
///
/// Implementations must be safe to share between tasks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the response without checking its status.
    async fn send(&self, request: Request) -> Result<RawResponse>;
}

impl Request {
    /// Create a request without query or body.
    pub fn new<I>(method: Method, path: I) -> Request
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Request {
            method,
            path: path.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Add a query parameter.
    pub fn with_query<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Request {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Set a JSON body.
    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Request> {
        let value = serde_json::to_value(body).map_err(|err| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Cannot serialize request body: {}", err),
            )
        })?;
        self.body = Some(value);
        Ok(self)
    }

    /// Set an already built JSON body.
    pub fn with_body(mut self, body: serde_json::Value) -> Request {
        self.body = Some(body);
        self
    }

    /// Path joined with slashes, as used in log messages.
    pub fn path_string(&self) -> String {
        format!("/{}", self.path.join("/"))
    }
}

impl RawResponse {
    /// Create a response.
    pub fn new<S: Into<String>>(status: StatusCode, headers: HeaderMap, body: S) -> RawResponse {
        RawResponse {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Value of a header, if present and valid UTF-8.
    ///
    /// Header names are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|err| {
            Error::new(
                ErrorKind::InvalidResponse,
                format!("Failed to decode response body: {}", err),
            )
        })
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: Request) -> Result<RawResponse> {
        (**self).send(request).await
    }
}

#[async_trait]
impl Transport for Session {
    async fn send(&self, request: Request) -> Result<RawResponse> {
        trace!("Sending {} {}", request.method, request.path_string());
        let mut builder = self.request(COMPUTE, request.method, &request.path);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send_unchecked().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        trace!("Received HTTP {} with {} bytes", status, body.len());
        Ok(RawResponse::new(status, headers, body))
    }
}
