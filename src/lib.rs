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

//! Client for the servers part of the OpenStack Compute (Nova) API.
//!
//! The entry point is [ServerService](compute/struct.ServerService.html),
//! which translates operations like "boot a server", "live-migrate" or
//! "wait until ACTIVE" into requests against a Nova endpoint.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use nova_servers::compute::{Action, ServerCreate, ServerService};
//!
//! # async fn example() -> nova_servers::Result<()> {
//! let service = ServerService::from_env().await?;
//!
//! let request = ServerCreate::new("web-1", "m1.small").with_image("cirros");
//! let server = service
//!     .boot_and_wait_active(&request, Duration::from_secs(300))
//!     .await?
//!     .expect("Server disappeared while booting");
//! println!("Server {} is {}", server.id, server.status);
//!
//! let result = service.action(&server.id, Action::Pause).await?;
//! assert!(result.is_success());
//! # Ok(()) }
//! # #[tokio::main]
//! # async fn main() { example().await.unwrap(); }
//! ```
//!
//! Any [Transport](transport/trait.Transport.html) can back the service;
//! `osauth::Session` is the default one.

#![crate_name = "nova_servers"]
#![crate_type = "lib"]
#![doc(html_root_url = "https://docs.rs/nova-servers/0.1.0")]
// NOTE: we do not use generic deny(warnings) to avoid breakages with new
// versions of the compiler. Add more warnings here as you discover them.
#![deny(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused,
    unused_import_braces,
    unused_qualifications
)]

#[macro_use]
extern crate log;

#[macro_use]
mod utils;

pub mod compute;
pub mod transport;

pub use osauth::{Error, ErrorKind};

/// A result of an OpenStack operation.
pub type Result<T> = ::std::result::Result<T, Error>;
