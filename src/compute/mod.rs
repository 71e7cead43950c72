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

//! Compute API support.
//!
//! Currently supported functionality:
//!
//! * [server management](struct.ServerService.html): listing, booting,
//!   deleting and waiting for servers
//! * [server actions](enum.Action.html) like pause, reboot, resize,
//!   migrate or snapshot
//! * consoles, diagnostics, metadata and volume attachments
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use nova_servers::compute::{ServerService, ServerStatus};
//!
//! # async fn example() -> nova_servers::Result<()> {
//! let service = ServerService::from_config("mycloud").await?;
//! let result = service.resize("8a1c355b-2e1e-440a-8aa8-f272df72bc32", "m1.large").await?;
//! if result.is_success() {
//!     let server = service
//!         .wait_for_server_status(
//!             "8a1c355b-2e1e-440a-8aa8-f272df72bc32",
//!             ServerStatus::VerifyingResize,
//!             Duration::from_secs(600),
//!         )
//!         .await?;
//!     println!("{:?}", server.map(|s| s.status));
//! }
//! # Ok(()) }
//! ```

mod action;
pub mod api;
mod protocol;
mod servers;
mod waiter;

pub use self::action::{classify, envelope, Action, ActionResult};
pub use self::protocol::{
    AddressType, BackupOptions, BackupType, Link, LiveMigrateOptions, RebootType, RebuildOptions,
    Ref, Server, ServerAddress, ServerCreate, ServerCreateRoot, ServerFault, ServerStatus,
    VncConsole, VncConsoleType, VolumeAttachment,
};
pub use self::servers::ServerService;
