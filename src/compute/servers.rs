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

//! Server management via Compute API.

use std::collections::HashMap;
use std::time::Duration;

use osauth::Session;
use serde::Serialize;
use serde_json::{json, Value};

use super::action::{classify, Action, ActionResult};
use super::api;
use super::protocol::{
    BackupOptions, LiveMigrateOptions, RebootType, RebuildOptions, Server, ServerStatus,
    VncConsole, VncConsoleType, VolumeAttachment,
};
use super::waiter::{StatusWaiter, DEFAULT_POLL_INTERVAL};
use crate::transport::Transport;
use crate::utils::ensure_not_empty;
use crate::{Error, ErrorKind, Result};

/// Number of console lines returned when no positive count is given.
const DEFAULT_CONSOLE_LINES: u32 = 50;

/// Operations on Compute servers.
///
/// The service holds nothing but its transport, so it can be cloned and
/// shared freely. Operations on the same server are not serialized.
///
/// # Examples
///
/// Listing servers of all projects:
///
/// ```rust,no_run
/// # async fn example() -> nova_servers::Result<()> {
/// let service = nova_servers::compute::ServerService::from_config("mycloud").await?;
/// for server in service.list_all(true).await? {
///     println!("{} {}", server.id, server.status);
/// }
/// # Ok(()) }
/// ```
///
/// Rebooting a server:
///
/// ```rust,no_run
/// use nova_servers::compute::{RebootType, ServerService};
///
/// # async fn example() -> nova_servers::Result<()> {
/// let service = ServerService::from_env().await?;
/// let result = service
///     .reboot("8a1c355b-2e1e-440a-8aa8-f272df72bc32", RebootType::Soft)
///     .await?;
/// if let Some(reason) = result.reason() {
///     println!("Reboot failed: {}", reason);
/// }
/// # Ok(()) }
/// ```
#[derive(Debug, Clone)]
pub struct ServerService<T = Session> {
    transport: T,
    poll_interval: Duration,
}

impl ServerService<Session> {
    /// Create a service from a `clouds.yaml` entry.
    pub async fn from_config<S: AsRef<str>>(cloud_name: S) -> Result<ServerService<Session>> {
        Ok(ServerService::new(Session::from_config(cloud_name).await?))
    }

    /// Create a service from `OS_*` environment variables.
    pub async fn from_env() -> Result<ServerService<Session>> {
        Ok(ServerService::new(Session::from_env().await?))
    }
}

impl<T: Transport> ServerService<T> {
    /// Create a service on top of a transport.
    pub fn new(transport: T) -> ServerService<T> {
        ServerService {
            transport,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Change the delay between polls when waiting for a status.
    ///
    /// Zero is replaced by one millisecond.
    pub fn with_poll_interval(mut self, interval: Duration) -> ServerService<T> {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Transport used by this service.
    #[inline]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// List servers of the current project with details.
    pub async fn list(&self) -> Result<Vec<Server>> {
        self.list_with_detail(true).await
    }

    /// List servers of the current project.
    ///
    /// Without details only IDs, names and links are populated.
    pub async fn list_with_detail(&self, detail: bool) -> Result<Vec<Server>> {
        api::list_servers(&self.transport, detail, Vec::new()).await
    }

    /// List servers of all projects (requires admin rights).
    pub async fn list_all(&self, detail: bool) -> Result<Vec<Server>> {
        let query = vec![(String::from("all_tenants"), String::from("1"))];
        api::list_servers(&self.transport, detail, query).await
    }

    /// List servers with details, filtered by arbitrary query parameters.
    ///
    /// An empty map lists all servers of the current project.
    pub async fn list_filtered(&self, filters: &HashMap<String, String>) -> Result<Vec<Server>> {
        let query = filters
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        api::list_servers(&self.transport, true, query).await
    }

    /// Get a server, returning `None` if it does not exist.
    pub async fn get<S: AsRef<str>>(&self, server_id: S) -> Result<Option<Server>> {
        let server_id = server_id.as_ref();
        ensure_not_empty(server_id, "Server ID")?;
        match api::get_server(&self.transport, server_id).await {
            Ok(server) => Ok(Some(server)),
            Err(err) if err.kind() == ErrorKind::ResourceNotFound => {
                debug!("Server {} was not found", server_id);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Boot a server.
    ///
    /// Accepts a [ServerCreate](struct.ServerCreate.html) or anything else
    /// that serializes into a server creation request, wrapped into
    /// `{"server": ...}` or not.
    pub async fn boot<R: Serialize + ?Sized>(&self, request: &R) -> Result<Server> {
        let value = serde_json::to_value(request).map_err(|err| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Cannot serialize server creation request: {}", err),
            )
        })?;
        if value.is_null() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Server creation request must not be empty",
            ));
        }
        api::create_server(&self.transport, api::wrap_server_create(value)).await
    }

    /// Boot a server and wait for it to become `ACTIVE`.
    ///
    /// See [wait_for_server_status](#method.wait_for_server_status) for the
    /// meaning of the result.
    pub async fn boot_and_wait_active<R: Serialize + ?Sized>(
        &self,
        request: &R,
        max_wait: Duration,
    ) -> Result<Option<Server>> {
        let server = self.boot(request).await?;
        self.wait_for_server_status(&server.id, ServerStatus::Active, max_wait)
            .await
    }

    /// Delete a server.
    pub async fn delete<S: AsRef<str>>(&self, server_id: S) -> Result<ActionResult> {
        let server_id = server_id.as_ref();
        ensure_not_empty(server_id, "Server ID")?;
        let response = api::delete_server(&self.transport, server_id).await?;
        let result = classify(&response, "delete");
        if result.is_success() {
            debug!("Successfully requested deletion of server {}", server_id);
        }
        Ok(result)
    }

    /// Run an action that takes no arguments.
    ///
    /// Actions that cannot be invoked yield a failure without any request.
    pub async fn action<S: AsRef<str>>(&self, server_id: S, action: Action) -> Result<ActionResult> {
        let server_id = server_id.as_ref();
        ensure_not_empty(server_id, "Server ID")?;
        match action.endpoint_key() {
            Some(key) => self.invoke(server_id, key, None).await,
            None => Ok(ActionResult::not_invokable(action)),
        }
    }

    /// Reboot a server.
    pub async fn reboot<S: AsRef<str>>(
        &self,
        server_id: S,
        reboot_type: RebootType,
    ) -> Result<ActionResult> {
        let server_id = server_id.as_ref();
        ensure_not_empty(server_id, "Server ID")?;
        self.invoke(server_id, "reboot", Some(json!({ "type": reboot_type })))
            .await
    }

    /// Rebuild a server, optionally with new parameters.
    pub async fn rebuild<S: AsRef<str>>(
        &self,
        server_id: S,
        options: Option<&RebuildOptions>,
    ) -> Result<ActionResult> {
        let server_id = server_id.as_ref();
        ensure_not_empty(server_id, "Server ID")?;
        let inner = options.map(to_json).transpose()?;
        self.invoke(server_id, "rebuild", inner).await
    }

    /// Resize a server to a new flavor.
    pub async fn resize<S1, S2>(&self, server_id: S1, flavor_id: S2) -> Result<ActionResult>
    where
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        let (server_id, flavor_id) = (server_id.as_ref(), flavor_id.as_ref());
        ensure_not_empty(server_id, "Server ID")?;
        ensure_not_empty(flavor_id, "Flavor ID")?;
        self.invoke(server_id, "resize", Some(json!({ "flavorRef": flavor_id })))
            .await
    }

    /// Confirm a finished resize.
    pub async fn confirm_resize<S: AsRef<str>>(&self, server_id: S) -> Result<ActionResult> {
        let server_id = server_id.as_ref();
        ensure_not_empty(server_id, "Server ID")?;
        self.invoke(server_id, "confirmResize", None).await
    }

    /// Revert a finished resize.
    pub async fn revert_resize<S: AsRef<str>>(&self, server_id: S) -> Result<ActionResult> {
        let server_id = server_id.as_ref();
        ensure_not_empty(server_id, "Server ID")?;
        self.invoke(server_id, "revertResize", None).await
    }

    /// Add a security group to a server.
    pub async fn add_security_group<S1, S2>(
        &self,
        server_id: S1,
        group_name: S2,
    ) -> Result<ActionResult>
    where
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        self.security_group_action(server_id.as_ref(), group_name.as_ref(), "addSecurityGroup")
            .await
    }

    /// Remove a security group from a server.
    pub async fn remove_security_group<S1, S2>(
        &self,
        server_id: S1,
        group_name: S2,
    ) -> Result<ActionResult>
    where
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        self.security_group_action(
            server_id.as_ref(),
            group_name.as_ref(),
            "removeSecurityGroup",
        )
        .await
    }

    /// Cold-migrate a server to another host.
    pub async fn migrate<S: AsRef<str>>(&self, server_id: S) -> Result<ActionResult> {
        let server_id = server_id.as_ref();
        ensure_not_empty(server_id, "Server ID")?;
        self.invoke(server_id, "migrate", None).await
    }

    /// Live-migrate a server.
    ///
    /// Without options the scheduler picks the host and no block migration
    /// is done.
    pub async fn live_migrate<S: AsRef<str>>(
        &self,
        server_id: S,
        options: Option<&LiveMigrateOptions>,
    ) -> Result<ActionResult> {
        let server_id = server_id.as_ref();
        ensure_not_empty(server_id, "Server ID")?;
        let inner = match options {
            Some(options) => to_json(options)?,
            None => to_json(&LiveMigrateOptions::default())?,
        };
        self.invoke(server_id, "os-migrateLive", Some(inner)).await
    }

    /// Create a backup of a server.
    pub async fn backup<S: AsRef<str>>(
        &self,
        server_id: S,
        options: &BackupOptions,
    ) -> Result<ActionResult> {
        let server_id = server_id.as_ref();
        ensure_not_empty(server_id, "Server ID")?;
        ensure_not_empty(&options.name, "Backup name")?;
        self.invoke(server_id, "createBackup", Some(to_json(options)?))
            .await
    }

    /// Change the administrator password of a server.
    pub async fn change_admin_password<S1, S2>(
        &self,
        server_id: S1,
        admin_password: S2,
    ) -> Result<ActionResult>
    where
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        let (server_id, admin_password) = (server_id.as_ref(), admin_password.as_ref());
        ensure_not_empty(server_id, "Server ID")?;
        ensure_not_empty(admin_password, "Administrator password")?;
        self.invoke(
            server_id,
            "changePassword",
            Some(json!({ "adminPass": admin_password })),
        )
        .await
    }

    /// Create an image from a server.
    ///
    /// Returns the ID of the image, which is created asynchronously, or
    /// `None` if the request was not accepted or the ID is unknown.
    pub async fn create_snapshot<S1, S2>(
        &self,
        server_id: S1,
        snapshot_name: S2,
    ) -> Result<Option<String>>
    where
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        let (server_id, snapshot_name) = (server_id.as_ref(), snapshot_name.as_ref());
        ensure_not_empty(server_id, "Server ID")?;
        ensure_not_empty(snapshot_name, "Snapshot name")?;
        let inner = json!({ "name": snapshot_name, "metadata": {} });
        let response =
            api::server_action(&self.transport, server_id, "createImage", Some(inner)).await?;
        let image_id = api::image_id_from_location(&response);
        match image_id {
            Some(ref id) => debug!("Server {} is being snapshotted into image {}", server_id, id),
            None => debug!(
                "No image ID for snapshot of server {} (HTTP {})",
                server_id, response.status
            ),
        }
        Ok(image_id)
    }

    /// Get the last lines of the console log.
    ///
    /// `None` or zero requests the default of 50 lines.
    pub async fn console_output<S: AsRef<str>>(
        &self,
        server_id: S,
        lines: Option<u32>,
    ) -> Result<Option<String>> {
        let server_id = server_id.as_ref();
        ensure_not_empty(server_id, "Server ID")?;
        let lines = lines.filter(|n| *n > 0).unwrap_or(DEFAULT_CONSOLE_LINES);
        api::get_console_output(&self.transport, server_id, lines).await
    }

    /// Get a VNC console, `novnc` by default.
    pub async fn vnc_console<S: AsRef<str>>(
        &self,
        server_id: S,
        console_type: Option<VncConsoleType>,
    ) -> Result<VncConsole> {
        let server_id = server_id.as_ref();
        ensure_not_empty(server_id, "Server ID")?;
        api::get_vnc_console(&self.transport, server_id, console_type.unwrap_or_default()).await
    }

    /// Get hypervisor-specific diagnostics.
    ///
    /// Values are mostly numbers, but the format depends on the hypervisor.
    pub async fn diagnostics<S: AsRef<str>>(&self, server_id: S) -> Result<HashMap<String, Value>> {
        let server_id = server_id.as_ref();
        ensure_not_empty(server_id, "Server ID")?;
        api::get_diagnostics(&self.transport, server_id).await
    }

    /// Get server metadata.
    pub async fn metadata<S: AsRef<str>>(&self, server_id: S) -> Result<HashMap<String, String>> {
        let server_id = server_id.as_ref();
        ensure_not_empty(server_id, "Server ID")?;
        api::get_metadata(&self.transport, server_id).await
    }

    /// Replace server metadata, returning the new metadata.
    pub async fn update_metadata<S: AsRef<str>>(
        &self,
        server_id: S,
        metadata: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>> {
        let server_id = server_id.as_ref();
        ensure_not_empty(server_id, "Server ID")?;
        if metadata.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Metadata must not be empty",
            ));
        }
        api::update_metadata(&self.transport, server_id, metadata.clone()).await
    }

    /// Delete one metadata item.
    pub async fn delete_metadata_item<S1, S2>(&self, server_id: S1, key: S2) -> Result<ActionResult>
    where
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        let (server_id, key) = (server_id.as_ref(), key.as_ref());
        ensure_not_empty(server_id, "Server ID")?;
        ensure_not_empty(key, "Metadata key")?;
        let response = api::delete_metadata_item(&self.transport, server_id, key).await?;
        Ok(classify(&response, "deleteMetadataItem"))
    }

    /// Attach a volume to a server.
    pub async fn attach_volume<S1, S2>(
        &self,
        server_id: S1,
        volume_id: S2,
    ) -> Result<VolumeAttachment>
    where
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        let (server_id, volume_id) = (server_id.as_ref(), volume_id.as_ref());
        ensure_not_empty(server_id, "Server ID")?;
        ensure_not_empty(volume_id, "Volume ID")?;
        api::attach_volume(&self.transport, server_id, volume_id).await
    }

    /// Detach a volume from a server.
    pub async fn detach_volume<S1, S2>(
        &self,
        server_id: S1,
        attachment_id: S2,
    ) -> Result<ActionResult>
    where
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        let (server_id, attachment_id) = (server_id.as_ref(), attachment_id.as_ref());
        ensure_not_empty(server_id, "Server ID")?;
        ensure_not_empty(attachment_id, "Attachment ID")?;
        let response = api::detach_volume(&self.transport, server_id, attachment_id).await?;
        Ok(classify(&response, "detachVolume"))
    }

    /// Wait for a server to reach a status.
    ///
    /// Polls the server once per interval (one second by default) until
    /// either its status is `status` or `ERROR`, the server disappears
    /// (`None` is returned) or `max_wait` elapses. In the last case the last
    /// fetched server is returned, so check its status. A zero `max_wait`
    /// results in `None` without any request.
    ///
    /// Dropping the returned future cancels the wait.
    pub async fn wait_for_server_status<S: AsRef<str>>(
        &self,
        server_id: S,
        status: ServerStatus,
        max_wait: Duration,
    ) -> Result<Option<Server>> {
        let server_id = server_id.as_ref();
        ensure_not_empty(server_id, "Server ID")?;
        StatusWaiter::new(status, max_wait, self.poll_interval)
            .wait(server_id, || self.get(server_id))
            .await
    }

    async fn security_group_action(
        &self,
        server_id: &str,
        group_name: &str,
        action: &str,
    ) -> Result<ActionResult> {
        ensure_not_empty(server_id, "Server ID")?;
        ensure_not_empty(group_name, "Security group name")?;
        self.invoke(server_id, action, Some(json!({ "name": group_name })))
            .await
    }

    async fn invoke(&self, server_id: &str, action: &str, inner: Option<Value>) -> Result<ActionResult> {
        let response = api::server_action(&self.transport, server_id, action, inner).await?;
        let result = classify(&response, action);
        if result.is_success() {
            debug!("Successfully ran {} on server {}", action, server_id);
        }
        Ok(result)
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|err| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("Cannot serialize action options: {}", err),
        )
    })
}
