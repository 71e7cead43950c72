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

//! JSON structures and protocol bits for the Compute API.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, FixedOffset};
use serde::de::{DeserializeOwned, Error as DeserError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

protocol_enum! {
    #[doc = "Possible server statuses."]
    enum ServerStatus ? Unknown {
        Active = "ACTIVE",
        Building = "BUILD",
        Deleted = "DELETED",
        Error = "ERROR",
        HardRebooting = "HARD_REBOOT",
        Migrating = "MIGRATING",
        Paused = "PAUSED",
        Rebooting = "REBOOT",
        Rebuilding = "REBUILD",
        Rescued = "RESCUE",
        Resizing = "RESIZE",
        RevertingResize = "REVERT_RESIZE",
        ShutOff = "SHUTOFF",
        Suspended = "SUSPENDED",
        Shelved = "SHELVED",
        ShelvedOffloaded = "SHELVED_OFFLOADED",
        SoftDeleted = "SOFT_DELETED",
        Unknown = "UNKNOWN",
        UpdatingPassword = "PASSWORD",
        VerifyingResize = "VERIFY_RESIZE"
    }
}

protocol_enum! {
    #[doc = "Reboot type."]
    enum RebootType {
        Hard = "HARD",
        Soft = "SOFT"
    }
}

protocol_enum! {
    #[doc = "Type of a VNC console."]
    enum VncConsoleType {
        NoVnc = "novnc",
        XvpVnc = "xvpvnc"
    }
}

protocol_enum! {
    #[doc = "Type of a server backup."]
    enum BackupType {
        Daily = "daily",
        Weekly = "weekly"
    }
}

protocol_enum! {
    #[doc = "Type of a server address."]
    enum AddressType {
        Fixed = "fixed",
        Floating = "floating"
    }
}

impl Default for ServerStatus {
    fn default() -> ServerStatus {
        ServerStatus::Unknown
    }
}

impl Default for VncConsoleType {
    fn default() -> VncConsoleType {
        VncConsoleType::NoVnc
    }
}

/// Treat `null` and empty strings as a missing value.
///
/// Nova returns `"image": ""` for servers booted from volumes.
fn empty_as_none<'de, D, T>(des: D) -> ::std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(des)? {
        Value::Null => Ok(None),
        Value::String(ref s) if s.is_empty() => Ok(None),
        other => serde_json::from_value(other)
            .map(Some)
            .map_err(DeserError::custom),
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub rel: String,
}

/// A reference to another resource.
#[derive(Clone, Debug, Deserialize)]
pub struct Ref {
    pub id: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// Address of a server.
#[derive(Clone, Debug, Deserialize)]
pub struct ServerAddress {
    /// IP (v4 of v6) address.
    pub addr: IpAddr,
    /// IP version (4 or 6).
    #[serde(default)]
    pub version: Option<u8>,
    /// MAC address (if available).
    #[serde(rename = "OS-EXT-IPS-MAC:mac_addr", default)]
    pub mac_addr: Option<String>,
    /// Address type (if known).
    #[serde(rename = "OS-EXT-IPS:type", default)]
    pub addr_type: Option<AddressType>,
}

/// Fault recorded for a server in the ERROR state.
#[derive(Clone, Debug, Deserialize)]
pub struct ServerFault {
    #[serde(default)]
    pub code: Option<u16>,
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
}

/// A server.
///
/// Summary listings only carry `id`, `name` and `links`, the rest of the
/// fields take their defaults then. Attributes without a dedicated field
/// are kept in `extra`.
#[derive(Clone, Debug, Deserialize)]
pub struct Server {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: ServerStatus,
    #[serde(rename = "accessIPv4", default, deserialize_with = "empty_as_none")]
    pub access_ipv4: Option<Ipv4Addr>,
    #[serde(rename = "accessIPv6", default, deserialize_with = "empty_as_none")]
    pub access_ipv6: Option<Ipv6Addr>,
    #[serde(default)]
    pub addresses: HashMap<String, Vec<ServerAddress>>,
    #[serde(rename = "adminPass", default)]
    pub admin_pass: Option<String>,
    #[serde(rename = "OS-EXT-AZ:availability_zone", default)]
    pub availability_zone: Option<String>,
    #[serde(rename = "created", default)]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub fault: Option<ServerFault>,
    /// Flavor reference (older microversions) or embedded flavor description.
    #[serde(default)]
    pub flavor: Option<Value>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub image: Option<Ref>,
    #[serde(rename = "key_name", default, deserialize_with = "empty_as_none")]
    pub key_pair_name: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(rename = "OS-EXT-STS:task_state", default)]
    pub task_state: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(rename = "updated", default)]
    pub updated_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(rename = "OS-EXT-STS:vm_state", default)]
    pub vm_state: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServersRoot {
    pub servers: Vec<Server>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerRoot {
    pub server: Server,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum ServerNetwork {
    Network { uuid: String },
    Port { port: String },
}

#[derive(Clone, Debug, Serialize)]
pub struct SecurityGroupName {
    pub name: String,
}

/// A request to boot a server.
///
/// Serialized without the `{"server": ...}` envelope, which is added when
/// the server is booted.
#[derive(Clone, Debug, Serialize)]
pub struct ServerCreate {
    #[serde(rename = "adminPass", skip_serializing_if = "Option::is_none")]
    pub admin_pass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(rename = "flavorRef")]
    pub flavor_ref: String,
    #[serde(rename = "imageRef", skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<ServerNetwork>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<SecurityGroupName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
}

/// A server creation request already wrapped into its envelope.
#[derive(Clone, Debug, Serialize)]
pub struct ServerCreateRoot {
    pub server: ServerCreate,
}

/// Options of the `rebuild` action.
#[derive(Clone, Debug, Serialize)]
pub struct RebuildOptions {
    #[serde(rename = "adminPass", skip_serializing_if = "Option::is_none")]
    pub admin_pass: Option<String>,
    #[serde(rename = "imageRef")]
    pub image_ref: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserve_ephemeral: Option<bool>,
}

/// Options of the `os-migrateLive` action.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LiveMigrateOptions {
    pub host: Option<String>,
    pub block_migration: bool,
    pub disk_over_commit: bool,
}

/// Options of the `createBackup` action.
#[derive(Clone, Debug, Serialize)]
pub struct BackupOptions {
    pub name: String,
    pub backup_type: BackupType,
    pub rotation: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ConsoleOutput {
    #[serde(default)]
    pub output: Option<String>,
}

/// A remote console of a server.
#[derive(Clone, Debug, Deserialize)]
pub struct VncConsole {
    #[serde(rename = "type")]
    pub console_type: VncConsoleType,
    pub url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VncConsoleRoot {
    pub console: VncConsole,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MetadataRoot {
    pub metadata: HashMap<String, String>,
}

/// An attachment of a volume to a server.
#[derive(Clone, Debug, Deserialize)]
pub struct VolumeAttachment {
    #[serde(default)]
    pub device: Option<String>,
    pub id: String,
    #[serde(rename = "serverId", default)]
    pub server_id: Option<String>,
    #[serde(rename = "volumeId")]
    pub volume_id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VolumeAttachmentRoot {
    #[serde(rename = "volumeAttachment")]
    pub volume_attachment: VolumeAttachment,
}

#[derive(Clone, Debug, Serialize)]
pub struct VolumeAttachmentCreate {
    #[serde(rename = "volumeId")]
    pub volume_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct VolumeAttachmentCreateRoot {
    #[serde(rename = "volumeAttachment")]
    pub volume_attachment: VolumeAttachmentCreate,
}

impl ServerCreate {
    /// Start a request with the required name and flavor.
    pub fn new<N: Into<String>, F: Into<String>>(name: N, flavor: F) -> ServerCreate {
        ServerCreate {
            admin_pass: None,
            availability_zone: None,
            flavor_ref: flavor.into(),
            image_ref: None,
            key_name: None,
            metadata: HashMap::new(),
            name: name.into(),
            networks: Vec::new(),
            security_groups: Vec::new(),
            user_data: None,
        }
    }

    /// Set the administrator password.
    pub fn with_admin_pass<S: Into<String>>(mut self, value: S) -> Self {
        self.admin_pass = Some(value.into());
        self
    }

    /// Set the availability zone.
    pub fn with_availability_zone<S: Into<String>>(mut self, value: S) -> Self {
        self.availability_zone = Some(value.into());
        self
    }

    /// Set the image to boot from.
    pub fn with_image<S: Into<String>>(mut self, value: S) -> Self {
        self.image_ref = Some(value.into());
        self
    }

    /// Set the key pair name.
    pub fn with_key_name<S: Into<String>>(mut self, value: S) -> Self {
        self.key_name = Some(value.into());
        self
    }

    /// Add a metadata item.
    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        let _ = self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach the server to a network.
    pub fn with_network<S: Into<String>>(mut self, value: S) -> Self {
        self.networks.push(ServerNetwork::Network { uuid: value.into() });
        self
    }

    /// Attach the server to an existing port.
    pub fn with_port<S: Into<String>>(mut self, value: S) -> Self {
        self.networks.push(ServerNetwork::Port { port: value.into() });
        self
    }

    /// Add a security group by name.
    pub fn with_security_group<S: Into<String>>(mut self, value: S) -> Self {
        self.security_groups.push(SecurityGroupName { name: value.into() });
        self
    }

    /// Set user data (expected to be base64-encoded).
    pub fn with_user_data<S: Into<String>>(mut self, value: S) -> Self {
        self.user_data = Some(value.into());
        self
    }

    /// Wrap into the `{"server": ...}` envelope.
    pub fn into_root(self) -> ServerCreateRoot {
        ServerCreateRoot { server: self }
    }
}

impl RebuildOptions {
    /// Rebuild from the given image.
    pub fn new<S: Into<String>>(image: S) -> RebuildOptions {
        RebuildOptions {
            admin_pass: None,
            image_ref: image.into(),
            metadata: HashMap::new(),
            name: None,
            preserve_ephemeral: None,
        }
    }

    /// Set a new administrator password.
    pub fn with_admin_pass<S: Into<String>>(mut self, value: S) -> Self {
        self.admin_pass = Some(value.into());
        self
    }

    /// Add a metadata item.
    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        let _ = self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set a new server name.
    pub fn with_name<S: Into<String>>(mut self, value: S) -> Self {
        self.name = Some(value.into());
        self
    }

    /// Whether to keep the ephemeral partition.
    pub fn with_preserve_ephemeral(mut self, value: bool) -> Self {
        self.preserve_ephemeral = Some(value);
        self
    }
}

impl LiveMigrateOptions {
    /// Migrate to the given host instead of letting the scheduler pick one.
    pub fn with_host<S: Into<String>>(mut self, value: S) -> Self {
        self.host = Some(value.into());
        self
    }

    /// Use block migration.
    pub fn with_block_migration(mut self, value: bool) -> Self {
        self.block_migration = value;
        self
    }

    /// Allow disk over-commit on the destination.
    pub fn with_disk_over_commit(mut self, value: bool) -> Self {
        self.disk_over_commit = value;
        self
    }
}

impl BackupOptions {
    /// Create backup options.
    pub fn new<S: Into<String>>(name: S, backup_type: BackupType, rotation: u32) -> BackupOptions {
        BackupOptions {
            name: name.into(),
            backup_type,
            rotation,
        }
    }
}
