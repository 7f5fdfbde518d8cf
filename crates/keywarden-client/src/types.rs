//! Wire types for the server's REST API

use crate::error::ClientError;
use keywarden_core::document::MountConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Seal state of the server, also returned by each unseal step.
///
/// `progress` resets to `0` when the server rejects a share; the unseal
/// loop relies on that to diagnose bad key material.
#[derive(Debug, Clone, Deserialize)]
pub struct SealStatus {
    pub sealed: bool,

    #[serde(default)]
    pub progress: u64,

    /// Shares required to unseal
    #[serde(default, rename = "t")]
    pub threshold: u64,

    /// Total shares
    #[serde(default, rename = "n")]
    pub shares: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderStatus {
    #[serde(default)]
    pub is_self: bool,

    #[serde(default)]
    pub leader_address: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct InitRequest {
    pub secret_shares: u32,
    pub secret_threshold: u32,
    pub recovery_shares: u32,
    pub recovery_threshold: u32,
}

/// Key material returned by initialization. The Debug form redacts the
/// shares and token so the response can never leak through logging.
#[derive(Clone, Deserialize)]
pub struct InitResponse {
    #[serde(default)]
    pub keys: Vec<String>,

    #[serde(default)]
    pub recovery_keys: Vec<String>,

    pub root_token: String,
}

impl fmt::Debug for InitResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitResponse")
            .field("keys", &format_args!("[REDACTED; {}]", self.keys.len()))
            .field(
                "recovery_keys",
                &format_args!("[REDACTED; {}]", self.recovery_keys.len()),
            )
            .field("root_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenCreateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    pub no_parent: bool,
}

/// An auth backend as listed by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthMount {
    #[serde(rename = "type")]
    pub method_type: String,

    #[serde(default)]
    pub accessor: String,

    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnableAuthOptions {
    #[serde(rename = "type")]
    pub method_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A secret-engine mount as listed by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct MountInfo {
    #[serde(rename = "type")]
    pub engine_type: String,

    #[serde(default)]
    pub accessor: String,

    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MountInput {
    #[serde(rename = "type")]
    pub engine_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_name: Option<String>,

    pub config: MountConfig,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,

    pub local: bool,

    pub seal_wrap: bool,
}

/// The server's plugin type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginType {
    Auth,
    Database,
    Secret,
}

impl PluginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Database => "database",
            Self::Secret => "secret",
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auth" => Ok(Self::Auth),
            "database" => Ok(Self::Database),
            "secret" => Ok(Self::Secret),
            other => Err(ClientError::InvalidPluginType {
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegisterPluginInput {
    pub name: String,
    pub plugin_type: PluginType,
    pub command: String,
    pub args: Vec<String>,
    pub sha256: String,
}

/// An audit device as listed by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditInfo {
    #[serde(rename = "type")]
    pub device_type: String,

    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnableAuditOptions {
    #[serde(rename = "type")]
    pub device_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,

    pub local: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_status_maps_short_field_names() {
        let status: SealStatus =
            serde_json::from_str(r#"{"sealed":true,"t":3,"n":5,"progress":2}"#).unwrap();
        assert!(status.sealed);
        assert_eq!(status.threshold, 3);
        assert_eq!(status.shares, 5);
        assert_eq!(status.progress, 2);
    }

    #[test]
    fn plugin_type_parses_the_server_enumeration() {
        assert_eq!("auth".parse::<PluginType>().unwrap(), PluginType::Auth);
        assert_eq!(
            "database".parse::<PluginType>().unwrap(),
            PluginType::Database
        );
        assert_eq!("secret".parse::<PluginType>().unwrap(), PluginType::Secret);
        assert!("backend".parse::<PluginType>().is_err());
    }

    #[test]
    fn init_response_debug_never_shows_material() {
        let resp: InitResponse = serde_json::from_str(
            r#"{"keys":["abc"],"recovery_keys":["def"],"root_token":"s.xyz"}"#,
        )
        .unwrap();
        let debug = format!("{resp:?}");
        assert!(!debug.contains("abc"));
        assert!(!debug.contains("s.xyz"));
        assert!(debug.contains("REDACTED"));
    }
}
