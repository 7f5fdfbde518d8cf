//! Declarative configuration document model
//!
//! The document drives reconciliation of the server's mutable configuration.
//! Free-form blocks (auth configs, roles, secret-engine sub-configs) are kept
//! as YAML values until the moment they are written to the server, because
//! YAML permits non-string mapping keys that have to be coerced first (see
//! [`crate::coerce`]).

use serde::{Deserialize, Serialize};
use serde_yaml_ng::Mapping;
use std::collections::BTreeMap;

/// The full declarative document consumed by the reconciler.
///
/// Unknown top-level keys are rejected, so a typo'd section name fails the
/// run instead of being silently ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalConfig {
    #[serde(default)]
    pub policies: Vec<Policy>,

    #[serde(default)]
    pub auth: Vec<AuthMethod>,

    #[serde(default)]
    pub secrets: Vec<SecretEngine>,

    #[serde(default)]
    pub plugins: Vec<Plugin>,

    #[serde(default)]
    pub audit: Vec<AuditDevice>,

    #[serde(default, rename = "startupSecrets")]
    pub startup_secrets: Vec<StartupSecret>,

    #[serde(default)]
    pub groups: Vec<IdentityGroup>,

    #[serde(default, rename = "group-aliases")]
    pub group_aliases: Vec<GroupAlias>,
}

/// A named policy whose rules are policy-language source text.
#[derive(Debug, Clone, Deserialize)]
pub struct Policy {
    pub name: String,
    pub rules: String,
}

/// An authentication backend to mount and configure.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthMethod {
    #[serde(rename = "type")]
    pub method_type: String,

    /// Mount path; defaults to the method type.
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Backend configuration written to `auth/<path>/config` (or the
    /// type-specific config endpoint).
    #[serde(default)]
    pub config: Option<Mapping>,

    /// Roles written under the backend's role sub-path.
    #[serde(default)]
    pub roles: Vec<Mapping>,

    /// GitHub team/user to policy mappings, keyed by mapping type.
    #[serde(default, rename = "map")]
    pub mappings: BTreeMap<String, BTreeMap<String, String>>,

    /// AWS cross-account STS roles.
    #[serde(default)]
    pub sts_roles: Vec<Mapping>,

    /// LDAP/Okta user to policy mappings.
    #[serde(default)]
    pub users: BTreeMap<String, Mapping>,

    /// LDAP/Okta group to policy mappings.
    #[serde(default)]
    pub groups: BTreeMap<String, Mapping>,
}

/// Mount tuning parameters shared by the mount and tune endpoints.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MountConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_lease_ttl: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lease_ttl: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_no_cache: Option<bool>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

/// A secret engine to mount (or tune) and configure.
#[derive(Debug, Clone, Deserialize)]
pub struct SecretEngine {
    #[serde(rename = "type")]
    pub engine_type: String,

    /// Mount path; defaults to the engine type.
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub plugin_name: Option<String>,

    #[serde(default)]
    pub local: bool,

    #[serde(default)]
    pub seal_wrap: bool,

    #[serde(default)]
    pub config: MountConfig,

    /// Engine options; overlaid onto `config.options`, outer wins.
    #[serde(default)]
    pub options: BTreeMap<String, String>,

    /// Nested engine configuration: config option to a list of sub-configs,
    /// each written at `<path>/<configOption>[/<name>]`.
    #[serde(default)]
    pub configuration: BTreeMap<String, Vec<Mapping>>,
}

impl SecretEngine {
    /// Mount tuning with `options` overlaid onto `config.options`;
    /// entries outside `config` win.
    pub fn mount_config(&self) -> MountConfig {
        let mut config = self.config.clone();
        for (key, value) in &self.options {
            config.options.insert(key.clone(), value.clone());
        }
        config
    }
}

/// A plugin binary to register in the server's catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct Plugin {
    pub plugin_name: String,

    #[serde(rename = "type")]
    pub plugin_type: String,

    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    pub sha256: String,
}

/// An audit sink to enable. Audit devices are never tuned once enabled.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditDevice {
    #[serde(rename = "type")]
    pub device_type: String,

    /// Mount path; defaults to the device type.
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub local: bool,

    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// A secret seeded once at startup. Only `kv` is recognized.
#[derive(Debug, Clone, Deserialize)]
pub struct StartupSecret {
    #[serde(rename = "type")]
    pub secret_type: String,

    pub path: String,

    #[serde(default)]
    pub data: Mapping,
}

/// An identity group. Only `external` groups are supported; members are
/// bound through group aliases.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityGroup {
    pub name: String,

    #[serde(rename = "type")]
    pub group_type: String,

    #[serde(default)]
    pub policies: Vec<String>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// A mapping from an identity-provider group (resolved through an auth
/// mount's accessor) to an internal identity group.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupAlias {
    pub name: String,
    pub mountpath: String,
    pub group: String,
}
