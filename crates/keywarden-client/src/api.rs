//! The server API surface driven by the lifecycle manager

use crate::error::ClientError;
use crate::types::{
    AuditInfo, AuthMount, EnableAuditOptions, EnableAuthOptions, InitRequest, InitResponse,
    LeaderStatus, MountInfo, MountInput, RegisterPluginInput, SealStatus, TokenCreateRequest,
};
use async_trait::async_trait;
use keywarden_core::document::MountConfig;
use serde_json::Value;
use std::collections::BTreeMap;

/// Everything the lifecycle manager needs from the server. Object-safe so
/// tests can substitute a recording implementation.
#[async_trait]
pub trait VaultApi: Send + Sync {
    /// Install an auth token used for subsequent requests.
    fn set_token(&self, token: &str);

    /// Drop (and zero) the installed auth token.
    fn clear_token(&self);

    async fn seal_status(&self) -> Result<SealStatus, ClientError>;

    /// Whether the server answers its health endpoint as an active node.
    async fn health(&self) -> Result<bool, ClientError>;

    async fn leader(&self) -> Result<LeaderStatus, ClientError>;

    async fn init_status(&self) -> Result<bool, ClientError>;

    async fn init(&self, request: &InitRequest) -> Result<InitResponse, ClientError>;

    async fn unseal(&self, share: &str) -> Result<SealStatus, ClientError>;

    async fn step_down(&self) -> Result<(), ClientError>;

    async fn create_orphan_token(&self, request: &TokenCreateRequest) -> Result<(), ClientError>;

    /// Revoke the token currently installed on the client.
    async fn revoke_self(&self) -> Result<(), ClientError>;

    /// Auth backends keyed by mount path (with trailing slash).
    async fn list_auth(&self) -> Result<BTreeMap<String, AuthMount>, ClientError>;

    async fn enable_auth(&self, path: &str, options: &EnableAuthOptions)
        -> Result<(), ClientError>;

    async fn put_policy(&self, name: &str, rules: &str) -> Result<(), ClientError>;

    /// Secret-engine mounts keyed by mount path (with trailing slash).
    async fn list_mounts(&self) -> Result<BTreeMap<String, MountInfo>, ClientError>;

    async fn mount(&self, path: &str, input: &MountInput) -> Result<(), ClientError>;

    async fn tune_mount(&self, path: &str, config: &MountConfig) -> Result<(), ClientError>;

    /// Names currently present in the plugin catalog.
    async fn list_plugins(&self) -> Result<Vec<String>, ClientError>;

    async fn register_plugin(&self, input: &RegisterPluginInput) -> Result<(), ClientError>;

    /// Audit devices keyed by mount path (with trailing slash).
    async fn list_audit(&self) -> Result<BTreeMap<String, AuditInfo>, ClientError>;

    async fn enable_audit(
        &self,
        path: &str,
        options: &EnableAuditOptions,
    ) -> Result<(), ClientError>;

    /// Generic read of a logical path. `None` when the path has no data.
    async fn read(&self, path: &str) -> Result<Option<Value>, ClientError>;

    /// Generic write of a logical path. `None` body sends an empty request
    /// (rotation endpoints).
    async fn write(&self, path: &str, body: Option<&Value>) -> Result<(), ClientError>;

    /// Generic list of a logical path. `None` when the path has no entries.
    async fn list(&self, path: &str) -> Result<Option<Vec<String>>, ClientError>;
}
