//! Recording mock of the server API for reconciler and state-machine tests
//!
//! Pre-configure server-side state through the public fields, then assert
//! on the recorded call sequence.

#![allow(dead_code)]

use async_trait::async_trait;
use keywarden_client::{
    AuditInfo, AuthMount, ClientError, EnableAuditOptions, EnableAuthOptions, InitRequest,
    InitResponse, LeaderStatus, MountInfo, MountInput, RegisterPluginInput, SealStatus,
    TokenCreateRequest, VaultApi,
};
use keywarden_core::document::MountConfig;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

/// One recorded API call.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub op: String,
    pub path: String,
    pub body: Option<Value>,
}

/// Recording in-memory stand-in for the server.
#[derive(Default)]
pub struct MockVaultApi {
    pub calls: Mutex<Vec<RecordedCall>>,
    pub token: Mutex<Option<String>>,

    pub initialized: Mutex<bool>,
    pub sealed: Mutex<bool>,

    /// `(keys, recovery_keys, root_token)` returned by `init`.
    pub init_response: Mutex<Option<(Vec<String>, Vec<String>, String)>>,

    /// Responses returned by successive `unseal` calls.
    pub unseal_responses: Mutex<VecDeque<SealStatus>>,

    pub auth_mounts: Mutex<BTreeMap<String, AuthMount>>,
    pub mounts: Mutex<BTreeMap<String, MountInfo>>,
    pub audit_devices: Mutex<BTreeMap<String, AuditInfo>>,
    pub plugins: Mutex<Vec<String>>,

    /// Data returned by generic `read`s, keyed by path.
    pub read_responses: Mutex<HashMap<String, Value>>,

    /// Keys returned by generic `list`s, keyed by path.
    pub list_responses: Mutex<HashMap<String, Vec<String>>>,

    /// Paths whose generic `write` fails with `(status, message)`.
    pub write_errors: Mutex<HashMap<String, (u16, String)>>,
}

impl MockVaultApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, op: &str, path: &str, body: Option<Value>) {
        self.calls.lock().unwrap().push(RecordedCall {
            op: op.to_string(),
            path: path.to_string(),
            body,
        });
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, op: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.op == op)
            .collect()
    }

    pub fn writes_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.op == "write" && call.path == path)
            .collect()
    }

    /// Index of the first call matching the predicate, for ordering asserts.
    pub fn position<F: Fn(&RecordedCall) -> bool>(&self, pred: F) -> Option<usize> {
        self.calls().iter().position(|call| pred(call))
    }

    pub fn installed_token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }
}

#[async_trait]
impl VaultApi for MockVaultApi {
    fn set_token(&self, token: &str) {
        *self.token.lock().unwrap() = Some(token.to_string());
    }

    fn clear_token(&self) {
        *self.token.lock().unwrap() = None;
    }

    async fn seal_status(&self) -> Result<SealStatus, ClientError> {
        self.record("seal_status", "sys/seal-status", None);
        Ok(SealStatus {
            sealed: *self.sealed.lock().unwrap(),
            progress: 0,
            threshold: 0,
            shares: 0,
        })
    }

    async fn health(&self) -> Result<bool, ClientError> {
        self.record("health", "sys/health", None);
        Ok(!*self.sealed.lock().unwrap())
    }

    async fn leader(&self) -> Result<LeaderStatus, ClientError> {
        self.record("leader", "sys/leader", None);
        Ok(LeaderStatus {
            is_self: true,
            leader_address: String::new(),
        })
    }

    async fn init_status(&self) -> Result<bool, ClientError> {
        self.record("init_status", "sys/init", None);
        Ok(*self.initialized.lock().unwrap())
    }

    async fn init(&self, request: &InitRequest) -> Result<InitResponse, ClientError> {
        self.record(
            "init",
            "sys/init",
            Some(serde_json::to_value(request).unwrap()),
        );
        let (keys, recovery_keys, root_token) = self
            .init_response
            .lock()
            .unwrap()
            .clone()
            .expect("init response not configured on the mock");
        *self.initialized.lock().unwrap() = true;
        Ok(InitResponse {
            keys,
            recovery_keys,
            root_token,
        })
    }

    async fn unseal(&self, share: &str) -> Result<SealStatus, ClientError> {
        self.record("unseal", "sys/unseal", Some(json!({ "key": share })));
        self.unseal_responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::invalid_response("no unseal response configured"))
    }

    async fn step_down(&self) -> Result<(), ClientError> {
        self.record("step_down", "sys/step-down", None);
        Ok(())
    }

    async fn create_orphan_token(&self, request: &TokenCreateRequest) -> Result<(), ClientError> {
        self.record(
            "create_orphan_token",
            "auth/token/create-orphan",
            Some(serde_json::to_value(request).unwrap()),
        );
        Ok(())
    }

    async fn revoke_self(&self) -> Result<(), ClientError> {
        self.record("revoke_self", "auth/token/revoke-self", None);
        Ok(())
    }

    async fn list_auth(&self) -> Result<BTreeMap<String, AuthMount>, ClientError> {
        self.record("list_auth", "sys/auth", None);
        Ok(self.auth_mounts.lock().unwrap().clone())
    }

    async fn enable_auth(
        &self,
        path: &str,
        options: &EnableAuthOptions,
    ) -> Result<(), ClientError> {
        self.record(
            "enable_auth",
            path,
            Some(serde_json::to_value(options).unwrap()),
        );
        self.auth_mounts.lock().unwrap().insert(
            format!("{path}/"),
            AuthMount {
                method_type: options.method_type.clone(),
                accessor: format!("auth_{}_mock", options.method_type),
                description: options.description.clone().unwrap_or_default(),
            },
        );
        Ok(())
    }

    async fn put_policy(&self, name: &str, rules: &str) -> Result<(), ClientError> {
        self.record("put_policy", name, Some(json!({ "policy": rules })));
        Ok(())
    }

    async fn list_mounts(&self) -> Result<BTreeMap<String, MountInfo>, ClientError> {
        self.record("list_mounts", "sys/mounts", None);
        Ok(self.mounts.lock().unwrap().clone())
    }

    async fn mount(&self, path: &str, input: &MountInput) -> Result<(), ClientError> {
        self.record("mount", path, Some(serde_json::to_value(input).unwrap()));
        self.mounts.lock().unwrap().insert(
            format!("{path}/"),
            MountInfo {
                engine_type: input.engine_type.clone(),
                accessor: format!("mount_{}_mock", input.engine_type),
                description: input.description.clone().unwrap_or_default(),
            },
        );
        Ok(())
    }

    async fn tune_mount(&self, path: &str, config: &MountConfig) -> Result<(), ClientError> {
        self.record(
            "tune_mount",
            path,
            Some(serde_json::to_value(config).unwrap()),
        );
        Ok(())
    }

    async fn list_plugins(&self) -> Result<Vec<String>, ClientError> {
        self.record("list_plugins", "sys/plugins/catalog", None);
        Ok(self.plugins.lock().unwrap().clone())
    }

    async fn register_plugin(&self, input: &RegisterPluginInput) -> Result<(), ClientError> {
        self.record(
            "register_plugin",
            &format!("sys/plugins/catalog/{}/{}", input.plugin_type, input.name),
            Some(json!({
                "command": input.command,
                "args": input.args,
                "sha256": input.sha256,
            })),
        );
        Ok(())
    }

    async fn list_audit(&self) -> Result<BTreeMap<String, AuditInfo>, ClientError> {
        self.record("list_audit", "sys/audit", None);
        Ok(self.audit_devices.lock().unwrap().clone())
    }

    async fn enable_audit(
        &self,
        path: &str,
        options: &EnableAuditOptions,
    ) -> Result<(), ClientError> {
        self.record(
            "enable_audit",
            path,
            Some(serde_json::to_value(options).unwrap()),
        );
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Option<Value>, ClientError> {
        self.record("read", path, None);
        Ok(self.read_responses.lock().unwrap().get(path).cloned())
    }

    async fn write(&self, path: &str, body: Option<&Value>) -> Result<(), ClientError> {
        self.record("write", path, body.cloned());
        if let Some((status, message)) = self.write_errors.lock().unwrap().get(path) {
            return Err(ClientError::Api {
                status: *status,
                message: message.clone(),
            });
        }
        Ok(())
    }

    async fn list(&self, path: &str) -> Result<Option<Vec<String>>, ClientError> {
        self.record("list", path, None);
        Ok(self.list_responses.lock().unwrap().get(path).cloned())
    }
}
