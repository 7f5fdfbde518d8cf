//! reqwest-backed implementation of the server API

use crate::api::VaultApi;
use crate::error::ClientError;
use crate::types::{
    AuditInfo, AuthMount, EnableAuditOptions, EnableAuthOptions, InitRequest, InitResponse,
    LeaderStatus, MountInfo, MountInput, RegisterPluginInput, SealStatus, TokenCreateRequest,
};
use async_trait::async_trait;
use keywarden_core::document::MountConfig;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::Duration;
use tracing::warn;
use zeroize::Zeroize;

const TOKEN_HEADER: &str = "X-Vault-Token";
const DEFAULT_ADDRESS: &str = "https://127.0.0.1:8200";

/// Bounded exponential backoff for read-only requests.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// HTTP client for the server's `/v1` API. The auth token is held behind a
/// lock so it can be installed and scrubbed without `&mut`.
pub struct HttpVaultClient {
    http: reqwest::Client,
    address: String,
    token: RwLock<Option<String>>,
    retry: RetryConfig,
}

impl HttpVaultClient {
    /// Create a client for the given base address (scheme + host + port).
    pub fn new(address: &str) -> Result<Self, ClientError> {
        Self::with_timeout(address, Duration::from_secs(30))
    }

    /// Create a client reading `VAULT_ADDR`, `VAULT_TOKEN`, and
    /// `VAULT_TIMEOUT` from the environment.
    pub fn from_env() -> Result<Self, ClientError> {
        let address = std::env::var("VAULT_ADDR").unwrap_or_else(|_| DEFAULT_ADDRESS.to_string());
        let timeout = std::env::var("VAULT_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let client = Self::with_timeout(&address, Duration::from_secs(timeout))?;
        if let Ok(token) = std::env::var("VAULT_TOKEN") {
            client.set_token(&token);
        }
        Ok(client)
    }

    fn with_timeout(address: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            address: address.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.address, path.trim_start_matches('/'))
    }

    fn builder(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self.http.request(method, self.url(path));
        if let Some(token) = self.token.read().unwrap().as_deref() {
            request = request.header(TOKEN_HEADER, token);
        }
        request
    }

    async fn api_error(response: reqwest::Response) -> ClientError {
        #[derive(Deserialize)]
        struct ErrorBody {
            #[serde(default)]
            errors: Vec<String>,
        }

        let status = response.status().as_u16();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.errors.join("; "),
            Err(_) => String::new(),
        };
        ClientError::Api { status, message }
    }

    /// Issue a request, mapping any non-success status to `ClientError::Api`.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<reqwest::Response, ClientError> {
        let mut request = self.builder(method, path);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn try_get(&self, path: &str) -> Result<Option<Value>, ClientError> {
        let response = self.builder(Method::GET, path).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            _ => Err(Self::api_error(response).await),
        }
    }

    /// GET with retry on transport-level failures only; server answers
    /// (including errors) are returned as-is on the first attempt.
    async fn get_with_retry(&self, path: &str) -> Result<Option<Value>, ClientError> {
        let mut attempt = 0;
        let mut delay = self.retry.base_delay;

        loop {
            match self.try_get(path).await {
                Err(ClientError::Transport(e)) if attempt + 1 < self.retry.max_attempts => {
                    warn!(
                        path = %path,
                        attempt = attempt + 1,
                        error = %e,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.retry.max_delay);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let value = self
            .get_with_retry(path)
            .await?
            .ok_or_else(|| ClientError::invalid_response(format!("unexpected 404 from '{path}'")))?;
        Ok(serde_json::from_value(value)?)
    }

    async fn get_mount_map<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<BTreeMap<String, T>, ClientError> {
        let value = self
            .get_with_retry(path)
            .await?
            .ok_or_else(|| ClientError::invalid_response(format!("unexpected 404 from '{path}'")))?;
        mount_map(value)
    }
}

/// Parse a mount listing. Newer servers nest the map under `data`; older
/// ones return it at the top level mixed with request metadata. Mount keys
/// always carry a trailing slash, which separates them from the metadata.
fn mount_map<T: DeserializeOwned>(value: Value) -> Result<BTreeMap<String, T>, ClientError> {
    let source = match value.get("data") {
        Some(data) if data.is_object() => data.clone(),
        _ => value,
    };

    let Value::Object(entries) = source else {
        return Err(ClientError::invalid_response(
            "mount listing is not an object",
        ));
    };

    let mut mounts = BTreeMap::new();
    for (path, entry) in entries {
        if !path.ends_with('/') {
            continue;
        }
        let parsed = serde_json::from_value(entry)?;
        mounts.insert(path, parsed);
    }
    Ok(mounts)
}

#[async_trait]
impl VaultApi for HttpVaultClient {
    fn set_token(&self, token: &str) {
        let mut guard = self.token.write().unwrap();
        if let Some(mut old) = guard.take() {
            old.zeroize();
        }
        *guard = Some(token.to_string());
    }

    fn clear_token(&self) {
        if let Some(mut token) = self.token.write().unwrap().take() {
            token.zeroize();
        }
    }

    async fn seal_status(&self) -> Result<SealStatus, ClientError> {
        self.get_json("sys/seal-status").await
    }

    async fn health(&self) -> Result<bool, ClientError> {
        let response = self.builder(Method::GET, "sys/health").send().await?;
        Ok(response.status() == StatusCode::OK)
    }

    async fn leader(&self) -> Result<LeaderStatus, ClientError> {
        self.get_json("sys/leader").await
    }

    async fn init_status(&self) -> Result<bool, ClientError> {
        #[derive(Deserialize)]
        struct InitStatus {
            initialized: bool,
        }

        let status: InitStatus = self.get_json("sys/init").await?;
        Ok(status.initialized)
    }

    async fn init(&self, request: &InitRequest) -> Result<InitResponse, ClientError> {
        let response = self
            .request(Method::PUT, "sys/init", Some(serde_json::to_value(request)?))
            .await?;
        Ok(response.json().await?)
    }

    async fn unseal(&self, share: &str) -> Result<SealStatus, ClientError> {
        let response = self
            .request(Method::PUT, "sys/unseal", Some(json!({ "key": share })))
            .await?;
        Ok(response.json().await?)
    }

    async fn step_down(&self) -> Result<(), ClientError> {
        self.request(Method::PUT, "sys/step-down", None).await?;
        Ok(())
    }

    async fn create_orphan_token(&self, request: &TokenCreateRequest) -> Result<(), ClientError> {
        self.request(
            Method::POST,
            "auth/token/create-orphan",
            Some(serde_json::to_value(request)?),
        )
        .await?;
        Ok(())
    }

    async fn revoke_self(&self) -> Result<(), ClientError> {
        self.request(Method::POST, "auth/token/revoke-self", None)
            .await?;
        Ok(())
    }

    async fn list_auth(&self) -> Result<BTreeMap<String, AuthMount>, ClientError> {
        self.get_mount_map("sys/auth").await
    }

    async fn enable_auth(
        &self,
        path: &str,
        options: &EnableAuthOptions,
    ) -> Result<(), ClientError> {
        self.request(
            Method::POST,
            &format!("sys/auth/{path}"),
            Some(serde_json::to_value(options)?),
        )
        .await?;
        Ok(())
    }

    async fn put_policy(&self, name: &str, rules: &str) -> Result<(), ClientError> {
        self.request(
            Method::PUT,
            &format!("sys/policy/{name}"),
            Some(json!({ "policy": rules })),
        )
        .await?;
        Ok(())
    }

    async fn list_mounts(&self) -> Result<BTreeMap<String, MountInfo>, ClientError> {
        self.get_mount_map("sys/mounts").await
    }

    async fn mount(&self, path: &str, input: &MountInput) -> Result<(), ClientError> {
        self.request(
            Method::POST,
            &format!("sys/mounts/{path}"),
            Some(serde_json::to_value(input)?),
        )
        .await?;
        Ok(())
    }

    async fn tune_mount(&self, path: &str, config: &MountConfig) -> Result<(), ClientError> {
        self.request(
            Method::POST,
            &format!("sys/mounts/{path}/tune"),
            Some(serde_json::to_value(config)?),
        )
        .await?;
        Ok(())
    }

    async fn list_plugins(&self) -> Result<Vec<String>, ClientError> {
        let value = self
            .get_with_retry("sys/plugins/catalog")
            .await?
            .ok_or_else(|| ClientError::invalid_response("unexpected 404 from the plugin catalog"))?;
        let data = match value.get("data") {
            Some(data) if data.is_object() => data.clone(),
            _ => value,
        };

        let mut names = Vec::new();
        if let Some(listed) = data.get("names").and_then(Value::as_array) {
            names.extend(listed.iter().filter_map(Value::as_str).map(String::from));
        } else {
            for kind in ["auth", "database", "secret"] {
                if let Some(listed) = data.get(kind).and_then(Value::as_array) {
                    names.extend(listed.iter().filter_map(Value::as_str).map(String::from));
                }
            }
        }
        Ok(names)
    }

    async fn register_plugin(&self, input: &RegisterPluginInput) -> Result<(), ClientError> {
        let body = json!({
            "command": input.command,
            "args": input.args,
            "sha256": input.sha256,
        });
        self.request(
            Method::PUT,
            &format!("sys/plugins/catalog/{}/{}", input.plugin_type, input.name),
            Some(body),
        )
        .await?;
        Ok(())
    }

    async fn list_audit(&self) -> Result<BTreeMap<String, AuditInfo>, ClientError> {
        self.get_mount_map("sys/audit").await
    }

    async fn enable_audit(
        &self,
        path: &str,
        options: &EnableAuditOptions,
    ) -> Result<(), ClientError> {
        self.request(
            Method::PUT,
            &format!("sys/audit/{path}"),
            Some(serde_json::to_value(options)?),
        )
        .await?;
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Option<Value>, ClientError> {
        let Some(value) = self.get_with_retry(path).await? else {
            return Ok(None);
        };
        match value.get("data") {
            Some(Value::Null) | None => Ok(None),
            Some(data) => Ok(Some(data.clone())),
        }
    }

    async fn write(&self, path: &str, body: Option<&Value>) -> Result<(), ClientError> {
        self.request(Method::PUT, path, body.cloned()).await?;
        Ok(())
    }

    async fn list(&self, path: &str) -> Result<Option<Vec<String>>, ClientError> {
        let Some(value) = self.get_with_retry(&format!("{path}?list=true")).await? else {
            return Ok(None);
        };
        let keys = value
            .get("data")
            .and_then(|data| data.get("keys"))
            .and_then(Value::as_array)
            .map(|keys| {
                keys.iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            });
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_map_prefers_the_data_wrapper() {
        let value = json!({
            "request_id": "abc",
            "data": {
                "token/": { "type": "token", "accessor": "auth_token_123" }
            }
        });
        let mounts: BTreeMap<String, AuthMount> = mount_map(value).unwrap();
        assert_eq!(mounts["token/"].method_type, "token");
    }

    #[test]
    fn mount_map_skips_metadata_on_legacy_responses() {
        let value = json!({
            "kv/": { "type": "kv", "accessor": "kv_123" },
            "request_id": "abc"
        });
        let mounts: BTreeMap<String, MountInfo> = mount_map(value).unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts["kv/"].engine_type, "kv");
    }

    #[test]
    fn urls_are_rooted_at_v1() {
        let client = HttpVaultClient::new("http://127.0.0.1:8200/").unwrap();
        assert_eq!(
            client.url("sys/seal-status"),
            "http://127.0.0.1:8200/v1/sys/seal-status"
        );
        assert_eq!(client.url("/secret/foo"), "http://127.0.0.1:8200/v1/secret/foo");
    }
}
