//! Command implementations

pub mod configure;
pub mod init;
pub mod step_down;
pub mod unseal;

use anyhow::Result;
use camino::Utf8PathBuf;
use keywarden_client::HttpVaultClient;
use keywarden_kv::FileKv;
use keywarden_lifecycle::{InitConfig, LifecycleManager};
use std::sync::Arc;

use crate::cli::InitArgs;

/// Shared command context built from the global CLI flags.
pub struct AppContext {
    pub vault_addr: String,
    pub keystore_dir: Utf8PathBuf,
}

impl AppContext {
    /// Build a lifecycle manager over the file keystore and the HTTP client.
    pub fn manager(&self, config: InitConfig) -> Result<LifecycleManager> {
        let keystore = Arc::new(FileKv::new(self.keystore_dir.clone())?);
        let client = Arc::new(HttpVaultClient::new(&self.vault_addr)?);
        Ok(LifecycleManager::new(keystore, client, config)?)
    }
}

impl InitArgs {
    pub fn into_config(self) -> InitConfig {
        InitConfig {
            secret_shares: self.secret_shares,
            secret_threshold: self.secret_threshold,
            init_root_token: self.init_root_token,
            store_root_token: self.store_root_token,
            preflight_checks: self.preflight_checks,
        }
    }
}
