//! The init/unseal state machine and reconciler entry point

use crate::error::LifecycleError;
use crate::paths;
use crate::reconcile;
use anyhow::{Context, Result};
use keywarden_client::{HttpVaultClient, InitRequest, TokenCreateRequest, VaultApi};
use keywarden_core::ExternalConfig;
use keywarden_kv::{set_once, KvError, KvStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

const UNSEAL_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Immutable initialization parameters, validated at construction.
#[derive(Debug, Clone)]
pub struct InitConfig {
    /// How many key shares to produce.
    pub secret_shares: u32,

    /// How many shares are needed to unseal (`<= secret_shares`).
    pub secret_threshold: u32,

    /// When set, the server-issued root token is exchanged for this one.
    pub init_root_token: Option<String>,

    /// Whether the effective root token is persisted to the keystore.
    pub store_root_token: bool,

    /// Whether to round-trip the keystore before initializing.
    pub preflight_checks: bool,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            secret_shares: 5,
            secret_threshold: 3,
            init_root_token: None,
            store_root_token: true,
            preflight_checks: false,
        }
    }
}

/// Performs init, unseal, and configuration reconciliation against a
/// running server, with all shared material held in the keystore.
pub struct LifecycleManager {
    keystore: Arc<dyn KvStore>,
    client: Arc<dyn VaultApi>,
    config: InitConfig,
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Clears the client token on drop so that no exit path leaves the root
/// token installed.
struct TokenScrub<'a> {
    client: &'a dyn VaultApi,
}

impl Drop for TokenScrub<'_> {
    fn drop(&mut self) {
        self.client.clear_token();
    }
}

impl LifecycleManager {
    /// Create a manager. Fails before any I/O when the share parameters are
    /// inconsistent.
    pub fn new(
        keystore: Arc<dyn KvStore>,
        client: Arc<dyn VaultApi>,
        config: InitConfig,
    ) -> Result<Self, LifecycleError> {
        if config.secret_threshold == 0 {
            return Err(LifecycleError::ThresholdTooSmall);
        }
        if config.secret_shares < config.secret_threshold {
            return Err(LifecycleError::ThresholdExceedsShares {
                shares: config.secret_shares,
                threshold: config.secret_threshold,
            });
        }

        Ok(Self {
            keystore,
            client,
            config,
        })
    }

    /// Whether the server is sealed.
    pub async fn sealed(&self) -> Result<bool> {
        let status = self
            .client
            .seal_status()
            .await
            .context("error checking the seal status")?;
        Ok(status.sealed)
    }

    /// Whether the server answers as the active node.
    pub async fn active(&self) -> Result<bool> {
        self.client
            .health()
            .await
            .context("error checking the health status")
    }

    /// Whether this node is the leader.
    pub async fn leader(&self) -> Result<bool> {
        let status = self
            .client
            .leader()
            .await
            .context("error checking the leader")?;
        Ok(status.is_self)
    }

    /// Initialize the server if it is not initialized already.
    ///
    /// Shares and recovery shares are persisted to the keystore with
    /// create-only writes; residual material from an earlier attempt makes
    /// the whole operation fail rather than overwrite.
    pub async fn init(&self) -> Result<()> {
        let initialized = self
            .client
            .init_status()
            .await
            .context("error testing if vault is initialized")?;
        if initialized {
            info!("vault is already initialized");
            return Ok(());
        }

        info!("initializing vault");

        if self.config.preflight_checks {
            self.keystore
                .test(paths::TEST_KEY)
                .await
                .context("error testing the keystore before init")?;
        }

        let mut keys = vec![paths::ROOT_TOKEN_KEY.to_string()];
        for i in 0..=self.config.secret_shares {
            keys.push(paths::unseal_key(i));
        }
        for key in keys {
            match self.keystore.get(&key).await {
                Err(KvError::NotFound { .. }) => {}
                Ok(_) => return Err(LifecycleError::ResidualInitState { key }.into()),
                Err(e) => {
                    return Err(e).with_context(|| format!("checking key '{key}' before init"))
                }
            }
        }

        let response = self
            .client
            .init(&InitRequest {
                secret_shares: self.config.secret_shares,
                secret_threshold: self.config.secret_threshold,
                recovery_shares: self.config.secret_shares,
                recovery_threshold: self.config.secret_threshold,
            })
            .await
            .context("error initializing vault")?;

        for (i, share) in response.keys.iter().enumerate() {
            let key = paths::unseal_key(i as u32);
            set_once(self.keystore.as_ref(), &key, share.as_bytes())
                .await
                .with_context(|| format!("error storing unseal key '{key}'"))?;
            info!(key = %key, "unseal key stored in the keystore");
        }

        for (i, share) in response.recovery_keys.iter().enumerate() {
            let key = paths::recovery_key(i as u32);
            set_once(self.keystore.as_ref(), &key, share.as_bytes())
                .await
                .with_context(|| format!("error storing recovery key '{key}'"))?;
            info!(key = %key, "recovery key stored in the keystore");
        }

        let mut root_token = Zeroizing::new(response.root_token.clone());

        if let Some(requested) = &self.config.init_root_token {
            info!("setting up the requested root token, waiting for vault to be unsealed");

            loop {
                match self.sealed().await {
                    Ok(false) => break,
                    Ok(true) => info!("vault is still sealed, waiting for unseal"),
                    Err(e) => info!(error = %e, "vault is not reachable"),
                }
                tokio::time::sleep(UNSEAL_POLL_INTERVAL).await;
            }

            // The server-issued token is only used to mint the requested one
            // and is revoked right after.
            self.client.set_token(&response.root_token);
            let _scrub = TokenScrub {
                client: self.client.as_ref(),
            };

            self.client
                .create_orphan_token(&TokenCreateRequest {
                    id: Some(requested.clone()),
                    policies: vec!["root".to_string()],
                    display_name: Some("root-token".to_string()),
                    no_parent: true,
                })
                .await
                .context("unable to set up the requested root token")?;

            self.client
                .revoke_self()
                .await
                .context("unable to revoke the server-issued root token")?;

            root_token = Zeroizing::new(requested.clone());
        }

        if self.config.store_root_token {
            set_once(
                self.keystore.as_ref(),
                paths::ROOT_TOKEN_KEY,
                root_token.as_bytes(),
            )
            .await
            .context("error storing the root token")?;
            info!(key = paths::ROOT_TOKEN_KEY, "root token stored in the keystore");
        } else if self.config.init_root_token.is_none() {
            warn!(
                root_token = %root_token.as_str(),
                "the root token won't be stored in the keystore; it grants full privileges to vault, keep it safe"
            );
        }

        Ok(())
    }

    /// Unseal the server by submitting stored shares until it reports
    /// unsealed.
    ///
    /// The server resets `progress` to 0 when it rejects a share; that is
    /// diagnosed as [`LifecycleError::InvalidShare`] instead of looping.
    pub async fn unseal(&self) -> Result<()> {
        let mut share_index: u32 = 0;
        loop {
            let key = paths::unseal_key(share_index);
            debug!(key = %key, "retrieving unseal share from the keystore");
            let share_bytes = self
                .keystore
                .get(&key)
                .await
                .with_context(|| format!("unable to get key '{key}'"))?;
            let share = Zeroizing::new(
                String::from_utf8(share_bytes.to_vec())
                    .with_context(|| format!("unseal share '{key}' is not valid UTF-8"))?,
            );

            debug!("sending an unseal request to vault");
            let status = self
                .client
                .unseal(share.as_str())
                .await
                .context("failed to send the unseal request to vault")?;

            debug!(
                sealed = status.sealed,
                progress = status.progress,
                "got unseal response"
            );

            if !status.sealed {
                return Ok(());
            }

            if status.progress == 0 {
                return Err(LifecycleError::InvalidShare { index: share_index }.into());
            }

            share_index += 1;
        }
    }

    /// Reconcile the server's mutable configuration from the declarative
    /// document. Sections run in a fixed order; the first failing section
    /// aborts the run. The root token is scrubbed on every exit path.
    pub async fn configure(&self, external: &ExternalConfig) -> Result<()> {
        debug!("retrieving the root token from the keystore");
        let token_bytes = self
            .keystore
            .get(paths::ROOT_TOKEN_KEY)
            .await
            .with_context(|| format!("unable to get key '{}'", paths::ROOT_TOKEN_KEY))?;
        let root_token = Zeroizing::new(
            String::from_utf8(token_bytes.to_vec())
                .context("the stored root token is not valid UTF-8")?,
        );

        self.client.set_token(root_token.as_str());
        let _scrub = TokenScrub {
            client: self.client.as_ref(),
        };
        let client = self.client.as_ref();

        reconcile::auth::reconcile(client, &external.auth)
            .await
            .context("error configuring auth methods for vault")?;

        reconcile::policy::reconcile(client, &external.policies)
            .await
            .context("error configuring policies for vault")?;

        reconcile::plugin::reconcile(client, &external.plugins)
            .await
            .context("error configuring plugins for vault")?;

        reconcile::secrets::reconcile(client, &external.secrets)
            .await
            .context("error configuring secret engines for vault")?;

        reconcile::audit::reconcile(client, &external.audit)
            .await
            .context("error configuring audit devices for vault")?;

        reconcile::startup::reconcile(client, &external.startup_secrets)
            .await
            .context("error writing startup secrets to vault")?;

        reconcile::identity::reconcile(client, &external.groups, &external.group_aliases)
            .await
            .context("error configuring identity groups for vault")?;

        Ok(())
    }

    /// Instruct the active node at `address` to step down, authenticating
    /// with the stored root token through a transient client.
    pub async fn step_down_active(&self, address: &str) -> Result<()> {
        debug!("retrieving the root token from the keystore");
        let token_bytes = self
            .keystore
            .get(paths::ROOT_TOKEN_KEY)
            .await
            .with_context(|| format!("unable to get key '{}'", paths::ROOT_TOKEN_KEY))?;
        let root_token = Zeroizing::new(
            String::from_utf8(token_bytes.to_vec())
                .context("the stored root token is not valid UTF-8")?,
        );

        let client = HttpVaultClient::new(address)
            .context("unable to create a client for the active node")?;
        client.set_token(root_token.as_str());
        let _scrub = TokenScrub { client: &client };

        client
            .step_down()
            .await
            .context("error instructing the active node to step down")
    }
}
