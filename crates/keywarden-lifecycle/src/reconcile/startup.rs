//! Startup secret seeding
//!
//! A plain upsert against a KV endpoint; idempotence comes from the
//! endpoint, not from the writer.

use crate::error::LifecycleError;
use anyhow::{Context, Result};
use keywarden_client::VaultApi;
use keywarden_core::coerce;
use keywarden_core::document::StartupSecret;
use serde_json::Value;
use tracing::debug;

pub async fn reconcile(client: &dyn VaultApi, secrets: &[StartupSecret]) -> Result<()> {
    for secret in secrets {
        match secret.secret_type.as_str() {
            "kv" => {
                let data = coerce::mapping_to_json(&secret.data).with_context(|| {
                    format!("error converting data for startup secret '{}'", secret.path)
                })?;

                client
                    .write(&secret.path, Some(&Value::Object(data)))
                    .await
                    .with_context(|| {
                        format!("error writing data for startup secret '{}'", secret.path)
                    })?;

                debug!(path = %secret.path, "startup secret written");
            }
            other => {
                return Err(LifecycleError::UnsupportedStartupSecret {
                    secret_type: other.to_string(),
                }
                .into())
            }
        }
    }

    Ok(())
}
