//! Secret engine reconciliation
//!
//! Engines are mounted if absent, tuned otherwise. The nested
//! `configuration` block is written entry by entry, with three guards
//! layered on top of the plain upsert:
//!
//! - engines with rotatable root credentials (`database`, `aws`) are
//!   re-rotated instead of re-posted, so rotated credentials are never
//!   clobbered with the stale config they were derived from
//! - `create_only` entries are skipped once the server has data for them
//! - endpoints that are immutable once created ("delete them before
//!   reconfiguring") are logged and skipped

use crate::error::LifecycleError;
use crate::paths::normalize_mount_path;
use anyhow::{bail, Context, Result};
use keywarden_client::{MountInput, VaultApi};
use keywarden_core::coerce;
use keywarden_core::document::SecretEngine;
use serde_json::Value;
use serde_yaml_ng::Mapping;
use std::collections::HashSet;
use tracing::info;

/// Engine types whose `config` endpoint is not keyed by a name.
const NAME_FREE_CONFIG_TYPES: &[&str] = &["ad", "alicloud", "azure", "gcp", "gcpkms", "kv"];

pub async fn reconcile(client: &dyn VaultApi, engines: &[SecretEngine]) -> Result<()> {
    // Each rotation endpoint is hit at most once per reconciliation run.
    let mut rotated: HashSet<String> = HashSet::new();

    for engine in engines {
        if engine.engine_type.is_empty() {
            bail!("can't find type for secret engine");
        }

        let path = super::mount_target(&engine.path, &engine.engine_type);
        let mounts = client
            .list_mounts()
            .await
            .context("error reading mounts from vault")?;
        let mount_exists = mounts.contains_key(&normalize_mount_path(&path));

        let config = engine.mount_config();
        if mount_exists {
            info!(path = %path, "tuning already existing mount");
            client
                .tune_mount(&path, &config)
                .await
                .with_context(|| format!("error tuning '{path}' in vault"))?;
        } else {
            let input = MountInput {
                engine_type: engine.engine_type.clone(),
                description: engine.description.clone(),
                plugin_name: engine.plugin_name.clone(),
                options: config.options.clone(),
                config,
                local: engine.local,
                seal_wrap: engine.seal_wrap,
            };
            info!(path = %path, engine = %engine.engine_type, "mounting secret engine");
            client
                .mount(&path, &input)
                .await
                .with_context(|| format!("error mounting '{path}' into vault"))?;
        }

        for (config_option, sub_configs) in &engine.configuration {
            for sub_config in sub_configs {
                apply_sub_config(
                    client,
                    &mut rotated,
                    engine,
                    &path,
                    mount_exists,
                    config_option,
                    sub_config,
                )
                .await?;
            }
        }
    }

    Ok(())
}

async fn apply_sub_config(
    client: &dyn VaultApi,
    rotated: &mut HashSet<String>,
    engine: &SecretEngine,
    path: &str,
    mount_exists: bool,
    config_option: &str,
    sub_config: &Mapping,
) -> Result<()> {
    let mut body = coerce::mapping_to_json(sub_config)
        .with_context(|| format!("error converting sub-config for '{path}/{config_option}'"))?;

    let name = body.get("name").and_then(Value::as_str).map(String::from);
    if name.is_none() && !config_needs_no_name(&engine.engine_type, config_option) {
        return Err(LifecycleError::MissingConfigName {
            path: path.to_string(),
            config_option: config_option.to_string(),
        }
        .into());
    }

    let config_path = match &name {
        Some(name) => format!("{path}/{config_option}/{name}"),
        None => format!("{path}/{config_option}"),
    };

    let rotate = body
        .get("rotate")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    // Re-posting the old credentials after a rotation would lock the engine
    // out of its upstream; rotate again instead of reconfiguring.
    if rotate && mount_exists && has_rotatable_root(&engine.engine_type, config_option) {
        rotate_credentials(client, rotated, &engine.engine_type, path, name.as_deref()).await?;
        info!(path = %config_path, "skipping reconfiguration because of credential rotation");
        return Ok(());
    }

    // create_only is a document-level directive, not a server field.
    let create_only = body
        .remove("create_only")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    if create_only && mount_exists {
        let existing = client
            .read(&config_path)
            .await
            .with_context(|| format!("error reading '{config_path}'"))?;
        if existing.is_some() {
            info!(path = %config_path, "config already exists and create_only is set, skipping");
            return Ok(());
        }
    }

    match client.write(&config_path, Some(&Value::Object(body))).await {
        Ok(()) => {}
        Err(e) if e.is_overwrite_prohibited() => {
            info!(path = %config_path, "can't reconfigure, please delete it manually");
            return Ok(());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("error configuring '{config_path}' in vault"))
        }
    }

    if rotate {
        rotate_credentials(client, rotated, &engine.engine_type, path, name.as_deref()).await?;
    }

    Ok(())
}

async fn rotate_credentials(
    client: &dyn VaultApi,
    rotated: &mut HashSet<String>,
    engine_type: &str,
    path: &str,
    name: Option<&str>,
) -> Result<()> {
    let rotate_path = match engine_type {
        "aws" => format!("{path}/config/rotate-root"),
        "database" => {
            let name = name.context("credential rotation for database engines requires a name")?;
            format!("{path}/rotate-root/{name}")
        }
        "gcp" => {
            let name = name.context("credential rotation for gcp engines requires a name")?;
            format!("{path}/{name}/rotate")
        }
        other => {
            return Err(LifecycleError::UnsupportedRotation {
                engine_type: other.to_string(),
            }
            .into())
        }
    };

    if rotated.insert(rotate_path.clone()) {
        info!(path = %rotate_path, "rotating root credentials");
        client
            .write(&rotate_path, None)
            .await
            .with_context(|| format!("error rotating credentials at '{rotate_path}'"))?;
    } else {
        info!(path = %rotate_path, "credentials were already rotated during this run");
    }

    Ok(())
}

fn has_rotatable_root(engine_type: &str, config_option: &str) -> bool {
    (engine_type == "database" && config_option == "config")
        || (engine_type == "aws" && config_option == "config/root")
}

fn config_needs_no_name(engine_type: &str, config_option: &str) -> bool {
    if config_option == "config" {
        return NAME_FREE_CONFIG_TYPES.contains(&engine_type);
    }
    engine_type == "aws" && config_option == "config/root"
}
