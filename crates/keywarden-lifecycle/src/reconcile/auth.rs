//! Auth backend reconciliation
//!
//! Each method is mounted if absent, then configured through its
//! type-specific endpoint family. Endpoint grammars differ per backend:
//! github uses `map/<type>/<name>`, aws splits client config from STS
//! roles, cert stores roles under `certs`, token roles live under a fixed
//! mount.

use crate::error::LifecycleError;
use crate::paths::normalize_mount_path;
use anyhow::{bail, Context, Result};
use keywarden_client::{EnableAuthOptions, VaultApi};
use keywarden_core::coerce;
use keywarden_core::document::AuthMethod;
use serde_json::{json, Map, Value};
use serde_yaml_ng::Mapping;
use std::collections::BTreeMap;
use tracing::debug;

const SERVICE_ACCOUNT_CA_CERT: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";
const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

pub async fn reconcile(client: &dyn VaultApi, methods: &[AuthMethod]) -> Result<()> {
    let existing = client
        .list_auth()
        .await
        .context("error listing auth backends")?;

    for method in methods {
        if method.method_type.is_empty() {
            bail!("can't find type for auth method");
        }

        let path = super::mount_target(&method.path, &method.method_type);
        let description = method
            .description
            .clone()
            .unwrap_or_else(|| format!("{} backend", method.method_type));

        // A mount of the same type at the path is reused; a mount of a
        // different type is configured as-is (callers must avoid that case).
        let mounted = existing
            .get(&normalize_mount_path(&path))
            .is_some_and(|mount| mount.method_type == method.method_type);

        if mounted {
            debug!(method = %method.method_type, path = %path, "auth backend is already mounted");
        } else {
            debug!(method = %method.method_type, path = %path, "enabling auth backend");
            client
                .enable_auth(
                    &path,
                    &EnableAuthOptions {
                        method_type: method.method_type.clone(),
                        description: Some(description),
                    },
                )
                .await
                .with_context(|| format!("error enabling {} auth method", method.method_type))?;
        }

        match method.method_type.as_str() {
            "kubernetes" => {
                let mut config = required_config(method)?;
                // kubernetes_host present means we're configured from
                // outside the cluster; only synthesize the in-cluster
                // defaults when it is absent.
                if !config.contains_key("kubernetes_host") {
                    let mut merged = kubernetes_defaults()
                        .context("error getting default kubernetes auth config")?;
                    merged.extend(config);
                    config = merged;
                }
                write_config(client, method, &path, config).await?;
                write_roles(client, method, &path, "role").await?;
            }
            "github" => {
                let config = required_config(method)?;
                write_config(client, method, &path, config).await?;
                write_github_mappings(client, &path, &method.mappings).await?;
            }
            "aws" => {
                let config = required_config(method)?;
                client
                    .write(&format!("auth/{path}/config/client"), Some(&Value::Object(config)))
                    .await
                    .context("error putting aws auth client config into vault")?;
                write_sts_roles(client, &path, &method.sts_roles).await?;
                write_roles(client, method, &path, "role").await?;
            }
            "gcp" | "jwt" | "oidc" => {
                let config = required_config(method)?;
                write_config(client, method, &path, config).await?;
                write_roles(client, method, &path, "role").await?;
            }
            "cert" => {
                let config = required_config(method)?;
                write_config(client, method, &path, config).await?;
                write_roles(client, method, &path, "certs").await?;
            }
            "approle" => {
                write_roles(client, method, &path, "role").await?;
            }
            "token" => {
                write_roles(client, method, "token", "roles").await?;
            }
            "ldap" | "okta" => {
                let config = required_config(method)?;
                write_config(client, method, &path, config).await?;
                write_user_group_mappings(client, method, &path, "users", &method.users).await?;
                write_user_group_mappings(client, method, &path, "groups", &method.groups).await?;
            }
            _ => {}
        }
    }

    Ok(())
}

fn required_config(method: &AuthMethod) -> Result<Map<String, Value>> {
    let mapping = method
        .config
        .as_ref()
        .ok_or_else(|| LifecycleError::MissingAuthConfig {
            method_type: method.method_type.clone(),
        })?;
    coerce::mapping_to_json(mapping)
        .with_context(|| format!("error converting {} auth config", method.method_type))
}

/// In-cluster defaults synthesized from the pod's service account.
fn kubernetes_defaults() -> Result<Map<String, Value>> {
    let ca_cert = std::fs::read_to_string(SERVICE_ACCOUNT_CA_CERT)
        .with_context(|| format!("reading {SERVICE_ACCOUNT_CA_CERT}"))?;
    let reviewer_jwt = std::fs::read_to_string(SERVICE_ACCOUNT_TOKEN)
        .with_context(|| format!("reading {SERVICE_ACCOUNT_TOKEN}"))?;
    let host = std::env::var("KUBERNETES_SERVICE_HOST").unwrap_or_default();

    let mut config = Map::new();
    config.insert(
        "kubernetes_host".to_string(),
        Value::String(format!("https://{host}")),
    );
    config.insert("kubernetes_ca_cert".to_string(), Value::String(ca_cert));
    config.insert("token_reviewer_jwt".to_string(), Value::String(reviewer_jwt));
    Ok(config)
}

async fn write_config(
    client: &dyn VaultApi,
    method: &AuthMethod,
    path: &str,
    config: Map<String, Value>,
) -> Result<()> {
    client
        .write(&format!("auth/{path}/config"), Some(&Value::Object(config)))
        .await
        .with_context(|| format!("error putting {} auth config into vault", method.method_type))
}

async fn write_roles(
    client: &dyn VaultApi,
    method: &AuthMethod,
    path: &str,
    role_sub_path: &str,
) -> Result<()> {
    for role in &method.roles {
        let body = coerce::mapping_to_json(role)
            .with_context(|| format!("error converting {} auth role", method.method_type))?;
        let name = body
            .get("name")
            .and_then(Value::as_str)
            .map(String::from)
            .with_context(|| format!("error finding name for {} auth role", method.method_type))?;

        client
            .write(
                &format!("auth/{path}/{role_sub_path}/{name}"),
                Some(&Value::Object(body)),
            )
            .await
            .with_context(|| {
                format!(
                    "error putting {} {} role into vault",
                    name, method.method_type
                )
            })?;
    }
    Ok(())
}

async fn write_github_mappings(
    client: &dyn VaultApi,
    path: &str,
    mappings: &BTreeMap<String, BTreeMap<String, String>>,
) -> Result<()> {
    for (mapping_type, mapping) in mappings {
        for (user_or_team, policy) in mapping {
            client
                .write(
                    &format!("auth/{path}/map/{mapping_type}/{user_or_team}"),
                    Some(&json!({ "value": policy })),
                )
                .await
                .with_context(|| {
                    format!("error putting {mapping_type} github mapping into vault")
                })?;
        }
    }
    Ok(())
}

async fn write_sts_roles(client: &dyn VaultApi, path: &str, roles: &[Mapping]) -> Result<()> {
    for role in roles {
        let body = coerce::mapping_to_json(role).context("error converting aws sts role")?;
        let account_id = match body.get("account_id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => bail!("error finding account_id for aws sts role"),
        };

        client
            .write(
                &format!("auth/{path}/config/sts/{account_id}"),
                Some(&Value::Object(body)),
            )
            .await
            .with_context(|| {
                format!("error putting {account_id} cross account aws role into vault")
            })?;
    }
    Ok(())
}

async fn write_user_group_mappings(
    client: &dyn VaultApi,
    method: &AuthMethod,
    path: &str,
    mapping_type: &str,
    mappings: &BTreeMap<String, Mapping>,
) -> Result<()> {
    for (user_or_group, mapping) in mappings {
        let body = coerce::mapping_to_json(mapping).with_context(|| {
            format!("error converting {} {mapping_type} mapping", method.method_type)
        })?;

        client
            .write(
                &format!("auth/{path}/{mapping_type}/{user_or_group}"),
                Some(&Value::Object(body)),
            )
            .await
            .with_context(|| {
                format!(
                    "error putting {} {mapping_type} mapping into vault",
                    method.method_type
                )
            })?;
    }
    Ok(())
}
