//! Identity group and group-alias reconciliation
//!
//! Groups are created or tuned by name. Aliases need three lookups before
//! they can be written: the alias's own id (the server only lists alias
//! ids, so this is a scan), the auth mount's accessor, and the canonical
//! group id. The scan is O(existing aliases) per alias, which is fine at
//! operational scale.

use crate::error::LifecycleError;
use crate::paths::normalize_mount_path;
use anyhow::{anyhow, Context, Result};
use keywarden_client::VaultApi;
use keywarden_core::document::{GroupAlias, IdentityGroup};
use serde_json::{json, Value};
use tracing::info;

pub async fn reconcile(
    client: &dyn VaultApi,
    groups: &[IdentityGroup],
    aliases: &[GroupAlias],
) -> Result<()> {
    for group in groups {
        // Members are not supported directly; external groups get their
        // members through aliases.
        if group.group_type != "external" {
            return Err(LifecycleError::UnsupportedGroupType {
                name: group.name.clone(),
                group_type: group.group_type.clone(),
            }
            .into());
        }

        let existing = read_group(client, &group.name).await?;

        let config = json!({
            "name": group.name,
            "type": group.group_type,
            "policies": group.policies,
            "metadata": group.metadata,
        });

        if existing.is_none() {
            info!(group = %group.name, "creating group");
            client
                .write("identity/group", Some(&config))
                .await
                .with_context(|| format!("failed to create group '{}'", group.name))?;
        } else {
            info!(group = %group.name, "tuning already existing group");
            client
                .write(&format!("identity/group/name/{}", group.name), Some(&config))
                .await
                .with_context(|| format!("failed to tune group '{}'", group.name))?;
        }
    }

    for alias in aliases {
        let existing_id = find_alias_id(client, &alias.name).await?;

        let accessor = auth_mount_accessor(client, &alias.mountpath)
            .await
            .with_context(|| format!("error getting mount accessor for '{}'", alias.mountpath))?;

        let canonical_id = group_id(client, &alias.group)
            .await
            .with_context(|| format!("error getting canonical id for group '{}'", alias.group))?;

        let config = json!({
            "name": alias.name,
            "mount_accessor": accessor,
            "canonical_id": canonical_id,
        });

        match existing_id {
            None => {
                info!(alias = %alias.name, "creating group-alias");
                client
                    .write("identity/group-alias", Some(&config))
                    .await
                    .with_context(|| format!("failed to create group-alias '{}'", alias.name))?;
            }
            Some(id) => {
                info!(alias = %alias.name, id = %id, "tuning already existing group-alias");
                client
                    .write(&format!("identity/group-alias/id/{id}"), Some(&config))
                    .await
                    .with_context(|| format!("failed to tune group-alias '{}'", alias.name))?;
            }
        }
    }

    Ok(())
}

async fn read_group(client: &dyn VaultApi, name: &str) -> Result<Option<Value>> {
    client
        .read(&format!("identity/group/name/{name}"))
        .await
        .with_context(|| format!("failed to read group '{name}' by name"))
}

async fn group_id(client: &dyn VaultApi, name: &str) -> Result<String> {
    let group = read_group(client, name)
        .await?
        .ok_or_else(|| anyhow!("group '{name}' does not exist"))?;

    group
        .get("id")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| anyhow!("group '{name}' has no id"))
}

async fn auth_mount_accessor(client: &dyn VaultApi, mount_path: &str) -> Result<String> {
    let mounts = client
        .list_auth()
        .await
        .context("failed to read auth mounts from vault")?;

    let path = normalize_mount_path(mount_path);
    mounts
        .get(&path)
        .map(|mount| mount.accessor.clone())
        .ok_or_else(|| anyhow!("auth mount path '{path}' does not exist"))
}

/// Resolve an alias id by name by walking the alias listing.
async fn find_alias_id(client: &dyn VaultApi, name: &str) -> Result<Option<String>> {
    let Some(ids) = client
        .list("identity/group-alias/id")
        .await
        .context("error listing group aliases")?
    else {
        return Ok(None);
    };

    for id in ids {
        let alias = client
            .read(&format!("identity/group-alias/id/{id}"))
            .await
            .with_context(|| format!("error fetching name for alias id '{id}'"))?
            .ok_or_else(|| anyhow!("group alias '{id}' does not exist"))?;

        if alias.get("name").and_then(Value::as_str) == Some(name) {
            return Ok(Some(id));
        }
    }

    Ok(None)
}
