//! Plugin catalog reconciliation
//!
//! Registration is unconditional: the server treats a re-register with a
//! matching SHA256 as a no-op and rejects mismatches.

use anyhow::{Context, Result};
use keywarden_client::{PluginType, RegisterPluginInput, VaultApi};
use keywarden_core::document::Plugin;
use tracing::{debug, info};

pub async fn reconcile(client: &dyn VaultApi, plugins: &[Plugin]) -> Result<()> {
    let registered = client
        .list_plugins()
        .await
        .context("failed to retrieve the list of plugins")?;
    debug!(plugins = ?registered, "already registered plugins");

    for plugin in plugins {
        let plugin_type: PluginType = plugin
            .plugin_type
            .parse()
            .with_context(|| format!("error parsing type for plugin '{}'", plugin.plugin_name))?;

        let input = RegisterPluginInput {
            name: plugin.plugin_name.clone(),
            plugin_type,
            command: plugin.command.clone(),
            args: plugin.args.clone(),
            sha256: plugin.sha256.clone(),
        };

        info!(plugin = %plugin.plugin_name, plugin_type = %plugin_type, "registering plugin");
        client
            .register_plugin(&input)
            .await
            .with_context(|| format!("error registering plugin '{}' in vault", plugin.plugin_name))?;
    }

    Ok(())
}
