//! Audit device reconciliation
//!
//! Devices are enabled if absent and otherwise left alone; audit mounts
//! are not tuned.

use crate::paths::normalize_mount_path;
use anyhow::{Context, Result};
use keywarden_client::{EnableAuditOptions, VaultApi};
use keywarden_core::document::AuditDevice;
use tracing::info;

pub async fn reconcile(client: &dyn VaultApi, devices: &[AuditDevice]) -> Result<()> {
    for device in devices {
        let path = super::mount_target(&device.path, &device.device_type);

        let existing = client
            .list_audit()
            .await
            .context("error reading audit mounts from vault")?;

        if existing.contains_key(&normalize_mount_path(&path)) {
            info!(path = %path, "audit device is already mounted");
            continue;
        }

        let options = EnableAuditOptions {
            device_type: device.device_type.clone(),
            description: device.description.clone(),
            options: device.options.clone(),
            local: device.local,
        };

        info!(path = %path, device = %device.device_type, "enabling audit device");
        client
            .enable_audit(&path, &options)
            .await
            .with_context(|| format!("error enabling audit device '{path}' in vault"))?;
    }

    Ok(())
}
