//! Policy reconciliation
//!
//! Rules are pushed through the canonical HCL printer before the upsert, so
//! whitespace-only edits to the document don't produce spurious diffs on the
//! server. The upsert itself is unconditionally safe: the server replaces
//! the policy.

use anyhow::{Context, Result};
use keywarden_client::VaultApi;
use keywarden_core::document::Policy;
use tracing::debug;

pub async fn reconcile(client: &dyn VaultApi, policies: &[Policy]) -> Result<()> {
    for policy in policies {
        let parsed = hcl::parse(&policy.rules)
            .with_context(|| format!("error formatting '{}' policy rules", policy.name))?;
        let formatted = hcl::format::to_string(&parsed)
            .with_context(|| format!("error formatting '{}' policy rules", policy.name))?;

        client
            .put_policy(&policy.name, &formatted)
            .await
            .with_context(|| format!("error putting '{}' policy into vault", policy.name))?;

        debug!(policy = %policy.name, "policy written");
    }
    Ok(())
}
