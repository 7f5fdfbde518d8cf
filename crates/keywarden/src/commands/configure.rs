//! Reconcile the server's configuration from a declarative document

use super::AppContext;
use crate::cli::ConfigureArgs;
use anyhow::Result;
use keywarden_core::ExternalConfig;
use keywarden_lifecycle::InitConfig;
use tracing::info;

pub async fn run(args: ConfigureArgs, ctx: &AppContext) -> Result<()> {
    let external = ExternalConfig::load(args.config.as_deref())?;

    let manager = ctx.manager(InitConfig::default())?;
    manager.configure(&external).await?;

    info!("configuration reconciled");
    Ok(())
}
