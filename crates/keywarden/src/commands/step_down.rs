//! Instruct the active node to step down

use super::AppContext;
use crate::cli::StepDownArgs;
use anyhow::Result;
use keywarden_lifecycle::InitConfig;
use tracing::info;

pub async fn run(args: StepDownArgs, ctx: &AppContext) -> Result<()> {
    let address = args.address.as_deref().unwrap_or(&ctx.vault_addr);

    let manager = ctx.manager(InitConfig::default())?;
    manager.step_down_active(address).await?;

    info!(address = %address, "step-down requested");
    Ok(())
}
