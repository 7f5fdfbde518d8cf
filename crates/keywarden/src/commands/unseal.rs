//! Unseal the server from stored shares

use super::AppContext;
use crate::cli::UnsealArgs;
use anyhow::Result;
use tracing::info;

pub async fn run(args: UnsealArgs, ctx: &AppContext) -> Result<()> {
    let manager = ctx.manager(args.init_args.into_config())?;

    if args.init {
        manager.init().await?;
    }

    if !manager.sealed().await? {
        info!("vault is already unsealed");
        return Ok(());
    }

    manager.unseal().await?;
    info!("vault unsealed");
    Ok(())
}
