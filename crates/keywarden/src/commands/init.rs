//! Initialize the server

use super::AppContext;
use crate::cli::InitArgs;
use anyhow::Result;
use tracing::info;

pub async fn run(args: InitArgs, ctx: &AppContext) -> Result<()> {
    let manager = ctx.manager(args.into_config())?;
    manager.init().await?;
    info!("init finished");
    Ok(())
}
