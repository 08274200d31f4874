use anyhow::{Context as _, Result};
use clap::Args;

use super::Context;

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Number of most recent lines
    #[arg(long, short, default_value_t = 200)]
    pub number: u32,
}

pub async fn run(args: LogsArgs, ctx: &Context<'_>) -> Result<()> {
    let lines = ctx
        .client()
        .get_logs(0, args.number)
        .await
        .context("unable to retrieve logs")?;
    for line in &lines {
        ctx.printer.print(line.trim_end());
    }
    Ok(())
}
