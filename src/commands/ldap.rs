use anyhow::{Context as _, Result};
use clap::Subcommand;
use serde_json::json;

use super::Context;

#[derive(Subcommand, Debug)]
pub enum LdapCommands {
    /// Start an LDAP synchronization job
    Sync,
}

pub async fn run(cmd: LdapCommands, ctx: &Context<'_>) -> Result<()> {
    match cmd {
        LdapCommands::Sync => {
            ctx.client()
                .sync_ldap()
                .await
                .context("unable to synchronize with LDAP")?;
            ctx.printer.set_single(true);
            ctx.printer
                .print_t("{{ status }}", &json!({ "status": "ok" }));
            Ok(())
        }
    }
}
