use anyhow::{Context as _, Result};
use clap::Subcommand;
use serde_json::json;

use super::Context;
use crate::resolve::resolve_users;

#[derive(Subcommand, Debug)]
pub enum SamlCommands {
    /// Reset SAML users' AuthData field to their email
    AuthDataReset {
        /// Also reset deleted users
        #[arg(long)]
        include_deleted: bool,
        /// Report how many users would change without changing them
        #[arg(long)]
        dry_run: bool,
        /// Only these users
        #[arg(long, value_delimiter = ',')]
        users: Vec<String>,
    },
}

pub async fn run(cmd: SamlCommands, ctx: &Context<'_>) -> Result<()> {
    let SamlCommands::AuthDataReset {
        include_deleted,
        dry_run,
        users,
    } = cmd;
    let client = ctx.client();
    let resolved = resolve_users(client, &users).await;
    super::report_misses(ctx.printer, &resolved.errors);
    let ids: Vec<String> = resolved.found.into_iter().map(|u| u.id).collect();
    if !users.is_empty() && ids.is_empty() {
        return Ok(());
    }
    let affected = client
        .reset_saml_auth_data(include_deleted, dry_run, &ids)
        .await
        .context("unable to reset SAML auth data")?;
    let template = if dry_run {
        "{{ affected }} user records would be affected."
    } else {
        "{{ affected }} user records were changed."
    };
    ctx.printer.set_single(true);
    ctx.printer
        .print_t(template, &json!({ "affected": affected }));
    Ok(())
}
