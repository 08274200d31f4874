use anyhow::{Context as _, Result};
use clap::Subcommand;

use super::Context;
use crate::resolve::resolve_user;

#[derive(Subcommand, Debug)]
pub enum TokenCommands {
    /// Create a personal access token for a user
    Generate { user: String, description: String },
    /// List a user's tokens
    List {
        user: String,
        /// Only active tokens
        #[arg(long, conflicts_with = "inactive")]
        active: bool,
        /// Only revoked or disabled tokens
        #[arg(long)]
        inactive: bool,
    },
    /// Revoke tokens by id
    Revoke {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

pub async fn run(cmd: TokenCommands, ctx: &Context<'_>) -> Result<()> {
    let client = ctx.client();
    match cmd {
        TokenCommands::Generate { user, description } => {
            let user = resolve_user(client, &user).await?;
            let token = client
                .create_user_access_token(&user.id, &description)
                .await
                .with_context(|| format!("could not create token for {}", user.username))?;
            ctx.printer.set_single(true);
            ctx.printer.print_t("{{ token }}: {{ description }}", &token);
            Ok(())
        }
        TokenCommands::List {
            user,
            active,
            inactive,
        } => {
            let user = resolve_user(client, &user).await?;
            let tokens = client
                .get_user_access_tokens(&user.id)
                .await
                .with_context(|| format!("could not list tokens for {}", user.username))?;
            let shown = tokens
                .iter()
                .filter(|t| (!active || t.is_active) && (!inactive || !t.is_active));
            for token in shown {
                ctx.printer.print_t(
                    "{{ id }}: {{ description }}{% if not is_active %} (inactive){% endif %}",
                    token,
                );
            }
            Ok(())
        }
        TokenCommands::Revoke { ids } => {
            for id in &ids {
                match client.revoke_user_access_token(id).await {
                    Ok(()) => ctx.printer.print(&format!("token {id} revoked")),
                    Err(err) => ctx
                        .printer
                        .print_error(format!("could not revoke token {id}: {err}")),
                }
            }
            Ok(())
        }
    }
}
