use anyhow::{Context as _, Result};
use clap::Subcommand;

use super::{report_misses, Context};
use crate::constants::DEFAULT_PAGE_SIZE;
use crate::model::Bot;
use crate::resolve::{resolve_user, resolve_users};

const BOT_TEMPLATE: &str =
    "{{ username }}: {{ display_name }} ({{ user_id }}){% if delete_at > 0 %} (DISABLED){% endif %}";

#[derive(Subcommand, Debug)]
pub enum BotCommands {
    /// List bots
    List {
        /// Only bots whose owner is deactivated
        #[arg(long)]
        orphaned: bool,
        /// Include disabled bots
        #[arg(long)]
        all: bool,
    },
    /// Create a bot
    Create {
        username: String,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Enable bots
    Enable {
        #[arg(required = true)]
        bots: Vec<String>,
    },
    /// Disable bots
    Disable {
        #[arg(required = true)]
        bots: Vec<String>,
    },
    /// Hand a bot over to another owner
    Assign { bot: String, owner: String },
}

pub async fn run(cmd: BotCommands, ctx: &Context<'_>) -> Result<()> {
    let client = ctx.client();
    match cmd {
        BotCommands::List { orphaned, all } => {
            let mut page = 0;
            loop {
                let bots = client
                    .get_bots(page, DEFAULT_PAGE_SIZE, all, orphaned)
                    .await
                    .context("listing bots")?;
                let done = bots.len() < DEFAULT_PAGE_SIZE as usize;
                for bot in &bots {
                    ctx.printer.print_t(BOT_TEMPLATE, bot);
                }
                if done {
                    return Ok(());
                }
                page += 1;
            }
        }
        BotCommands::Create {
            username,
            display_name,
            description,
        } => {
            let bot = Bot {
                username,
                display_name: display_name.unwrap_or_default(),
                description: description.unwrap_or_default(),
                ..Default::default()
            };
            let created = client.create_bot(&bot).await.context("unable to create bot")?;
            ctx.printer.set_single(true);
            ctx.printer.print_t(BOT_TEMPLATE, &created);
            Ok(())
        }
        BotCommands::Enable { bots } => toggle(ctx, &bots, true).await,
        BotCommands::Disable { bots } => toggle(ctx, &bots, false).await,
        BotCommands::Assign { bot, owner } => {
            let bot_user = resolve_user(client, &bot).await?;
            let owner = resolve_user(client, &owner).await?;
            let assigned = client
                .assign_bot(&bot_user.id, &owner.id)
                .await
                .with_context(|| format!("can not assign bot '{}' to user '{}'", bot, owner.username))?;
            ctx.printer.set_single(true);
            ctx.printer.print_t(BOT_TEMPLATE, &assigned);
            Ok(())
        }
    }
}

/// A conflict means the bot is already in the requested state, which counts as success.
async fn toggle(ctx: &Context<'_>, args: &[String], enable: bool) -> Result<()> {
    let client = ctx.client();
    let verb = if enable { "enable" } else { "disable" };
    let resolved = resolve_users(client, args).await;
    for user in &resolved.found {
        let outcome = if enable {
            client.enable_bot(&user.id).await
        } else {
            client.disable_bot(&user.id).await
        };
        match outcome {
            Ok(bot) => ctx.printer.print_t(BOT_TEMPLATE, &bot),
            Err(err) if err.is_conflict() => {
                tracing::debug!(bot = %user.username, verb, "bot already in requested state");
                ctx.printer.print_t("{{ username }}", user);
            }
            Err(err) => ctx
                .printer
                .print_error(format!("could not {verb} bot '{}': {err}", user.username)),
        }
    }
    report_misses(ctx.printer, &resolved.errors);
    Ok(())
}
