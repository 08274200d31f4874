use anyhow::{anyhow, bail, Context as _, Result};
use clap::Subcommand;

use super::{all_teams, report_misses, Context};
use crate::client::Client;
use crate::constants::DEFAULT_PAGE_SIZE;
use crate::error::{is_lookup_miss, ApiResult};
use crate::model::{IncomingWebhook, OutgoingWebhook, Team, Webhook};
use crate::resolve::{resolve_channel, resolve_teams, resolve_user};

const INCOMING_TEMPLATE: &str = "Incoming:\t{{ display_name }} ({{ id }})";
const OUTGOING_TEMPLATE: &str = "Outgoing:\t{{ display_name }} ({{ id }})";

#[derive(Subcommand, Debug)]
pub enum WebhookCommands {
    /// List incoming and outgoing webhooks of teams, or of every team
    List { teams: Vec<String> },
    /// Show one webhook
    Show { id: String },
    /// Create an incoming webhook
    CreateIncoming {
        /// `team:channel` or a channel id
        #[arg(long)]
        channel: String,
        /// Owner of the webhook
        #[arg(long)]
        user: String,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        /// Only allow posting to the webhook's channel
        #[arg(long)]
        lock_to_channel: bool,
    },
    /// Delete a webhook
    Delete { id: String },
}

pub async fn run(cmd: WebhookCommands, ctx: &Context<'_>) -> Result<()> {
    let client = ctx.client();
    match cmd {
        WebhookCommands::List { teams } => {
            let teams = if teams.is_empty() {
                all_teams(client, false)
                    .await
                    .context("unable to list teams")?
            } else {
                let resolved = resolve_teams(client, &teams).await;
                report_misses(ctx.printer, &resolved.errors);
                resolved.found
            };
            for team in &teams {
                match hooks_for_team(client, team).await {
                    Ok(hooks) => {
                        for hook in &hooks {
                            match hook {
                                Webhook::Incoming(h) => ctx.printer.print_t(INCOMING_TEMPLATE, h),
                                Webhook::Outgoing(h) => ctx.printer.print_t(OUTGOING_TEMPLATE, h),
                            }
                        }
                    }
                    Err(err) => ctx.printer.print_error(format!(
                        "unable to list webhooks for team {}: {err}",
                        team.name
                    )),
                }
            }
            Ok(())
        }
        WebhookCommands::Show { id } => {
            ctx.printer.set_single(true);
            match find(client, &id).await? {
                Webhook::Incoming(h) => ctx.printer.print(&h),
                Webhook::Outgoing(h) => ctx.printer.print(&h),
            }
            Ok(())
        }
        WebhookCommands::CreateIncoming {
            channel,
            user,
            display_name,
            description,
            icon,
            lock_to_channel,
        } => {
            let channel = resolve_channel(client, &channel).await?;
            let owner = resolve_user(client, &user).await?;
            let hook = IncomingWebhook {
                channel_id: channel.id,
                user_id: owner.id,
                display_name: display_name.unwrap_or_default(),
                description: description.unwrap_or_default(),
                icon_url: icon.unwrap_or_default(),
                channel_locked: lock_to_channel,
                ..Default::default()
            };
            let created = client
                .create_incoming_webhook(&hook)
                .await
                .context("unable to create webhook")?;
            ctx.printer.set_single(true);
            ctx.printer.print_t("Id: {{ id }}\nDisplay Name: {{ display_name }}", &created);
            Ok(())
        }
        WebhookCommands::Delete { id } => {
            let hook = find(client, &id).await?;
            let deleted = match &hook {
                Webhook::Incoming(h) => client.delete_incoming_webhook(&h.id).await,
                Webhook::Outgoing(h) => client.delete_outgoing_webhook(&h.id).await,
            };
            deleted.with_context(|| format!("unable to delete webhook '{id}'"))?;
            ctx.printer.set_single(true);
            ctx.printer.print(&hook);
            Ok(())
        }
    }
}

/// Fetch incoming and outgoing hooks concurrently; incoming come first.
async fn hooks_for_team(client: &dyn Client, team: &Team) -> ApiResult<Vec<Webhook>> {
    let (incoming, outgoing) = tokio::join!(
        all_incoming(client, &team.id),
        all_outgoing(client, &team.id)
    );
    Ok(incoming?
        .into_iter()
        .map(Webhook::Incoming)
        .chain(outgoing?.into_iter().map(Webhook::Outgoing))
        .collect())
}

async fn all_incoming(client: &dyn Client, team_id: &str) -> ApiResult<Vec<IncomingWebhook>> {
    let mut out = Vec::new();
    let mut page = 0;
    loop {
        let batch = client
            .get_incoming_webhooks_for_team(team_id, page, DEFAULT_PAGE_SIZE)
            .await?;
        let done = batch.len() < DEFAULT_PAGE_SIZE as usize;
        out.extend(batch);
        if done {
            return Ok(out);
        }
        page += 1;
    }
}

async fn all_outgoing(client: &dyn Client, team_id: &str) -> ApiResult<Vec<OutgoingWebhook>> {
    let mut out = Vec::new();
    let mut page = 0;
    loop {
        let batch = client
            .get_outgoing_webhooks_for_team(team_id, page, DEFAULT_PAGE_SIZE)
            .await?;
        let done = batch.len() < DEFAULT_PAGE_SIZE as usize;
        out.extend(batch);
        if done {
            return Ok(out);
        }
        page += 1;
    }
}

/// Incoming and outgoing hooks share one id space.
async fn find(client: &dyn Client, id: &str) -> Result<Webhook> {
    match client.get_incoming_webhook(id).await {
        Ok(h) => return Ok(Webhook::Incoming(h)),
        Err(err) if is_lookup_miss(&err) => {}
        Err(err) => return Err(anyhow!(err).context(format!("unable to get webhook '{id}'"))),
    }
    match client.get_outgoing_webhook(id).await {
        Ok(h) => Ok(Webhook::Outgoing(h)),
        Err(err) if is_lookup_miss(&err) => bail!("webhook {id} not found"),
        Err(err) => Err(anyhow!(err).context(format!("unable to get webhook '{id}'"))),
    }
}
