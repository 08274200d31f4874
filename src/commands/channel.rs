use anyhow::{bail, Context as _, Result};
use clap::Subcommand;

use super::{all_teams, report_misses, validate_name, Context, Requirements};
use crate::client::Client;
use crate::constants::DEFAULT_PAGE_SIZE;
use crate::error::ApiResult;
use crate::model::{Channel, ChannelPatch, Team};
use crate::resolve::{resolve_channel, resolve_channels, resolve_team, resolve_teams, resolve_users};

const CHANNEL_TEMPLATE: &str = "{{ name }}";

#[derive(Subcommand, Debug)]
pub enum ChannelCommands {
    /// List public, private and archived channels of teams
    List {
        #[arg(required = true)]
        teams: Vec<String>,
    },
    /// Create a channel
    Create {
        #[arg(long)]
        team: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        display_name: String,
        #[arg(long)]
        private: bool,
        #[arg(long)]
        purpose: Option<String>,
        #[arg(long)]
        header: Option<String>,
    },
    /// Change a channel's name or display name
    Rename {
        /// `team:channel` or a channel id
        channel: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        display_name: Option<String>,
    },
    /// Archive channels
    Archive {
        #[arg(required = true)]
        channels: Vec<String>,
    },
    /// Restore archived channels
    Unarchive {
        #[arg(required = true)]
        channels: Vec<String>,
    },
    /// Search channels by name, in one team or across all of them
    Search {
        term: String,
        #[arg(long)]
        team: Option<String>,
    },
    /// Manage channel members
    Users {
        #[command(subcommand)]
        cmd: ChannelUsersCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ChannelUsersCommands {
    /// Add users to a channel
    Add {
        channel: String,
        #[arg(required = true)]
        users: Vec<String>,
    },
    /// Remove users from a channel
    Remove {
        channel: String,
        #[arg(required = true)]
        users: Vec<String>,
    },
}

pub async fn run(cmd: ChannelCommands, ctx: &Context<'_>) -> Result<()> {
    let client = ctx.client();
    match cmd {
        ChannelCommands::List { teams } => {
            let resolved = resolve_teams(client, &teams).await;
            for team in &resolved.found {
                list_team(ctx, team).await;
            }
            report_misses(ctx.printer, &resolved.errors);
            Ok(())
        }
        ChannelCommands::Create {
            team,
            name,
            display_name,
            private,
            purpose,
            header,
        } => {
            validate_name("channel", &name)?;
            let team = resolve_team(client, &team).await?;
            let channel = Channel {
                team_id: team.id,
                name,
                display_name,
                channel_type: if private { "P" } else { "O" }.to_string(),
                purpose: purpose.unwrap_or_default(),
                header: header.unwrap_or_default(),
                ..Default::default()
            };
            let created = client
                .create_channel(&channel)
                .await
                .context("unable to create channel")?;
            ctx.printer.set_single(true);
            ctx.printer.print_t("New channel {{ name }} successfully created", &created);
            Ok(())
        }
        ChannelCommands::Rename {
            channel,
            name,
            display_name,
        } => {
            if name.is_none() && display_name.is_none() {
                bail!("nothing to change: pass --name or --display-name");
            }
            if let Some(name) = &name {
                validate_name("channel", name)?;
            }
            let found = resolve_channel(client, &channel).await?;
            let patch = ChannelPatch {
                name,
                display_name,
                ..Default::default()
            };
            let updated = client
                .patch_channel(&found.id, &patch)
                .await
                .with_context(|| format!("cannot rename channel {}", found.name))?;
            ctx.printer.set_single(true);
            ctx.printer.print_t(CHANNEL_TEMPLATE, &updated);
            Ok(())
        }
        ChannelCommands::Archive { channels } => {
            let resolved = resolve_channels(client, &channels).await;
            for channel in &resolved.found {
                match client.delete_channel(&channel.id).await {
                    Ok(()) => ctx.printer.print_t(CHANNEL_TEMPLATE, channel),
                    Err(err) => ctx.printer.print_error(format!(
                        "unable to archive channel {}: {err}",
                        channel.name
                    )),
                }
            }
            report_misses(ctx.printer, &resolved.errors);
            Ok(())
        }
        ChannelCommands::Unarchive { channels } => {
            let resolved = resolve_channels(client, &channels).await;
            for channel in &resolved.found {
                match client.restore_channel(&channel.id).await {
                    Ok(restored) => ctx.printer.print_t(CHANNEL_TEMPLATE, &restored),
                    Err(err) => ctx.printer.print_error(format!(
                        "unable to unarchive channel {}: {err}",
                        channel.name
                    )),
                }
            }
            report_misses(ctx.printer, &resolved.errors);
            Ok(())
        }
        ChannelCommands::Search { term, team } => search(ctx, &term, team.as_deref()).await,
        ChannelCommands::Users { cmd } => members(ctx, cmd).await,
    }
}

/// Print public, then private, then archived channels of `team`.
///
/// Private channels need extra permissions; failures there are skipped.
async fn list_team(ctx: &Context<'_>, team: &Team) {
    let client = ctx.client();
    match all_pages(client, team, Listing::Public).await {
        Ok(channels) => {
            for c in &channels {
                ctx.printer.print_t(CHANNEL_TEMPLATE, c);
            }
        }
        Err(err) => ctx.printer.print_error(format!(
            "unable to list public channels for '{}': {err}",
            team.name
        )),
    }
    match all_pages(client, team, Listing::Private).await {
        Ok(channels) => {
            for c in &channels {
                ctx.printer.print_t("{{ name }} (private)", c);
            }
        }
        Err(err) => {
            tracing::debug!(team = %team.name, error = %err, "skipping private channels");
        }
    }
    match all_pages(client, team, Listing::Archived).await {
        Ok(channels) => {
            for c in &channels {
                ctx.printer.print_t("{{ name }} (archived)", c);
            }
        }
        Err(err) => ctx.printer.print_error(format!(
            "unable to list archived channels for '{}': {err}",
            team.name
        )),
    }
}

#[derive(Debug, Clone, Copy)]
enum Listing {
    Public,
    Private,
    Archived,
}

async fn all_pages(client: &dyn Client, team: &Team, listing: Listing) -> ApiResult<Vec<Channel>> {
    let mut out = Vec::new();
    let mut page = 0;
    loop {
        let batch = match listing {
            Listing::Public => {
                client
                    .get_public_channels_for_team(&team.id, page, DEFAULT_PAGE_SIZE)
                    .await?
            }
            Listing::Private => {
                client
                    .get_private_channels_for_team(&team.id, page, DEFAULT_PAGE_SIZE)
                    .await?
            }
            Listing::Archived => {
                client
                    .get_deleted_channels_for_team(&team.id, page, DEFAULT_PAGE_SIZE)
                    .await?
            }
        };
        let done = batch.len() < DEFAULT_PAGE_SIZE as usize;
        out.extend(batch);
        if done {
            return Ok(out);
        }
        page += 1;
    }
}

async fn search(ctx: &Context<'_>, term: &str, team: Option<&str>) -> Result<()> {
    let client = ctx.client();
    let teams = match team {
        Some(arg) => vec![resolve_team(client, arg).await?],
        None => all_teams(client, false).await.context("listing teams")?,
    };
    let mut hits = 0;
    for team in &teams {
        let channels = client
            .search_channels(&team.id, term)
            .await
            .with_context(|| format!("searching channels of team {}", team.name))?;
        for c in &channels {
            hits += 1;
            ctx.printer.print_t(
                "Channel Name: {{ name }}, Display Name: {{ display_name }}, Channel ID: {{ id }}",
                c,
            );
        }
    }
    if hits == 0 {
        bail!("channel {term} was not found");
    }
    Ok(())
}

async fn members(ctx: &Context<'_>, cmd: ChannelUsersCommands) -> Result<()> {
    let client = ctx.client();
    let (channel, users, adding) = match cmd {
        ChannelUsersCommands::Add { channel, users } => (channel, users, true),
        ChannelUsersCommands::Remove { channel, users } => (channel, users, false),
    };
    let channel = resolve_channel(client, &channel).await?;
    let resolved = resolve_users(client, &users).await;
    for user in &resolved.found {
        let outcome = if adding {
            client
                .add_channel_member(&channel.id, &user.id)
                .await
                .map(|_| ())
        } else {
            client.remove_channel_member(&channel.id, &user.id).await
        };
        match outcome {
            Ok(()) => ctx.printer.print_t("{{ username }}", user),
            Err(err) => {
                let verb = if adding { "add" } else { "remove" };
                let prep = if adding { "to" } else { "from" };
                ctx.printer.print_error(format!(
                    "unable to {verb} user {} {prep} channel {}: {err}",
                    user.username, channel.name
                ))
            }
        }
    }
    report_misses(ctx.printer, &resolved.errors);
    Ok(())
}
