use anyhow::{bail, Context as _, Result};
use clap::Subcommand;

use super::{all_teams, plural, report_misses, validate_name, Context, Requirements};
use crate::confirm::ConfirmGate;
use crate::model::{Team, TeamPatch};
use crate::resolve::{resolve_team, resolve_teams, resolve_users};

const TEAM_TEMPLATE: &str = "{{ name }}";
const ARCHIVED_TEMPLATE: &str = "{{ name }} (archived)";

#[derive(Subcommand, Debug)]
pub enum TeamCommands {
    /// Create a team
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        display_name: String,
        /// Team contact email
        #[arg(long)]
        email: Option<String>,
        /// Invite-only team
        #[arg(long)]
        private: bool,
    },
    /// List all teams, archived ones last
    List,
    /// Search teams by name
    Search {
        #[arg(required = true)]
        terms: Vec<String>,
    },
    /// Archive teams
    Archive {
        #[arg(required = true)]
        teams: Vec<String>,
        #[arg(long)]
        confirm: bool,
    },
    /// Permanently delete teams
    Delete {
        #[arg(required = true)]
        teams: Vec<String>,
        #[arg(long)]
        confirm: bool,
    },
    /// Restore archived teams
    Restore {
        #[arg(required = true)]
        teams: Vec<String>,
    },
    /// Rename a team; pass `-` as the new name to only change the display name
    Rename {
        team: String,
        new_name: String,
        #[arg(long)]
        display_name: Option<String>,
    },
    /// Manage team members
    Users {
        #[command(subcommand)]
        cmd: TeamUsersCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum TeamUsersCommands {
    /// Add users to a team
    Add {
        team: String,
        #[arg(required = true)]
        users: Vec<String>,
    },
    /// Remove users from a team
    Remove {
        team: String,
        #[arg(required = true)]
        users: Vec<String>,
    },
}

impl TeamCommands {
    pub fn requirements(&self) -> Requirements {
        match self {
            TeamCommands::Archive { teams, confirm } => Requirements::session().gated(
                ConfirmGate::destructive(*confirm, format!("archive {}", plural(teams.len(), "team"))),
            ),
            TeamCommands::Delete { teams, confirm } => {
                Requirements::session().gated(ConfirmGate::destructive(
                    *confirm,
                    format!("permanently delete {}", plural(teams.len(), "team")),
                ))
            }
            _ => Requirements::session(),
        }
    }
}

pub async fn run(cmd: TeamCommands, ctx: &Context<'_>) -> Result<()> {
    let client = ctx.client();
    match cmd {
        TeamCommands::Create {
            name,
            display_name,
            email,
            private,
        } => {
            validate_name("team", &name)?;
            let team = Team {
                name,
                display_name,
                email: email.unwrap_or_default(),
                team_type: if private { "I" } else { "O" }.to_string(),
                ..Default::default()
            };
            let created = client.create_team(&team).await.context("unable to create team")?;
            ctx.printer.set_single(true);
            ctx.printer.print_t("New team {{ name }} successfully created", &created);
            Ok(())
        }
        TeamCommands::List => {
            let teams = all_teams(client, true).await.context("listing teams")?;
            let (archived, active): (Vec<Team>, Vec<Team>) =
                teams.into_iter().partition(Team::is_archived);
            for team in &active {
                ctx.printer.print_t(TEAM_TEMPLATE, team);
            }
            for team in &archived {
                ctx.printer.print_t(ARCHIVED_TEMPLATE, team);
            }
            Ok(())
        }
        TeamCommands::Search { terms } => {
            let mut seen = std::collections::HashSet::new();
            for term in &terms {
                match client.search_teams(term).await {
                    Ok(teams) => {
                        for team in teams.into_iter().filter(|t| seen.insert(t.id.clone())) {
                            let template = if team.is_archived() {
                                ARCHIVED_TEMPLATE
                            } else {
                                TEAM_TEMPLATE
                            };
                            ctx.printer.print_t(template, &team);
                        }
                    }
                    Err(err) => ctx
                        .printer
                        .print_error(format!("unable to search teams for '{term}': {err}")),
                }
            }
            Ok(())
        }
        TeamCommands::Archive { teams, .. } => {
            let resolved = resolve_teams(client, &teams).await;
            for team in &resolved.found {
                match client.soft_delete_team(&team.id).await {
                    Ok(()) => ctx.printer.print_t(TEAM_TEMPLATE, team),
                    Err(err) => ctx
                        .printer
                        .print_error(format!("unable to archive team {}: {err}", team.name)),
                }
            }
            report_misses(ctx.printer, &resolved.errors);
            Ok(())
        }
        TeamCommands::Delete { teams, .. } => {
            let resolved = resolve_teams(client, &teams).await;
            for team in &resolved.found {
                match client.permanent_delete_team(&team.id).await {
                    Ok(()) => ctx.printer.print_t(TEAM_TEMPLATE, team),
                    Err(err) => ctx
                        .printer
                        .print_error(format!("unable to delete team {}: {err}", team.name)),
                }
            }
            report_misses(ctx.printer, &resolved.errors);
            Ok(())
        }
        TeamCommands::Restore { teams } => {
            let resolved = resolve_teams(client, &teams).await;
            for team in &resolved.found {
                match client.restore_team(&team.id).await {
                    Ok(restored) => ctx.printer.print_t(TEAM_TEMPLATE, &restored),
                    Err(err) => ctx
                        .printer
                        .print_error(format!("unable to restore team {}: {err}", team.name)),
                }
            }
            report_misses(ctx.printer, &resolved.errors);
            Ok(())
        }
        TeamCommands::Rename {
            team,
            new_name,
            display_name,
        } => rename(ctx, &team, &new_name, display_name).await,
        TeamCommands::Users { cmd } => members(ctx, cmd).await,
    }
}

async fn rename(
    ctx: &Context<'_>,
    team: &str,
    new_name: &str,
    display_name: Option<String>,
) -> Result<()> {
    // "-" keeps the current name; the positional is still required.
    let name = (new_name != "-").then(|| new_name.to_string());
    if name.is_none() && display_name.is_none() {
        bail!("nothing to change: pass a new name or --display-name");
    }
    if let Some(name) = &name {
        validate_name("team", name)?;
    }
    let found = resolve_team(ctx.client(), team).await?;
    let patch = TeamPatch {
        name,
        display_name,
        ..Default::default()
    };
    let updated = ctx
        .client()
        .patch_team(&found.id, &patch)
        .await
        .with_context(|| format!("cannot rename team {}", found.name))?;
    ctx.printer.set_single(true);
    ctx.printer.print_t("'{{ name }}' team renamed", &updated);
    Ok(())
}

async fn members(ctx: &Context<'_>, cmd: TeamUsersCommands) -> Result<()> {
    let client = ctx.client();
    let (team, users, adding) = match cmd {
        TeamUsersCommands::Add { team, users } => (team, users, true),
        TeamUsersCommands::Remove { team, users } => (team, users, false),
    };
    let team = resolve_team(client, &team).await?;
    let resolved = resolve_users(client, &users).await;
    for user in &resolved.found {
        let outcome = if adding {
            client.add_team_member(&team.id, &user.id).await.map(|_| ())
        } else {
            client.remove_team_member(&team.id, &user.id).await
        };
        match outcome {
            Ok(()) => ctx.printer.print_t("{{ username }}", user),
            Err(err) => {
                let verb = if adding { "add" } else { "remove" };
                let prep = if adding { "to" } else { "from" };
                ctx.printer.print_error(format!(
                    "unable to {verb} user {} {prep} team {}: {err}",
                    user.username, team.name
                ))
            }
        }
    }
    report_misses(ctx.printer, &resolved.errors);
    Ok(())
}
