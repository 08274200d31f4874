use anyhow::Result;
use clap::Subcommand;

use super::{all_teams, report_misses, Context};
use crate::resolve::resolve_teams;

#[derive(Subcommand, Debug)]
pub enum CommandCommands {
    /// List custom slash commands of teams, or of every team
    List { teams: Vec<String> },
}

pub async fn run(cmd: CommandCommands, ctx: &Context<'_>) -> Result<()> {
    let CommandCommands::List { teams } = cmd;
    let client = ctx.client();
    let teams = if teams.is_empty() {
        all_teams(client, false).await?
    } else {
        let resolved = resolve_teams(client, &teams).await;
        report_misses(ctx.printer, &resolved.errors);
        resolved.found
    };
    for team in &teams {
        match client.list_commands(&team.id, true).await {
            Ok(commands) => {
                for command in &commands {
                    ctx.printer.print_t(
                        "{{ id }}: {{ display_name }} (team: {{ team_id }}) /{{ trigger }}",
                        command,
                    );
                }
            }
            Err(err) => ctx
                .printer
                .print_error(format!("unable to list commands for '{}': {err}", team.name)),
        }
    }
    Ok(())
}
