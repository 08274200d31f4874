use anyhow::{bail, Result};
use clap::Subcommand;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::client::{Client, TeamApi};
use crate::constants::DEFAULT_PAGE_SIZE;
use crate::error::ApiResult;
use crate::model::Team;
use crate::confirm::{confirm, ConfirmGate, Prompter, TerminalPrompter};
use crate::printer::Printer;
use crate::resolve::ResolveError;
use crate::session::Session;
use crate::{Cli, GlobalArgs};

pub mod auth;
pub mod bot;
pub mod channel;
pub mod command;
pub mod completion;
pub mod config;
pub mod docs;
pub mod export;
pub mod import;
pub mod integrity;
pub mod ldap;
pub mod logs;
pub mod permission;
pub mod plugin;
pub mod saml;
pub mod system;
pub mod team;
pub mod token;
pub mod user;
pub mod version;
pub mod webhook;
pub mod websocket;

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Log in to an instance and store the credentials")]
    Login(auth::LoginArgs),
    #[command(about = "Manage stored credentials profiles")]
    Auth {
        #[command(subcommand)]
        cmd: auth::AuthCommands,
    },
    #[command(about = "Manage users")]
    User {
        #[command(subcommand)]
        cmd: user::UserCommands,
    },
    #[command(about = "Manage teams")]
    Team {
        #[command(subcommand)]
        cmd: team::TeamCommands,
    },
    #[command(about = "Manage channels")]
    Channel {
        #[command(subcommand)]
        cmd: channel::ChannelCommands,
    },
    #[command(about = "Manage bots")]
    Bot {
        #[command(subcommand)]
        cmd: bot::BotCommands,
    },
    #[command(about = "Inspect slash commands")]
    Command {
        #[command(subcommand)]
        cmd: command::CommandCommands,
    },
    #[command(about = "Read and change the server configuration")]
    Config {
        #[command(subcommand)]
        cmd: config::ConfigCommands,
    },
    #[command(about = "Create and inspect export jobs")]
    Export {
        #[command(subcommand)]
        cmd: export::ExportCommands,
    },
    #[command(about = "Upload and process import files")]
    Import {
        #[command(subcommand)]
        cmd: import::ImportCommands,
    },
    #[command(about = "Manage role permissions", visible_alias = "role")]
    Permission {
        #[command(subcommand)]
        cmd: permission::PermissionCommands,
    },
    #[command(about = "Manage plugins")]
    Plugin {
        #[command(subcommand)]
        cmd: plugin::PluginCommands,
    },
    #[command(about = "Manage webhooks")]
    Webhook {
        #[command(subcommand)]
        cmd: webhook::WebhookCommands,
    },
    #[command(about = "Manage personal access tokens")]
    Token {
        #[command(subcommand)]
        cmd: token::TokenCommands,
    },
    #[command(about = "Server status and version")]
    System {
        #[command(subcommand)]
        cmd: system::SystemCommands,
    },
    #[command(about = "LDAP synchronization")]
    Ldap {
        #[command(subcommand)]
        cmd: ldap::LdapCommands,
    },
    #[command(about = "SAML administration")]
    Saml {
        #[command(subcommand)]
        cmd: saml::SamlCommands,
    },
    #[command(about = "Check database record integrity")]
    Integrity(integrity::IntegrityArgs),
    #[command(about = "Fetch server log lines")]
    Logs(logs::LogsArgs),
    #[command(about = "Print server events as they happen")]
    Websocket,
    #[command(about = "Print the client version")]
    Version,
    #[command(about = "Emit shell completion scripts")]
    Completion { shell: clap_complete::Shell },
    #[command(about = "Generate markdown documentation for every command")]
    Docs(docs::DocsArgs),
}

/// What must hold before a command's handler runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    /// Needs a server session.
    pub session: bool,
    /// Refuses to run unless `--local` is set.
    pub local_only: bool,
    pub confirm: Option<ConfirmGate>,
}

impl Requirements {
    pub fn standalone() -> Self {
        Self::default()
    }

    pub fn session() -> Self {
        Self {
            session: true,
            ..Self::default()
        }
    }

    pub fn local_only(mut self) -> Self {
        self.local_only = true;
        self
    }

    pub fn gated(mut self, gate: ConfirmGate) -> Self {
        self.confirm = Some(gate);
        self
    }
}

impl Commands {
    pub fn requirements(&self) -> Requirements {
        match self {
            Commands::Login(_)
            | Commands::Auth { .. }
            | Commands::Version
            | Commands::Completion { .. }
            | Commands::Docs(_) => Requirements::standalone(),
            Commands::User { cmd } => cmd.requirements(),
            Commands::Team { cmd } => cmd.requirements(),
            Commands::Config { cmd } => cmd.requirements(),
            Commands::Integrity(args) => args.requirements(),
            _ => Requirements::session(),
        }
    }
}

/// Everything a session-bound handler works with.
pub struct Context<'a> {
    pub session: &'a Session,
    pub printer: &'a Printer,
    pub global: &'a GlobalArgs,
}

impl<'a> Context<'a> {
    pub fn client(&self) -> &'a dyn Client {
        self.session.client()
    }
}

pub async fn run(cli: Cli, printer: &Printer) -> Result<()> {
    run_with(cli, printer, &TerminalPrompter).await
}

/// Dispatch with an explicit prompter for confirmation and login questions.
pub async fn run_with(cli: Cli, printer: &Printer, prompter: &dyn Prompter) -> Result<()> {
    let Cli { global, cmd } = cli;
    let reqs = cmd.requirements();

    if reqs.local_only && !global.local {
        bail!("this command is only available in local mode, rerun with --local");
    }
    if let Some(gate) = &reqs.confirm {
        confirm(gate, prompter)?;
    }

    if !reqs.session {
        return match cmd {
            Commands::Login(args) => auth::login(args, &global, printer, prompter).await,
            Commands::Auth { cmd } => auth::run(cmd, &global, printer, prompter).await,
            Commands::Version => version::run(printer),
            Commands::Completion { shell } => completion::run(shell, printer),
            Commands::Docs(args) => docs::run(args, printer),
            _ => bail!("command needs a session"),
        };
    }

    let session = Session::establish(&global, printer).await?;
    let ctx = Context {
        session: &session,
        printer,
        global: &global,
    };
    match cmd {
        Commands::User { cmd } => user::run(cmd, &ctx).await,
        Commands::Team { cmd } => team::run(cmd, &ctx).await,
        Commands::Channel { cmd } => channel::run(cmd, &ctx).await,
        Commands::Bot { cmd } => bot::run(cmd, &ctx).await,
        Commands::Command { cmd } => command::run(cmd, &ctx).await,
        Commands::Config { cmd } => config::run(cmd, &ctx).await,
        Commands::Export { cmd } => export::run(cmd, &ctx).await,
        Commands::Import { cmd } => import::run(cmd, &ctx).await,
        Commands::Permission { cmd } => permission::run(cmd, &ctx).await,
        Commands::Plugin { cmd } => plugin::run(cmd, &ctx).await,
        Commands::Webhook { cmd } => webhook::run(cmd, &ctx).await,
        Commands::Token { cmd } => token::run(cmd, &ctx).await,
        Commands::System { cmd } => system::run(cmd, &ctx).await,
        Commands::Ldap { cmd } => ldap::run(cmd, &ctx).await,
        Commands::Saml { cmd } => saml::run(cmd, &ctx).await,
        Commands::Integrity(args) => integrity::run(args, &ctx).await,
        Commands::Logs(args) => logs::run(args, &ctx).await,
        Commands::Websocket => websocket::run(&ctx).await,
        Commands::Login(_)
        | Commands::Auth { .. }
        | Commands::Version
        | Commands::Completion { .. }
        | Commands::Docs(_) => bail!("command does not take a session"),
    }
}

static NAME_RE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+([a-z0-9\-_]*[a-z0-9]+)?$"));

/// Team and channel names: lowercase alphanumerics with inner `-`/`_`.
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    let re = match NAME_RE.as_ref() {
        Ok(re) => re,
        Err(e) => bail!("name pattern failed to compile: {e}"),
    };
    if !re.is_match(name) {
        bail!(
            "invalid {kind} name '{name}': use lowercase letters, digits, '-' and '_', starting and ending with a letter or digit"
        );
    }
    Ok(())
}

pub(crate) const JOB_TEMPLATE: &str = "  ID: {{ id }}
  Type: {{ type }}
  Status: {{ status }}
  Created: {{ create_at | datetime }}
  Started: {{ start_at | datetime }}{% for k, v in data | items %}
  {{ k }}: {{ v }}{% endfor %}
";

pub(crate) fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Every team on the server, one page after another until a short page.
pub(crate) async fn all_teams<C: TeamApi + ?Sized>(
    client: &C,
    include_deleted: bool,
) -> ApiResult<Vec<Team>> {
    let mut out = Vec::new();
    let mut page = 0;
    loop {
        let batch = client
            .get_all_teams(page, DEFAULT_PAGE_SIZE, include_deleted)
            .await?;
        let done = batch.len() < DEFAULT_PAGE_SIZE as usize;
        out.extend(batch);
        if done {
            return Ok(out);
        }
        page += 1;
    }
}

/// Put every resolution failure on the error stream.
pub(crate) fn report_misses(printer: &Printer, errors: &[ResolveError]) {
    for err in errors {
        printer.print_error(err.describe());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn names_follow_the_server_pattern() {
        for ok in ["a", "team1", "my-team", "my_team-2"] {
            validate_name("team", ok).unwrap();
        }
        for bad in ["", "-a", "a-", "My", "a b", "a.b"] {
            assert!(validate_name("team", bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn destructive_commands_are_gated() {
        let cli = Cli::parse_from(["chatctl", "team", "archive", "t1", "t2"]);
        let reqs = cli.cmd.requirements();
        assert!(reqs.session);
        let gate = reqs.confirm.unwrap();
        assert!(!gate.confirmed);
        assert_eq!(gate.action, "archive 2 teams");

        let cli = Cli::parse_from(["chatctl", "team", "archive", "t1", "--confirm"]);
        assert!(cli.cmd.requirements().confirm.unwrap().confirmed);
    }

    #[test]
    fn config_reload_is_local_only() {
        let cli = Cli::parse_from(["chatctl", "config", "reload"]);
        assert!(cli.cmd.requirements().local_only);
        let cli = Cli::parse_from(["chatctl", "config", "get", "ServiceSettings.SiteURL"]);
        assert!(!cli.cmd.requirements().local_only);
    }

    #[test]
    fn json_flag_overrides_format() {
        let cli = Cli::parse_from(["chatctl", "--json", "version"]);
        assert_eq!(cli.global.output_format(), crate::printer::OutputFormat::Json);
        let cli = Cli::parse_from(["chatctl", "--format", "raw", "version"]);
        assert_eq!(cli.global.output_format(), crate::printer::OutputFormat::Raw);
    }

    #[test]
    fn unknown_verbs_are_rejected() {
        let err = Cli::try_parse_from(["chatctl", "team", "explode"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn local_only_rejected_before_session() {
        let printer = Printer::new();
        let prompter = crate::confirm::scripted::ScriptedPrompter::new(false, &[]);
        let cli = Cli::parse_from(["chatctl", "config", "reload"]);
        let err = run_with(cli, &printer, &prompter).await.unwrap_err();
        assert!(err.to_string().contains("only available in local mode"));
    }

    #[tokio::test]
    async fn unconfirmed_gate_aborts_without_a_session() {
        let printer = Printer::new();
        let prompter = crate::confirm::scripted::ScriptedPrompter::new(false, &[]);
        // The credentials path points nowhere, so reaching the session would fail differently.
        let cli = Cli::parse_from([
            "chatctl",
            "--config",
            "/nonexistent/chatctl-test",
            "team",
            "delete",
            "t1",
        ]);
        let err = run_with(cli, &printer, &prompter).await.unwrap_err();
        assert!(err.to_string().starts_with("aborted: "), "{err}");
    }
}
