use anyhow::{Context as _, Result};
use clap::Subcommand;

use super::{report_misses, Context, Requirements};
use crate::client::Client;
use crate::confirm::ConfirmGate;
use crate::constants::DEFAULT_PAGE_SIZE;
use crate::error::ApiResult;
use crate::model::User;
use crate::resolve::{resolve_team, resolve_user, resolve_users};

const USER_TEMPLATE: &str = "{{ id }}: {{ username }} ({{ email }})";

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// List users, one page at a time or all of them
    List {
        /// Only users in this team
        #[arg(long)]
        team: Option<String>,
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        per_page: u32,
        /// Fetch every page
        #[arg(long)]
        all: bool,
    },
    /// Look up users by email, username or id
    Search {
        #[arg(required = true)]
        users: Vec<String>,
    },
    /// Create a user
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        nickname: Option<String>,
    },
    /// Deactivate users
    Deactivate {
        #[arg(required = true)]
        users: Vec<String>,
    },
    /// Reactivate users
    Activate {
        #[arg(required = true)]
        users: Vec<String>,
    },
    /// Permanently delete users and everything they posted
    Delete {
        #[arg(required = true)]
        users: Vec<String>,
        /// Skip the interactive confirmation
        #[arg(long)]
        confirm: bool,
    },
    /// Turn off multi-factor authentication for users
    ResetMfa {
        #[arg(required = true)]
        users: Vec<String>,
    },
    /// Set a user's password
    ChangePassword {
        user: String,
        #[arg(long)]
        password: String,
    },
}

impl UserCommands {
    pub fn requirements(&self) -> Requirements {
        match self {
            UserCommands::Delete { users, confirm } => Requirements::session().gated(
                ConfirmGate::destructive(
                    *confirm,
                    format!("permanently delete {}", super::plural(users.len(), "user")),
                ),
            ),
            _ => Requirements::session(),
        }
    }
}

pub async fn run(cmd: UserCommands, ctx: &Context<'_>) -> Result<()> {
    match cmd {
        UserCommands::List {
            team,
            page,
            per_page,
            all,
        } => list(ctx, team.as_deref(), page, per_page, all).await,
        UserCommands::Search { users } => search(ctx, &users).await,
        UserCommands::Create {
            email,
            username,
            password,
            first_name,
            last_name,
            nickname,
        } => {
            let user = User {
                email,
                username,
                password: Some(password),
                first_name: first_name.unwrap_or_default(),
                last_name: last_name.unwrap_or_default(),
                nickname: nickname.unwrap_or_default(),
                ..Default::default()
            };
            let created = ctx
                .client()
                .create_user(&user)
                .await
                .context("unable to create user")?;
            ctx.printer.set_single(true);
            ctx.printer.print_t(USER_TEMPLATE, &created);
            Ok(())
        }
        UserCommands::Deactivate { users } => for_each_user(ctx, &users, Action::Deactivate).await,
        UserCommands::Activate { users } => for_each_user(ctx, &users, Action::Activate).await,
        UserCommands::Delete { users, .. } => for_each_user(ctx, &users, Action::Delete).await,
        UserCommands::ResetMfa { users } => for_each_user(ctx, &users, Action::ResetMfa).await,
        UserCommands::ChangePassword { user, password } => {
            let found = resolve_user(ctx.client(), &user).await?;
            ctx.client()
                .update_user_password(&found.id, &password)
                .await
                .with_context(|| format!("changing password for {}", found.username))?;
            ctx.printer
                .print(&format!("password for user {} changed", found.username));
            Ok(())
        }
    }
}

async fn list(
    ctx: &Context<'_>,
    team: Option<&str>,
    page: u32,
    per_page: u32,
    all: bool,
) -> Result<()> {
    let team_id = match team {
        Some(arg) => Some(resolve_team(ctx.client(), arg).await?.id),
        None => None,
    };
    let mut page = page;
    loop {
        let users = ctx
            .client()
            .get_users(page, per_page, team_id.as_deref())
            .await
            .context("listing users")?;
        let done = users.is_empty() || users.len() < per_page as usize;
        for u in &users {
            ctx.printer.print_t(USER_TEMPLATE, u);
        }
        if !all || done {
            return Ok(());
        }
        page += 1;
    }
}

async fn search(ctx: &Context<'_>, args: &[String]) -> Result<()> {
    let resolved = resolve_users(ctx.client(), args).await;
    for user in &resolved.found {
        ctx.printer.print_t(USER_TEMPLATE, user);
    }
    report_misses(ctx.printer, &resolved.errors);
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Deactivate,
    Activate,
    Delete,
    ResetMfa,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Action::Deactivate => "deactivate",
            Action::Activate => "activate",
            Action::Delete => "delete",
            Action::ResetMfa => "reset MFA for",
        }
    }

    async fn apply(self, client: &dyn Client, id: &str) -> ApiResult<()> {
        match self {
            Action::Deactivate => client.deactivate_user(id).await,
            Action::Activate => client.activate_user(id).await,
            Action::Delete => client.permanent_delete_user(id).await,
            Action::ResetMfa => client.reset_user_mfa(id).await,
        }
    }
}

/// Resolve every argument and apply `action`; failures go to the error stream.
async fn for_each_user(ctx: &Context<'_>, args: &[String], action: Action) -> Result<()> {
    let resolved = resolve_users(ctx.client(), args).await;
    for user in &resolved.found {
        match action.apply(ctx.client(), &user.id).await {
            Ok(()) => ctx.printer.print_t(USER_TEMPLATE, user),
            Err(err) => ctx.printer.print_error(format!(
                "unable to {} user {}: {err}",
                action.verb(),
                user.username
            )),
        }
    }
    report_misses(ctx.printer, &resolved.errors);
    Ok(())
}
