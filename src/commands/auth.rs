use std::path::PathBuf;

use anyhow::{anyhow, bail, Context as _, Result};
use clap::{Args, Subcommand};
use serde_json::json;

use crate::confirm::Prompter;
use crate::credentials::{self, CredentialsStore, Profile};
use crate::printer::Printer;
use crate::session::{normalize_instance_url, password_login, Session};
use crate::GlobalArgs;

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Instance URL, e.g. https://chat.example.com
    pub url: String,
    /// Login id: username or email
    pub username: Option<String>,
    pub password: Option<String>,
    /// Profile name, defaults to the instance host
    #[arg(long)]
    pub name: Option<String>,
    /// Read the password from this file
    #[arg(long, conflicts_with = "password")]
    pub password_file: Option<PathBuf>,
    /// One-time MFA code
    #[arg(long)]
    pub mfa_token: Option<String>,
    /// Store an existing personal access token instead of logging in
    #[arg(long, conflicts_with_all = ["username", "password", "password_file", "mfa_token"])]
    pub access_token: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    #[command(about = "Log in and store a credentials profile")]
    Login(LoginArgs),
    #[command(about = "Show the active credentials profile")]
    Current,
    #[command(about = "List stored credentials profiles")]
    List,
    #[command(about = "Make a stored profile the active one")]
    Set { name: String },
    #[command(about = "Delete a stored profile")]
    Delete { name: String },
    #[command(about = "Log in again and replace a profile's token")]
    Renew {
        name: String,
        #[arg(long, short)]
        password: Option<String>,
        #[arg(long, conflicts_with = "password")]
        password_file: Option<PathBuf>,
        #[arg(long)]
        mfa_token: Option<String>,
        #[arg(long, conflicts_with_all = ["password", "password_file", "mfa_token"])]
        access_token: Option<String>,
    },
    #[command(about = "Remove every stored profile")]
    Clean,
}

const PROFILE_TEMPLATE: &str =
    "{% if active %}* {% else %}  {% endif %}{{ name }}: {{ username }} @ {{ instanceUrl }}";

fn credentials_store(
    global: &GlobalArgs,
) -> Result<(credentials::CredentialsLocation, CredentialsStore)> {
    let location = credentials::locate_from_env(global.config.as_deref())?;
    let store = CredentialsStore::new(location.write_path());
    Ok((location, store))
}

/// The token is never printed.
fn profile_view(p: &Profile) -> serde_json::Value {
    json!({
        "name": p.name,
        "instanceUrl": p.instance_url,
        "username": p.username,
        "active": p.active,
    })
}

fn ask(prompter: &dyn Prompter, what: &str, secret: bool) -> Result<String> {
    if !prompter.is_interactive() {
        bail!("{what} is required when not running in an interactive shell");
    }
    let answer = if secret {
        prompter.ask_secret(what)?
    } else {
        prompter.ask(what)?
    };
    if answer.is_empty() {
        bail!("{what} cannot be empty");
    }
    Ok(answer)
}

fn read_password(
    password: Option<String>,
    password_file: Option<PathBuf>,
    prompter: &dyn Prompter,
) -> Result<String> {
    if let Some(path) = password_file {
        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("reading password from {}", path.display()))?;
        return Ok(data.trim_end_matches(['\r', '\n']).to_string());
    }
    match password {
        Some(p) => Ok(p),
        None => ask(prompter, "Password", true),
    }
}

fn host_of(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url).with_context(|| format!("invalid instance URL {url}"))?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("instance URL {url} has no host"))
}

pub async fn login(
    args: LoginArgs,
    global: &GlobalArgs,
    printer: &Printer,
    prompter: &dyn Prompter,
) -> Result<()> {
    let url = normalize_instance_url(&args.url)?;
    let name = match args.name {
        Some(name) => name,
        None => host_of(&url)?,
    };

    let (username, token) = match args.access_token {
        Some(token) => {
            let session = Session::remote(&url, &token, global.insecure_skip_verify).await?;
            let username = session
                .user()
                .map(|u| u.username.clone())
                .unwrap_or_default();
            (username, token)
        }
        None => {
            let login_id = match args.username {
                Some(u) => u,
                None => ask(prompter, "Username", false)?,
            };
            let password = read_password(args.password, args.password_file, prompter)?;
            let (user, token) = password_login(
                &url,
                &login_id,
                &password,
                args.mfa_token.as_deref(),
                global.insecure_skip_verify,
            )
            .await?;
            let username = if user.username.is_empty() {
                login_id
            } else {
                user.username
            };
            (username, token)
        }
    };

    let (location, store) = credentials_store(global)?;
    let mut creds = CredentialsStore::new(&location.path).read_or_default()?;
    creds.upsert_active(Profile {
        name,
        instance_url: url.clone(),
        username: username.clone(),
        auth_token: token,
        active: true,
    });
    store.save(&creds)?;
    tracing::debug!(path = %store.path().display(), "stored credentials");

    printer.set_single(true);
    printer.print(&format!("credentials for {username} @ {url} stored"));
    Ok(())
}

pub async fn run(
    cmd: AuthCommands,
    global: &GlobalArgs,
    printer: &Printer,
    prompter: &dyn Prompter,
) -> Result<()> {
    let (location, store) = credentials_store(global)?;
    let reader = CredentialsStore::new(&location.path);
    match cmd {
        AuthCommands::Login(args) => return login(args, global, printer, prompter).await,
        AuthCommands::Current => {
            let creds = reader.read()?;
            let active = creds.select(None)?;
            printer.set_single(true);
            printer.print_t(
                "found credentials for {{ name }}: {{ username }} @ {{ instanceUrl }}",
                &profile_view(active),
            );
        }
        AuthCommands::List => {
            let creds = reader.read()?;
            for p in creds.profiles() {
                printer.print_t(PROFILE_TEMPLATE, &profile_view(p));
            }
        }
        AuthCommands::Set { name } => {
            let mut creds = reader.read()?;
            creds.set_active(&name)?;
            store.save(&creds)?;
            printer.set_single(true);
            printer.print(&format!("credentials for {name} set as active"));
        }
        AuthCommands::Delete { name } => {
            if !reader.exists() {
                tracing::debug!(
                    path = %reader.path().display(),
                    "no credentials file, nothing to delete"
                );
                return Ok(());
            }
            let mut creds = reader.read_or_default()?;
            creds.remove(&name)?;
            store.save(&creds)?;
            printer.set_single(true);
            printer.print(&format!("credentials for {name} deleted"));
        }
        AuthCommands::Renew {
            name,
            password,
            password_file,
            mfa_token,
            access_token,
        } => {
            let mut creds = reader.read()?;
            let profile = creds
                .get(&name)
                .cloned()
                .ok_or_else(|| credentials::CredentialsError::ProfileNotFound(name.clone()))?;
            let token = match access_token {
                Some(token) => {
                    Session::remote(&profile.instance_url, &token, global.insecure_skip_verify)
                        .await?;
                    token
                }
                None => {
                    let password = read_password(password, password_file, prompter)?;
                    let (_, token) = password_login(
                        &profile.instance_url,
                        &profile.username,
                        &password,
                        mfa_token.as_deref(),
                        global.insecure_skip_verify,
                    )
                    .await?;
                    token
                }
            };
            creds.update_token(&name, &token)?;
            store.save(&creds)?;
            printer.set_single(true);
            printer.print(&format!(
                "credentials for {} @ {} renewed",
                profile.username, profile.instance_url
            ));
        }
        AuthCommands::Clean => {
            reader.clean()?;
            if store.path() != reader.path() {
                store.clean()?;
            }
            printer.set_single(true);
            printer.print("credentials removed");
        }
    }
    Ok(())
}
