//! # chatctl library
//!
//! Core of the `chatctl` administration tool: transports, the session client,
//! entity resolution, output and the command tree.

use std::path::PathBuf;

use clap::{Args, Parser};

use printer::OutputFormat;

pub mod client;
pub mod commands;
pub mod confirm;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod model;
pub mod printer;
pub mod resolve;
pub mod session;
pub mod transport;

/// Remote administration for a chat server.
///
/// Commands talk to the server's HTTP API using stored credentials, or to the
/// server's local socket with `--local` when run on the server host.
#[derive(Parser, Debug)]
#[command(
    name = "chatctl",
    version,
    about = "Remote administration for a chat server",
    long_about = "Administer users, teams, channels, bots, plugins and server configuration.\n\nLog in once with `chatctl auth login`, or run on the server host with `--local` to use the\nlocal administration socket without credentials."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: commands::Commands,
}

/// Options accepted by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Use the local administration socket instead of stored credentials
    #[arg(long, global = true, env = "CHATCTL_LOCAL")]
    pub local: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "plain", env = "CHATCTL_FORMAT")]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, global = true, env = "CHATCTL_JSON")]
    pub json: bool,

    /// Directory holding the credentials file
    #[arg(long, global = true, value_name = "DIR", env = "CHATCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use the stored profile for this URL instead of the active one
    #[arg(long, global = true, value_name = "URL", env = "CHATCTL_INSTANCE_URL")]
    pub instance_url: Option<String>,

    /// Don't print warnings
    #[arg(long, global = true, env = "CHATCTL_SUPPRESS_WARNINGS")]
    pub suppress_warnings: bool,

    /// Never page JSON output
    #[arg(long, global = true, env = "CHATCTL_DISABLE_PAGER")]
    pub disable_pager: bool,

    /// Path of the local administration socket
    #[arg(long, global = true, value_name = "PATH", env = "CHATCTL_LOCAL_SOCKET_PATH")]
    pub local_socket_path: Option<PathBuf>,

    /// Accept invalid TLS certificates
    #[arg(long, global = true, env = "CHATCTL_INSECURE_SKIP_VERIFY")]
    pub insecure_skip_verify: bool,
}

impl GlobalArgs {
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}
