//! # chatctl
//!
//! Command-line administration for a chat server.
//!
//! ```bash
//! # Store credentials for an instance
//! chatctl login https://chat.example.com sysadmin
//!
//! # List channels of a team, including archived ones
//! chatctl channel list myteam
//!
//! # Deactivate users by email, username or id
//! chatctl user deactivate alice@example.com bob
//!
//! # Administer from the server host without credentials
//! chatctl --local config reload
//! ```
//!
//! Credentials live in `$XDG_CONFIG_HOME/chatctl/credentials.yaml`
//! (or `~/.config/chatctl/credentials.yaml`).

use std::process::ExitCode;

use chatctl::{commands, logging, printer, Cli};
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    let printer = printer::global();
    printer.configure(
        cli.global.output_format(),
        cli.global.suppress_warnings,
        cli.global.disable_pager,
    );

    let outcome = tokio::select! {
        res = commands::run(cli, printer) => res,
        _ = tokio::signal::ctrl_c() => Err(anyhow::anyhow!("interrupted")),
    };

    if let Err(err) = printer.flush() {
        tracing::debug!(error = %err, "flushing output failed");
    }
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
