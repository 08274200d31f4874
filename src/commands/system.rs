use anyhow::{Context as _, Result};
use clap::Subcommand;
use serde_json::json;

use super::Context;

#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Print the server version
    Version,
    /// Print server, database and file store health
    Status,
}

pub async fn run(cmd: SystemCommands, ctx: &Context<'_>) -> Result<()> {
    let client = ctx.client();
    match cmd {
        SystemCommands::Version => {
            // Local sessions skip the who-am-I probe, so ask again when needed.
            let version = match ctx.session.server_version() {
                Some(v) => v.to_string(),
                None => ctx
                    .session
                    .client()
                    .server_version()
                    .await
                    .context("unable to fetch server version")?
                    .unwrap_or_default(),
            };
            ctx.printer.set_single(true);
            ctx.printer
                .print_t("Server version {{ version }}", &json!({ "version": version }));
            Ok(())
        }
        SystemCommands::Status => {
            let status = client
                .get_ping(true)
                .await
                .context("unable to fetch server status")?;
            ctx.printer.set_single(true);
            ctx.printer.print_t(
                "Server status: {{ status }}\nDatabase status: {{ database_status }}\nFilestore status: {{ filestore_status }}",
                &status,
            );
            Ok(())
        }
    }
}
