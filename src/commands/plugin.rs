use anyhow::{Context as _, Result};
use clap::Subcommand;

use super::Context;

#[derive(Subcommand, Debug)]
pub enum PluginCommands {
    /// List active and inactive plugins
    List,
    /// Enable plugins
    Enable {
        #[arg(required = true)]
        plugins: Vec<String>,
    },
    /// Disable plugins
    Disable {
        #[arg(required = true)]
        plugins: Vec<String>,
    },
    /// Remove plugins from the server
    Delete {
        #[arg(required = true)]
        plugins: Vec<String>,
    },
}

pub async fn run(cmd: PluginCommands, ctx: &Context<'_>) -> Result<()> {
    let client = ctx.client();
    match cmd {
        PluginCommands::List => {
            let plugins = client.get_plugins().await.context("unable to get plugins")?;
            ctx.printer.print("Listing active plugins");
            for p in &plugins.active {
                ctx.printer.print_t("{{ id }}: {{ name }}, Version: {{ version }}", p);
            }
            ctx.printer.print("Listing inactive plugins");
            for p in &plugins.inactive {
                ctx.printer.print_t("{{ id }}: {{ name }}, Version: {{ version }}", p);
            }
            Ok(())
        }
        PluginCommands::Enable { plugins } => {
            for id in &plugins {
                match client.enable_plugin(id).await {
                    Ok(()) => ctx.printer.print(&format!("Enabled plugin: {id}")),
                    Err(err) => ctx
                        .printer
                        .print_error(format!("unable to enable plugin {id}: {err}")),
                }
            }
            Ok(())
        }
        PluginCommands::Disable { plugins } => {
            for id in &plugins {
                match client.disable_plugin(id).await {
                    Ok(()) => ctx.printer.print(&format!("Disabled plugin: {id}")),
                    Err(err) => ctx
                        .printer
                        .print_error(format!("unable to disable plugin {id}: {err}")),
                }
            }
            Ok(())
        }
        PluginCommands::Delete { plugins } => {
            for id in &plugins {
                match client.remove_plugin(id).await {
                    Ok(()) => ctx.printer.print(&format!("Plugin {id} deleted")),
                    Err(err) => ctx
                        .printer
                        .print_error(format!("unable to delete plugin {id}: {err}")),
                }
            }
            Ok(())
        }
    }
}
