use anyhow::{Context as _, Result};
use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::constants::APP_NAME;
use crate::printer::Printer;
use crate::Cli;

pub fn run(shell: Shell, printer: &Printer) -> Result<()> {
    let mut cmd = Cli::command();
    let mut script = Vec::new();
    generate(shell, &mut cmd, APP_NAME, &mut script);
    let script = String::from_utf8(script).context("completion script is not UTF-8")?;
    printer.set_single(true);
    printer.print(script.trim_end());
    Ok(())
}
