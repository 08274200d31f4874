use anyhow::Result;
use serde::Serialize;

use crate::constants::CLIENT_VERSION;
use crate::printer::Printer;

#[derive(Serialize)]
struct VersionInfo {
    version: &'static str,
    os: &'static str,
    arch: &'static str,
}

pub fn run(printer: &Printer) -> Result<()> {
    printer.set_single(true);
    printer.print_t(
        "chatctl {{ version }} ({{ os }}/{{ arch }})",
        &VersionInfo {
            version: CLIENT_VERSION,
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        },
    );
    Ok(())
}
