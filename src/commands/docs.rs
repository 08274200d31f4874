use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Args, CommandFactory};

use crate::printer::Printer;
use crate::Cli;

#[derive(Args, Debug)]
pub struct DocsArgs {
    /// Output directory
    #[arg(long, short, default_value = "docs")]
    pub directory: PathBuf,
}

pub fn run(args: DocsArgs, printer: &Printer) -> Result<()> {
    std::fs::create_dir_all(&args.directory)
        .with_context(|| format!("creating {}", args.directory.display()))?;
    let mut root = Cli::command();
    root.build();
    let mut written = Vec::new();
    write_tree(&root, &[], &args.directory, &mut written)?;
    for path in &written {
        printer.print(&path.display().to_string());
    }
    Ok(())
}

fn write_tree(
    cmd: &clap::Command,
    parents: &[&str],
    dir: &Path,
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    let mut path: Vec<&str> = parents.to_vec();
    path.push(cmd.get_name());

    let file = dir.join(format!("{}.md", path.join("_")));
    std::fs::write(&file, render(cmd, &path))
        .with_context(|| format!("writing {}", file.display()))?;
    written.push(file);

    for sub in cmd.get_subcommands().filter(|s| s.get_name() != "help") {
        write_tree(sub, &path, dir, written)?;
    }
    Ok(())
}

fn render(cmd: &clap::Command, path: &[&str]) -> String {
    let mut out = String::new();
    let title = path.join(" ");
    let _ = writeln!(out, "## {title}\n");
    if let Some(about) = cmd.get_long_about().or_else(|| cmd.get_about()) {
        let _ = writeln!(out, "{about}\n");
    }
    let _ = writeln!(out, "### Synopsis\n\n```\n{title} [flags]\n```\n");

    let options: Vec<_> = cmd
        .get_arguments()
        .filter(|a| a.get_long().is_some() && !a.is_hide_set())
        .collect();
    if !options.is_empty() {
        let _ = writeln!(out, "### Options\n\n```");
        for arg in options {
            let long = arg.get_long().unwrap_or_default();
            let short = arg.get_short().map(|s| format!("-{s}, ")).unwrap_or_default();
            let help = arg.get_help().map(|h| h.to_string()).unwrap_or_default();
            let _ = writeln!(out, "  {short}--{long}\t{help}");
        }
        let _ = writeln!(out, "```\n");
    }

    let subs: Vec<_> = cmd
        .get_subcommands()
        .filter(|s| s.get_name() != "help")
        .collect();
    if !subs.is_empty() {
        let _ = writeln!(out, "### See also\n");
        for sub in subs {
            let link = format!("{}_{}", path.join("_"), sub.get_name());
            let about = sub.get_about().map(|a| a.to_string()).unwrap_or_default();
            let _ = writeln!(out, "* [{} {}]({link}.md)\t - {about}", title, sub.get_name());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_page_per_command() {
        let dir = tempfile::TempDir::new().unwrap();
        let printer = Printer::new();
        run(
            DocsArgs {
                directory: dir.path().to_path_buf(),
            },
            &printer,
        )
        .unwrap();
        let root = std::fs::read_to_string(dir.path().join("chatctl.md")).unwrap();
        assert!(root.contains("[chatctl team](chatctl_team.md)"));
        let archive = std::fs::read_to_string(dir.path().join("chatctl_team_archive.md")).unwrap();
        assert!(archive.contains("--confirm"));
    }
}
