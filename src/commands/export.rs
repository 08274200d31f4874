use std::collections::BTreeMap;

use anyhow::{Context as _, Result};
use clap::Subcommand;

use super::{Context, JOB_TEMPLATE};
use crate::constants::DEFAULT_PAGE_SIZE;
use crate::jobs::wait_for_job;
use crate::model::{NewJob, JOB_TYPE_EXPORT};

#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    /// Start an export job
    Create {
        /// Include file attachments in the export
        #[arg(long)]
        attachments: bool,
        /// Wait for the job to finish
        #[arg(long)]
        wait: bool,
    },
    /// List export jobs
    List {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        per_page: u32,
    },
    /// Inspect export jobs
    Job {
        #[command(subcommand)]
        cmd: ExportJobCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ExportJobCommands {
    /// Show one export job
    Show { id: String },
}

pub async fn run(cmd: ExportCommands, ctx: &Context<'_>) -> Result<()> {
    let client = ctx.client();
    match cmd {
        ExportCommands::Create { attachments, wait } => {
            let mut data = BTreeMap::new();
            if attachments {
                data.insert("include_attachments".to_string(), "true".to_string());
            }
            let job = client
                .create_job(&NewJob {
                    job_type: JOB_TYPE_EXPORT.to_string(),
                    data,
                })
                .await
                .context("failed to create export process job")?;
            let job = if wait {
                wait_for_job(client, &job.id).await?
            } else {
                job
            };
            ctx.printer.set_single(true);
            ctx.printer.print_t(JOB_TEMPLATE, &job);
            Ok(())
        }
        ExportCommands::List { page, per_page } => {
            let jobs = client
                .get_jobs_by_type(JOB_TYPE_EXPORT, page, per_page)
                .await
                .context("failed to get export jobs")?;
            if jobs.is_empty() {
                ctx.printer.print_warning("No jobs found");
            }
            for job in &jobs {
                ctx.printer.print_t(JOB_TEMPLATE, job);
            }
            Ok(())
        }
        ExportCommands::Job {
            cmd: ExportJobCommands::Show { id },
        } => {
            let job = client
                .get_job(&id)
                .await
                .with_context(|| format!("failed to get export job {id}"))?;
            ctx.printer.set_single(true);
            ctx.printer.print_t(JOB_TEMPLATE, &job);
            Ok(())
        }
    }
}
