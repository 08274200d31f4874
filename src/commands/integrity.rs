use anyhow::{Context as _, Result};
use clap::Args;

use super::{Context, Requirements};
use crate::confirm::ConfirmGate;

const RESULT_TEMPLATE: &str = "Found {{ (data.records or []) | length }} in relation {{ data.child_name }} orphans of relation {{ data.parent_name }}";
const VERBOSE_TEMPLATE: &str = "Found {{ (data.records or []) | length }} in relation {{ data.child_name }} orphans of relation {{ data.parent_name }}{% for r in data.records or [] %}
  {{ data.child_id_attr or \"child\" }}: {{ r.child_id }}{% if r.parent_id %}, {{ data.parent_id_attr or \"parent\" }}: {{ r.parent_id }}{% endif %}{% endfor %}";

#[derive(Args, Debug)]
pub struct IntegrityArgs {
    /// Skip the confirmation prompt
    #[arg(long)]
    pub confirm: bool,
    /// List every orphaned record
    #[arg(long, short)]
    pub verbose: bool,
}

impl IntegrityArgs {
    pub fn requirements(&self) -> Requirements {
        Requirements::session().gated(ConfirmGate::acknowledge(
            self.confirm,
            "run the integrity check",
        ))
    }
}

pub async fn run(args: IntegrityArgs, ctx: &Context<'_>) -> Result<()> {
    let results = ctx
        .client()
        .check_integrity()
        .await
        .context("unable to perform integrity check")?;
    let template = if args.verbose {
        VERBOSE_TEMPLATE
    } else {
        RESULT_TEMPLATE
    };
    for result in &results {
        match &result.err {
            Some(err) if !err.is_null() => ctx.printer.print_error(err.to_string()),
            _ => ctx.printer.print_t(template, result),
        }
    }
    Ok(())
}
