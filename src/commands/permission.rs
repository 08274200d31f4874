use anyhow::{anyhow, Context as _, Result};
use clap::Subcommand;

use super::Context;
use crate::client::Client;
use crate::error::is_lookup_miss;
use crate::model::Role;

const ROLE_TEMPLATE: &str = "Name: {{ name }}
Display Name: {{ display_name }}
Built in: {{ built_in }}
Scheme managed: {{ scheme_managed }}
Permissions:{% for p in permissions %}
  {{ p }}{% endfor %}";

#[derive(Subcommand, Debug)]
pub enum PermissionCommands {
    /// Show a role and its permissions
    Show { role: String },
    /// Grant permissions to a role
    Add {
        role: String,
        #[arg(required = true)]
        permissions: Vec<String>,
    },
    /// Revoke permissions from a role
    Remove {
        role: String,
        #[arg(required = true)]
        permissions: Vec<String>,
    },
}

pub async fn run(cmd: PermissionCommands, ctx: &Context<'_>) -> Result<()> {
    let client = ctx.client();
    let (role, updated) = match cmd {
        PermissionCommands::Show { role } => {
            let role = find_role(client, &role).await?;
            ctx.printer.set_single(true);
            ctx.printer.print_t(ROLE_TEMPLATE, &role);
            return Ok(());
        }
        PermissionCommands::Add { role, permissions } => {
            let role = find_role(client, &role).await?;
            let mut updated = role.permissions.clone();
            for p in permissions {
                if !updated.contains(&p) {
                    updated.push(p);
                }
            }
            (role, updated)
        }
        PermissionCommands::Remove { role, permissions } => {
            let role = find_role(client, &role).await?;
            let updated = role
                .permissions
                .iter()
                .filter(|p| !permissions.contains(*p))
                .cloned()
                .collect();
            (role, updated)
        }
    };
    let patched = client
        .patch_role(&role.id, &updated)
        .await
        .with_context(|| format!("failed to update role {}", role.name))?;
    ctx.printer.set_single(true);
    ctx.printer.print_t(ROLE_TEMPLATE, &patched);
    Ok(())
}

/// Roles are looked up by name only; a miss is fatal.
async fn find_role(client: &dyn Client, name: &str) -> Result<Role> {
    match client.get_role_by_name(name).await {
        Ok(role) => Ok(role),
        Err(err) if is_lookup_miss(&err) => Err(anyhow!("role not found")),
        Err(err) => Err(err).with_context(|| format!("fetching role {name}")),
    }
}
