use anyhow::{anyhow, bail, Context as _, Result};
use clap::Subcommand;
use serde_json::Value;

use super::{Context, Requirements};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print one setting, e.g. `ServiceSettings.SiteURL`
    Get { key: String },
    /// Change one setting; list settings take several values
    Set {
        key: String,
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Print the whole configuration
    Show,
    /// Make the server reread its configuration (local mode only)
    Reload,
}

impl ConfigCommands {
    pub fn requirements(&self) -> Requirements {
        match self {
            ConfigCommands::Reload => Requirements::session().local_only(),
            _ => Requirements::session(),
        }
    }
}

pub async fn run(cmd: ConfigCommands, ctx: &Context<'_>) -> Result<()> {
    let client = ctx.client();
    match cmd {
        ConfigCommands::Get { key } => {
            let config = client.get_config().await.context("fetching config")?;
            let value = lookup(&config, &key)?;
            ctx.printer.set_single(true);
            ctx.printer.print(value);
            Ok(())
        }
        ConfigCommands::Set { key, values } => {
            let mut config = client.get_config().await.context("fetching config")?;
            assign(&mut config, &key, &values)?;
            let saved = client
                .update_config(&config)
                .await
                .context("saving config")?;
            ctx.printer.set_single(true);
            ctx.printer.print(lookup(&saved, &key)?);
            Ok(())
        }
        ConfigCommands::Show => {
            let config = client.get_config().await.context("fetching config")?;
            ctx.printer.set_single(true);
            ctx.printer.print(&config);
            Ok(())
        }
        ConfigCommands::Reload => {
            client.reload_config().await.context("reloading config")?;
            Ok(())
        }
    }
}

fn pointer(key: &str) -> String {
    key.split('.').fold(String::new(), |mut acc, part| {
        acc.push('/');
        acc.push_str(&part.replace('~', "~0").replace('/', "~1"));
        acc
    })
}

fn lookup<'v>(config: &'v Value, key: &str) -> Result<&'v Value> {
    config
        .pointer(&pointer(key))
        .ok_or_else(|| anyhow!("invalid key: {key}"))
}

/// Set `key`, converting the input to the type the setting already has.
fn assign(config: &mut Value, key: &str, values: &[String]) -> Result<()> {
    let slot = config
        .pointer_mut(&pointer(key))
        .ok_or_else(|| anyhow!("invalid key: {key}"))?;
    let new = match slot {
        Value::Array(_) => Value::Array(values.iter().cloned().map(Value::String).collect()),
        _ if values.len() > 1 => bail!("setting {key} takes a single value"),
        Value::Bool(_) => Value::Bool(
            values[0]
                .parse()
                .with_context(|| format!("{key} expects true or false"))?,
        ),
        Value::Number(_) => {
            let n: serde_json::Number = values[0]
                .parse()
                .with_context(|| format!("{key} expects a number"))?;
            Value::Number(n)
        }
        Value::Object(_) => bail!("{key} is a section, pick a setting inside it"),
        Value::String(_) | Value::Null => Value::String(values[0].clone()),
    };
    *slot = new;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "ServiceSettings": {
                "SiteURL": "https://old",
                "EnableDeveloper": false,
                "MaximumLoginAttempts": 10,
                "AllowCorsFrom": ["a"],
            }
        })
    }

    #[test]
    fn get_walks_dotted_keys() {
        let config = sample();
        assert_eq!(lookup(&config, "ServiceSettings.SiteURL").unwrap(), "https://old");
        assert!(lookup(&config, "ServiceSettings.Nope").is_err());
    }

    #[test]
    fn set_keeps_the_setting_type() {
        let mut config = sample();
        assign(&mut config, "ServiceSettings.EnableDeveloper", &["true".into()]).unwrap();
        assign(&mut config, "ServiceSettings.MaximumLoginAttempts", &["5".into()]).unwrap();
        assign(
            &mut config,
            "ServiceSettings.AllowCorsFrom",
            &["x".into(), "y".into()],
        )
        .unwrap();
        let s = &config["ServiceSettings"];
        assert_eq!(s["EnableDeveloper"], json!(true));
        assert_eq!(s["MaximumLoginAttempts"], json!(5));
        assert_eq!(s["AllowCorsFrom"], json!(["x", "y"]));
    }

    #[test]
    fn set_rejects_bad_input() {
        let mut config = sample();
        assert!(assign(&mut config, "ServiceSettings.EnableDeveloper", &["maybe".into()]).is_err());
        assert!(assign(&mut config, "ServiceSettings", &["x".into()]).is_err());
        assert!(assign(&mut config, "ServiceSettings.SiteURL", &["a".into(), "b".into()]).is_err());
    }
}
