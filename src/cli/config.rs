use crate::cli::context::CliContext;
use crate::cli::output::OutputFormat;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde_json::Value as JsonValue;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (file plus environment overrides)
    Show,

    /// Get configuration value
    Get {
        /// Dotted configuration key, e.g. `site.url`
        key: String,
    },

    /// Validate configuration
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let config = ctx.config();
    match args.action {
        ConfigAction::Show => {
            if matches!(output, OutputFormat::Human) {
                println!("Current configuration ({}):", ctx.config_path().display());
            }
            print_value(&serde_json::to_value(config)?, output)?;
        }
        ConfigAction::Get { key } => {
            let json = serde_json::to_value(config)?;
            let segments = split_key(&key)?;
            match get_json_value(&json, &segments) {
                Some(value) => print_value(value, output)?,
                None => bail!("{} not found in configuration", key),
            }
        }
        ConfigAction::Validate => {
            config
                .validate()
                .with_context(|| format!("validating {}", ctx.config_path().display()))?;
            println!("Configuration ({}) is valid", ctx.config_path().display());
        }
    }

    Ok(())
}

fn print_value(value: &JsonValue, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Human => match value {
            JsonValue::String(text) => println!("{text}"),
            other => print!("{}", serde_yaml::to_string(other)?),
        },
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

fn split_key(key: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = key
        .split('.')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        bail!("configuration key cannot be empty");
    }
    Ok(segments)
}

fn get_json_value<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let mut current = value;
    for segment in path {
        match current {
            JsonValue::Object(map) => {
                current = map.get(*segment)?;
            }
            _ => return None,
        }
    }
    Some(current)
}
