//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};
use dialoguer::Confirm;
use regdesk_observability::LogFormat;

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, CONFIG_NAMES};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Init { force } => init_config(force, ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }

    let loader = &ctx.config.loader;
    ctx.output.info("[loader]");
    ctx.output.kv("label", &loader.label);
    ctx.output.kv("timeout_ms", &loader.timeout_ms.to_string());
    ctx.output.kv("auto_load", &loader.auto_load.to_string());

    let logging = &ctx.config.logging;
    ctx.output.info("[logging]");
    ctx.output.kv("level", logging.level.as_str());
    let format = match logging.format {
        LogFormat::Json => "json",
        LogFormat::Human => "human",
    };
    ctx.output.kv("format", format);
    for directive in &logging.directives {
        ctx.output.list_item(directive);
    }

    let sim = &ctx.config.simulation;
    ctx.output.info("[simulation]");
    ctx.output.kv("latency_ms", &sim.latency_ms.to_string());
    ctx.output.kv("rows", &sim.rows.to_string());
    ctx.output.kv("failure", &sim.failure.to_string());
    if let Some(after) = sim.fail_after {
        ctx.output.kv("fail_after", &after.to_string());
    }

    Ok(())
}

async fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join(CONFIG_NAMES[0]);

    if config_path.exists() && !force {
        if ctx.output.is_json() {
            bail!(
                "Config file already exists: {}. Use --force to overwrite.",
                config_path.display()
            );
        }

        let overwrite = Confirm::new()
            .with_prompt(format!("{} exists. Overwrite?", config_path.display()))
            .default(false)
            .interact()?;

        if !overwrite {
            ctx.output.warn("Left existing config untouched");
            return Ok(());
        }
    }

    fs::write(&config_path, generate_default_config())?;
    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let (errors, warnings) = ctx.config.validate();

    if errors.is_empty() && warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for error in &errors {
        ctx.output.error(&format!("Error: {}", error));
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if !errors.is_empty() {
        bail!("Configuration has {} error(s)", errors.len());
    }

    ctx.output.success("Configuration is valid (with warnings)");

    Ok(())
}
