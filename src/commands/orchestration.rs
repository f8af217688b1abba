use anyhow::{Context as _, Result};
use compute::kinds::OrchestrationSpec;
use std::fs;
use std::path::Path;

use crate::Context;
use crate::cli::{OrchestrationCommand, WaitArgs};
use crate::commands;
use crate::ui;

pub fn run(ctx: &Context, cmd: OrchestrationCommand) -> Result<()> {
    match cmd {
        OrchestrationCommand::Create { file, wait } => create(ctx, &file, &wait),
        OrchestrationCommand::Get { name } => get(ctx, &name),
        OrchestrationCommand::Update { file, wait } => update(ctx, &file, &wait),
        OrchestrationCommand::Delete { name, wait } => delete(ctx, &name, &wait),
    }
}

fn create(ctx: &Context, file: &Path, args: &WaitArgs) -> Result<()> {
    let spec = read_spec(file)?;
    let settings = commands::load_settings(ctx)?;
    let client = commands::client(ctx, &settings)?;
    let wait = commands::wait_override(settings.waits.orchestration, args);

    if !ctx.quiet {
        ui::info(&format!(
            "Creating orchestration '{}' ({} objects)",
            spec.name,
            spec.objects.len()
        ));
    }
    let orchestration = client
        .orchestrations()
        .create(&spec, &wait)
        .with_context(|| format!("Failed to create orchestration '{}'", spec.name))?;

    ui::json(&orchestration)
}

fn get(ctx: &Context, name: &str) -> Result<()> {
    let settings = commands::load_settings(ctx)?;
    let client = commands::client(ctx, &settings)?;
    let orchestration = client.orchestrations().get(name)?;
    ui::json(&orchestration)
}

fn update(ctx: &Context, file: &Path, args: &WaitArgs) -> Result<()> {
    let spec = read_spec(file)?;
    let settings = commands::load_settings(ctx)?;
    let client = commands::client(ctx, &settings)?;
    let wait = commands::wait_override(settings.waits.orchestration, args);

    if !ctx.quiet {
        ui::info(&format!("Updating orchestration '{}'", spec.name));
    }
    let orchestration = client
        .orchestrations()
        .update(&spec, &wait)
        .with_context(|| format!("Failed to update orchestration '{}'", spec.name))?;

    ui::json(&orchestration)
}

fn delete(ctx: &Context, name: &str, args: &WaitArgs) -> Result<()> {
    let settings = commands::load_settings(ctx)?;
    let client = commands::client(ctx, &settings)?;
    let wait = commands::wait_override(settings.waits.orchestration, args);

    client
        .orchestrations()
        .delete(name, &wait)
        .with_context(|| format!("Failed to delete orchestration '{}'", name))?;

    if !ctx.quiet {
        ui::success(&format!("Deleted orchestration '{}'", name));
    }
    Ok(())
}

/// Read an orchestration definition from a JSON file
fn read_spec(path: &Path) -> Result<OrchestrationSpec> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    let spec: OrchestrationSpec = serde_json::from_str(&content)
        .with_context(|| format!("Invalid orchestration definition in {}", path.display()))?;
    log::debug!(
        "Read orchestration '{}' with {} objects from {}",
        spec.name,
        spec.objects.len(),
        path.display()
    );
    Ok(spec)
}
