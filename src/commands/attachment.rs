use anyhow::{Context as _, Result};
use compute::kinds::CreateStorageAttachmentInput;

use crate::Context;
use crate::cli::{AttachmentCommand, WaitArgs};
use crate::commands;
use crate::ui;

pub fn run(ctx: &Context, cmd: AttachmentCommand) -> Result<()> {
    match cmd {
        AttachmentCommand::Create {
            instance,
            volume,
            index,
            wait,
        } => create(ctx, CreateStorageAttachmentInput::new(index, instance, volume), &wait),
        AttachmentCommand::Get { name } => get(ctx, &name),
        AttachmentCommand::Delete { name, wait } => delete(ctx, &name, &wait),
    }
}

fn create(ctx: &Context, input: CreateStorageAttachmentInput, args: &WaitArgs) -> Result<()> {
    let settings = commands::load_settings(ctx)?;
    let client = commands::client(ctx, &settings)?;
    let wait = commands::wait_override(settings.waits.attachment, args);

    if !ctx.quiet {
        ui::info(&format!(
            "Attaching '{}' to '{}' at index {}",
            input.storage_volume_name, input.instance_name, input.index
        ));
    }
    let attachment = client
        .storage_attachments()
        .create(&input, &wait)
        .with_context(|| {
            format!(
                "Failed to attach '{}' to '{}'",
                input.storage_volume_name, input.instance_name
            )
        })?;

    ui::json(&attachment)
}

fn get(ctx: &Context, name: &str) -> Result<()> {
    let settings = commands::load_settings(ctx)?;
    let client = commands::client(ctx, &settings)?;
    let attachment = client.storage_attachments().get(name)?;
    ui::json(&attachment)
}

fn delete(ctx: &Context, name: &str, args: &WaitArgs) -> Result<()> {
    let settings = commands::load_settings(ctx)?;
    let client = commands::client(ctx, &settings)?;
    let wait = commands::wait_override(settings.waits.attachment, args);

    client
        .storage_attachments()
        .delete(name, &wait)
        .with_context(|| format!("Failed to detach '{}'", name))?;

    if !ctx.quiet {
        ui::success(&format!("Detached '{}'", name));
    }
    Ok(())
}
