pub mod attachment;
pub mod config;
pub mod orchestration;

use anyhow::{Context as _, Result};
use compute::Client;
use converge::WaitOverride;

use crate::Context;
use crate::cli::WaitArgs;
use crate::config::{Settings, WaitSecs};
use crate::paths;
use crate::ui;

/// Load settings from `--config` or the default location
pub fn load_settings(ctx: &Context) -> Result<Settings> {
    let path = paths::config_file(ctx.config.as_deref())?;
    log::debug!("Loading settings from {}", path.display());
    Settings::load(&path)
}

/// Build a client, reporting wait progress unless `--quiet`
pub fn client(ctx: &Context, settings: &Settings) -> Result<Client> {
    let client = Client::new(&settings.client_config()).context("Could not create client")?;
    if ctx.quiet {
        Ok(client)
    } else {
        Ok(client.with_observer(Box::new(ui::ProgressObserver)))
    }
}

/// Command-line wait flags layered over the configured defaults
pub fn wait_override(configured: WaitSecs, args: &WaitArgs) -> WaitOverride {
    configured
        .merged(WaitSecs {
            poll_interval: args.poll_interval,
            timeout: args.timeout,
        })
        .to_override()
}
