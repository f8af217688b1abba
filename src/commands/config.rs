use anyhow::Result;
use compute::Scope;

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::{Settings, WaitSecs};
use crate::paths;
use crate::ui;

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(ctx),
    }
}

fn show(ctx: &Context) -> Result<()> {
    ui::header("Configuration");

    let dir = paths::config_dir()?;
    let file = paths::config_file(ctx.config.as_deref())?;
    println!();
    ui::kv("Config directory", &dir.display().to_string());
    ui::kv("Config file", &file.display().to_string());
    println!();

    if !file.exists() {
        ui::warn("Config file not found");
        ui::dim("Create it with at least:");
        ui::dim("  endpoint = \"https://<compute api endpoint>\"");
        ui::dim("  identity_domain = \"<domain>\"");
        ui::dim("  user = \"<user>\"");
        return Ok(());
    }

    let settings = Settings::load(&file)?;
    ui::kv("Endpoint", &settings.endpoint);
    ui::kv("Identity domain", &settings.identity_domain);
    ui::kv("User", &settings.user);
    match Scope::for_user(&settings.identity_domain, &settings.user) {
        Ok(scope) => ui::kv("Scope", scope.as_str()),
        Err(e) => ui::kv("Scope", &format!("invalid ({})", e)),
    }

    let cookie_env = settings.cookie_env();
    let cookie_state = if cookie_is_set(cookie_env) {
        "set"
    } else {
        "not set"
    };
    ui::kv("Auth cookie", &format!("${} ({})", cookie_env, cookie_state));

    println!();
    ui::info("Waits");
    ui::kv("orchestration", &describe_waits(settings.waits.orchestration));
    ui::kv("attachment", &describe_waits(settings.waits.attachment));

    Ok(())
}

fn cookie_is_set(var: &str) -> bool {
    std::env::var(var).is_ok_and(|v| !v.trim().is_empty())
}

fn describe_waits(waits: WaitSecs) -> String {
    let poll = waits
        .poll_interval
        .map_or_else(|| "default".to_string(), |s| format!("{}s", s));
    let timeout = waits
        .timeout
        .map_or_else(|| "default".to_string(), |s| format!("{}s", s));
    format!("poll every {}, give up after {}", poll, timeout)
}
