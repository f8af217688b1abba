mod cli;
mod commands;
mod config;
mod paths;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
    };

    if let Err(e) = run(&ctx, cli.command) {
        report(&ctx, &e);
        std::process::exit(1);
    }
}

fn run(ctx: &Context, command: Command) -> Result<()> {
    match command {
        Command::Orchestration(cmd) => commands::orchestration::run(ctx, cmd),
        Command::Attachment(cmd) => commands::attachment::run(ctx, cmd),
        Command::Config(cmd) => commands::config::run(ctx, cmd),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "opcctl", &mut io::stdout());
            Ok(())
        }
    }
}

fn report(ctx: &Context, err: &anyhow::Error) {
    ui::error(&format!("{:#}", err));

    let Some(compute_err) = err.downcast_ref::<compute::Error>() else {
        return;
    };
    if ctx.verbose > 0 {
        log::info!("Error category: {}", compute_err.category());
    }
    if !ctx.quiet {
        ui::dim(compute_err.category().advice());
    }
}
