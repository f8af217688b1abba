use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "opcctl")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Drive compute cloud resources to their desired state", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: config.toml in the config directory)
    #[arg(long, global = true, env = "OPCCTL_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage orchestrations
    #[command(subcommand)]
    Orchestration(OrchestrationCommand),

    /// Manage storage attachments
    #[command(subcommand)]
    Attachment(AttachmentCommand),

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Overrides for how long to wait for convergence
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct WaitArgs {
    /// Seconds between status checks
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: Option<u64>,

    /// Seconds to wait before giving up
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

// ============================================================================
// Orchestration Commands
// ============================================================================

#[derive(Subcommand)]
pub enum OrchestrationCommand {
    /// Create an orchestration from a JSON file and wait until it is ready
    Create {
        /// Orchestration definition (JSON)
        #[arg(short, long)]
        file: PathBuf,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Show an orchestration
    Get {
        /// Orchestration name
        name: String,
    },

    /// Replace an orchestration's definition and wait until it is ready
    Update {
        /// Orchestration definition (JSON)
        #[arg(short, long)]
        file: PathBuf,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Delete an orchestration and wait until it is gone
    Delete {
        /// Orchestration name
        name: String,

        #[command(flatten)]
        wait: WaitArgs,
    },
}

// ============================================================================
// Attachment Commands
// ============================================================================

#[derive(Subcommand)]
pub enum AttachmentCommand {
    /// Attach a storage volume to an instance and wait until attached
    Create {
        /// Instance name
        #[arg(long)]
        instance: String,

        /// Storage volume name
        #[arg(long)]
        volume: String,

        /// Attachment index (1 is /dev/xvdb)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
        index: u8,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Show a storage attachment
    Get {
        /// Attachment name
        name: String,
    },

    /// Detach a storage volume and wait until the attachment is gone
    Delete {
        /// Attachment name
        name: String,

        #[command(flatten)]
        wait: WaitArgs,
    },
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show config file location and effective settings
    Show,
}
