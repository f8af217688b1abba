use colored::Colorize;
use converge::WaitObserver;
use serde::Serialize;
use std::time::Duration;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a value as pretty JSON
pub fn json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format a wait duration for progress lines
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 3600 {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}

/// Prints one dim line per pending sample while a command waits
pub struct ProgressObserver;

impl WaitObserver for ProgressObserver {
    fn on_pending(&self, description: &str, attempt: u32, status: &str, elapsed: Duration) {
        dim(&progress_line(description, attempt, status, elapsed));
    }
}

fn progress_line(description: &str, attempt: u32, status: &str, elapsed: Duration) -> String {
    format!(
        "waiting for {}: {} (check {}, {})",
        description,
        status,
        attempt,
        format_elapsed(elapsed)
    )
}

// ============================================================================
// Tests
// ============================================================================
