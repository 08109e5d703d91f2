// Output formatting and display for CLI

use crate::supervisor::{ServerState, ServerStatus};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Print a progress line such as "Stopping chatroom..."
pub fn print_info(message: &str) {
    println!("{}", message);
}

/// Print the "> success" / "> failure" line closing an operation
pub fn print_outcome(success: bool) {
    if success {
        println!("{}", "> success".green().bold());
    } else {
        eprintln!("{}", "> failure".red().bold());
    }
}

/// Print an error message to stderr
pub fn print_error(error: &str) {
    eprintln!("{} {}", "✗ Error:".red().bold(), error);
}

/// Print a status table for one server
pub fn print_status(status: &ServerStatus) {
    #[derive(Tabled)]
    struct StatusRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "State")]
        state: String,
        #[tabled(rename = "PID")]
        pid: String,
        #[tabled(rename = "Memory")]
        memory: String,
        #[tabled(rename = "Uptime")]
        uptime: String,
        #[tabled(rename = "Started")]
        started: String,
        #[tabled(rename = "PID file")]
        pid_file: String,
    }

    let dash = || "-".to_string();
    let row = StatusRow {
        name: truncate(&status.name, 20),
        state: format_state_colored(&status.state),
        pid: status.pid.map(|pid| pid.to_string()).unwrap_or_else(dash),
        memory: status.memory.map(format_memory).unwrap_or_else(dash),
        uptime: status
            .uptime
            .as_ref()
            .map(format_duration)
            .unwrap_or_else(dash),
        started: status
            .started_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(dash),
        pid_file: status.pid_file.display().to_string(),
    };

    let mut table = Table::new([row]);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    println!("\n{}\n", table);
    if !status.description.is_empty() {
        println!("{}", status.description.dimmed().italic());
    }
}

fn format_state_colored(state: &ServerState) -> String {
    match state {
        ServerState::Running => state.to_string().green().to_string(),
        ServerState::Stopped => state.to_string().bright_black().to_string(),
        ServerState::StalePidFile => state.to_string().yellow().to_string(),
    }
}

/// Format a duration in human-readable format
fn format_duration(duration: &Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        match (secs / 60, secs % 60) {
            (mins, 0) => format!("{}m", mins),
            (mins, secs) => format!("{}m {}s", mins, secs),
        }
    } else if secs < 86400 {
        match (secs / 3600, (secs % 3600) / 60) {
            (hours, 0) => format!("{}h", hours),
            (hours, mins) => format!("{}h {}m", hours, mins),
        }
    } else {
        match (secs / 86400, (secs % 86400) / 3600) {
            (days, 0) => format!("{}d", days),
            (days, hours) => format!("{}d {}h", days, hours),
        }
    }
}

/// Format memory usage in human-readable format
fn format_memory(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{}B", bytes)
    } else if bytes < MB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2}GB", bytes as f64 / GB as f64)
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Spinner shown on stderr while waiting on a process; hidden off-terminal
pub fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
