// Output formatting and display for CLI

use colored::*;

use crate::daemon::DaemonStatus;

/// Print a success message to stdout
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an info message to stdout
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print an error message to stderr
pub fn print_error(error: &str) {
    eprintln!("{} {}", "✗ Error:".red().bold(), error);
}

/// Print daemon status
pub fn print_status(status: &DaemonStatus) {
    if status.running {
        println!("{}", "✓ Daemon is running".green().bold());
        if let Some(pid) = status.pid {
            println!("  {}: {}", "PID".bold(), pid);
        }
        if let Some(started) = status.started_at {
            println!(
                "  {}: {}",
                "Started".bold(),
                started.format("%Y-%m-%d %H:%M:%S")
            );
        }
    } else {
        println!("{}", "✗ Daemon is not running".red().bold());
    }
    println!("  {}: {}", "PID file".bold(), status.pid_file.display());
}
