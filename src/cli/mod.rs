// CLI module - command dispatch for daemon lifecycle control

pub mod output;

use clap::{Parser, Subcommand};

use crate::daemon::{DaemonManager, Service, StopOutcome};
use crate::error::Result;

/// Vigil - turn a process into a managed background daemon
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the daemon in the background
    Start,
    /// Stop the running daemon
    Stop,
    /// Restart the daemon
    Restart,
    /// Show daemon status
    Status,
}

impl Cli {
    /// Parse the command line and execute against the given manager and
    /// workload. Missing, unknown, or extra arguments make clap print a
    /// usage diagnostic and exit with status 2; lifecycle failures are
    /// returned for the caller to map to an exit code.
    pub fn run<S: Service>(manager: &DaemonManager, service: S) -> Result<()> {
        let cli = Cli::parse();
        cli.execute(manager, service)
    }

    fn execute<S: Service>(self, manager: &DaemonManager, service: S) -> Result<()> {
        match self.command {
            // Only returns if the service's run loop returns
            Commands::Start => manager.start(service),

            Commands::Stop => {
                report_stop(manager.stop()?);
                Ok(())
            }

            Commands::Restart => {
                report_stop(manager.stop()?);
                manager.start(service)
            }

            Commands::Status => {
                output::print_status(&manager.status());
                Ok(())
            }
        }
    }
}

fn report_stop(outcome: StopOutcome) {
    match outcome {
        StopOutcome::Stopped(pid) => {
            output::print_success(&format!("daemon stopped (PID {})", pid));
        }
        StopOutcome::NotRunning => {
            output::print_info("daemon not running, nothing to stop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_lifecycle_commands_parse() {
        for command in ["start", "stop", "restart", "status"] {
            assert!(Cli::try_parse_from(["vigil", command]).is_ok(), "{}", command);
        }
    }

    #[test]
    fn test_no_arguments_is_a_usage_error() {
        let err = Cli::try_parse_from(["vigil"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_unknown_command_is_a_usage_error() {
        let err = Cli::try_parse_from(["vigil", "bogus"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_extra_arguments_are_a_usage_error() {
        let err = Cli::try_parse_from(["vigil", "start", "extra"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
