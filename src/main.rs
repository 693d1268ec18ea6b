use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use vigil::cli::{output, Cli};
use vigil::daemon::{DaemonManager, ProcessRegistry, Service};
use vigil::error::Result;

const DEFAULT_LOG_FILE: &str = "/tmp/vigil.log";

/// Minimal workload: once detached, log a heartbeat once a second, forever
struct Heartbeat {
    log_file: PathBuf,
    interval: Duration,
}

impl Service for Heartbeat {
    fn run(&mut self) -> Result<()> {
        // The standard streams point at /dev/null once daemonized, so the
        // subscriber writes to a file instead
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_writer(Mutex::new(log))
            .with_ansi(false)
            .init();

        tracing::info!(pid = std::process::id(), "daemon started");
        loop {
            tracing::info!("heartbeat");
            thread::sleep(self.interval);
        }
    }
}

fn main() {
    let registry = match env::var_os("VIGIL_PID_FILE") {
        Some(path) => ProcessRegistry::with_path(PathBuf::from(path)),
        None => ProcessRegistry::new(),
    };
    let manager = DaemonManager::with_registry(registry);

    let service = Heartbeat {
        log_file: env::var_os("VIGIL_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
        interval: Duration::from_secs(1),
    };

    if let Err(e) = Cli::run(&manager, service) {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}
