// Daemon lifecycle management

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeZone};

use super::daemonize::daemonize;
use super::registry::{Liveness, ProcessRegistry};
use crate::error::{Result, VigilError};

/// Interval between liveness checks while waiting for the daemon to exit
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Time to wait for a graceful exit before escalating to SIGKILL
const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Long-running body of a daemon.
///
/// `run` is called in the daemonized process after detachment and is
/// expected to contain its own work loop; in normal operation it never
/// returns. If it does return, the PID record is removed and the process
/// exits with its result.
pub trait Service {
    fn run(&mut self) -> Result<()>;
}

impl<F> Service for F
where
    F: FnMut() -> Result<()>,
{
    fn run(&mut self) -> Result<()> {
        self()
    }
}

/// Outcome of a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// A running daemon was terminated and its PID record removed
    Stopped(u32),
    /// Nothing was running; treated as success so `restart` stays idempotent
    NotRunning,
}

/// Controls the daemon lifecycle: start, stop, restart, status
pub struct DaemonManager {
    registry: ProcessRegistry,
    stop_timeout: Duration,
}

impl DaemonManager {
    /// Create a manager with the default PID file
    pub fn new() -> Self {
        Self::with_registry(ProcessRegistry::new())
    }

    /// Create a manager over a specific registry
    pub fn with_registry(registry: ProcessRegistry) -> Self {
        Self {
            registry,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    /// Change how long `stop` waits for a graceful exit before SIGKILL
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Check if the daemon is currently running
    pub fn is_running(&self) -> bool {
        self.registry.is_running()
    }

    /// Get the PID of the running daemon, if any
    pub fn pid(&self) -> Option<u32> {
        match self.registry.status() {
            Liveness::Running(pid) => Some(pid),
            _ => None,
        }
    }

    /// Detach from the terminal and hand control to the service.
    ///
    /// Refuses to start while a matching daemon is alive. A stale PID
    /// record (dead process, or a recycled PID now owned by some other
    /// program) is cleared and startup proceeds. Only returns if the
    /// service's `run` returns; the calling process otherwise lives on as
    /// the daemon until it is signalled.
    pub fn start<S: Service>(&self, mut service: S) -> Result<()> {
        match self.registry.status() {
            Liveness::Running(pid) => return Err(VigilError::AlreadyRunning(pid)),
            Liveness::Stale(pid) => {
                tracing::warn!(pid, "clearing stale PID record");
                self.registry.clear()?;
            }
            Liveness::NotRunning => {}
        }

        daemonize()?;
        self.registry.record()?;

        // Remove the PID record when the daemon is told to terminate;
        // normal return below does the same
        let registry = self.registry.clone();
        ctrlc::set_handler(move || {
            let _ = registry.clear();
            std::process::exit(0);
        })
        .ok();

        let result = service.run();
        self.registry.clear()?;
        result
    }

    /// Terminate the running daemon and remove its PID record.
    ///
    /// Sends SIGTERM once, then polls for exit every 100ms. After the
    /// configured timeout the daemon is killed outright. A missing or
    /// stale record is not an error; the record is cleared and
    /// [`StopOutcome::NotRunning`] is returned so `restart` can proceed.
    #[cfg(unix)]
    pub fn stop(&self) -> Result<StopOutcome> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let pid = match self.registry.status() {
            Liveness::NotRunning => return Ok(StopOutcome::NotRunning),
            Liveness::Stale(pid) => {
                tracing::warn!(pid, "PID record is stale, nothing to stop");
                self.registry.clear()?;
                return Ok(StopOutcome::NotRunning);
            }
            Liveness::Running(pid) => pid,
        };

        tracing::debug!(pid, "sending SIGTERM");
        let target = Pid::from_raw(pid as i32);
        match kill(target, Signal::SIGTERM) {
            // ESRCH means the process exited between the check and the signal
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => return Err(VigilError::Signal(pid, e.to_string())),
        }

        let deadline = Instant::now() + self.stop_timeout;
        while self.registry.process_alive(pid) {
            if Instant::now() >= deadline {
                tracing::info!(pid, "daemon did not exit in time, sending SIGKILL");
                match kill(target, Signal::SIGKILL) {
                    Ok(()) | Err(Errno::ESRCH) => {}
                    Err(e) => return Err(VigilError::Signal(pid, e.to_string())),
                }

                let grace = Instant::now() + Duration::from_secs(1);
                loop {
                    if !self.registry.process_alive(pid) {
                        break;
                    }
                    if Instant::now() >= grace {
                        return Err(VigilError::StopTimeout(pid));
                    }
                    std::thread::sleep(STOP_POLL_INTERVAL);
                }
                break;
            }
            std::thread::sleep(STOP_POLL_INTERVAL);
        }

        self.registry.clear()?;
        Ok(StopOutcome::Stopped(pid))
    }

    #[cfg(not(unix))]
    pub fn stop(&self) -> Result<StopOutcome> {
        Err(VigilError::Unsupported)
    }

    /// Stop the daemon if running, then start it again
    pub fn restart<S: Service>(&self, service: S) -> Result<()> {
        self.stop()?;
        self.start(service)
    }

    /// Get daemon status information
    pub fn status(&self) -> DaemonStatus {
        match self.registry.status() {
            Liveness::Running(pid) => DaemonStatus {
                running: true,
                pid: Some(pid),
                pid_file: self.registry.path().to_path_buf(),
                started_at: self
                    .registry
                    .start_time(pid)
                    .and_then(|secs| Local.timestamp_opt(secs as i64, 0).single()),
            },
            _ => DaemonStatus {
                running: false,
                pid: None,
                pid_file: self.registry.path().to_path_buf(),
                started_at: None,
            },
        }
    }

    /// Access the underlying registry
    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }
}

impl Default for DaemonManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Daemon status information
#[derive(Debug, Clone)]
pub struct DaemonStatus {
    pub running: bool,
    pub pid: Option<u32>,
    pub pid_file: PathBuf,
    pub started_at: Option<DateTime<Local>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    struct NoopService;

    impl Service for NoopService {
        fn run(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_not_running_on_clean_system() {
        let dir = tempdir().unwrap();
        let registry = ProcessRegistry::with_path(dir.path().join("vigil.pid"));
        let manager = DaemonManager::with_registry(registry);

        assert!(!manager.is_running());
        assert!(manager.pid().is_none());

        let status = manager.status();
        assert!(!status.running);
        assert!(status.pid.is_none());
        assert!(status.started_at.is_none());
    }

    #[test]
    fn test_start_refuses_when_already_running() {
        let dir = tempdir().unwrap();
        let registry = ProcessRegistry::with_path(dir.path().join("vigil.pid"));
        let manager = DaemonManager::with_registry(registry);

        // Record this process as the running daemon
        manager.registry().record().unwrap();
        assert!(manager.is_running());

        let before = fs::read_to_string(manager.registry().path()).unwrap();
        let result = manager.start(NoopService);
        match result {
            Err(VigilError::AlreadyRunning(pid)) => assert_eq!(pid, std::process::id()),
            other => panic!("expected AlreadyRunning, got {:?}", other),
        }

        // The existing record is untouched
        let after = fs::read_to_string(manager.registry().path()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_stop_without_record_is_a_noop() {
        let dir = tempdir().unwrap();
        let registry = ProcessRegistry::with_path(dir.path().join("vigil.pid"));
        let manager = DaemonManager::with_registry(registry);

        assert_eq!(manager.stop().unwrap(), StopOutcome::NotRunning);
        // Stopping twice behaves the same
        assert_eq!(manager.stop().unwrap(), StopOutcome::NotRunning);
    }

    #[test]
    fn test_stop_with_malformed_record_is_a_noop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vigil.pid");
        fs::write(&path, "not-a-pid\n").unwrap();

        let manager = DaemonManager::with_registry(ProcessRegistry::with_path(&path));
        assert_eq!(manager.stop().unwrap(), StopOutcome::NotRunning);
    }

    #[test]
    fn test_stop_clears_stale_record_of_dead_process() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vigil.pid");

        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();

        fs::write(&path, format!("{}\n", pid)).unwrap();

        let manager = DaemonManager::with_registry(ProcessRegistry::with_path(&path));
        assert_eq!(manager.stop().unwrap(), StopOutcome::NotRunning);
        assert!(!path.exists());
    }

    #[test]
    fn test_status_reports_running_daemon() {
        let dir = tempdir().unwrap();
        let registry = ProcessRegistry::with_path(dir.path().join("vigil.pid"));
        let manager = DaemonManager::with_registry(registry);

        manager.registry().record().unwrap();

        let status = manager.status();
        assert!(status.running);
        assert_eq!(status.pid, Some(std::process::id()));
        assert!(status.started_at.is_some());

        manager.registry().clear().unwrap();
    }
}
