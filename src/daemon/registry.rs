// PID file registry with process-identity validation

use std::fs;
use std::path::{Path, PathBuf};

use sysinfo::{ProcessStatus, ProcessesToUpdate, System};

use crate::error::{Result, VigilError};

/// Default PID file location
const DEFAULT_PID_FILE: &str = "/tmp/vigil.pid";

/// Observed state of the process named by the PID record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// No record, or a record whose content is not a usable PID
    NotRunning,
    /// The recorded PID is dead, a zombie, or belongs to some other program
    Stale(u32),
    /// The recorded PID is alive and matches the expected daemon identity
    Running(u32),
}

/// Reads and writes the PID file and answers "is the daemon running?".
///
/// A bare PID on disk is not trusted: the registry also checks that the
/// process is alive and that its name matches the expected daemon binary,
/// so a recycled PID is reported as [`Liveness::Stale`] instead of being
/// signalled.
#[derive(Debug, Clone)]
pub struct ProcessRegistry {
    path: PathBuf,
    process_name: Option<String>,
}

impl ProcessRegistry {
    /// Create a registry at the default PID file path
    pub fn new() -> Self {
        Self::with_path(DEFAULT_PID_FILE)
    }

    /// Create a registry for a custom PID file path. The expected process
    /// name is taken from the current executable.
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        let process_name = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.file_name().map(|n| n.to_string_lossy().into_owned()));

        Self {
            path: path.as_ref().to_path_buf(),
            process_name,
        }
    }

    /// Override the process name used for identity matching
    pub fn with_process_name<S: Into<String>>(mut self, name: S) -> Self {
        self.process_name = Some(name.into());
        self
    }

    /// Record the current process in the PID file, creating or truncating it.
    /// The record is the decimal PID followed by a single newline.
    pub fn record(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| VigilError::PidFile(format!("failed to create {}: {}", parent.display(), e)))?;
            }
        }

        let pid = std::process::id();
        fs::write(&self.path, format!("{}\n", pid))
            .map_err(|e| VigilError::PidFile(format!("failed to write {}: {}", self.path.display(), e)))
    }

    /// Read the recorded PID. Missing, unreadable, empty, or non-integer
    /// records all yield `None`; a malformed record means "not running",
    /// never an error.
    pub fn current(&self) -> Option<u32> {
        let content = fs::read_to_string(&self.path).ok()?;
        let pid = content.trim().parse::<u32>().ok()?;
        if pid == 0 {
            return None;
        }
        Some(pid)
    }

    /// Classify the recorded PID at this instant
    pub fn status(&self) -> Liveness {
        let Some(pid) = self.current() else {
            return Liveness::NotRunning;
        };

        if !process_exists(pid) {
            return Liveness::Stale(pid);
        }

        match inspect(pid) {
            Some(info) if info.zombie => Liveness::Stale(pid),
            Some(info) if self.name_matches(&info.name) => Liveness::Running(pid),
            _ => Liveness::Stale(pid),
        }
    }

    /// Whether the recorded process is alive and matches the daemon identity
    pub fn is_running(&self) -> bool {
        matches!(self.status(), Liveness::Running(_))
    }

    /// Whether the given process is still alive. A zombie counts as exited:
    /// it can do no work and no signal will make it go away.
    pub fn process_alive(&self, pid: u32) -> bool {
        if !process_exists(pid) {
            return false;
        }
        match inspect(pid) {
            Some(info) => !info.zombie,
            None => false,
        }
    }

    /// Unix start time of the given process, in seconds since the epoch
    pub fn start_time(&self, pid: u32) -> Option<u64> {
        inspect(pid).map(|info| info.start_time)
    }

    /// Remove the PID file if present
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| VigilError::PidFile(format!("failed to remove {}: {}", self.path.display(), e)))?;
        }
        Ok(())
    }

    /// Check if the PID file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Get the path to the PID file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn name_matches(&self, observed: &str) -> bool {
        let Some(expected) = &self.process_name else {
            // No identity configured; fall back to plain liveness
            return true;
        };

        // The kernel reports comm, which truncates long names to 15 bytes
        observed == expected.as_str() || (observed.len() >= 15 && expected.starts_with(observed))
    }
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

struct ProcessInfo {
    name: String,
    zombie: bool,
    start_time: u64,
}

fn inspect(pid: u32) -> Option<ProcessInfo> {
    let target = sysinfo::Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);

    let process = system.process(target)?;
    Some(ProcessInfo {
        name: process.name().to_string_lossy().into_owned(),
        zombie: matches!(process.status(), ProcessStatus::Zombie),
        start_time: process.start_time(),
    })
}

/// Check whether a process with the given PID exists at all
#[cfg(unix)]
fn process_exists(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Signal 0 probes for existence without delivering anything
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(_) => true,
        Err(Errno::ESRCH) => false,
        Err(Errno::EPERM) => true, // exists, owned by somebody else
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn process_exists(pid: u32) -> bool {
    inspect(pid).is_some()
}
