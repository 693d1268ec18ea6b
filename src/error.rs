use thiserror::Error;

/// Main error type for the vigil daemon toolkit
#[derive(Debug, Error)]
pub enum VigilError {
    #[error("daemon already running with PID {0}")]
    AlreadyRunning(u32),

    #[error("fork failed: {0}")]
    Fork(String),

    #[error("failed to detach from terminal: {0}")]
    Detach(String),

    #[error("PID file error: {0}")]
    PidFile(String),

    #[error("failed to signal PID {0}: {1}")]
    Signal(u32, String),

    #[error("daemon with PID {0} did not exit, even after SIGKILL")]
    StopTimeout(u32),

    #[error("daemonization is not supported on this platform")]
    Unsupported,

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for vigil operations
pub type Result<T> = std::result::Result<T, VigilError>;
