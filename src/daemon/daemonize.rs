// Daemonization support for Unix systems

use crate::error::{Result, VigilError};

/// Detach the calling process from its controlling terminal using the
/// classic double-fork sequence.
///
/// On return the process is reparented to init, leads its own session,
/// runs from the filesystem root with an unrestricted umask, and has its
/// standard streams pointed at `/dev/null`. The original parent and the
/// intermediate child both exit with status 0.
#[cfg(unix)]
pub fn daemonize() -> Result<()> {
    use nix::sys::stat::{umask, Mode};
    use nix::unistd::{fork, setsid, ForkResult};
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::os::unix::io::AsRawFd;

    // First fork
    match unsafe { fork() } {
        Ok(ForkResult::Parent { .. }) => {
            // Original caller exits; the shell gets its prompt back
            std::process::exit(0);
        }
        Ok(ForkResult::Child) => {}
        Err(e) => {
            return Err(VigilError::Fork(format!("first fork failed: {}", e)));
        }
    }

    // Decouple from the parent environment: run from the filesystem root,
    // lead a new session with no controlling terminal, clear the umask
    std::env::set_current_dir("/")
        .map_err(|e| VigilError::Detach(format!("failed to change directory to /: {}", e)))?;
    setsid().map_err(|e| VigilError::Detach(format!("setsid failed: {}", e)))?;
    umask(Mode::empty());

    // Second fork so the surviving process is no longer a session leader
    // and can never reacquire a controlling terminal
    match unsafe { fork() } {
        Ok(ForkResult::Parent { .. }) => {
            std::process::exit(0);
        }
        Ok(ForkResult::Child) => {}
        Err(e) => {
            return Err(VigilError::Fork(format!("second fork failed: {}", e)));
        }
    }

    // Flush anything still buffered before the streams go dark
    std::io::stdout().flush().ok();
    std::io::stderr().flush().ok();

    let devnull = OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .map_err(|e| VigilError::Detach(format!("failed to open /dev/null: {}", e)))?;

    let devnull_fd = devnull.as_raw_fd();

    // Duplicate /dev/null over the standard descriptors; the originals are
    // overwritten, not closed
    use nix::libc;
    unsafe {
        libc::dup2(devnull_fd, libc::STDIN_FILENO);
        libc::dup2(devnull_fd, libc::STDOUT_FILENO);
        libc::dup2(devnull_fd, libc::STDERR_FILENO);
    }

    Ok(())
}

#[cfg(not(unix))]
pub fn daemonize() -> Result<()> {
    Err(VigilError::Unsupported)
}
