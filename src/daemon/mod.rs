// Daemon module - terminal detachment and lifecycle control

pub mod daemonize;
pub mod lifecycle;
pub mod registry;

pub use daemonize::daemonize;
pub use lifecycle::{DaemonManager, DaemonStatus, Service, StopOutcome};
pub use registry::{Liveness, ProcessRegistry};
