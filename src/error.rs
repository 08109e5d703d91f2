use std::path::PathBuf;
use thiserror::Error;

/// Main error type for serverctl
#[derive(Debug, Error)]
pub enum ServerCtlError {
    // Lifecycle outcomes
    #[error("{0} process is already running.")]
    AlreadyRunning(String),

    #[error("no {0} process running.")]
    NotRunning(String),

    #[error("Unable to stop the {name} process (PID {pid}) within {secs}s")]
    StopTimeout { name: String, pid: i32, secs: u64 },

    #[error("{name} process (PID {pid}) exited while reloading")]
    ReloadFailed { name: String, pid: i32 },

    // Invocation errors
    #[error("Invalid argument action:{0}, Expected start|stop|restart|reload|status .")]
    InvalidAction(String),

    #[error("Unknown server '{name}'. Configured servers: {known}")]
    UnknownServer { name: String, known: String },

    #[error("Another serverctl invocation holds the lock {}", .0.display())]
    LockHeld(PathBuf),

    // Launch errors
    #[error("Failed to spawn server: {0}")]
    SpawnError(String),

    #[error("Server {0} exited with {1}")]
    ServerExited(String, String),

    #[error("Signal error: {0}")]
    SignalError(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Missing required configuration field: {0}")]
    MissingConfigField(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for serverctl operations
pub type Result<T> = std::result::Result<T, ServerCtlError>;
