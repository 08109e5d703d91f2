// Supervisor module - PID-file driven lifecycle control of one server

pub mod lock;
pub mod manager;
pub mod pid;
pub mod probe;
pub mod signal;
pub mod status;

pub use lock::InvocationLock;
pub use manager::{Action, ProcessSupervisor};
pub use pid::PidFile;
pub use probe::{is_running, kill_and_wait, ProcessProbe, SystemProbe};
pub use signal::SignalKind;
pub use status::{ServerState, ServerStatus};
