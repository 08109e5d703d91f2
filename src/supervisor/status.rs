// Read-only status snapshot of a managed server

use chrono::{DateTime, Local};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Derived server state; never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Running,
    Stopped,
    /// PID file names a process that no longer exists
    StalePidFile,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerState::Running => write!(f, "running"),
            ServerState::Stopped => write!(f, "stopped"),
            ServerState::StalePidFile => write!(f, "stopped (stale pid file)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerStatus {
    pub name: String,
    pub description: String,
    pub state: ServerState,
    pub pid: Option<i32>,
    pub pid_file: PathBuf,
    pub memory: Option<u64>,
    pub uptime: Option<Duration>,
    pub started_at: Option<DateTime<Local>>,
}

/// Resource figures for a live process
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProcessMetrics {
    pub memory: u64,
    pub uptime: Duration,
    pub started_at: Option<DateTime<Local>>,
}

/// Look up memory and timing for `pid`; `None` if sysinfo cannot see it
pub(crate) fn collect_metrics(pid: i32) -> Option<ProcessMetrics> {
    if pid <= 0 {
        return None;
    }

    let sys_pid = Pid::from_u32(pid as u32);
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[sys_pid]),
        true,
        ProcessRefreshKind::new().with_memory(),
    );

    system.process(sys_pid).map(|process| ProcessMetrics {
        memory: process.memory(),
        uptime: Duration::from_secs(process.run_time()),
        started_at: DateTime::from_timestamp(process.start_time() as i64, 0)
            .map(|utc| utc.with_timezone(&Local)),
    })
}
