// Lifecycle state machine: start, stop, restart, reload

use super::lock::InvocationLock;
use super::pid::PidFile;
use super::probe::{kill_and_wait, ProcessProbe, SystemProbe};
use super::status::{collect_metrics, ServerState, ServerStatus};
use crate::cli::output;
use crate::config::ServerConfig;
use crate::error::{Result, ServerCtlError};
use crate::runtime::{CommandRuntime, ServerRuntime};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// CLI action for one server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    Start,
    Stop,
    Restart,
    Reload,
    Status,
}

impl FromStr for Action {
    type Err = ServerCtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "start" => Ok(Action::Start),
            "stop" => Ok(Action::Stop),
            "restart" => Ok(Action::Restart),
            "reload" => Ok(Action::Reload),
            "status" => Ok(Action::Status),
            other => Err(ServerCtlError::InvalidAction(other.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Restart => "restart",
            Action::Reload => "reload",
            Action::Status => "status",
        };
        f.write_str(name)
    }
}

/// Supervises one server through its PID file
///
/// Holds no liveness state: every operation re-reads the PID file and
/// probes the process again.
pub struct ProcessSupervisor {
    config: ServerConfig,
    pid_file: PidFile,
    runtime: Box<dyn ServerRuntime>,
    probe: Box<dyn ProcessProbe>,
}

impl ProcessSupervisor {
    /// Supervisor for `config` backed by the real process table and a
    /// `CommandRuntime`
    pub fn for_server(config: ServerConfig) -> Self {
        let runtime = CommandRuntime::new(&config);
        Self::with_parts(config, Box::new(runtime), Box::new(SystemProbe))
    }

    pub fn with_parts(
        config: ServerConfig,
        runtime: Box<dyn ServerRuntime>,
        probe: Box<dyn ProcessProbe>,
    ) -> Self {
        let pid_file = PidFile::new(&config.pid_file);
        Self {
            config,
            pid_file,
            runtime,
            probe,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn pid_file(&self) -> &PidFile {
        &self.pid_file
    }

    pub fn read_pid(&self) -> i32 {
        self.pid_file.read_pid()
    }

    pub fn is_running(&self) -> bool {
        self.probe.is_running(self.read_pid())
    }

    /// Run `action`
    pub fn dispatch(&mut self, action: Action) -> Result<()> {
        debug!(server = %self.config.name, %action, "dispatching");
        match action {
            Action::Start => self.start(),
            Action::Stop => self.stop(),
            Action::Restart => self.restart(),
            Action::Reload => self.reload(),
            Action::Status => {
                output::print_status(&self.status());
                Ok(())
            }
        }
    }

    /// Launch the server in the foreground
    ///
    /// Blocks until the server exits. Fails with `AlreadyRunning`, without
    /// side effects, when the PID file names a live process.
    pub fn start(&mut self) -> Result<()> {
        let lock = self.lock()?;
        self.start_locked(lock)
    }

    /// Send the stop signal and wait up to `stop_timeout_secs`
    ///
    /// The PID file is removed only once the process is confirmed gone.
    pub fn stop(&self) -> Result<()> {
        let _lock = self.lock()?;
        self.stop_locked()
    }

    /// Send the reload signal; succeeds when the process is still alive
    /// right after delivery
    pub fn reload(&self) -> Result<()> {
        let _lock = self.lock()?;

        let pid = self.read_pid();
        if !self.probe.is_running(pid) {
            return Err(ServerCtlError::NotRunning(self.config.name.clone()));
        }

        output::print_info(&format!("Reloading {}...", self.config.name));
        info!(server = %self.config.name, pid, signal = %self.config.reload_signal, "reloading");

        let still_running = kill_and_wait(
            &*self.probe,
            pid,
            self.config.reload_signal,
            Duration::ZERO,
        );

        if !still_running {
            output::print_outcome(false);
            return Err(ServerCtlError::ReloadFailed {
                name: self.config.name.clone(),
                pid,
            });
        }

        output::print_outcome(true);
        Ok(())
    }

    /// Stop if running, then start
    ///
    /// A failed stop is reported and the start is still attempted; start
    /// re-checks liveness, so a process that refused to die surfaces as
    /// `AlreadyRunning` instead of a second instance.
    pub fn restart(&mut self) -> Result<()> {
        let lock = self.lock()?;

        if self.is_running() {
            if let Err(e) = self.stop_locked() {
                warn!(server = %self.config.name, "stop during restart failed: {}", e);
                output::print_error(&e.to_string());
            }
        }

        self.start_locked(lock)
    }

    /// Snapshot of the server's derived state
    pub fn status(&self) -> ServerStatus {
        let pid = self.read_pid();
        let running = self.probe.is_running(pid);

        let state = match (running, pid) {
            (true, _) => ServerState::Running,
            (false, 0) => ServerState::Stopped,
            (false, _) => ServerState::StalePidFile,
        };
        let metrics = if running { collect_metrics(pid) } else { None };

        ServerStatus {
            name: self.config.name.clone(),
            description: self.config.description.clone(),
            state,
            pid: (pid > 0).then_some(pid),
            pid_file: self.pid_file.path().to_path_buf(),
            memory: metrics.map(|m| m.memory),
            uptime: metrics.map(|m| m.uptime),
            started_at: metrics.and_then(|m| m.started_at),
        }
    }

    fn start_locked(&mut self, lock: Option<InvocationLock>) -> Result<()> {
        let pid = self.read_pid();
        if self.probe.is_running(pid) {
            return Err(ServerCtlError::AlreadyRunning(self.config.name.clone()));
        }

        output::print_info(&format!("Starting {}...", self.config.name));

        if let Some(every) = self.config.auto_reload.interval() {
            debug!(server = %self.config.name, ?every, "scheduling hot reload");
            self.runtime.schedule_reload(every);
        }

        // Serving may last forever; don't keep other invocations out
        drop(lock);

        info!(server = %self.config.name, "handing over to server runtime");
        self.runtime.run()
    }

    fn stop_locked(&self) -> Result<()> {
        let pid = self.read_pid();
        if !self.probe.is_running(pid) {
            return Err(ServerCtlError::NotRunning(self.config.name.clone()));
        }

        output::print_info(&format!("Stopping {}...", self.config.name));
        info!(server = %self.config.name, pid, signal = %self.config.stop_signal, "stopping");

        let wait = self.config.stop_timeout();
        let spinner = output::create_progress_bar(&format!(
            "Waiting up to {}s for PID {} to exit",
            wait.as_secs(),
            pid
        ));
        let still_running =
            kill_and_wait(&*self.probe, pid, self.config.stop_signal, wait);
        spinner.finish_and_clear();

        if still_running {
            output::print_outcome(false);
            return Err(ServerCtlError::StopTimeout {
                name: self.config.name.clone(),
                pid,
                secs: wait.as_secs(),
            });
        }

        self.pid_file.remove()?;
        output::print_outcome(true);
        Ok(())
    }

    fn lock(&self) -> Result<Option<InvocationLock>> {
        if self.config.lock {
            InvocationLock::acquire(self.config.lock_path()).map(Some)
        } else {
            Ok(None)
        }
    }
}
