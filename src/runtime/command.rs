use super::hot_reload::HotReloadTimer;
use super::ServerRuntime;
use crate::config::{LaunchOptions, ServerConfig};
use crate::error::{Result, ServerCtlError};
use crate::supervisor::pid::PidFile;
use crate::supervisor::probe::{ProcessProbe, SystemProbe};
use crate::supervisor::SignalKind;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Runs the configured server executable in the foreground
///
/// The child inherits stdio. SIGINT/SIGTERM received while serving are
/// forwarded to the child as the configured stop signal, so the server goes
/// down together with its controller.
pub struct CommandRuntime {
    name: String,
    options: LaunchOptions,
    pid_file: PidFile,
    stop_signal: SignalKind,
    reload_every: Option<Duration>,
    reloader: Reloader,
}

/// Sends the reload signal to the current child
///
/// Shared by `ServerRuntime::reload` and the hot-reload timer task.
#[derive(Debug, Clone)]
struct Reloader {
    // 0 while nothing is running
    child_pid: Arc<AtomicI32>,
    signal: SignalKind,
}

impl Reloader {
    fn reload(&self) -> Result<()> {
        signal_child(&self.child_pid, self.signal)
    }
}

impl CommandRuntime {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            name: config.name.clone(),
            options: config.server.clone(),
            pid_file: PidFile::new(&config.pid_file),
            stop_signal: config.stop_signal,
            reload_every: None,
            reloader: Reloader {
                child_pid: Arc::new(AtomicI32::new(0)),
                signal: config.reload_signal,
            },
        }
    }

    /// PID of the running child, if any
    pub fn child_pid(&self) -> Option<i32> {
        match self.reloader.child_pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    fn spawn(&self) -> Result<Child> {
        let mut command = Command::new(&self.options.command);
        command.args(&self.options.args);

        if let Some(ref cwd) = self.options.cwd {
            command.current_dir(cwd);
        }

        for (key, value) in &self.options.env {
            command.env(key, value);
        }

        command
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        command.spawn().map_err(|e| {
            ServerCtlError::SpawnError(format!(
                "Failed to spawn '{}' ({}): {}",
                self.name,
                self.options.command.display(),
                e
            ))
        })
    }

    async fn serve(&self) -> Result<ExitStatus> {
        let mut child = self.spawn()?;
        let pid = child.id().ok_or_else(|| {
            ServerCtlError::SpawnError(format!("Failed to get PID for '{}'", self.name))
        })?;
        let pid = pid as i32;

        self.reloader.child_pid.store(pid, Ordering::SeqCst);
        info!(server = %self.name, pid, "server launched");

        if self.options.write_pid_file {
            if let Err(e) = self.pid_file.write_pid(pid as u32) {
                let _ = SystemProbe.signal(pid, SignalKind::Kill);
                let _ = child.wait().await;
                return Err(e);
            }
        }

        let _timer = self.reload_every.map(|every| {
            info!(server = %self.name, ?every, "hot reload enabled");
            let reloader = self.reloader.clone();
            HotReloadTimer::start(every, move || reloader.reload())
        });

        let mut shutdown = ShutdownSignals::install()?;
        let status = loop {
            tokio::select! {
                status = child.wait() => break status?,
                received = shutdown.recv() => {
                    info!(server = %self.name, %received, signal = %self.stop_signal, "forwarding shutdown");
                    if let Err(e) = signal_child(&self.reloader.child_pid, self.stop_signal) {
                        warn!("{}", e);
                    }
                }
            }
        };

        self.reloader.child_pid.store(0, Ordering::SeqCst);

        // Only clean up a PID file we wrote and that still names our child
        if self.options.write_pid_file && self.pid_file.read_pid() == pid {
            self.pid_file.remove()?;
        }

        Ok(status)
    }

    fn check_exit(&self, status: ExitStatus) -> Result<()> {
        if status.success() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            let stopped_by = [self.stop_signal, SignalKind::Interrupt];
            if stopped_by
                .iter()
                .any(|kind| status.signal() == Some(kind.to_nix() as i32))
            {
                debug!(server = %self.name, %status, "server stopped by signal");
                return Ok(());
            }
        }

        Err(ServerCtlError::ServerExited(
            self.name.clone(),
            status.to_string(),
        ))
    }
}

impl ServerRuntime for CommandRuntime {
    fn schedule_reload(&mut self, every: Duration) {
        self.reload_every = Some(every);
    }

    fn run(&mut self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let status = runtime.block_on(self.serve())?;
        info!(server = %self.name, %status, "server exited");
        self.check_exit(status)
    }

    fn reload(&self) -> Result<()> {
        self.reloader.reload()
    }
}

fn signal_child(child_pid: &AtomicI32, signal: SignalKind) -> Result<()> {
    let pid = child_pid.load(Ordering::SeqCst);
    if pid == 0 {
        return Err(ServerCtlError::SignalError(format!(
            "cannot send {}: server is not running",
            signal
        )));
    }

    if SystemProbe.signal(pid, signal) {
        debug!(pid, %signal, "signal sent to server");
        Ok(())
    } else {
        Err(ServerCtlError::SignalError(format!(
            "failed to send {} to PID {}",
            signal, pid
        )))
    }
}

/// Termination requests addressed to the controlling process
struct ShutdownSignals {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    fn install() -> Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal as unix_signal, SignalKind as UnixSignalKind};
            Ok(Self {
                terminate: unix_signal(UnixSignalKind::terminate())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Resolves with the name of the received signal
    async fn recv(&mut self) -> &'static str {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.terminate.recv() => "SIGTERM",
                _ = tokio::signal::ctrl_c() => "SIGINT",
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            "SIGINT"
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn shell_config(dir: &TempDir, script: &str) -> ServerConfig {
        let mut config = ServerConfig::new("test-server", dir.path().join("server.pid"), "/bin/sh");
        config.server.args = vec!["-c".to_string(), script.to_string()];
        config
    }

    #[test]
    fn test_run_blocks_until_exit() {
        let dir = TempDir::new().unwrap();
        let config = shell_config(&dir, "sleep 0.3");
        let mut runtime = CommandRuntime::new(&config);

        let start = std::time::Instant::now();
        runtime.run().unwrap();

        assert!(start.elapsed() >= Duration::from_millis(300));
        assert!(runtime.child_pid().is_none());
    }

    #[test]
    fn test_run_reports_non_zero_exit() {
        let dir = TempDir::new().unwrap();
        let mut runtime = CommandRuntime::new(&shell_config(&dir, "exit 3"));

        match runtime.run() {
            Err(ServerCtlError::ServerExited(name, status)) => {
                assert_eq!(name, "test-server");
                assert!(status.contains('3'));
            }
            other => panic!("Expected ServerExited, got {:?}", other),
        }
    }

    #[test]
    fn test_run_missing_executable() {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig::new(
            "ghost",
            dir.path().join("ghost.pid"),
            "/nonexistent/server",
        );
        let mut runtime = CommandRuntime::new(&config);

        assert!(matches!(runtime.run(), Err(ServerCtlError::SpawnError(_))));
    }

    #[test]
    fn test_run_applies_cwd_and_env() {
        let dir = TempDir::new().unwrap();
        let mut config = shell_config(&dir, "echo \"$GREETING\" > out.txt");
        config.server.cwd = Some(dir.path().to_path_buf());
        config
            .server
            .env
            .insert("GREETING".to_string(), "hello".to_string());

        CommandRuntime::new(&config).run().unwrap();

        let out = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_written_pid_file_names_child_and_is_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let seen = dir.path().join("seen.txt");
        let pid_file = dir.path().join("server.pid");

        // The runtime writes the PID file right after spawning; give it a moment
        let script = format!(
            "sleep 0.2; echo $(cat {}) > {}; echo $$ >> {}",
            pid_file.display(),
            seen.display(),
            seen.display()
        );
        let mut config = shell_config(&dir, &script);
        config.server.write_pid_file = true;

        CommandRuntime::new(&config).run().unwrap();

        let seen = std::fs::read_to_string(&seen).unwrap();
        let lines: Vec<&str> = seen.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], lines[1]);
        assert!(!pid_file.exists());
    }

    #[test]
    fn test_scheduled_reload_signals_child() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("reloads.log");
        let script = format!(
            "trap 'echo reload >> {}' USR1; i=0; while [ $i -lt 10 ]; do sleep 0.1 & wait $!; i=$((i+1)); done",
            log.display()
        );

        let mut runtime = CommandRuntime::new(&shell_config(&dir, &script));
        runtime.schedule_reload(Duration::from_millis(250));
        runtime.run().unwrap();

        let reloads = std::fs::read_to_string(&log).unwrap_or_default();
        assert!(reloads.lines().count() >= 2, "reload log: {:?}", reloads);
    }

    #[test]
    fn test_reload_without_child_fails() {
        let dir = TempDir::new().unwrap();
        let runtime = CommandRuntime::new(&shell_config(&dir, "true"));

        assert!(matches!(
            runtime.reload(),
            Err(ServerCtlError::SignalError(_))
        ));
    }

    #[test]
    fn test_reload_signals_current_child() {
        use std::os::unix::process::ExitStatusExt;

        let dir = TempDir::new().unwrap();
        let mut config = shell_config(&dir, "true");
        config.reload_signal = SignalKind::Terminate;
        let runtime = CommandRuntime::new(&config);

        let mut child = std::process::Command::new("sleep").arg("5").spawn().unwrap();
        runtime
            .reloader
            .child_pid
            .store(child.id() as i32, Ordering::SeqCst);

        runtime.reload().unwrap();

        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(SignalKind::Terminate.to_nix() as i32));
    }
}
