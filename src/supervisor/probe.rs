// Liveness probing and signal delivery

use super::signal::SignalKind;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Granularity of the bounded wait in `kill_and_wait`
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// OS-facing operations the supervisor needs
///
/// Implementations swallow every platform error: a failed probe means "not
/// running" and a failed delivery is only reported through the return value.
pub trait ProcessProbe {
    /// Send `signal` to `pid`, returning whether it was delivered
    fn signal(&self, pid: i32, signal: SignalKind) -> bool;

    /// Whether `pid` names a live process we may signal
    fn is_running(&self, pid: i32) -> bool;
}

/// Probe backed by the real process table
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl ProcessProbe for SystemProbe {
    #[cfg(unix)]
    fn signal(&self, pid: i32, signal: SignalKind) -> bool {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        // 0 and negative pids address process groups
        if pid <= 0 {
            return false;
        }

        match kill(Pid::from_raw(pid), signal.to_nix()) {
            Ok(()) => true,
            Err(e) => {
                debug!(pid, %signal, error = %e, "signal delivery failed");
                false
            }
        }
    }

    #[cfg(not(unix))]
    fn signal(&self, pid: i32, signal: SignalKind) -> bool {
        debug!(pid, %signal, "signals are not supported on this platform");
        false
    }

    fn is_running(&self, pid: i32) -> bool {
        is_running(pid)
    }
}

/// Signal-0 existence check; `false` for non-positive pids and on any error
pub fn is_running(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    probe_alive(pid)
}

#[cfg(unix)]
fn probe_alive(pid: i32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // EPERM counts as not running: we could not signal it anyway
    kill(Pid::from_raw(pid), None::<Signal>).is_ok()
}

#[cfg(not(unix))]
fn probe_alive(pid: i32) -> bool {
    use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

    let sys_pid = Pid::from_u32(pid as u32);
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[sys_pid]),
        true,
        ProcessRefreshKind::new(),
    );
    system.process(sys_pid).is_some()
}

/// Send `signal` and wait up to `wait` for the process to disappear
///
/// Returns `true` when the process is still running afterwards. A zero
/// `wait` performs exactly one liveness check and never sleeps.
pub fn kill_and_wait<P>(probe: &P, pid: i32, signal: SignalKind, wait: Duration) -> bool
where
    P: ProcessProbe + ?Sized,
{
    probe.signal(pid, signal);

    if !wait.is_zero() {
        // None when the wait runs past what Instant can represent
        let deadline = Instant::now().checked_add(wait);

        loop {
            if !probe.is_running(pid) {
                debug!(pid, %signal, "process gone");
                break;
            }

            let now = Instant::now();
            let pause = match deadline {
                Some(deadline) if now >= deadline => {
                    debug!(pid, %signal, ?wait, "process still running after wait");
                    break;
                }
                Some(deadline) => POLL_INTERVAL.min(deadline - now),
                None => POLL_INTERVAL,
            };
            thread::sleep(pause);
        }
    }

    probe.is_running(pid)
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedProbe;
    use super::*;

    #[test]
    fn test_is_running_rejects_invalid_pids() {
        assert!(!is_running(0));
        assert!(!is_running(-1));
        assert!(!is_running(i32::MIN));
    }

    #[test]
    fn test_is_running_current_process() {
        assert!(is_running(std::process::id() as i32));
    }

    #[test]
    fn test_zero_wait_checks_once_without_sleeping() {
        let probe = ScriptedProbe::stubborn();

        let start = Instant::now();
        let still_running = kill_and_wait(&probe, 42, SignalKind::User1, Duration::ZERO);

        assert!(still_running);
        assert_eq!(probe.checks(), 1);
        assert!(start.elapsed() < POLL_INTERVAL);
        assert_eq!(probe.signals(), vec![(42, SignalKind::User1)]);
    }

    #[test]
    fn test_wait_returns_early_when_process_dies() {
        // Two more positive probes after SIGTERM, so roughly two poll intervals
        let probe = ScriptedProbe::dies_after(2);

        let start = Instant::now();
        let still_running =
            kill_and_wait(&probe, 42, SignalKind::Terminate, Duration::from_secs(5));
        let elapsed = start.elapsed();

        assert!(!still_running);
        assert!(elapsed >= POLL_INTERVAL * 2);
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_times_out_on_stubborn_process() {
        let probe = ScriptedProbe::stubborn();

        let start = Instant::now();
        let still_running =
            kill_and_wait(&probe, 42, SignalKind::Terminate, Duration::from_millis(350));
        let elapsed = start.elapsed();

        assert!(still_running);
        assert!(elapsed >= Duration::from_millis(350));
        assert!(elapsed < Duration::from_millis(900));
    }

    #[test]
    fn test_huge_wait_does_not_overflow_deadline() {
        let probe = ScriptedProbe::dies_after(1);

        let start = Instant::now();
        let still_running = kill_and_wait(
            &probe,
            42,
            SignalKind::Terminate,
            Duration::from_secs(u64::MAX),
        );

        assert!(!still_running);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_dead_process_needs_no_polling() {
        let probe = ScriptedProbe::dead();

        let start = Instant::now();
        let still_running =
            kill_and_wait(&probe, 42, SignalKind::Terminate, Duration::from_secs(5));

        assert!(!still_running);
        assert!(start.elapsed() < POLL_INTERVAL);
        assert_eq!(probe.checks(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_probe_refuses_group_pids() {
        // Must not signal our own process group
        assert!(!SystemProbe.signal(0, SignalKind::User2));
        assert!(!SystemProbe.signal(-1, SignalKind::User2));
    }
}
