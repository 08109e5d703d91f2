// Periodic reload task running alongside the launched server

use crate::error::Result;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Background task calling a reload routine on a fixed interval
///
/// The first reload happens one full interval after start. Dropping the
/// timer aborts the task.
pub struct HotReloadTimer {
    handle: JoinHandle<()>,
}

impl HotReloadTimer {
    /// Spawn the timer on the current tokio runtime
    pub fn start<F>(every: Duration, mut reload: F) -> Self
    where
        F: FnMut() -> Result<()> + Send + 'static,
    {
        let every = every.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                debug!("hot reload tick");
                if let Err(e) = reload() {
                    warn!("Hot reload failed: {}", e);
                }
            }
        });

        Self { handle }
    }
}

impl Drop for HotReloadTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
