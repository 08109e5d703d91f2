// Server runtime - the launched server the supervisor hands control to

mod command;
pub mod hot_reload;

use crate::error::Result;
use std::time::Duration;

pub use command::CommandRuntime;
pub use hot_reload::HotReloadTimer;

/// What the supervisor needs from the server it manages
pub trait ServerRuntime {
    /// Register a periodic reload; takes effect on the next `run`
    fn schedule_reload(&mut self, every: Duration);

    /// Launch the server and serve in the foreground
    ///
    /// Does not return until the server itself terminates.
    fn run(&mut self) -> Result<()>;

    /// Ask the running server to reload without stopping
    fn reload(&self) -> Result<()>;
}
