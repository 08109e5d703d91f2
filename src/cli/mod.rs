// CLI module - User-facing command-line interface

pub mod output;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::logging;
use crate::supervisor::{Action, ProcessSupervisor};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// serverctl - start, stop, restart and reload PID-file managed servers
#[derive(Parser, Debug)]
#[command(name = "serverctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Server definitions (.toml or .json)
    #[arg(
        short,
        long,
        env = "SERVERCTL_CONFIG",
        default_value = "serverctl.toml"
    )]
    config: PathBuf,

    /// Log more (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Name of the configured server
    server: String,

    /// start|stop|restart|reload|status
    #[arg(default_value = "start")]
    action: String,
}

impl Cli {
    /// Run the CLI application
    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        logging::init(cli.verbose);
        cli.execute()
    }

    fn execute(&self) -> Result<()> {
        // Reject a bad action before touching config or processes
        let action: Action = self.action.parse()?;

        let configs = ServerConfig::from_file(&self.config)?;
        let config = ServerConfig::select(configs, &self.server)?;

        ProcessSupervisor::for_server(config).dispatch(action)
    }
}
