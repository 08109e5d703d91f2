use crate::error::{Result, ServerCtlError};
use crate::supervisor::SignalKind;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Interval used when auto reload is switched on without a positive value
pub const DEFAULT_AUTO_RELOAD_MS: u64 = 3000;

/// Configuration for one managed server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server name, also the CLI command name
    pub name: String,

    /// Human-readable description shown in help and status output
    #[serde(default)]
    pub description: String,

    /// PID file of the server's master process
    pub pid_file: PathBuf,

    /// Periodic reload interval
    #[serde(default)]
    pub auto_reload: AutoReload,

    /// Signal sent on stop
    #[serde(default = "default_stop_signal")]
    pub stop_signal: SignalKind,

    /// Signal sent on reload
    #[serde(default = "default_reload_signal")]
    pub reload_signal: SignalKind,

    /// How long stop waits for the process to exit (in seconds)
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,

    /// Serialize concurrent invocations through `<pid_file>.lock`
    #[serde(default)]
    pub lock: bool,

    /// Options handed to the server runtime untouched by the supervisor
    pub server: LaunchOptions,
}

/// How the server runtime launches the server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaunchOptions {
    /// Executable to run
    pub command: PathBuf,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub cwd: Option<PathBuf>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Write the child's PID to `pid_file` after spawning. Leave off for
    /// servers that write their own PID file.
    #[serde(default)]
    pub write_pid_file: bool,
}

/// `auto_reload` accepts milliseconds or a boolean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AutoReload {
    Switch(bool),
    Millis(i64),
}

impl AutoReload {
    /// Reload interval, or `None` when disabled
    pub fn interval(&self) -> Option<Duration> {
        match *self {
            AutoReload::Switch(false) | AutoReload::Millis(0) => None,
            AutoReload::Switch(true) => Some(Duration::from_millis(DEFAULT_AUTO_RELOAD_MS)),
            AutoReload::Millis(ms) if ms < 0 => {
                Some(Duration::from_millis(DEFAULT_AUTO_RELOAD_MS))
            }
            AutoReload::Millis(ms) => Some(Duration::from_millis(ms as u64)),
        }
    }
}

impl Default for AutoReload {
    fn default() -> Self {
        AutoReload::Switch(false)
    }
}

// Default value functions for serde
fn default_stop_signal() -> SignalKind {
    SignalKind::Terminate
}

fn default_reload_signal() -> SignalKind {
    SignalKind::User1
}

fn default_stop_timeout() -> u64 {
    15
}

fn non_empty(configs: Vec<ServerConfig>) -> Result<Vec<ServerConfig>> {
    if configs.is_empty() {
        return Err(ServerCtlError::InvalidConfig(
            "No server configuration found in file".to_string(),
        ));
    }
    Ok(configs)
}

impl ServerConfig {
    /// Minimal configuration with every optional field at its default
    pub fn new<N, P, C>(name: N, pid_file: P, command: C) -> Self
    where
        N: Into<String>,
        P: AsRef<Path>,
        C: AsRef<Path>,
    {
        Self {
            name: name.into(),
            description: String::new(),
            pid_file: pid_file.as_ref().to_path_buf(),
            auto_reload: AutoReload::default(),
            stop_signal: default_stop_signal(),
            reload_signal: default_reload_signal(),
            stop_timeout_secs: default_stop_timeout(),
            lock: false,
            server: LaunchOptions {
                command: command.as_ref().to_path_buf(),
                ..LaunchOptions::default()
            },
        }
    }

    /// Load server configurations from a file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<Vec<ServerConfig>> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ServerCtlError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let configs = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(ServerCtlError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        let configs: Vec<ServerConfig> = configs
            .into_iter()
            .map(|mut config| {
                config.expand_env_vars();
                config
            })
            .collect();

        let mut seen = HashSet::new();
        for config in &configs {
            config.validate()?;
            if !seen.insert(config.name.as_str()) {
                return Err(ServerCtlError::ConfigValidationError(format!(
                    "Duplicate server name: {}",
                    config.name
                )));
            }
        }

        Ok(configs)
    }

    /// A file holds either one server at the top level or a `servers` list
    fn parse_toml(contents: &str) -> Result<Vec<ServerConfig>> {
        let invalid =
            |e: toml::de::Error| ServerCtlError::InvalidConfig(format!("Failed to parse TOML: {}", e));

        let mut table: toml::Table = toml::from_str(contents).map_err(invalid)?;

        let configs: Vec<ServerConfig> = match table.remove("servers") {
            Some(servers) => servers.try_into().map_err(invalid)?,
            None if table.is_empty() => Vec::new(),
            None => vec![toml::Value::Table(table).try_into().map_err(invalid)?],
        };
        non_empty(configs)
    }

    fn parse_json(contents: &str) -> Result<Vec<ServerConfig>> {
        let invalid =
            |e: serde_json::Error| ServerCtlError::InvalidConfig(format!("Failed to parse JSON: {}", e));

        let value: serde_json::Value = serde_json::from_str(contents).map_err(invalid)?;

        let configs: Vec<ServerConfig> = match value {
            serde_json::Value::Object(mut map) => match map.remove("servers") {
                Some(servers) => serde_json::from_value(servers).map_err(invalid)?,
                None if map.is_empty() => Vec::new(),
                None => vec![serde_json::from_value(serde_json::Value::Object(map))
                    .map_err(invalid)?],
            },
            other => {
                return Err(ServerCtlError::InvalidConfig(format!(
                    "Expected a JSON object at the top level, found {}",
                    other
                )))
            }
        };
        non_empty(configs)
    }

    /// Pick the configuration named `name`
    pub fn select(configs: Vec<ServerConfig>, name: &str) -> Result<ServerConfig> {
        let known: Vec<String> = configs.iter().map(|c| c.name.clone()).collect();

        configs
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ServerCtlError::UnknownServer {
                name: name.to_string(),
                known: known.join(", "),
            })
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ServerCtlError::MissingConfigField("name".to_string()));
        }

        if self.pid_file.as_os_str().is_empty() {
            return Err(ServerCtlError::MissingConfigField("pid_file".to_string()));
        }

        if self.server.command.as_os_str().is_empty() {
            return Err(ServerCtlError::MissingConfigField(
                "server.command".to_string(),
            ));
        }

        if self.stop_timeout_secs == 0 {
            return Err(ServerCtlError::ConfigValidationError(
                "stop_timeout_secs must be at least 1".to_string(),
            ));
        }

        if let Some(ref cwd) = self.server.cwd {
            if !cwd.is_dir() {
                return Err(ServerCtlError::ConfigValidationError(format!(
                    "Working directory does not exist or is not a directory: {}",
                    cwd.display()
                )));
            }
        }

        Ok(())
    }

    fn expand_env_vars(&mut self) {
        self.pid_file = expand_env_in_path(&self.pid_file);
        self.server.command = expand_env_in_path(&self.server.command);

        if let Some(ref cwd) = self.server.cwd {
            self.server.cwd = Some(expand_env_in_path(cwd));
        }

        self.server.args = self
            .server
            .args
            .iter()
            .map(|arg| expand_env_in_string(arg))
            .collect();

        for value in self.server.env.values_mut() {
            *value = expand_env_in_string(value);
        }
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// Lock file guarding concurrent invocations for this server
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.pid_file.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }
}

/// Expand `$VAR` and `${VAR}`; unset variables are left verbatim
fn expand_env_in_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match std::env::var(name) {
            Ok(value) if !name.is_empty() => out.push_str(&value),
            _ => out.push_str(&rest[pos..pos + 1 + consumed]),
        }
        rest = &after[consumed..];
    }

    out.push_str(rest);
    out
}

fn expand_env_in_path(path: &Path) -> PathBuf {
    PathBuf::from(expand_env_in_string(&path.to_string_lossy()))
}
