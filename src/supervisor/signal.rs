// Signal kinds understood by the supervisor and accepted in configuration

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ServerCtlError;

/// Platform-neutral signal names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SignalKind {
    Terminate,
    Interrupt,
    Quit,
    Kill,
    Hangup,
    User1,
    User2,
}

impl SignalKind {
    pub const ALL: [SignalKind; 7] = [
        SignalKind::Terminate,
        SignalKind::Interrupt,
        SignalKind::Quit,
        SignalKind::Kill,
        SignalKind::Hangup,
        SignalKind::User1,
        SignalKind::User2,
    ];

    /// Conventional `SIG*` name
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Terminate => "SIGTERM",
            SignalKind::Interrupt => "SIGINT",
            SignalKind::Quit => "SIGQUIT",
            SignalKind::Kill => "SIGKILL",
            SignalKind::Hangup => "SIGHUP",
            SignalKind::User1 => "SIGUSR1",
            SignalKind::User2 => "SIGUSR2",
        }
    }

    #[cfg(unix)]
    pub fn to_nix(self) -> nix::sys::signal::Signal {
        use nix::sys::signal::Signal;

        match self {
            SignalKind::Terminate => Signal::SIGTERM,
            SignalKind::Interrupt => Signal::SIGINT,
            SignalKind::Quit => Signal::SIGQUIT,
            SignalKind::Kill => Signal::SIGKILL,
            SignalKind::Hangup => Signal::SIGHUP,
            SignalKind::User1 => Signal::SIGUSR1,
            SignalKind::User2 => Signal::SIGUSR2,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = ServerCtlError;

    /// Accepts `SIGTERM`, `TERM` and `term` alike
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        let bare = normalized.strip_prefix("SIG").unwrap_or(&normalized);

        SignalKind::ALL
            .iter()
            .copied()
            .find(|kind| &kind.as_str()[3..] == bare)
            .ok_or_else(|| {
                let valid: Vec<&str> = SignalKind::ALL.iter().map(|k| k.as_str()).collect();
                ServerCtlError::ConfigValidationError(format!(
                    "Invalid signal: {}. Must be one of: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

impl TryFrom<String> for SignalKind {
    type Error = ServerCtlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SignalKind> for String {
    fn from(kind: SignalKind) -> Self {
        kind.as_str().to_string()
    }
}
