//! Monitor configuration.

use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Default pause between probes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(3000);
/// Default time to wait for an echo reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);
/// Default number of consecutive failures before remediation.
pub const DEFAULT_MAX_FAILURES: u32 = 5;
/// Default pause after remediation before probing resumes.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(300_000);

/// Settings the monitor loop runs with. Immutable once the monitor is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Sleep between iterations that did not remediate.
    pub interval: Duration,
    /// Upper bound on a single probe.
    pub timeout: Duration,
    /// Consecutive failures that trigger remediation.
    pub max_failures: u32,
    /// Sleep after a remediation run, replacing the interval sleep.
    pub cooldown: Duration,
    /// Remediation program followed by its arguments.
    pub command: Vec<String>,
    /// Optional bound on the remediation command. `None` waits forever.
    pub command_timeout: Option<Duration>,
}

impl MonitorConfig {
    /// Build a config with the stock timings for the given command.
    pub fn new(command: Vec<String>) -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            max_failures: DEFAULT_MAX_FAILURES,
            cooldown: DEFAULT_COOLDOWN,
            command,
            command_timeout: None,
        }
    }

    /// Check the invariants the monitor relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_failures == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        match self.command.first() {
            None => Err(ConfigError::EmptyCommand),
            Some(program) if program.trim().is_empty() => Err(ConfigError::EmptyProgram),
            Some(_) => Ok(()),
        }
    }

    /// The command line as a single string, for logs.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}
