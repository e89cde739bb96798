//! Error types for the monitor and its collaborators.

use std::time::Duration;

use thiserror::Error;

/// Rejected monitor configuration. Always fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failure threshold must be at least 1")]
    ZeroThreshold,

    #[error("remediation command is empty")]
    EmptyCommand,

    #[error("remediation command has an empty program name")]
    EmptyProgram,
}

/// Failure to build a prober. Raised once at startup, never per probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to resolve target {host}: {reason}")]
    Resolve { host: String, reason: String },

    #[error("failed to open icmp socket: {0}")]
    Socket(#[from] std::io::Error),
}

/// Failure of a single remediation attempt. Logged, never fatal.
#[derive(Debug, Error)]
pub enum RemediationError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command exited with {0}")]
    ExitStatus(std::process::ExitStatus),

    #[error("command did not finish within {0:?}")]
    Timeout(Duration),
}

/// Failure to hand a status report to the reporting channel.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to encode status: {0}")]
    Encode(String),

    #[error("failed to publish status: {0}")]
    Publish(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type SinkResult<T> = Result<T, SinkError>;
