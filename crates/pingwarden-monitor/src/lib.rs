//! pingwarden-monitor — probe, remediate, and report.
//!
//! Turns a stream of noisy ICMP probe results into a debounced health
//! signal, runs a remediation command after sustained failure, and pauses
//! for a cooldown before probing again.
//!
//! # Architecture
//!
//! ```text
//! Monitor
//!   ├── HealthTracker (failure counter, last-reported latch)
//!   ├── Prober        → ProbeOutcome        (IcmpProber)
//!   ├── Remediator    → RemediationReport   (CommandRemediator)
//!   └── StatusSink    ← transitions only    (NoopSink by default)
//! ```
//!
//! # Hysteresis
//!
//! A single success clears the failure counter. Reaching the threshold
//! runs the command once, clears the counter and sleeps for the cooldown,
//! so a long outage remediates at most once per cooldown window.

pub mod config;
pub mod error;
pub mod monitor;
pub mod probe;
pub mod remediate;
pub mod sink;
pub mod tracker;

pub use config::MonitorConfig;
pub use error::{ConfigError, ProbeError, RemediationError, SinkError, SinkResult};
pub use monitor::{Iteration, Monitor};
pub use probe::{IcmpProber, ProbeOutcome, Prober};
pub use remediate::{CommandRemediator, RemediationReport, Remediator};
pub use sink::{NoopSink, StatusSink};
pub use tracker::{HealthStatus, HealthTracker};
