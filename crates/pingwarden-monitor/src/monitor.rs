//! The probe-and-remediate loop.
//!
//! One `Monitor` owns every piece of mutable state: the failure counter,
//! the last-reported latch and the three collaborators. Each iteration
//! probes once, updates the counter, reports a transition if there is one,
//! remediates if the threshold is reached, then sleeps for either the
//! cooldown or the interval (never both).

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::error::ConfigResult;
use crate::probe::{ProbeOutcome, Prober};
use crate::remediate::Remediator;
use crate::sink::{NoopSink, StatusSink};
use crate::tracker::{HealthStatus, HealthTracker};

/// What happened during one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iteration {
    /// The probe result.
    pub outcome: ProbeOutcome,
    /// Status computed from the probe.
    pub status: HealthStatus,
    /// Status handed to the sink, if this iteration was a transition.
    pub reported: Option<HealthStatus>,
    /// The remediation command ran.
    pub remediated: bool,
    /// Sleep that ends the iteration.
    pub pause: Duration,
}

/// Drives the prober, remediator and sink.
pub struct Monitor {
    config: MonitorConfig,
    tracker: HealthTracker,
    prober: Box<dyn Prober>,
    remediator: Box<dyn Remediator>,
    sink: Box<dyn StatusSink>,
}

impl Monitor {
    /// Build a monitor with no status sink.
    pub fn new(
        config: MonitorConfig,
        prober: Box<dyn Prober>,
        remediator: Box<dyn Remediator>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            tracker: HealthTracker::new(config.max_failures),
            config,
            prober,
            remediator,
            sink: Box::new(NoopSink),
        })
    }

    /// Report transitions to `sink`.
    pub fn with_sink(mut self, sink: Box<dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Run iterations until the process is stopped.
    pub async fn run(&mut self) {
        info!(
            host = %self.prober.target(),
            interval_ms = self.config.interval.as_millis() as u64,
            timeout_ms = self.config.timeout.as_millis() as u64,
            max_failures = self.config.max_failures,
            cooldown_ms = self.config.cooldown.as_millis() as u64,
            command = %self.config.command_line(),
            "monitor starting"
        );

        loop {
            self.tick().await;
        }
    }

    /// Run one iteration, including its trailing sleep.
    pub async fn tick(&mut self) -> Iteration {
        let iteration = self.evaluate().await;
        tokio::time::sleep(iteration.pause).await;
        iteration
    }

    /// Run one iteration up to, but not including, its trailing sleep.
    pub async fn evaluate(&mut self) -> Iteration {
        let host = self.prober.target().to_string();
        let outcome = self.prober.probe(self.config.timeout).await;
        let status = self.tracker.record(outcome.success);

        if outcome.success {
            debug!(
                %host,
                rtt_ms = outcome.rtt.map(|d| d.as_secs_f64() * 1000.0),
                "ping succeeded"
            );
        } else {
            warn!(
                %host,
                failures = self.tracker.consecutive_failures(),
                error = outcome.error.as_deref().unwrap_or("no reply"),
                "ping failed"
            );
        }

        let reported = self.report(status).await;

        let remediated = if self.tracker.threshold_reached() {
            self.remediate(&host).await;
            true
        } else {
            false
        };

        let pause = if remediated {
            self.config.cooldown
        } else {
            self.config.interval
        };

        Iteration {
            outcome,
            status,
            reported,
            remediated,
            pause,
        }
    }

    /// Hand a transition to the sink. The latch moves even if the sink fails.
    async fn report(&mut self, status: HealthStatus) -> Option<HealthStatus> {
        let previous = self.tracker.last_reported();
        let changed = self.tracker.transition(status)?;

        match changed {
            HealthStatus::Healthy if previous == HealthStatus::Unhealthy => {
                info!(host = %self.prober.target(), "target recovered");
            }
            HealthStatus::Unhealthy => {
                warn!(host = %self.prober.target(), %previous, "target unreachable");
            }
            _ => info!(host = %self.prober.target(), status = %changed, "initial status"),
        }

        if let Some(healthy) = changed.is_healthy() {
            if let Err(e) = self.sink.report(healthy).await {
                error!(error = %e, status = %changed, "failed to report status");
            }
        }

        Some(changed)
    }

    /// Run the remediation command, then clear the failure counter.
    async fn remediate(&mut self, host: &str) {
        error!(
            %host,
            failures = self.tracker.max_failures(),
            command = %self.config.command_line(),
            "ping failed repeatedly, running remediation command"
        );

        let report = self.remediator.run(&self.config.command).await;
        match &report.result {
            Ok(()) => info!(output = %report.output_text(), "remediation command finished"),
            Err(e) => error!(
                error = %e,
                output = %report.output_text(),
                command = %self.config.command_line(),
                "remediation command failed"
            ),
        }

        self.tracker.remediated();
        info!(
            cooldown_ms = self.config.cooldown.as_millis() as u64,
            "cooling down before probing again"
        );
    }

    /// Consecutive failures counted so far.
    pub fn consecutive_failures(&self) -> u32 {
        self.tracker.consecutive_failures()
    }

    /// Status most recently reported to the sink.
    pub fn last_reported(&self) -> HealthStatus {
        self.tracker.last_reported()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}
