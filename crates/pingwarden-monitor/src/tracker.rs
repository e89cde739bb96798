//! Failure counting and report debouncing.
//!
//! Pure bookkeeping with no I/O, so the hysteresis rules can be checked
//! without a network or a clock.

use std::fmt;

/// Health as last reported to the status sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthStatus {
    /// Nothing reported yet.
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    /// Map a probe result to a status.
    pub fn from_success(success: bool) -> Self {
        if success {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    /// The flag handed to a status sink. `None` for `Unknown`.
    pub fn is_healthy(self) -> Option<bool> {
        match self {
            HealthStatus::Unknown => None,
            HealthStatus::Healthy => Some(true),
            HealthStatus::Unhealthy => Some(false),
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HealthStatus::Unknown => "unknown",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        })
    }
}

/// Tracks consecutive failures and the last reported status.
#[derive(Debug)]
pub struct HealthTracker {
    /// Consecutive failures since the last success or remediation.
    consecutive_failures: u32,
    /// Failures that trigger remediation.
    max_failures: u32,
    /// Latched status of the last report.
    last_reported: HealthStatus,
}

impl HealthTracker {
    pub fn new(max_failures: u32) -> Self {
        Self {
            consecutive_failures: 0,
            max_failures,
            last_reported: HealthStatus::Unknown,
        }
    }

    /// Count a probe result and return the computed status.
    ///
    /// A success clears the counter outright; there is no decay.
    pub fn record(&mut self, success: bool) -> HealthStatus {
        if success {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }
        HealthStatus::from_success(success)
    }

    /// Latch `computed` and return it if it differs from the last report.
    ///
    /// The latch moves even if the caller's report later fails.
    pub fn transition(&mut self, computed: HealthStatus) -> Option<HealthStatus> {
        if computed == self.last_reported {
            return None;
        }
        self.last_reported = computed;
        Some(computed)
    }

    /// The failure count has reached the threshold.
    pub fn threshold_reached(&self) -> bool {
        self.consecutive_failures >= self.max_failures
    }

    /// Clear the counter after a remediation run, whatever its result.
    pub fn remediated(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    pub fn last_reported(&self) -> HealthStatus {
        self.last_reported
    }
}
