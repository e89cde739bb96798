//! State machine tests with scripted collaborators.
//!
//! Time is paused so cooldown and interval sleeps complete instantly while
//! still advancing the tokio clock by their full duration.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use pingwarden_monitor::*;

const F: bool = false;
const S: bool = true;

/// Replays a fixed list of outcomes, then fails forever.
struct ScriptedProber {
    script: VecDeque<bool>,
    probed_at: Arc<Mutex<Vec<Instant>>>,
}

#[async_trait]
impl Prober for ScriptedProber {
    fn target(&self) -> &str {
        "192.0.2.1"
    }

    async fn probe(&mut self, _timeout: Duration) -> ProbeOutcome {
        self.probed_at.lock().unwrap().push(Instant::now());
        if self.script.pop_front().unwrap_or(false) {
            ProbeOutcome::reply(Duration::from_millis(5))
        } else {
            ProbeOutcome::lost("timeout")
        }
    }
}

/// Records every invocation and optionally fails.
struct RecordingRemediator {
    runs: Arc<Mutex<Vec<Vec<String>>>>,
    fail: bool,
}

#[async_trait]
impl Remediator for RecordingRemediator {
    async fn run(&mut self, argv: &[String]) -> RemediationReport {
        self.runs.lock().unwrap().push(argv.to_vec());
        let result = if self.fail {
            Err(RemediationError::Timeout(Duration::from_secs(1)))
        } else {
            Ok(())
        };
        RemediationReport {
            output: b"modem restarted\n".to_vec(),
            result,
        }
    }
}

/// Records every report and optionally fails.
struct RecordingSink {
    reports: Arc<Mutex<Vec<bool>>>,
    fail: bool,
}

#[async_trait]
impl StatusSink for RecordingSink {
    async fn report(&mut self, healthy: bool) -> SinkResult<()> {
        self.reports.lock().unwrap().push(healthy);
        if self.fail {
            Err(SinkError::Publish("broker gone".to_string()))
        } else {
            Ok(())
        }
    }
}

struct Harness {
    monitor: Monitor,
    probed_at: Arc<Mutex<Vec<Instant>>>,
    runs: Arc<Mutex<Vec<Vec<String>>>>,
    reports: Option<Arc<Mutex<Vec<bool>>>>,
}

impl Harness {
    fn runs(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    fn reports(&self) -> Vec<bool> {
        self.reports
            .as_ref()
            .map(|r| r.lock().unwrap().clone())
            .unwrap_or_default()
    }

    fn probe_times(&self) -> Vec<Instant> {
        self.probed_at.lock().unwrap().clone()
    }
}

fn config(max_failures: u32, cooldown_ms: u64) -> MonitorConfig {
    let mut config = MonitorConfig::new(vec![
        "systemctl".to_string(),
        "restart".to_string(),
        "modem".to_string(),
    ]);
    config.interval = Duration::from_millis(100);
    config.timeout = Duration::from_millis(50);
    config.max_failures = max_failures;
    config.cooldown = Duration::from_millis(cooldown_ms);
    config
}

struct Options {
    sink: bool,
    sink_fails: bool,
    remediation_fails: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            sink: true,
            sink_fails: false,
            remediation_fails: false,
        }
    }
}

fn harness(config: MonitorConfig, script: &[bool], options: Options) -> Harness {
    let probed_at = Arc::new(Mutex::new(Vec::new()));
    let runs = Arc::new(Mutex::new(Vec::new()));

    let prober = ScriptedProber {
        script: script.iter().copied().collect(),
        probed_at: probed_at.clone(),
    };
    let remediator = RecordingRemediator {
        runs: runs.clone(),
        fail: options.remediation_fails,
    };

    let mut monitor = Monitor::new(config, Box::new(prober), Box::new(remediator)).unwrap();
    let mut reports = None;
    if options.sink {
        let shared = Arc::new(Mutex::new(Vec::new()));
        monitor = monitor.with_sink(Box::new(RecordingSink {
            reports: shared.clone(),
            fail: options.sink_fails,
        }));
        reports = Some(shared);
    }

    Harness {
        monitor,
        probed_at,
        runs,
        reports,
    }
}

#[test]
fn zero_threshold_is_rejected_at_construction() {
    let prober = ScriptedProber {
        script: VecDeque::new(),
        probed_at: Arc::new(Mutex::new(Vec::new())),
    };
    let remediator = RecordingRemediator {
        runs: Arc::new(Mutex::new(Vec::new())),
        fail: false,
    };
    let result = Monitor::new(config(0, 1000), Box::new(prober), Box::new(remediator));
    assert!(matches!(result, Err(ConfigError::ZeroThreshold)));
}

#[tokio::test(start_paused = true)]
async fn counter_is_zero_after_every_success() {
    let script = [F, F, S, F, F, F, S, S, F, S];
    let mut h = harness(config(10, 1000), &script, Options::default());

    for &probe in &script {
        h.monitor.tick().await;
        if probe {
            assert_eq!(h.monitor.consecutive_failures(), 0);
        }
    }
    assert_eq!(h.runs(), 0);
}

#[tokio::test(start_paused = true)]
async fn sink_sees_only_transitions() {
    let script = [F, F, F, S, S, F];
    let mut h = harness(config(5, 1000), &script, Options::default());

    for _ in 0..script.len() {
        h.monitor.tick().await;
    }

    assert_eq!(h.reports(), vec![false, true, false]);
    assert_eq!(h.monitor.last_reported(), HealthStatus::Unhealthy);
    assert_eq!(h.runs(), 0);
}

#[tokio::test(start_paused = true)]
async fn first_probe_always_reports() {
    let mut h = harness(config(5, 1000), &[S], Options::default());

    assert_eq!(h.monitor.last_reported(), HealthStatus::Unknown);
    let iteration = h.monitor.tick().await;
    assert_eq!(iteration.reported, Some(HealthStatus::Healthy));
    assert_eq!(h.reports(), vec![true]);
}

#[tokio::test(start_paused = true)]
async fn threshold_triggers_single_remediation_then_cooldown() {
    let mut h = harness(config(3, 1000), &[F, F, F, F], Options::default());

    for _ in 0..2 {
        let iteration = h.monitor.tick().await;
        assert!(!iteration.remediated);
        assert_eq!(iteration.pause, Duration::from_millis(100));
    }

    let iteration = h.monitor.tick().await;
    assert!(iteration.remediated);
    assert_eq!(iteration.pause, Duration::from_millis(1000));
    assert_eq!(h.runs(), 1);
    assert_eq!(h.monitor.consecutive_failures(), 0);
    assert_eq!(
        h.runs.lock().unwrap()[0],
        vec!["systemctl", "restart", "modem"]
    );

    // Next probe only happens after the full cooldown, and counts from zero.
    h.monitor.tick().await;
    let times = h.probe_times();
    assert!(times[3] - times[2] >= Duration::from_millis(1000));
    assert!(times[3] - times[2] < Duration::from_millis(1100));
    assert_eq!(h.monitor.consecutive_failures(), 1);
    assert_eq!(h.runs(), 1);
}

#[tokio::test(start_paused = true)]
async fn interval_and_cooldown_do_not_stack() {
    let mut h = harness(config(1, 500), &[F, S], Options::default());

    let start = Instant::now();
    h.monitor.tick().await;
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(500));
    assert!(elapsed < Duration::from_millis(600));

    let start = Instant::now();
    h.monitor.tick().await;
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn endless_outage_without_sink_remediates_once_per_threshold() {
    let options = Options {
        sink: false,
        ..Options::default()
    };
    let mut h = harness(config(5, 1000), &[], options);

    for _ in 0..23 {
        let iteration = h.monitor.tick().await;
        assert!(!iteration.outcome.success);
    }

    assert_eq!(h.runs(), 4);
    assert_eq!(h.monitor.consecutive_failures(), 3);
    assert!(h.reports().is_empty());
    // The latch still tracks the computed status with the no-op sink.
    assert_eq!(h.monitor.last_reported(), HealthStatus::Unhealthy);
}

#[tokio::test(start_paused = true)]
async fn steady_health_is_idempotent() {
    let script = [S; 8];
    let mut h = harness(config(2, 1000), &script, Options::default());

    for _ in 0..script.len() {
        h.monitor.tick().await;
    }

    assert_eq!(h.reports(), vec![true]);
    assert_eq!(h.runs(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_remediation_still_resets_and_cools_down() {
    let options = Options {
        remediation_fails: true,
        ..Options::default()
    };
    let mut h = harness(config(2, 2000), &[F, F, F], options);

    h.monitor.tick().await;
    let start = Instant::now();
    let iteration = h.monitor.tick().await;

    assert!(iteration.remediated);
    assert!(start.elapsed() >= Duration::from_millis(2000));
    assert_eq!(h.monitor.consecutive_failures(), 0);

    h.monitor.tick().await;
    assert_eq!(h.monitor.consecutive_failures(), 1);
    assert_eq!(h.runs(), 1);
}

#[tokio::test(start_paused = true)]
async fn sink_failure_still_moves_the_latch() {
    let options = Options {
        sink_fails: true,
        ..Options::default()
    };
    let mut h = harness(config(5, 1000), &[F, F, S], options);

    h.monitor.tick().await;
    assert_eq!(h.monitor.last_reported(), HealthStatus::Unhealthy);

    // Same status again: no retry of the failed report.
    h.monitor.tick().await;
    assert_eq!(h.reports(), vec![false]);

    h.monitor.tick().await;
    assert_eq!(h.reports(), vec![false, true]);
    assert_eq!(h.monitor.last_reported(), HealthStatus::Healthy);
}

#[tokio::test(start_paused = true)]
async fn remediation_runs_exactly_when_threshold_is_reached() {
    let script = [
        F, F, S, F, F, F, F, S, F, F, F, F, F, F, F, F, S, S, F, F,
    ];
    let threshold = 4;
    let mut h = harness(config(threshold, 300), &script, Options::default());

    let mut expected_failures = 0;
    let mut expected_runs = 0;
    for &probe in &script {
        let iteration = h.monitor.tick().await;

        if probe {
            expected_failures = 0;
        } else {
            expected_failures += 1;
        }
        let should_run = expected_failures >= threshold;
        if should_run {
            expected_runs += 1;
            expected_failures = 0;
        }

        assert_eq!(iteration.remediated, should_run);
        assert_eq!(h.monitor.consecutive_failures(), expected_failures);
    }

    assert_eq!(h.runs(), expected_runs);
    assert_eq!(expected_runs, 3);
}
