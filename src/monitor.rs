//! Execution monitoring for campaign runs.
//!
//! The monitor is owned by the workflow runner, not serialized with the
//! campaign output. It tracks wall-clock time against the configured
//! ceiling and keeps a per-decision-visit iteration log for telemetry.

use crate::state::CampaignState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::warn;

/// Iteration count above which the monitor emits an advisory warning.
/// Observability only; no control-flow effect.
const HIGH_ITERATION_THRESHOLD: usize = 5;

/// Lifecycle of a monitored run. Transitions only move forward:
/// `Created → Running → (Completed | TimedOut | Exhausted)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MonitorPhase {
    #[default]
    Created,
    Running,
    /// The run converged through a router decision.
    Completed,
    /// The run hit the wall-clock ceiling.
    TimedOut,
    /// The run hit the structural step ceiling.
    Exhausted,
}

impl MonitorPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::TimedOut | Self::Exhausted)
    }
}

/// One telemetry snapshot, taken on every decision-point visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub timestamp: DateTime<Utc>,
    pub revision_count: u32,
    pub artifacts_count: usize,
    pub feedback_count: usize,
}

/// Aggregate view of a finished (or in-flight) run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorSummary {
    pub total_iterations: usize,
    pub avg_artifacts: f64,
    pub duration_secs: f64,
}

/// Tracks wall-clock budget and decision-visit telemetry for one run.
pub struct ExecutionMonitor {
    start: Instant,
    max_duration: Duration,
    iteration_log: Vec<IterationRecord>,
    phase: MonitorPhase,
}

impl ExecutionMonitor {
    pub fn new(max_duration: Duration) -> Self {
        Self {
            start: Instant::now(),
            max_duration,
            iteration_log: Vec::new(),
            phase: MonitorPhase::Created,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    /// Pure read: has the run exceeded its wall-clock ceiling?
    pub fn check_timeout(&self) -> bool {
        self.elapsed() > self.max_duration
    }

    /// Append a telemetry snapshot. Called unconditionally once per
    /// decision-point visit, regardless of the routing outcome.
    pub fn log_iteration(&mut self, state: &CampaignState) {
        self.iteration_log.push(IterationRecord {
            timestamp: Utc::now(),
            revision_count: state.revision_count,
            artifacts_count: state.artifacts.count(),
            feedback_count: state.feedback.len(),
        });

        if self.iteration_log.len() > HIGH_ITERATION_THRESHOLD {
            warn!(
                iterations = self.iteration_log.len(),
                "high iteration count detected; consider manual intervention"
            );
        }
    }

    pub fn iteration_log(&self) -> &[IterationRecord] {
        &self.iteration_log
    }

    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    pub fn mark_running(&mut self) {
        self.advance(MonitorPhase::Running);
    }

    pub fn mark_completed(&mut self) {
        self.advance(MonitorPhase::Completed);
    }

    pub fn mark_timed_out(&mut self) {
        self.advance(MonitorPhase::TimedOut);
    }

    pub fn mark_exhausted(&mut self) {
        self.advance(MonitorPhase::Exhausted);
    }

    // Terminal phases are sticky.
    fn advance(&mut self, next: MonitorPhase) {
        if !self.phase.is_terminal() {
            self.phase = next;
        }
    }

    /// Aggregate execution summary for reporting.
    pub fn summary(&self) -> MonitorSummary {
        if self.iteration_log.is_empty() {
            return MonitorSummary::default();
        }

        let total = self.iteration_log.len();
        let avg_artifacts = self
            .iteration_log
            .iter()
            .map(|r| r.artifacts_count as f64)
            .sum::<f64>()
            / total as f64;
        let duration = self.iteration_log[total - 1].timestamp - self.iteration_log[0].timestamp;

        MonitorSummary {
            total_iterations: total,
            avg_artifacts,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Artifacts, Brief};

    fn state_with_artifacts(n: usize) -> CampaignState {
        let mut state = CampaignState::new(Brief::from([("product", "X")]));
        let mut artifacts = Artifacts::default();
        if n >= 1 {
            artifacts.strategy = Some("s".into());
        }
        if n >= 2 {
            artifacts.copy = Some("c".into());
        }
        state.artifacts = artifacts;
        state
    }

    #[test]
    fn test_zero_budget_times_out_immediately() {
        let monitor = ExecutionMonitor::new(Duration::ZERO);
        // Any elapsed time at all exceeds a zero budget.
        std::thread::sleep(Duration::from_millis(1));
        assert!(monitor.check_timeout());
    }

    #[test]
    fn test_generous_budget_does_not_time_out() {
        let monitor = ExecutionMonitor::new(Duration::from_secs(300));
        assert!(!monitor.check_timeout());
    }

    #[test]
    fn test_log_iteration_appends_snapshots() {
        let mut monitor = ExecutionMonitor::new(Duration::from_secs(300));
        monitor.log_iteration(&state_with_artifacts(1));
        monitor.log_iteration(&state_with_artifacts(2));

        let log = monitor.iteration_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].artifacts_count, 1);
        assert_eq!(log[1].artifacts_count, 2);
    }

    #[test]
    fn test_phase_transitions_are_forward_only() {
        let mut monitor = ExecutionMonitor::new(Duration::from_secs(300));
        assert_eq!(monitor.phase(), MonitorPhase::Created);

        monitor.mark_running();
        assert_eq!(monitor.phase(), MonitorPhase::Running);

        monitor.mark_timed_out();
        assert_eq!(monitor.phase(), MonitorPhase::TimedOut);

        // Terminal phase is sticky.
        monitor.mark_completed();
        assert_eq!(monitor.phase(), MonitorPhase::TimedOut);
        assert!(monitor.phase().is_terminal());
    }

    #[test]
    fn test_summary_empty_log() {
        let monitor = ExecutionMonitor::new(Duration::from_secs(300));
        let summary = monitor.summary();
        assert_eq!(summary.total_iterations, 0);
        assert_eq!(summary.avg_artifacts, 0.0);
    }

    #[test]
    fn test_summary_averages_artifact_counts() {
        let mut monitor = ExecutionMonitor::new(Duration::from_secs(300));
        monitor.log_iteration(&state_with_artifacts(1));
        monitor.log_iteration(&state_with_artifacts(2));

        let summary = monitor.summary();
        assert_eq!(summary.total_iterations, 2);
        assert!((summary.avg_artifacts - 1.5).abs() < f64::EPSILON);
    }
}
