//! The revision router: the decision-point policy that chooses, after each
//! review pass, between finishing the campaign and re-entering an upstream
//! content stage.
//!
//! Gate order is load-bearing: cheap deterministic terminations (timeout,
//! counters, scores) run before the keyword heuristic, and termination
//! always takes priority over another revision. The design favors bounded
//! execution over thoroughness.

use crate::monitor::ExecutionMonitor;
use crate::quality::{self, FeedbackSentiment};
use crate::state::CampaignState;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Keyword families for content routing, checked in this order.
const COPY_KEYWORDS: &[&str] = &["copy", "text", "words", "headline"];
const VISUAL_KEYWORDS: &[&str] = &["visual", "image", "design", "picture"];
const STRATEGY_KEYWORDS: &[&str] = &["strategy", "approach", "plan", "target"];
const CREATIVE_KEYWORDS: &[&str] = &["creative", "concept", "idea"];

/// Upstream stages the router may re-enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionTarget {
    Strategy,
    Creative,
    Copy,
    Visual,
}

impl RevisionTarget {
    /// The graph node this target maps to.
    pub fn node_id(&self) -> &'static str {
        match self {
            Self::Strategy => "strategy",
            Self::Creative => "creative",
            Self::Copy => "copy",
            Self::Visual => "visual",
        }
    }
}

/// Why the router decided the campaign is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// Wall-clock budget exceeded.
    Timeout,
    /// Revision cap reached; terminate regardless of other signals.
    RevisionCap,
    /// Quality score reached the configured threshold.
    QualityMet,
    /// Consecutive iterations produced no meaningful artifact changes.
    Stagnant,
    /// Latest feedback reads as satisfied.
    FeedbackSatisfied,
    /// No feedback to act on.
    NoFeedback,
}

impl std::fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Timeout => "timeout",
            Self::RevisionCap => "revision cap reached",
            Self::QualityMet => "quality threshold met",
            Self::Stagnant => "no significant changes",
            Self::FeedbackSatisfied => "feedback satisfied",
            Self::NoFeedback => "no feedback",
        };
        f.write_str(s)
    }
}

/// Outcome of one decision-point visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Complete(CompletionReason),
    Revise(RevisionTarget),
}

/// Multi-criteria routing policy evaluated at the decision node.
#[derive(Debug, Clone)]
pub struct RevisionRouter {
    max_revisions: u32,
    quality_threshold: u8,
}

impl RevisionRouter {
    pub fn new(max_revisions: u32, quality_threshold: u8) -> Self {
        Self {
            max_revisions,
            quality_threshold,
        }
    }

    /// Decide whether to finish or re-enter an upstream stage.
    ///
    /// Evaluated in strict priority order; the first matching condition
    /// short-circuits. The iteration snapshot (step 2) is telemetry and is
    /// recorded on every visit regardless of the outcome. The stagnation
    /// gate consumes the change-detector baseline as a side effect.
    pub fn route(
        &self,
        state: &mut CampaignState,
        monitor: &mut ExecutionMonitor,
    ) -> RouteDecision {
        // 1. Timeout.
        if monitor.check_timeout() {
            info!(
                elapsed_secs = monitor.elapsed().as_secs(),
                "wall-clock budget exceeded; completing workflow"
            );
            return RouteDecision::Complete(CompletionReason::Timeout);
        }

        // 2. Telemetry snapshot, unconditional.
        monitor.log_iteration(state);

        // 3. Revision cap.
        if state.revision_count >= self.max_revisions {
            info!(
                revisions = state.revision_count,
                cap = self.max_revisions,
                "revision cap reached; completing workflow"
            );
            return RouteDecision::Complete(CompletionReason::RevisionCap);
        }

        // 4. Quality gate.
        let score = quality::assess_quality(state);
        if score >= self.quality_threshold {
            info!(score, threshold = self.quality_threshold, "quality threshold met");
            return RouteDecision::Complete(CompletionReason::QualityMet);
        }

        // 5. Stagnation gate (consumes the comparison baseline).
        if !quality::has_significant_changes(state) {
            info!("no significant changes since last visit; completing workflow");
            return RouteDecision::Complete(CompletionReason::Stagnant);
        }

        // 6. Sentiment gate.
        if quality::analyze_feedback(state) == FeedbackSentiment::Complete {
            info!("feedback reads as satisfied; completing workflow");
            return RouteDecision::Complete(CompletionReason::FeedbackSatisfied);
        }

        // 7. Content routing over the latest feedback.
        if let Some(feedback) = state.last_feedback() {
            let feedback = feedback.to_lowercase();
            let target = if contains_any(&feedback, COPY_KEYWORDS) {
                RevisionTarget::Copy
            } else if contains_any(&feedback, VISUAL_KEYWORDS) {
                RevisionTarget::Visual
            } else if contains_any(&feedback, STRATEGY_KEYWORDS) {
                RevisionTarget::Strategy
            } else if contains_any(&feedback, CREATIVE_KEYWORDS) {
                RevisionTarget::Creative
            } else {
                debug!("no keyword family matched; defaulting to strategy");
                RevisionTarget::Strategy
            };
            info!(to = target.node_id(), "routing for revision");
            return RouteDecision::Revise(target);
        }

        // 8. Nothing to act on.
        RouteDecision::Complete(CompletionReason::NoFeedback)
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}
