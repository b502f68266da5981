//! Quality, change, and feedback evaluators consulted by the revision
//! router at the decision point.
//!
//! All three are functions of the campaign state alone. The change
//! detector has one deliberate side effect: it consumes its comparison
//! baseline by overwriting `previous_artifacts` on every call.

use crate::state::{ArtifactEntry, CampaignState};
use std::collections::BTreeMap;

/// Lexical markers counted by [`analyze_feedback`]. Substring matching
/// against the lower-cased most recent feedback entry; deliberately a
/// coarse keyword heuristic, not sentiment analysis.
pub const POSITIVE_MARKERS: &[&str] = &["good", "great", "excellent", "approved", "satisfied", "perfect"];
pub const NEGATIVE_MARKERS: &[&str] = &["revise", "change", "improve", "fix", "wrong", "bad", "needs"];

/// Additions + modifications required before an iteration counts as
/// having made meaningful progress.
const SIGNIFICANT_CHANGE_THRESHOLD: usize = 2;

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.is_empty())
}

/// Score campaign completeness on a 0-100 scale.
///
/// Weighted presence check over artifact slots; deterministic and purely a
/// function of which slots hold non-empty content.
pub fn assess_quality(state: &CampaignState) -> u8 {
    let artifacts = &state.artifacts;
    let mut score = 0u8;

    if filled(&artifacts.strategy) {
        score += 20;
    }
    if filled(&artifacts.creative_concepts) {
        score += 20;
    }
    if filled(&artifacts.copy) {
        score += 20;
    }
    if artifacts
        .visual
        .as_ref()
        .and_then(|v| v.image_url.as_deref())
        .is_some_and(|url| !url.is_empty())
    {
        score += 20;
    }
    if filled(&artifacts.audience_personas) {
        score += 10;
    }
    if filled(&artifacts.cta_optimization) {
        score += 10;
    }

    score
}

/// Compare current artifacts against the previous decision-visit snapshot
/// and report whether the iteration produced meaningful progress.
///
/// Counts additions (slot filled now, empty before) and modifications
/// (filled in both, value differs); returns true iff the count reaches the
/// significance threshold. Unconditionally replaces the snapshot, so a
/// second consecutive call with no intervening mutation reports false.
pub fn has_significant_changes(state: &mut CampaignState) -> bool {
    let changes = {
        let previous: BTreeMap<&str, ArtifactEntry<'_>> =
            state.previous_artifacts.entries().into_iter().collect();

        state
            .artifacts
            .entries()
            .into_iter()
            .filter(|(key, entry)| match previous.get(key) {
                None => true,
                Some(prev) => prev != entry,
            })
            .count()
    };

    state.previous_artifacts = state.artifacts.clone();

    changes >= SIGNIFICANT_CHANGE_THRESHOLD
}

/// Outcome of the feedback sentiment heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackSentiment {
    /// Positive (or absent/neutral) feedback; the workflow may finish.
    Complete,
    /// Negative feedback dominates; another revision pass is warranted.
    ContinueRevision,
}

/// Classify the most recent feedback entry by counting positive vs
/// negative lexical markers.
///
/// No feedback, a positive majority, or no markers at all → `Complete`.
/// Any negative markers not outnumbered by positive ones → `ContinueRevision`.
pub fn analyze_feedback(state: &CampaignState) -> FeedbackSentiment {
    let Some(last) = state.last_feedback() else {
        return FeedbackSentiment::Complete;
    };
    let last = last.to_lowercase();

    let positive = POSITIVE_MARKERS.iter().filter(|m| last.contains(*m)).count();
    let negative = NEGATIVE_MARKERS.iter().filter(|m| last.contains(*m)).count();

    if positive > negative {
        return FeedbackSentiment::Complete;
    }
    if negative > 0 {
        return FeedbackSentiment::ContinueRevision;
    }
    FeedbackSentiment::Complete
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Artifacts, Brief, VisualAsset};

    fn empty_state() -> CampaignState {
        CampaignState::new(Brief::from([("product", "X")]))
    }

    fn full_content_state() -> CampaignState {
        let mut state = empty_state();
        state.artifacts = Artifacts {
            strategy: Some("strategy".into()),
            creative_concepts: Some("concepts".into()),
            copy: Some("copy".into()),
            visual: Some(VisualAsset {
                image_prompt: "prompt".into(),
                image_url: Some("https://img/1".into()),
            }),
            audience_personas: Some("personas".into()),
            cta_optimization: Some("cta".into()),
            ..Default::default()
        };
        state
    }

    #[test]
    fn test_quality_empty_state_scores_zero() {
        assert_eq!(assess_quality(&empty_state()), 0);
    }

    #[test]
    fn test_quality_full_state_scores_hundred() {
        assert_eq!(assess_quality(&full_content_state()), 100);
    }

    #[test]
    fn test_quality_missing_image_url_drops_twenty() {
        let mut state = full_content_state();
        state.artifacts.visual = Some(VisualAsset::prompt_only("prompt"));
        assert_eq!(assess_quality(&state), 80);
    }

    #[test]
    fn test_quality_is_pure() {
        let state = full_content_state();
        assert_eq!(assess_quality(&state), assess_quality(&state));
    }

    #[test]
    fn test_quality_empty_string_does_not_count() {
        let mut state = empty_state();
        state.artifacts.strategy = Some(String::new());
        assert_eq!(assess_quality(&state), 0);
    }

    #[test]
    fn test_changes_below_threshold_not_significant() {
        let mut state = empty_state();
        state.artifacts.strategy = Some("one".into());
        // Single addition is below the threshold of two.
        assert!(!has_significant_changes(&mut state));
    }

    #[test]
    fn test_two_additions_are_significant() {
        let mut state = empty_state();
        state.artifacts.strategy = Some("one".into());
        state.artifacts.copy = Some("two".into());
        assert!(has_significant_changes(&mut state));
    }

    #[test]
    fn test_modifications_count_as_changes() {
        let mut state = empty_state();
        state.artifacts.strategy = Some("v1".into());
        state.artifacts.copy = Some("c1".into());
        assert!(has_significant_changes(&mut state));

        state.artifacts.strategy = Some("v2".into());
        state.artifacts.copy = Some("c2".into());
        assert!(has_significant_changes(&mut state));
    }

    #[test]
    fn test_change_detection_consumes_baseline() {
        let mut state = empty_state();
        state.artifacts.strategy = Some("one".into());
        state.artifacts.copy = Some("two".into());

        assert!(has_significant_changes(&mut state));
        // Baseline was overwritten; nothing changed since.
        assert!(!has_significant_changes(&mut state));
    }

    fn with_feedback(text: &str) -> CampaignState {
        let mut state = empty_state();
        state.feedback.push(text.to_string());
        state
    }

    #[test]
    fn test_no_feedback_is_complete() {
        assert_eq!(analyze_feedback(&empty_state()), FeedbackSentiment::Complete);
    }

    #[test]
    fn test_positive_feedback_is_complete() {
        let state = with_feedback("Looks great, approved for launch");
        assert_eq!(analyze_feedback(&state), FeedbackSentiment::Complete);
    }

    #[test]
    fn test_negative_feedback_continues_revision() {
        let state = with_feedback("Please revise the headline, it reads wrong");
        assert_eq!(analyze_feedback(&state), FeedbackSentiment::ContinueRevision);
    }

    #[test]
    fn test_neutral_feedback_is_complete() {
        let state = with_feedback("The campaign targets urban commuters");
        assert_eq!(analyze_feedback(&state), FeedbackSentiment::Complete);
    }

    #[test]
    fn test_positive_majority_wins_over_negative() {
        let state = with_feedback("Great work, excellent copy, approved; one small fix later");
        assert_eq!(analyze_feedback(&state), FeedbackSentiment::Complete);
    }

    #[test]
    fn test_only_latest_feedback_is_inspected() {
        let mut state = with_feedback("revise everything, wrong tone");
        state.feedback.push("perfect, approved".to_string());
        assert_eq!(analyze_feedback(&state), FeedbackSentiment::Complete);
    }
}
