//! Core content stages: coordination, strategy, personas, creative
//! concepts, copy, CTA optimization, and visual-prompt authoring.

use crate::service::ResilientCompleter;
use crate::stage::{Stage, clip, node};
use crate::state::{Artifacts, CampaignState, StageDelta, VisualAsset};
use async_trait::async_trait;
use tracing::debug;

const EXCERPT_CHARS: usize = 4000;

/// Coordinates the workflow: reviews the current state and comments on
/// next steps. Writes no artifacts; the graph re-enters this node at the
/// decision point after every review pass.
pub struct CoordinatorStage {
    completer: ResilientCompleter,
}

impl CoordinatorStage {
    pub fn new(completer: ResilientCompleter) -> Self {
        Self { completer }
    }

    const ROLE: &'static str = "You are the project manager coordinating a marketing \
        campaign build. Assess the current state of the work and describe what should \
        happen next, calling out areas that look thin.";
}

#[async_trait]
impl Stage for CoordinatorStage {
    fn id(&self) -> &'static str {
        node::COORDINATOR
    }

    async fn execute(&self, state: &CampaignState) -> StageDelta {
        debug!(
            revisions = state.revision_count,
            feedback = state.feedback.len(),
            "coordinator pass"
        );
        let context = format!(
            "Campaign brief:\n{}\n\nArtifacts so far: {}. Feedback entries: {}. \
             Revisions dispatched: {}. What should happen next?",
            state.brief.summary(),
            state.artifacts.count(),
            state.feedback.len(),
            state.revision_count,
        );
        let done = self.completer.complete(Self::ROLE, &context, "coordination").await;
        StageDelta::empty().with_note(done.text)
    }
}

/// Analyzes the brief and produces strategic direction.
pub struct StrategyStage {
    completer: ResilientCompleter,
}

impl StrategyStage {
    pub fn new(completer: ResilientCompleter) -> Self {
        Self { completer }
    }

    const ROLE: &'static str = "You are the strategy team for a marketing campaign. \
        Analyze the campaign requirements and recommend targeting, messaging and \
        positioning with actionable insights.";
}

#[async_trait]
impl Stage for StrategyStage {
    fn id(&self) -> &'static str {
        node::STRATEGY
    }

    async fn execute(&self, state: &CampaignState) -> StageDelta {
        let context = format!("Analyze this campaign brief:\n{}", state.brief.summary());
        let done = self
            .completer
            .complete(Self::ROLE, &context, "campaign strategy")
            .await;
        StageDelta::artifacts(Artifacts {
            strategy: Some(done.text),
            ..Default::default()
        })
    }
}

/// Builds audience personas from the brief and strategy.
pub struct PersonaStage {
    completer: ResilientCompleter,
}

impl PersonaStage {
    pub fn new(completer: ResilientCompleter) -> Self {
        Self { completer }
    }

    const ROLE: &'static str = "You are the audience research team. Build detailed \
        audience personas: demographics, motivations, objections and preferred channels.";
}

#[async_trait]
impl Stage for PersonaStage {
    fn id(&self) -> &'static str {
        node::AUDIENCE_PERSONA
    }

    async fn execute(&self, state: &CampaignState) -> StageDelta {
        let strategy = state.artifacts.strategy.as_deref().unwrap_or_default();
        let context = format!(
            "Campaign brief:\n{}\n\nStrategy:\n{}\n\nBuild the audience personas.",
            state.brief.summary(),
            clip(strategy, EXCERPT_CHARS),
        );
        let done = self
            .completer
            .complete(Self::ROLE, &context, "audience personas")
            .await;
        StageDelta::artifacts(Artifacts {
            audience_personas: Some(done.text),
            ..Default::default()
        })
    }
}

/// Generates creative concepts aligned with the strategy.
pub struct CreativeStage {
    completer: ResilientCompleter,
}

impl CreativeStage {
    pub fn new(completer: ResilientCompleter) -> Self {
        Self { completer }
    }

    const ROLE: &'static str = "You are the creative team. Generate compelling campaign \
        concepts aligned with the strategy, including visual direction and thematic \
        elements.";
}

#[async_trait]
impl Stage for CreativeStage {
    fn id(&self) -> &'static str {
        node::CREATIVE
    }

    async fn execute(&self, state: &CampaignState) -> StageDelta {
        let strategy = state.artifacts.strategy.as_deref().unwrap_or_default();
        let context = format!(
            "Based on this strategy:\n{}\n\nGenerate the creative concepts.",
            clip(strategy, EXCERPT_CHARS),
        );
        let done = self
            .completer
            .complete(Self::ROLE, &context, "creative concepts")
            .await;
        StageDelta::artifacts(Artifacts {
            creative_concepts: Some(done.text),
            ..Default::default()
        })
    }
}

/// Writes the campaign copy from the creative concepts.
pub struct CopyStage {
    completer: ResilientCompleter,
}

impl CopyStage {
    pub fn new(completer: ResilientCompleter) -> Self {
        Self { completer }
    }

    const ROLE: &'static str = "You are the copywriting team. Write engaging headlines, \
        body copy and calls-to-action aligned with the creative concepts, persuasive and \
        on-brand.";
}

#[async_trait]
impl Stage for CopyStage {
    fn id(&self) -> &'static str {
        node::COPY
    }

    async fn execute(&self, state: &CampaignState) -> StageDelta {
        let concepts = state
            .artifacts
            .creative_concepts
            .as_deref()
            .unwrap_or_default();
        let context = format!(
            "Based on these concepts:\n{}\n\nWrite the campaign copy.",
            clip(concepts, EXCERPT_CHARS),
        );
        let done = self
            .completer
            .complete(Self::ROLE, &context, "campaign copy")
            .await;
        StageDelta::artifacts(Artifacts {
            copy: Some(done.text),
            ..Default::default()
        })
    }
}

/// Optimizes the calls-to-action in the drafted copy.
pub struct CtaOptimizerStage {
    completer: ResilientCompleter,
}

impl CtaOptimizerStage {
    pub fn new(completer: ResilientCompleter) -> Self {
        Self { completer }
    }

    const ROLE: &'static str = "You are the conversion optimization specialist. Review \
        the campaign copy and produce optimized call-to-action variants with placement \
        and wording recommendations.";
}

#[async_trait]
impl Stage for CtaOptimizerStage {
    fn id(&self) -> &'static str {
        node::CTA_OPTIMIZER
    }

    async fn execute(&self, state: &CampaignState) -> StageDelta {
        let copy = state.artifacts.copy.as_deref().unwrap_or_default();
        let personas = state
            .artifacts
            .audience_personas
            .as_deref()
            .unwrap_or_default();
        let context = format!(
            "Campaign copy:\n{}\n\nAudience personas:\n{}\n\nOptimize the calls-to-action.",
            clip(copy, EXCERPT_CHARS),
            clip(personas, EXCERPT_CHARS),
        );
        let done = self
            .completer
            .complete(Self::ROLE, &context, "cta optimization")
            .await;
        StageDelta::artifacts(Artifacts {
            cta_optimization: Some(done.text),
            ..Default::default()
        })
    }
}

/// Authors the image-generation prompt from the copy and concepts.
///
/// Writes a fresh [`VisualAsset`] with no image reference; the designer
/// stage renders it in the next step (and re-renders after revisions).
pub struct VisualPromptStage {
    completer: ResilientCompleter,
}

impl VisualPromptStage {
    pub fn new(completer: ResilientCompleter) -> Self {
        Self { completer }
    }

    const ROLE: &'static str = "You are the visual design lead. Author a single vivid \
        image-generation prompt describing the campaign's hero visual in concrete visual \
        terms, under 3800 characters.";
}

#[async_trait]
impl Stage for VisualPromptStage {
    fn id(&self) -> &'static str {
        node::VISUAL
    }

    async fn execute(&self, state: &CampaignState) -> StageDelta {
        let copy = state.artifacts.copy.as_deref().unwrap_or_default();
        let concepts = state
            .artifacts
            .creative_concepts
            .as_deref()
            .unwrap_or_default();
        let context = format!(
            "Copy:\n{}\n\nConcepts:\n{}\n\nAuthor the image prompt.",
            clip(copy, EXCERPT_CHARS),
            clip(concepts, EXCERPT_CHARS),
        );
        let done = self
            .completer
            .complete(Self::ROLE, &context, "visual prompt")
            .await;
        StageDelta::artifacts(Artifacts {
            visual: Some(VisualAsset::prompt_only(done.text)),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::testing::{completer_returning, failing_completer};
    use crate::state::Brief;

    fn state() -> CampaignState {
        CampaignState::new(Brief::from([("product", "Solar kettle")]))
    }

    #[tokio::test]
    async fn test_strategy_stage_writes_strategy() {
        let stage = StrategyStage::new(completer_returning("target early adopters"));
        let delta = stage.execute(&state()).await;
        assert_eq!(delta.artifacts.strategy.as_deref(), Some("target early adopters"));
        assert!(delta.feedback.is_none());
    }

    #[tokio::test]
    async fn test_coordinator_writes_no_artifacts() {
        let stage = CoordinatorStage::new(completer_returning("proceed"));
        let delta = stage.execute(&state()).await;
        assert!(delta.artifacts.is_empty());
        assert_eq!(delta.note.as_deref(), Some("proceed"));
    }

    #[tokio::test]
    async fn test_visual_prompt_has_no_image_url() {
        let stage = VisualPromptStage::new(completer_returning("a kettle at sunrise"));
        let delta = stage.execute(&state()).await;
        let visual = delta.artifacts.visual.unwrap();
        assert_eq!(visual.image_prompt, "a kettle at sunrise");
        assert!(visual.image_url.is_none());
    }

    #[tokio::test]
    async fn test_degraded_stage_still_returns_artifact() {
        let stage = CopyStage::new(failing_completer());
        let delta = stage.execute(&state()).await;
        let copy = delta.artifacts.copy.unwrap();
        assert!(copy.contains("[placeholder]"));
    }

    #[tokio::test]
    async fn test_stage_ids_match_node_names() {
        assert_eq!(StrategyStage::new(completer_returning("x")).id(), "strategy");
        assert_eq!(CopyStage::new(completer_returning("x")).id(), "copy");
        assert_eq!(VisualPromptStage::new(completer_returning("x")).id(), "visual");
    }
}
