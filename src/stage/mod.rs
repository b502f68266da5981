//! Workflow stages: the polymorphic units of pipeline work.
//!
//! Every stage consumes the shared campaign state read-only and returns a
//! [`StageDelta`] for the runner to merge. A stage makes at most one
//! completion-service call per execution, funneled through the shared
//! [`ResilientCompleter`](crate::service::ResilientCompleter) so upstream
//! failures degrade to placeholder content instead of aborting the run.

mod content;
mod design;
mod output;
mod specialized;

pub use content::{
    CoordinatorStage, CopyStage, CreativeStage, CtaOptimizerStage, PersonaStage, StrategyStage,
    VisualPromptStage,
};
pub use design::DesignerStage;
pub use output::{CampaignSummaryStage, ClientSummaryStage, ReviewStage, WebsiteStage};
pub use specialized::{EmotionPersonalizationStage, MediaPlanStage, SocialMediaStage};

use crate::state::{CampaignState, StageDelta};
use async_trait::async_trait;

/// Node names used in the workflow graph.
pub mod node {
    pub const COORDINATOR: &str = "coordinator";
    pub const STRATEGY: &str = "strategy";
    pub const AUDIENCE_PERSONA: &str = "audience_persona";
    pub const CREATIVE: &str = "creative";
    pub const COPY: &str = "copy";
    pub const CTA_OPTIMIZER: &str = "cta_optimizer";
    pub const VISUAL: &str = "visual";
    pub const DESIGNER: &str = "designer";
    pub const SOCIAL_MEDIA: &str = "social_media";
    pub const EMOTION_PERSONALIZATION: &str = "emotion_personalization";
    pub const MEDIA_PLANNER: &str = "media_planner";
    pub const REVIEW: &str = "review";
    pub const CAMPAIGN_SUMMARY: &str = "campaign_summary";
    pub const CLIENT_SUMMARY: &str = "client_summary";
    pub const WEBSITE: &str = "website";
}

/// One unit of pipeline work.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Graph node name for this stage.
    fn id(&self) -> &'static str;

    /// Consume the state, produce a delta. Must not fail: upstream service
    /// trouble is absorbed and surfaces as degraded placeholder content.
    async fn execute(&self, state: &CampaignState) -> StageDelta;
}

/// Bound the artifact excerpts embedded in stage context so prompts stay a
/// manageable size.
pub(crate) fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::errors::ServiceError;
    use crate::service::{CircuitBreaker, CompletionService, ResilientCompleter, RetryPolicy};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    /// Completion service that always returns the same text.
    pub struct StaticService(pub String);

    #[async_trait]
    impl CompletionService for StaticService {
        async fn complete(&self, _role: &str, _context: &str) -> Result<String, ServiceError> {
            Ok(self.0.clone())
        }
    }

    /// Completion service that always fails.
    pub struct DownService;

    #[async_trait]
    impl CompletionService for DownService {
        async fn complete(&self, _role: &str, _context: &str) -> Result<String, ServiceError> {
            Err(ServiceError::Transport("connection refused".into()))
        }
    }

    pub fn completer_returning(reply: &str) -> ResilientCompleter {
        ResilientCompleter::new(
            Arc::new(StaticService(reply.to_string())),
            Arc::new(CircuitBreaker::default()),
            fast_retry(),
        )
    }

    pub fn failing_completer() -> ResilientCompleter {
        ResilientCompleter::new(
            Arc::new(DownService),
            Arc::new(CircuitBreaker::default()),
            fast_retry(),
        )
    }

    pub fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 1,
            initial_delay: Duration::from_millis(1),
        }
    }
}
