//! Workflow graph: topology declaration and execution.
//!
//! Two components:
//!
//! 1. **Builder** - declares stages, static edges, the presence-routed
//!    fan-out region and the single decision node, and validates the
//!    topology up front ([`GraphBuilder`]).
//! 2. **Runner** - drives the graph node by node, consulting the revision
//!    router at the decision point ([`WorkflowRunner`]).
//!
//! [`build_campaign_graph`] wires the standard campaign pipeline:
//!
//! ```text
//! coordinator -> strategy -> audience_persona -> creative -> copy
//!   -> cta_optimizer -> visual -> designer
//!   -> fan-out [social_media, emotion_personalization, media_planner]
//!   -> review -> coordinator (decision)
//!        revise   -> strategy | creative | copy | visual
//!        complete -> campaign_summary -> client_summary -> website -> END
//! ```

mod builder;
mod runner;

pub use builder::{Decision, EdgeTarget, FanOut, GraphBuilder, WorkflowGraph};
pub use runner::{CampaignRun, RunEvent, WorkflowRunner};

use crate::errors::GraphError;
use crate::service::{ImageService, ResilientCompleter};
use crate::stage::{
    CampaignSummaryStage, ClientSummaryStage, CoordinatorStage, CopyStage, CreativeStage,
    CtaOptimizerStage, DesignerStage, EmotionPersonalizationStage, MediaPlanStage, PersonaStage,
    ReviewStage, SocialMediaStage, StrategyStage, VisualPromptStage, WebsiteStage, node,
};
use crate::state::ArtifactKey;
use std::sync::Arc;

/// Build the standard campaign workflow.
///
/// All completion-backed stages share the given resilient completer (and
/// through it one circuit breaker); the designer is the only stage holding
/// the image service.
pub fn build_campaign_graph(
    completer: ResilientCompleter,
    images: Arc<dyn ImageService>,
) -> Result<WorkflowGraph, GraphError> {
    GraphBuilder::new(node::COORDINATOR)
        .add_stage(Box::new(CoordinatorStage::new(completer.clone())))
        .add_stage(Box::new(StrategyStage::new(completer.clone())))
        .add_stage(Box::new(PersonaStage::new(completer.clone())))
        .add_stage(Box::new(CreativeStage::new(completer.clone())))
        .add_stage(Box::new(CopyStage::new(completer.clone())))
        .add_stage(Box::new(CtaOptimizerStage::new(completer.clone())))
        .add_stage(Box::new(VisualPromptStage::new(completer.clone())))
        .add_stage(Box::new(DesignerStage::new(images)))
        .add_stage(Box::new(SocialMediaStage::new(completer.clone())))
        .add_stage(Box::new(EmotionPersonalizationStage::new(completer.clone())))
        .add_stage(Box::new(MediaPlanStage::new(completer.clone())))
        .add_stage(Box::new(ReviewStage::new(completer.clone())))
        .add_stage(Box::new(CampaignSummaryStage::new(completer.clone())))
        .add_stage(Box::new(ClientSummaryStage::new(completer.clone())))
        .add_stage(Box::new(WebsiteStage::new(completer)))
        .edge(node::STRATEGY, node::AUDIENCE_PERSONA)
        .edge(node::AUDIENCE_PERSONA, node::CREATIVE)
        .edge(node::CREATIVE, node::COPY)
        .edge(node::COPY, node::CTA_OPTIMIZER)
        .edge(node::CTA_OPTIMIZER, node::VISUAL)
        .edge(node::VISUAL, node::DESIGNER)
        .fan_out(
            node::DESIGNER,
            &[
                (node::SOCIAL_MEDIA, ArtifactKey::SocialMediaCampaign),
                (
                    node::EMOTION_PERSONALIZATION,
                    ArtifactKey::EmotionPersonalization,
                ),
                (node::MEDIA_PLANNER, ArtifactKey::MediaPlan),
            ],
            node::REVIEW,
        )
        .edge(node::REVIEW, node::COORDINATOR)
        .decision(
            node::COORDINATOR,
            &[node::STRATEGY, node::CREATIVE, node::COPY, node::VISUAL],
            node::STRATEGY,
            EdgeTarget::Node(node::CAMPAIGN_SUMMARY.to_string()),
        )
        .edge(node::CAMPAIGN_SUMMARY, node::CLIENT_SUMMARY)
        .edge(node::CLIENT_SUMMARY, node::WEBSITE)
        .edge_to_end(node::WEBSITE)
        .build()
}
