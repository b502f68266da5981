//! Fan-out branch stages: social media, emotion personalization and media
//! planning. Mutually independent; each reads only artifacts produced
//! before the fan-out point, so they may run in any order.

use crate::service::ResilientCompleter;
use crate::stage::{Stage, clip, node};
use crate::state::{Artifacts, CampaignState, StageDelta};
use async_trait::async_trait;

const EXCERPT_CHARS: usize = 3000;

/// Platform-specific social campaign planning.
pub struct SocialMediaStage {
    completer: ResilientCompleter,
}

impl SocialMediaStage {
    pub fn new(completer: ResilientCompleter) -> Self {
        Self { completer }
    }

    const ROLE: &'static str = "You are the social media campaign specialist. Develop \
        platform-specific strategies for short-form video and feed placements: content \
        ideas, hashtags, posting cadence and engagement tactics aligned with the \
        campaign.";
}

#[async_trait]
impl Stage for SocialMediaStage {
    fn id(&self) -> &'static str {
        node::SOCIAL_MEDIA
    }

    async fn execute(&self, state: &CampaignState) -> StageDelta {
        let artifacts = &state.artifacts;
        let context = format!(
            "Campaign brief:\n{}\n\nStrategy:\n{}\n\nPersonas:\n{}\n\nCopy:\n{}\n\n\
             Develop the social media campaign.",
            state.brief.summary(),
            clip(artifacts.strategy.as_deref().unwrap_or_default(), EXCERPT_CHARS),
            clip(
                artifacts.audience_personas.as_deref().unwrap_or_default(),
                EXCERPT_CHARS
            ),
            clip(artifacts.copy.as_deref().unwrap_or_default(), EXCERPT_CHARS),
        );
        let done = self
            .completer
            .complete(Self::ROLE, &context, "social media campaign")
            .await;
        StageDelta::artifacts(Artifacts {
            social_media_campaign: Some(done.text),
            ..Default::default()
        })
    }
}

/// Emotion-segmented message personalization.
pub struct EmotionPersonalizationStage {
    completer: ResilientCompleter,
}

impl EmotionPersonalizationStage {
    pub fn new(completer: ResilientCompleter) -> Self {
        Self { completer }
    }

    const ROLE: &'static str = "You are the personalization specialist. Produce message \
        variants tailored to distinct emotional states of the audience (joyful, anxious, \
        curious, confident, ...), with tone and call-to-action adjustments for each.";
}

#[async_trait]
impl Stage for EmotionPersonalizationStage {
    fn id(&self) -> &'static str {
        node::EMOTION_PERSONALIZATION
    }

    async fn execute(&self, state: &CampaignState) -> StageDelta {
        let artifacts = &state.artifacts;
        let context = format!(
            "Campaign brief:\n{}\n\nCopy:\n{}\n\nCTA guidance:\n{}\n\nPersonas:\n{}\n\n\
             Produce the emotion-personalized variants.",
            state.brief.summary(),
            clip(artifacts.copy.as_deref().unwrap_or_default(), EXCERPT_CHARS),
            clip(
                artifacts.cta_optimization.as_deref().unwrap_or_default(),
                EXCERPT_CHARS
            ),
            clip(
                artifacts.audience_personas.as_deref().unwrap_or_default(),
                EXCERPT_CHARS
            ),
        );
        let done = self
            .completer
            .complete(Self::ROLE, &context, "emotion personalization")
            .await;
        StageDelta::artifacts(Artifacts {
            emotion_personalization: Some(done.text),
            ..Default::default()
        })
    }
}

/// Channel mix and budget allocation.
pub struct MediaPlanStage {
    completer: ResilientCompleter,
}

impl MediaPlanStage {
    pub fn new(completer: ResilientCompleter) -> Self {
        Self { completer }
    }

    const ROLE: &'static str = "You are the media planning specialist. Recommend the \
        most effective distribution channels with budget allocation and reasoning, \
        given the campaign requirements and audience.";
}

#[async_trait]
impl Stage for MediaPlanStage {
    fn id(&self) -> &'static str {
        node::MEDIA_PLANNER
    }

    async fn execute(&self, state: &CampaignState) -> StageDelta {
        let personas = state
            .artifacts
            .audience_personas
            .as_deref()
            .unwrap_or_default();
        let context = format!(
            "Campaign brief:\n{}\n\nAudience personas:\n{}\n\nRecommend the media mix.",
            state.brief.summary(),
            clip(personas, EXCERPT_CHARS),
        );
        let done = self.completer.complete(Self::ROLE, &context, "media plan").await;
        StageDelta::artifacts(Artifacts {
            media_plan: Some(done.text),
            ..Default::default()
        })
    }
}
