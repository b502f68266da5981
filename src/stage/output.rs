//! Review and output stages: the feedback-producing reviewer, the two
//! summaries and the campaign website.

use crate::service::ResilientCompleter;
use crate::stage::{Stage, clip, node};
use crate::state::{Artifacts, CampaignState, StageDelta};
use async_trait::async_trait;

const EXCERPT_CHARS: usize = 3000;

fn artifact_overview(artifacts: &Artifacts) -> String {
    let mut sections = Vec::new();
    macro_rules! section {
        ($field:ident, $title:expr) => {
            if let Some(v) = artifacts.$field.as_deref() {
                sections.push(format!("## {}\n{}", $title, clip(v, EXCERPT_CHARS)));
            }
        };
    }
    section!(strategy, "Strategy");
    section!(audience_personas, "Audience personas");
    section!(creative_concepts, "Creative concepts");
    section!(copy, "Copy");
    section!(cta_optimization, "CTA optimization");
    if let Some(v) = artifacts.visual.as_ref() {
        sections.push(format!(
            "## Visual\nprompt: {}\nimage: {}",
            clip(&v.image_prompt, EXCERPT_CHARS),
            v.image_url.as_deref().unwrap_or("(not rendered)"),
        ));
    }
    section!(social_media_campaign, "Social media campaign");
    section!(emotion_personalization, "Emotion personalization");
    section!(media_plan, "Media plan");
    sections.join("\n\n")
}

/// Reviews the assembled campaign and appends feedback. The only stage
/// that writes to the feedback log; it always produces an entry, even
/// degraded, so the decision point always has something to act on.
pub struct ReviewStage {
    completer: ResilientCompleter,
}

impl ReviewStage {
    pub fn new(completer: ResilientCompleter) -> Self {
        Self { completer }
    }

    const ROLE: &'static str = "You are the campaign review team. Critique the \
        assembled campaign for coherence, audience fit and completeness. Be direct: \
        say what works and what should be reworked, naming the area (copy, visual, \
        strategy, creative).";
}

#[async_trait]
impl Stage for ReviewStage {
    fn id(&self) -> &'static str {
        node::REVIEW
    }

    async fn execute(&self, state: &CampaignState) -> StageDelta {
        let context = format!(
            "Campaign brief:\n{}\n\n{}\n\nReview the campaign.",
            state.brief.summary(),
            artifact_overview(&state.artifacts),
        );
        let done = self
            .completer
            .complete(Self::ROLE, &context, "campaign review")
            .await;
        StageDelta::feedback(done.text)
    }
}

/// Internal-facing summary of everything that was produced.
pub struct CampaignSummaryStage {
    completer: ResilientCompleter,
}

impl CampaignSummaryStage {
    pub fn new(completer: ResilientCompleter) -> Self {
        Self { completer }
    }

    const ROLE: &'static str = "You are the campaign documentation lead. Summarize the \
        finished campaign: strategy, creative direction, assets and distribution, in a \
        form the delivery team can work from.";
}

#[async_trait]
impl Stage for CampaignSummaryStage {
    fn id(&self) -> &'static str {
        node::CAMPAIGN_SUMMARY
    }

    async fn execute(&self, state: &CampaignState) -> StageDelta {
        let feedback_trail = state.feedback.join(" | ");
        let context = format!(
            "{}\n\nReview trail:\n{}\n\nWrite the campaign summary.",
            artifact_overview(&state.artifacts),
            clip(&feedback_trail, EXCERPT_CHARS),
        );
        let done = self
            .completer
            .complete(Self::ROLE, &context, "campaign summary")
            .await;
        StageDelta::artifacts(Artifacts {
            campaign_summary: Some(done.text),
            ..Default::default()
        })
    }
}

/// Executive-level client summary: business value, outcomes, ROI.
pub struct ClientSummaryStage {
    completer: ResilientCompleter,
}

impl ClientSummaryStage {
    pub fn new(completer: ResilientCompleter) -> Self {
        Self { completer }
    }

    const ROLE: &'static str = "You are the client communications specialist. Write an \
        executive summary for the client: value proposition, expected outcomes and ROI \
        projections, in business terms.";
}

#[async_trait]
impl Stage for ClientSummaryStage {
    fn id(&self) -> &'static str {
        node::CLIENT_SUMMARY
    }

    async fn execute(&self, state: &CampaignState) -> StageDelta {
        let artifacts = &state.artifacts;
        let context = format!(
            "Campaign brief:\n{}\n\nStrategy:\n{}\n\nMedia plan:\n{}\n\nCTA guidance:\n{}\n\n\
             Write the client summary.",
            state.brief.summary(),
            clip(artifacts.strategy.as_deref().unwrap_or_default(), EXCERPT_CHARS),
            clip(artifacts.media_plan.as_deref().unwrap_or_default(), EXCERPT_CHARS),
            clip(
                artifacts.cta_optimization.as_deref().unwrap_or_default(),
                EXCERPT_CHARS
            ),
        );
        let done = self
            .completer
            .complete(Self::ROLE, &context, "client summary")
            .await;
        StageDelta::artifacts(Artifacts {
            client_summary: Some(done.text),
            ..Default::default()
        })
    }
}

/// Produces the single-page campaign website markup.
pub struct WebsiteStage {
    completer: ResilientCompleter,
}

impl WebsiteStage {
    pub fn new(completer: ResilientCompleter) -> Self {
        Self { completer }
    }

    const ROLE: &'static str = "You are the web developer. Produce a complete, \
        self-contained single-page HTML document presenting the campaign: hero section \
        with the generated image, the copy, and the calls-to-action.";
}

#[async_trait]
impl Stage for WebsiteStage {
    fn id(&self) -> &'static str {
        node::WEBSITE
    }

    async fn execute(&self, state: &CampaignState) -> StageDelta {
        let artifacts = &state.artifacts;
        let image = artifacts
            .visual
            .as_ref()
            .and_then(|v| v.image_url.as_deref())
            .unwrap_or("(no image)");
        let context = format!(
            "Copy:\n{}\n\nCTA guidance:\n{}\n\nHero image: {}\n\nSummary:\n{}\n\n\
             Produce the campaign website.",
            clip(artifacts.copy.as_deref().unwrap_or_default(), EXCERPT_CHARS),
            clip(
                artifacts.cta_optimization.as_deref().unwrap_or_default(),
                EXCERPT_CHARS
            ),
            image,
            clip(
                artifacts.campaign_summary.as_deref().unwrap_or_default(),
                EXCERPT_CHARS
            ),
        );
        let done = self
            .completer
            .complete(Self::ROLE, &context, "campaign website")
            .await;
        StageDelta::artifacts(Artifacts {
            campaign_website: Some(done.text),
            ..Default::default()
        })
    }
}
