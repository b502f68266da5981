//! Shared campaign state threaded through every workflow stage.
//!
//! The state is exclusively owned by the workflow runner and handed to one
//! stage at a time. Stages never mutate it directly: they return a
//! [`StageDelta`] that the runner merges back, last-writer-wins per field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The campaign brief: an immutable key-value document supplied once at
/// workflow start (product, audience, goals, budget, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Brief(BTreeMap<String, Value>);

impl Brief {
    pub fn new(fields: BTreeMap<String, Value>) -> Self {
        Self(fields)
    }

    /// Look up a brief field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render the brief as `key: value` lines for inclusion in stage context.
    pub fn summary(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{}: {}", k, s),
                other => format!("{}: {}", k, other),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<'a, const N: usize> From<[(&'a str, &'a str); N]> for Brief {
    fn from(pairs: [(&'a str, &'a str); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect(),
        )
    }
}

/// The visual artifact: the authored image prompt plus the generated image
/// reference, if generation succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualAsset {
    /// Prompt handed to the image-generation service.
    pub image_prompt: String,
    /// Reference to the generated image; `None` when generation failed.
    pub image_url: Option<String>,
}

impl VisualAsset {
    /// A prompt that has been authored but not yet rendered.
    pub fn prompt_only(image_prompt: impl Into<String>) -> Self {
        Self {
            image_prompt: image_prompt.into(),
            image_url: None,
        }
    }
}

/// Well-known artifact slots, used for fan-out presence probes and quality
/// scoring. The names double as the keys shown in rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKey {
    Strategy,
    AudiencePersonas,
    CreativeConcepts,
    Copy,
    CtaOptimization,
    Visual,
    SocialMediaCampaign,
    EmotionPersonalization,
    MediaPlan,
    CampaignSummary,
    ClientSummary,
    CampaignWebsite,
}

impl ArtifactKey {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Strategy => "strategy",
            Self::AudiencePersonas => "audience_personas",
            Self::CreativeConcepts => "creative_concepts",
            Self::Copy => "copy",
            Self::CtaOptimization => "cta_optimization",
            Self::Visual => "visual",
            Self::SocialMediaCampaign => "social_media_campaign",
            Self::EmotionPersonalization => "emotion_personalization",
            Self::MediaPlan => "media_plan",
            Self::CampaignSummary => "campaign_summary",
            Self::ClientSummary => "client_summary",
            Self::CampaignWebsite => "campaign_website",
        }
    }

    /// Whether this slot is filled in the given artifact record.
    pub fn is_set(&self, artifacts: &Artifacts) -> bool {
        match self {
            Self::Strategy => artifacts.strategy.is_some(),
            Self::AudiencePersonas => artifacts.audience_personas.is_some(),
            Self::CreativeConcepts => artifacts.creative_concepts.is_some(),
            Self::Copy => artifacts.copy.is_some(),
            Self::CtaOptimization => artifacts.cta_optimization.is_some(),
            Self::Visual => artifacts.visual.is_some(),
            Self::SocialMediaCampaign => artifacts.social_media_campaign.is_some(),
            Self::EmotionPersonalization => artifacts.emotion_personalization.is_some(),
            Self::MediaPlan => artifacts.media_plan.is_some(),
            Self::CampaignSummary => artifacts.campaign_summary.is_some(),
            Self::ClientSummary => artifacts.client_summary.is_some(),
            Self::CampaignWebsite => artifacts.campaign_website.is_some(),
        }
    }
}

/// A borrowed view of one artifact slot, used for change detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArtifactEntry<'a> {
    Text(&'a str),
    Visual(&'a VisualAsset),
}

/// Generated campaign content, accumulated across the run.
///
/// Fields are only ever overwritten by a later pass through the producing
/// stage (a revision), never cleared. The `extra` map is an open extension
/// point for content that has no dedicated slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifacts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience_personas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creative_concepts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cta_optimization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual: Option<VisualAsset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_media_campaign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion_personalization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_website: Option<String>,
    /// Extension map for artifacts without a dedicated slot.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Artifacts {
    /// Shallow-merge a patch into this record: set fields in the patch
    /// overwrite, unset fields leave the existing value untouched.
    pub fn merge(&mut self, patch: Artifacts) {
        macro_rules! take {
            ($field:ident) => {
                if patch.$field.is_some() {
                    self.$field = patch.$field;
                }
            };
        }
        take!(strategy);
        take!(audience_personas);
        take!(creative_concepts);
        take!(copy);
        take!(cta_optimization);
        take!(visual);
        take!(social_media_campaign);
        take!(emotion_personalization);
        take!(media_plan);
        take!(campaign_summary);
        take!(client_summary);
        take!(campaign_website);
        self.extra.extend(patch.extra);
    }

    /// All filled slots, keyed by name. Extension-map entries are included
    /// so change detection sees them like any other artifact.
    pub fn entries(&self) -> Vec<(&str, ArtifactEntry<'_>)> {
        let mut out = Vec::new();
        macro_rules! push_text {
            ($field:ident) => {
                if let Some(v) = self.$field.as_deref() {
                    out.push((stringify!($field), ArtifactEntry::Text(v)));
                }
            };
        }
        push_text!(strategy);
        push_text!(audience_personas);
        push_text!(creative_concepts);
        push_text!(copy);
        push_text!(cta_optimization);
        if let Some(v) = self.visual.as_ref() {
            out.push(("visual", ArtifactEntry::Visual(v)));
        }
        push_text!(social_media_campaign);
        push_text!(emotion_personalization);
        push_text!(media_plan);
        push_text!(campaign_summary);
        push_text!(client_summary);
        push_text!(campaign_website);
        for (k, v) in &self.extra {
            out.push((k.as_str(), ArtifactEntry::Text(v)));
        }
        out
    }

    /// Number of filled slots.
    pub fn count(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// What a stage hands back to the runner after executing.
#[derive(Debug, Clone, Default)]
pub struct StageDelta {
    /// Artifact fields to merge into the state (unset fields are no-ops).
    pub artifacts: Artifacts,
    /// Review feedback to append, if the stage produced any.
    pub feedback: Option<String>,
    /// Free-text commentary (coordinator notes); logged, not stored.
    pub note: Option<String>,
}

impl StageDelta {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn artifacts(artifacts: Artifacts) -> Self {
        Self {
            artifacts,
            ..Self::default()
        }
    }

    pub fn feedback(text: impl Into<String>) -> Self {
        Self {
            feedback: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// The mutable record threaded through every stage of a campaign run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignState {
    /// Immutable after creation.
    pub brief: Brief,
    pub artifacts: Artifacts,
    /// Append-only review feedback, oldest first.
    pub feedback: Vec<String>,
    /// Number of revision loops dispatched by the coordinator.
    pub revision_count: u32,
    /// Snapshot taken by the change detector at the previous decision
    /// visit; overwritten on every visit.
    #[serde(skip)]
    pub previous_artifacts: Artifacts,
    /// Captured once at workflow creation.
    pub started_at: DateTime<Utc>,
}

impl CampaignState {
    pub fn new(brief: Brief) -> Self {
        Self {
            brief,
            artifacts: Artifacts::default(),
            feedback: Vec::new(),
            revision_count: 0,
            previous_artifacts: Artifacts::default(),
            started_at: Utc::now(),
        }
    }

    /// Merge a stage's delta into the state.
    pub fn apply(&mut self, delta: StageDelta) {
        self.artifacts.merge(delta.artifacts);
        if let Some(entry) = delta.feedback {
            self.feedback.push(entry);
        }
    }

    /// The most recent review feedback, if any.
    pub fn last_feedback(&self) -> Option<&str> {
        self.feedback.last().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overwrites_only_set_fields() {
        let mut base = Artifacts {
            strategy: Some("v1".into()),
            copy: Some("copy v1".into()),
            ..Default::default()
        };

        base.merge(Artifacts {
            strategy: Some("v2".into()),
            ..Default::default()
        });

        assert_eq!(base.strategy.as_deref(), Some("v2"));
        assert_eq!(base.copy.as_deref(), Some("copy v1"));
    }

    #[test]
    fn test_merge_never_clears() {
        let mut base = Artifacts {
            media_plan: Some("plan".into()),
            ..Default::default()
        };
        base.merge(Artifacts::default());
        assert_eq!(base.media_plan.as_deref(), Some("plan"));
    }

    #[test]
    fn test_visual_overwrite_replaces_whole_asset() {
        // A new prompt from the visual stage drops the stale image_url;
        // the designer re-renders on the next pass.
        let mut base = Artifacts {
            visual: Some(VisualAsset {
                image_prompt: "old".into(),
                image_url: Some("https://img/1".into()),
            }),
            ..Default::default()
        };
        base.merge(Artifacts {
            visual: Some(VisualAsset::prompt_only("new")),
            ..Default::default()
        });

        let visual = base.visual.unwrap();
        assert_eq!(visual.image_prompt, "new");
        assert!(visual.image_url.is_none());
    }

    #[test]
    fn test_entries_and_count() {
        let mut artifacts = Artifacts {
            strategy: Some("s".into()),
            visual: Some(VisualAsset::prompt_only("p")),
            ..Default::default()
        };
        artifacts.extra.insert("moodboard".into(), "m".into());

        let entries = artifacts.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(artifacts.count(), 3);
        assert!(entries.iter().any(|(k, _)| *k == "moodboard"));
    }

    #[test]
    fn test_artifact_key_is_set() {
        let artifacts = Artifacts {
            social_media_campaign: Some("x".into()),
            ..Default::default()
        };
        assert!(ArtifactKey::SocialMediaCampaign.is_set(&artifacts));
        assert!(!ArtifactKey::MediaPlan.is_set(&artifacts));
    }

    #[test]
    fn test_apply_appends_feedback() {
        let mut state = CampaignState::new(Brief::from([("product", "X")]));
        state.apply(StageDelta::feedback("looks fine"));
        state.apply(StageDelta::feedback("second pass"));

        assert_eq!(state.feedback.len(), 2);
        assert_eq!(state.last_feedback(), Some("second pass"));
    }

    #[test]
    fn test_brief_summary_renders_plain_strings() {
        let brief = Brief::from([("product", "Widget"), ("audience", "makers")]);
        let summary = brief.summary();
        assert!(summary.contains("product: Widget"));
        assert!(summary.contains("audience: makers"));
    }
}
