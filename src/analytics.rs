//! Per-run campaign analytics: artifact output sizes across iterations and
//! a simple end-of-run report. Observability only; nothing here feeds back
//! into routing.

use crate::state::{ArtifactEntry, CampaignState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Output sizes below this average trigger a recommendation.
const THIN_OUTPUT_CHARS: usize = 100;

/// End-of-run analytics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub iterations: u32,
    pub summary: String,
    pub recommendations: Vec<String>,
    /// Character counts per artifact slot, one entry per tracked iteration.
    pub output_sizes: BTreeMap<String, Vec<usize>>,
}

/// Tracks artifact growth across decision-point iterations.
#[derive(Debug, Default)]
pub struct CampaignAnalytics {
    iterations: u32,
    output_sizes: BTreeMap<String, Vec<usize>>,
}

impl CampaignAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the size of every present artifact for this iteration.
    pub fn track_iteration(&mut self, state: &CampaignState) {
        self.iterations += 1;
        for (key, entry) in state.artifacts.entries() {
            let size = match entry {
                ArtifactEntry::Text(text) => text.len(),
                ArtifactEntry::Visual(visual) => visual.image_prompt.len(),
            };
            self.output_sizes.entry(key.to_string()).or_default().push(size);
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Produce the report: iteration count plus thin-output flags.
    pub fn report(&self) -> AnalyticsReport {
        let mut recommendations = Vec::new();
        for (key, sizes) in &self.output_sizes {
            if sizes.is_empty() {
                continue;
            }
            let avg = sizes.iter().sum::<usize>() / sizes.len();
            if avg < THIN_OUTPUT_CHARS {
                recommendations.push(format!(
                    "Output for '{key}' averaged {avg} characters; consider richer input \
                     to that stage"
                ));
            }
        }

        AnalyticsReport {
            iterations: self.iterations,
            summary: format!("Campaign generated in {} iterations", self.iterations),
            recommendations,
            output_sizes: self.output_sizes.clone(),
        }
    }
}
