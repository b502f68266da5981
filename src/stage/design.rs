//! Image rendering: turns the authored visual prompt into a generated
//! image reference.

use crate::service::ImageService;
use crate::stage::{Stage, node};
use crate::state::{Artifacts, CampaignState, StageDelta, VisualAsset};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Calls the image-generation service with the prompt authored by the
/// visual stage. The only stage that touches the image service.
///
/// On failure the stage stores the attempted prompt with
/// `image_url: None` and the workflow continues; image trouble never
/// aborts a run.
pub struct DesignerStage {
    images: Arc<dyn ImageService>,
}

impl DesignerStage {
    pub fn new(images: Arc<dyn ImageService>) -> Self {
        Self { images }
    }
}

#[async_trait]
impl Stage for DesignerStage {
    fn id(&self) -> &'static str {
        node::DESIGNER
    }

    async fn execute(&self, state: &CampaignState) -> StageDelta {
        let Some(prompt) = state
            .artifacts
            .visual
            .as_ref()
            .map(|v| v.image_prompt.clone())
        else {
            warn!("designer entered without an image prompt; nothing to render");
            return StageDelta::empty();
        };

        let image_url = match self.images.generate_image(&prompt).await {
            Ok(url) => {
                info!(%url, "image generated");
                Some(url)
            }
            Err(err) => {
                warn!(error = %err, "image generation failed; continuing without an image");
                None
            }
        };

        StageDelta::artifacts(Artifacts {
            visual: Some(VisualAsset { image_prompt: prompt, image_url }),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ServiceError;
    use crate::state::Brief;

    struct FixedImageService(Result<String, ()>);

    #[async_trait]
    impl ImageService for FixedImageService {
        async fn generate_image(&self, _prompt: &str) -> Result<String, ServiceError> {
            self.0
                .clone()
                .map_err(|_| ServiceError::Transport("image backend down".into()))
        }
    }

    fn state_with_prompt() -> CampaignState {
        let mut state = CampaignState::new(Brief::from([("product", "X")]));
        state.artifacts.visual = Some(VisualAsset::prompt_only("a kettle at sunrise"));
        state
    }

    #[tokio::test]
    async fn test_success_stores_url_and_prompt() {
        let stage = DesignerStage::new(Arc::new(FixedImageService(Ok("https://img/1".into()))));
        let delta = stage.execute(&state_with_prompt()).await;

        let visual = delta.artifacts.visual.unwrap();
        assert_eq!(visual.image_prompt, "a kettle at sunrise");
        assert_eq!(visual.image_url.as_deref(), Some("https://img/1"));
    }

    #[tokio::test]
    async fn test_failure_stores_prompt_without_url() {
        let stage = DesignerStage::new(Arc::new(FixedImageService(Err(()))));
        let delta = stage.execute(&state_with_prompt()).await;

        let visual = delta.artifacts.visual.unwrap();
        assert_eq!(visual.image_prompt, "a kettle at sunrise");
        assert!(visual.image_url.is_none());
    }

    #[tokio::test]
    async fn test_missing_prompt_is_a_noop() {
        let stage = DesignerStage::new(Arc::new(FixedImageService(Ok("https://img/1".into()))));
        let state = CampaignState::new(Brief::from([("product", "X")]));
        let delta = stage.execute(&state).await;
        assert!(delta.artifacts.is_empty());
    }
}
