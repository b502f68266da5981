//! External collaborators: the text-completion and image-generation
//! services every stage depends on.
//!
//! The core treats both as opaque. Stages reach the completion service
//! through [`ResilientCompleter`], which layers retry, circuit breaking,
//! and placeholder fallback on top of the raw trait so that no upstream
//! failure ever escapes a stage.

mod breaker;
mod http;
mod resilient;

pub use breaker::CircuitBreaker;
pub use http::{HttpImageService, HttpTextService};
pub use resilient::{Completion, ResilientCompleter, RetryPolicy};

use crate::errors::ServiceError;
use async_trait::async_trait;

/// Text-completion service: given a role-scoped instruction and context,
/// return generated text.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, role_instruction: &str, context: &str)
    -> Result<String, ServiceError>;
}

/// Image-generation service: given a textual prompt, return an image
/// reference.
#[async_trait]
pub trait ImageService: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<String, ServiceError>;
}
