//! The publish pipeline: generate, then post.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use herald_schedule::{FailureReason, PublishOutcome, Theme};

use crate::{GenerationError, ImageClient, ImageSize, PostClient, PostError};

/// Seam for the generation collaborator.
#[async_trait]
pub trait Generate: Send + Sync {
    async fn generate(&self, prompt: &str, size: ImageSize) -> Result<Vec<u8>, GenerationError>;
    async fn alive(&self) -> bool;
}

/// Seam for the posting collaborator.
#[async_trait]
pub trait Post: Send + Sync {
    async fn post(&self, caption: &str, artifact: Option<&[u8]>) -> Result<(), PostError>;
    async fn alive(&self) -> bool;
}

#[async_trait]
impl Generate for ImageClient {
    async fn generate(&self, prompt: &str, size: ImageSize) -> Result<Vec<u8>, GenerationError> {
        ImageClient::generate(self, prompt, size).await
    }

    async fn alive(&self) -> bool {
        ImageClient::alive(self).await
    }
}

#[async_trait]
impl Post for PostClient {
    async fn post(&self, caption: &str, artifact: Option<&[u8]>) -> Result<(), PostError> {
        PostClient::post(self, caption, artifact).await
    }

    async fn alive(&self) -> bool {
        PostClient::alive(self).await
    }
}

/// Runs generate-then-post for one theme.
///
/// Neither step is retried; a failed step yields a failed outcome and the
/// next opportunity is the next scheduled occurrence. Errors never escape
/// as faults: every path returns a typed [`PublishOutcome`].
pub struct PublishPipeline<G, P> {
    generator: G,
    poster: P,
    size: ImageSize,
}

impl<G: Generate, P: Post> PublishPipeline<G, P> {
    pub fn new(generator: G, poster: P, size: ImageSize) -> Self {
        Self {
            generator,
            poster,
            size,
        }
    }

    /// Publish one themed post. `now` is the zone-local fire time used in
    /// the caption.
    pub async fn publish(&self, theme: &Theme, now: DateTime<Tz>) -> PublishOutcome {
        let timestamp: DateTime<Utc> = now.with_timezone(&Utc);

        let prompt = format!("Generate an image themed '{theme}'");
        let artifact = match self.generator.generate(&prompt, self.size).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(theme = %theme, error = %e, "artifact generation failed");
                return PublishOutcome::failure(
                    theme.clone(),
                    timestamp,
                    FailureReason::GenerationFailed,
                );
            }
        };

        let caption = format!("{theme} - scheduled post {}", now.format("%Y-%m-%d %H:%M"));
        match self.poster.post(&caption, Some(&artifact)).await {
            Ok(()) => PublishOutcome::success(theme.clone(), timestamp),
            Err(e) => {
                warn!(theme = %theme, error = %e, "post submission failed");
                PublishOutcome::failure(theme.clone(), timestamp, FailureReason::PostFailed)
            }
        }
    }

    /// Opportunistic reachability of (generation, posting), for status.
    pub async fn provider_liveness(&self) -> (bool, bool) {
        tokio::join!(self.generator.alive(), self.poster.alive())
    }
}
