//! Generation and posting pipeline for herald.
//!
//! Two thin HTTP collaborators and the pipeline that composes them:
//! - [`ImageClient`] asks an OpenAI-style image API for an artifact
//! - [`PostClient`] submits a caption (plus optional media) to the
//!   posting service
//! - [`PublishPipeline`] runs generate-then-post for one theme and maps
//!   every failure to a typed [`herald_schedule::PublishOutcome`]

mod error;
mod generation;
mod pipeline;
mod posting;

pub use error::{GenerationError, PostError};
pub use generation::{ImageClient, ImageSize};
pub use pipeline::{Generate, Post, PublishPipeline};
pub use posting::PostClient;
