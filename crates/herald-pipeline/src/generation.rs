//! Image generation client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::GenerationError;

/// Supported artifact dimensions, in the generation API's notation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageSize {
    Square256,
    Square512,
    #[default]
    Square1024,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square256 => "256x256",
            Self::Square512 => "512x512",
            Self::Square1024 => "1024x1024",
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: String,
}

/// Client for an OpenAI-style image generation API.
///
/// Generation is two-step: the API returns a URL for the rendered image,
/// and the artifact bytes are fetched from that URL.
pub struct ImageClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl ImageClient {
    /// Create a client with the given request timeout applied to every call.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Generate one image for the prompt and return its bytes.
    pub async fn generate(&self, prompt: &str, size: ImageSize) -> Result<Vec<u8>, GenerationError> {
        let url = format!("{}/v1/images/generations", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "prompt": prompt,
                "n": 1,
                "size": size.as_str(),
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api { status, message });
        }

        let body: GenerationResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        let image_url = body
            .data
            .first()
            .map(|i| i.url.as_str())
            .ok_or_else(|| GenerationError::MalformedResponse("empty data array".to_string()))?;

        debug!(url = %image_url, "fetching generated artifact");
        let artifact = self.http.get(image_url).send().await?;
        if !artifact.status().is_success() {
            let status = artifact.status().as_u16();
            return Err(GenerationError::Api {
                status,
                message: "artifact fetch failed".to_string(),
            });
        }

        let bytes = artifact.bytes().await?.to_vec();
        info!(prompt_len = prompt.len(), bytes = bytes.len(), "generated artifact");
        Ok(bytes)
    }

    /// Cheap reachability ping for the status command. Any HTTP answer
    /// counts as alive; only transport failure counts as down.
    pub async fn alive(&self) -> bool {
        self.http.get(&self.base_url).send().await.is_ok()
    }
}
