//! Posting client.

use std::time::Duration;

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::PostError;

#[derive(Debug, Deserialize)]
struct MediaUploadResponse {
    media_id: String,
}

/// Client for the status-posting service.
///
/// Supports caption-only posts; when an artifact is supplied it is
/// uploaded first and attached to the post by media id.
pub struct PostClient {
    http: Client,
    base_url: String,
    token: String,
}

impl PostClient {
    /// Create a client with the given request timeout applied to every call.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Publish a post with the caption and optional artifact.
    pub async fn post(&self, caption: &str, artifact: Option<&[u8]>) -> Result<(), PostError> {
        let media_id = match artifact {
            Some(bytes) => Some(self.upload_media(bytes).await?),
            None => None,
        };

        let url = format!("{}/2/posts", self.base_url);
        let body = match &media_id {
            Some(id) => json!({ "text": caption, "media": { "media_ids": [id] } }),
            None => json!({ "text": caption }),
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(PostError::Api { status, message });
        }

        info!(caption_len = caption.len(), with_media = media_id.is_some(), "post published");
        Ok(())
    }

    async fn upload_media(&self, bytes: &[u8]) -> Result<String, PostError> {
        let url = format!("{}/2/media/upload", self.base_url);
        let part = Part::bytes(bytes.to_vec())
            .file_name("image.png")
            .mime_str("image/png")
            .map_err(|e| PostError::MalformedResponse(e.to_string()))?;
        let form = Form::new().part("media", part);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(PostError::Api { status, message });
        }

        let body: MediaUploadResponse = response
            .json()
            .await
            .map_err(|e| PostError::MalformedResponse(e.to_string()))?;

        Ok(body.media_id)
    }

    /// Cheap reachability ping for the status command.
    pub async fn alive(&self) -> bool {
        self.http.get(&self.base_url).send().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_caption_only_post() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/posts"))
            .and(body_partial_json(serde_json::json!({"text": "hello"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": {"id": "1"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = PostClient::new(server.uri(), "token", Duration::from_secs(5));
        client.post("hello", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_post_with_artifact_uploads_media_first() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/media/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "media_id": "m-42"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/2/posts"))
            .and(body_partial_json(
                serde_json::json!({"media": {"media_ids": ["m-42"]}}),
            ))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": {"id": "2"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = PostClient::new(server.uri(), "token", Duration::from_secs(5));
        client.post("with image", Some(b"png-bytes")).await.unwrap();
    }

    #[tokio::test]
    async fn test_post_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/posts"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let client = PostClient::new(server.uri(), "token", Duration::from_secs(5));
        let err = client.post("nope", None).await.unwrap_err();

        match err {
            PostError::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "forbidden");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_media_upload_failure_aborts_post() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/media/upload"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upload broken"))
            .mount(&server)
            .await;

        // No /2/posts mock: reaching it would 404 and fail differently
        let client = PostClient::new(server.uri(), "token", Duration::from_secs(5));
        let err = client.post("caption", Some(b"bytes")).await.unwrap_err();

        assert!(matches!(err, PostError::Api { status: 500, .. }));
    }
}
