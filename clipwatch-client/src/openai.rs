//! OpenAI videos API endpoints

use clipwatch_core::domain::request::{GenerationRequest, Provider};
use clipwatch_core::normalize::RawStatus;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::missing_credential;
use crate::error::Result;
use crate::{ContentFetch, handle_response, read_content, require_id};

/// HTTP client for the OpenAI videos (Sora) API
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

#[derive(Debug, Serialize)]
struct CreateVideoBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seconds: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remix_video_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    input_reference: Option<&'a str>,
}

impl<'a> From<&'a GenerationRequest> for CreateVideoBody<'a> {
    fn from(req: &'a GenerationRequest) -> Self {
        Self {
            model: &req.model,
            prompt: &req.prompt,
            size: req.size.as_deref(),
            seconds: req.seconds.as_deref(),
            remix_video_id: req.remix_video_id.as_deref(),
            input_reference: req.input_reference.as_deref(),
        }
    }
}

impl OpenAiClient {
    /// Create a new OpenAI client
    ///
    /// # Arguments
    /// * `base_url` - API root (e.g., "https://api.openai.com/v1")
    /// * `api_key` - Bearer key; calls fail with a configuration error without one
    /// * `client` - Shared reqwest client
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }

    /// Get the API root this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| missing_credential("OPENAI_API_KEY"))
    }

    /// Submit a video generation job
    ///
    /// # Arguments
    /// * `req` - A request already shaped by [`crate::catalog::shape`]
    pub async fn create_video(&self, req: &GenerationRequest) -> Result<RawStatus> {
        let key = self.api_key()?;
        let url = format!("{}/videos", self.base_url);
        debug!(model = %req.model, "Creating OpenAI video job");

        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(&CreateVideoBody::from(req))
            .send()
            .await?;

        let body: Value = handle_response(response).await?;
        Ok(RawStatus::from_value(Provider::OpenAi, body)?)
    }

    /// Retrieve the current video object for a job
    pub async fn retrieve_video(&self, id: &str) -> Result<RawStatus> {
        let key = self.api_key()?;
        let url = format!("{}/videos/{}", self.base_url, require_id(id)?);

        let response = self.client.get(&url).bearer_auth(key).send().await?;

        let body: Value = handle_response(response).await?;
        Ok(RawStatus::from_value(Provider::OpenAi, body)?)
    }

    /// Download rendered content for a job
    ///
    /// # Arguments
    /// * `id` - The video id
    /// * `variant` - Which asset to fetch ("video", "thumbnail", "spritesheet")
    pub async fn download_content(&self, id: &str, variant: &str) -> Result<ContentFetch> {
        let key = self.api_key()?;
        let url = format!("{}/videos/{}/content", self.base_url, require_id(id)?);

        let response = self
            .client
            .get(&url)
            .bearer_auth(key)
            .query(&[("variant", variant)])
            .send()
            .await?;

        Ok(ContentFetch::Ready(read_content(response).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = OpenAiClient::new("https://api.openai.com/v1/", None, Client::new());
        assert_eq!(client.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_create_body_skips_absent_fields() {
        let req = GenerationRequest::new(Provider::OpenAi, "A")
            .with_seconds("8")
            .with_size("1280x720");
        let body = serde_json::to_value(CreateVideoBody::from(&req)).unwrap();
        assert_eq!(body["model"], "sora-2");
        assert_eq!(body["seconds"], "8");
        assert_eq!(body["size"], "1280x720");
        assert!(body.get("remix_video_id").is_none());
        assert!(body.get("input_reference").is_none());
    }

    #[tokio::test]
    async fn test_calls_without_key_are_configuration_errors() {
        let client = OpenAiClient::new("https://api.openai.com/v1", None, Client::new());
        assert!(client.retrieve_video("video_1").await.unwrap_err().is_configuration());
        assert!(
            client
                .download_content("video_1", "video")
                .await
                .unwrap_err()
                .is_configuration()
        );
    }
}
