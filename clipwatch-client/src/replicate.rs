//! Replicate predictions API endpoints

use clipwatch_core::ValidationError;
use clipwatch_core::domain::job::JobStatus;
use clipwatch_core::domain::request::{GenerationRequest, Provider};
use clipwatch_core::normalize::{Normalizer, RawStatus, ReplicatePrediction};
use reqwest::Client;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::catalog;
use crate::config::missing_credential;
use crate::error::Result;
use crate::{ContentFetch, handle_response, read_content, require_id};

/// HTTP client for the Replicate predictions API
#[derive(Debug, Clone)]
pub struct ReplicateClient {
    base_url: String,
    api_token: Option<String>,
    client: Client,
}

impl ReplicateClient {
    /// Create a new Replicate client
    ///
    /// # Arguments
    /// * `base_url` - API root (e.g., "https://api.replicate.com/v1")
    /// * `api_token` - Bearer token; calls fail with a configuration error without one
    /// * `client` - Shared reqwest client
    pub fn new(base_url: impl Into<String>, api_token: Option<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            client,
        }
    }

    /// Get the API root this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_token(&self) -> Result<&str> {
        self.api_token
            .as_deref()
            .ok_or_else(|| missing_credential("REPLICATE_API_TOKEN"))
    }

    /// Start a prediction for an official model
    ///
    /// # Arguments
    /// * `req` - A request already shaped by [`crate::catalog::shape`]
    pub async fn create_prediction(&self, req: &GenerationRequest) -> Result<RawStatus> {
        let token = self.api_token()?;
        let url = format!("{}/models/{}/predictions", self.base_url, req.model);
        debug!(model = %req.model, "Creating Replicate prediction");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "input": build_input(req) }))
            .send()
            .await?;

        let body: Value = handle_response(response).await?;
        Ok(RawStatus::from_value(Provider::Replicate, body)?)
    }

    /// Get the current state of a prediction
    pub async fn get_prediction(&self, id: &str) -> Result<RawStatus> {
        let token = self.api_token()?;
        let url = format!("{}/predictions/{}", self.base_url, require_id(id)?);

        let response = self.client.get(&url).bearer_auth(token).send().await?;

        let body: Value = handle_response(response).await?;
        Ok(RawStatus::from_value(Provider::Replicate, body)?)
    }

    /// Download the output file of a finished prediction
    ///
    /// Predictions that have not succeeded yet are reported as not ready.
    pub async fn download_output(&self, id: &str) -> Result<ContentFetch> {
        let RawStatus::Replicate(prediction) = self.get_prediction(id).await? else {
            return Err(ValidationError::new("Expected a Replicate prediction payload.").into());
        };

        let normalized = prediction.normalize(chrono::Utc::now())?;
        if normalized.status != JobStatus::Completed {
            debug!(prediction_id = %id, status = %normalized.raw_status, "Prediction output not ready");
            return Ok(ContentFetch::NotReady);
        }

        let file_url = output_url(&prediction)?;
        let response = self.client.get(&file_url).send().await?;
        Ok(ContentFetch::Ready(read_content(response).await?))
    }
}

fn output_url(prediction: &ReplicatePrediction) -> Result<String> {
    prediction.output_url().ok_or_else(|| {
        ValidationError::new("Prediction completed but no downloadable output was provided.").into()
    })
}

/// Builds the model input from a shaped request
fn build_input(req: &GenerationRequest) -> Value {
    let mut input = Map::new();
    input.insert("prompt".into(), Value::String(req.prompt.clone()));

    if let Some(duration) = req.seconds.as_deref().and_then(|s| s.parse::<u64>().ok()) {
        input.insert("duration".into(), json!(duration));
    }
    if let Some(resolution) = &req.size {
        input.insert("resolution".into(), Value::String(resolution.clone()));
    }

    let spec = catalog::find(Provider::Replicate, &req.model);
    if let Some(aspect_ratio) = spec.and_then(|s| s.aspect_ratio) {
        input.insert("aspect_ratio".into(), Value::String(aspect_ratio.to_string()));
    }
    if let Some(image) = &req.input_reference {
        if spec.is_some_and(|s| s.supports_image_reference) {
            input.insert("image".into(), Value::String(image.clone()));
        }
    }

    Value::Object(input)
}
