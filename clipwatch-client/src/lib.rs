//! Clipwatch Provider Client
//!
//! Type-safe HTTP adapters for the asynchronous video-generation providers
//! (OpenAI Sora, Replicate).
//!
//! Every provider is reached through the same three collaborator calls,
//! expressed by the [`VideoBackend`] trait:
//! - `create`: submit a generation request, returning the provider's job payload
//! - `status`: fetch the provider-native status payload for a job
//! - `content`: fetch the finished media, or report that it is not ready yet
//!
//! # Example
//!
//! ```no_run
//! use clipwatch_client::{HttpBackend, ProviderConfig, VideoBackend};
//! use clipwatch_core::domain::request::{GenerationRequest, Provider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = HttpBackend::new(ProviderConfig::from_env());
//!     let job = backend
//!         .create(&GenerationRequest::new(Provider::OpenAi, "a pixel commando"))
//!         .await?;
//!     println!("Created job: {:?}", job);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
mod openai;
mod replicate;

pub use config::ProviderConfig;
pub use error::{ClientError, Result};
pub use openai::OpenAiClient;
pub use replicate::ReplicateClient;

use async_trait::async_trait;
use bytes::Bytes;
use clipwatch_core::domain::request::{GenerationRequest, Provider};
use clipwatch_core::normalize::RawStatus;
use reqwest::Client;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderName};
use serde::de::DeserializeOwned;

use crate::error::error_message_from_body;

/// Downloaded media with the headers the provider sent along
#[derive(Debug, Clone)]
pub struct VideoContent {
    pub bytes: Bytes,
    pub content_type: String,
    pub content_disposition: Option<String>,
}

/// Outcome of a content request
#[derive(Debug, Clone)]
pub enum ContentFetch {
    Ready(VideoContent),
    /// The provider has no downloadable media for this job yet
    NotReady,
}

/// The three provider calls the job tracker depends on
#[async_trait]
pub trait VideoBackend: Send + Sync {
    /// Submits a new generation request
    ///
    /// # Returns
    /// The provider's initial job payload
    async fn create(&self, request: &GenerationRequest) -> Result<RawStatus>;

    /// Fetches the provider-native status payload for a job
    async fn status(&self, id: &str, provider: Provider) -> Result<RawStatus>;

    /// Fetches the finished media for a job
    ///
    /// A "not found" answer from the provider is reported as
    /// [`ContentFetch::NotReady`], not as an error.
    async fn content(&self, id: &str, provider: Provider) -> Result<ContentFetch>;
}

/// HTTP implementation of [`VideoBackend`] dispatching on the job's provider
#[derive(Debug, Clone)]
pub struct HttpBackend {
    openai: OpenAiClient,
    replicate: ReplicateClient,
}

impl HttpBackend {
    /// Create a backend for every configured provider
    pub fn new(config: ProviderConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create a backend sharing a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(config: ProviderConfig, client: Client) -> Self {
        Self {
            openai: OpenAiClient::new(
                config.openai_base_url.clone(),
                config.openai_api_key.clone(),
                client.clone(),
            ),
            replicate: ReplicateClient::new(
                config.replicate_base_url.clone(),
                config.replicate_api_token.clone(),
                client,
            ),
        }
    }
}

#[async_trait]
impl VideoBackend for HttpBackend {
    async fn create(&self, request: &GenerationRequest) -> Result<RawStatus> {
        let shaped = catalog::shape(request)?;
        match shaped.provider {
            Provider::OpenAi => self.openai.create_video(&shaped).await,
            Provider::Replicate => self.replicate.create_prediction(&shaped).await,
        }
    }

    async fn status(&self, id: &str, provider: Provider) -> Result<RawStatus> {
        match provider {
            Provider::OpenAi => self.openai.retrieve_video(id).await,
            Provider::Replicate => self.replicate.get_prediction(id).await,
        }
    }

    async fn content(&self, id: &str, provider: Provider) -> Result<ContentFetch> {
        let fetched = match provider {
            Provider::OpenAi => self.openai.download_content(id, "video").await,
            Provider::Replicate => self.replicate.download_output(id).await,
        };
        match fetched {
            Err(e) if e.is_not_found() => Ok(ContentFetch::NotReady),
            other => other,
        }
    }
}

// =============================================================================
// Response Handlers
// =============================================================================

/// Check the status code, turning failures into [`ClientError::ApiError`]
pub(crate) async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(
            status.as_u16(),
            error_message_from_body(&error_text),
        ));
    }

    Ok(response)
}

/// Handle an API response and deserialize JSON
pub(crate) async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    check_response(response)
        .await?
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Read a media response body along with its content headers
pub(crate) async fn read_content(response: reqwest::Response) -> Result<VideoContent> {
    let response = check_response(response).await?;
    let headers = response.headers();

    let header = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let content_type = header(CONTENT_TYPE).unwrap_or_else(|| "video/mp4".to_string());
    let content_disposition = header(CONTENT_DISPOSITION);

    let bytes = response.bytes().await?;

    Ok(VideoContent {
        bytes,
        content_type,
        content_disposition,
    })
}

/// Reject empty job ids before building a URL from them
pub(crate) fn require_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(clipwatch_core::ValidationError::new("Video id is required.").into());
    }
    Ok(id)
}
