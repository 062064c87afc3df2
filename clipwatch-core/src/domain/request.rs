//! Generation request types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Third-party back end that renders the video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Replicate,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Replicate => "replicate",
        }
    }

    /// Model used when the caller does not pick one
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "sora-2",
            Self::Replicate => "bytedance/seedance-1-pro",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "sora" => Ok(Self::OpenAi),
            "replicate" => Ok(Self::Replicate),
            other => Err(ValidationError::new(format!(
                "Unknown provider \"{other}\". Expected openai or replicate."
            ))),
        }
    }
}

/// Parameters of one generation request
///
/// Stored unchanged on the tracked job so a failed job can be resubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub provider: Provider,
    pub prompt: String,
    pub model: String,
    pub seconds: Option<String>,
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remix_video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_reference: Option<String>,
}

impl GenerationRequest {
    /// Creates a request for the provider's default model
    pub fn new(provider: Provider, prompt: impl Into<String>) -> Self {
        Self {
            provider,
            prompt: prompt.into(),
            model: provider.default_model().to_string(),
            seconds: None,
            size: None,
            remix_video_id: None,
            input_reference: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_seconds(mut self, seconds: impl Into<String>) -> Self {
        self.seconds = Some(seconds.into());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    /// Checks the parts of the request every provider requires
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::new("Prompt is required."));
        }
        if self.model.trim().is_empty() {
            return Err(ValidationError::new("Model is required."));
        }
        Ok(())
    }
}
