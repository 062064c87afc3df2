//! Provider status normalization
//!
//! Each provider reports job state in its own shape. The tagged [`RawStatus`]
//! carries one variant per provider, and every variant implements the single
//! [`Normalizer`] capability that maps it onto a [`NormalizedStatus`].

mod openai;
mod replicate;

pub use openai::OpenAiVideo;
pub use replicate::ReplicatePrediction;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::job::JobStatus;
use crate::domain::request::Provider;
use crate::error::ValidationError;

/// Provider-agnostic view of one status observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedStatus {
    pub id: String,
    pub provider: Provider,
    pub status: JobStatus,
    /// Status value exactly as the provider reported it
    pub raw_status: String,
    pub progress: u8,
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub error: Option<String>,
    pub seconds: Option<String>,
    pub size: Option<String>,
}

/// Maps a provider-native payload onto the canonical status record
pub trait Normalizer {
    /// Normalizes the payload
    ///
    /// # Arguments
    /// * `observed_at` - When the payload was received; used as the creation
    ///   time when the provider does not report one
    fn normalize(&self, observed_at: DateTime<Utc>) -> Result<NormalizedStatus, ValidationError>;
}

/// Native status payload from one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", content = "payload", rename_all = "lowercase")]
pub enum RawStatus {
    OpenAi(OpenAiVideo),
    Replicate(ReplicatePrediction),
}

impl RawStatus {
    /// Decodes an untyped JSON payload for `provider`
    pub fn from_value(provider: Provider, value: Value) -> Result<Self, ValidationError> {
        if !value.is_object() {
            return Err(ValidationError::new(format!(
                "Invalid {provider} status payload: expected a JSON object"
            )));
        }
        let decoded = match provider {
            Provider::OpenAi => serde_json::from_value(value).map(Self::OpenAi),
            Provider::Replicate => serde_json::from_value(value).map(Self::Replicate),
        };
        decoded.map_err(|e| ValidationError::new(format!("Invalid {provider} status payload: {e}")))
    }

    pub fn provider(&self) -> Provider {
        match self {
            Self::OpenAi(_) => Provider::OpenAi,
            Self::Replicate(_) => Provider::Replicate,
        }
    }
}

impl Normalizer for RawStatus {
    fn normalize(&self, observed_at: DateTime<Utc>) -> Result<NormalizedStatus, ValidationError> {
        match self {
            Self::OpenAi(video) => video.normalize(observed_at),
            Self::Replicate(prediction) => prediction.normalize(observed_at),
        }
    }
}

/// Returns the id and raw status, rejecting payloads missing either
fn identify(
    provider: Provider,
    id: Option<&str>,
    status: Option<&str>,
) -> Result<(String, String), ValidationError> {
    let id = id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ValidationError::new(format!("{provider} payload has no job id")))?;
    let status = status
        .map(str::trim)
        .filter(|status| !status.is_empty())
        .ok_or_else(|| ValidationError::new(format!("{provider} payload for {id} has no status")))?;
    Ok((id.to_string(), status.to_string()))
}

/// Reads a 0-100 progress value; absent or non-numeric values count as 0
fn progress_from(value: Option<&Value>, status: &JobStatus) -> u8 {
    if *status == JobStatus::Completed {
        return 100;
    }
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(p) if p.is_finite() => p.clamp(0.0, 100.0).round() as u8,
        _ => 0,
    }
}

/// Reads a creation time given as epoch seconds or an RFC 3339 string,
/// truncated to whole seconds
fn created_at_from(value: Option<&Value>, observed_at: DateTime<Utc>) -> DateTime<Utc> {
    let seconds = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.timestamp())
            .ok()
            .or_else(|| s.trim().parse::<i64>().ok()),
        _ => None,
    };
    let seconds = seconds.unwrap_or_else(|| observed_at.timestamp());
    Utc.timestamp_opt(seconds, 0)
        .single()
        .unwrap_or_else(|| whole_seconds(observed_at))
}

fn whole_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(at.timestamp(), 0).single().unwrap_or(at)
}

/// Renders a string-or-number field as a string
fn text_from(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Extracts a readable message from an error field
fn error_from(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| map.get("code").and_then(Value::as_str).map(str::to_string)),
        _ => None,
    }
}
