//! Replicate predictions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    NormalizedStatus, Normalizer, created_at_from, error_from, identify, progress_from, text_from,
};
use crate::domain::job::JobStatus;
use crate::domain::request::Provider;
use crate::error::ValidationError;

/// Prediction object returned by the Replicate API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplicatePrediction {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub output: Option<Value>,
}

impl ReplicatePrediction {
    /// First downloadable URL in the prediction output
    ///
    /// Output may be a single URL, an object with `url`/`uri`/`href`, or an
    /// array of either.
    pub fn output_url(&self) -> Option<String> {
        fn inspect(item: &Value) -> Option<String> {
            match item {
                Value::String(url) if !url.is_empty() => Some(url.clone()),
                Value::Object(map) => ["url", "uri", "href"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_str))
                    .map(str::to_string),
                _ => None,
            }
        }

        match self.output.as_ref()? {
            Value::Array(items) => items.iter().find_map(inspect),
            other => inspect(other),
        }
    }

    fn input_field(&self, key: &str) -> Option<&Value> {
        self.input.as_ref().and_then(|input| input.get(key))
    }
}

impl Normalizer for ReplicatePrediction {
    fn normalize(&self, observed_at: DateTime<Utc>) -> Result<NormalizedStatus, ValidationError> {
        let (id, raw_status) =
            identify(Provider::Replicate, self.id.as_deref(), self.status.as_deref())?;
        let status = JobStatus::from_raw(&raw_status);

        Ok(NormalizedStatus {
            id,
            provider: Provider::Replicate,
            // Predictions carry no progress figure
            progress: progress_from(None, &status),
            status,
            raw_status,
            model: self.model.clone().or_else(|| self.version.clone()),
            created_at: created_at_from(self.created_at.as_ref(), observed_at),
            error: error_from(self.error.as_ref()),
            seconds: text_from(self.input_field("duration")),
            size: text_from(self.input_field("resolution")),
        })
    }
}
