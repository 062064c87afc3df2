//! OpenAI Sora video objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    NormalizedStatus, Normalizer, created_at_from, error_from, identify, progress_from, text_from,
};
use crate::domain::job::JobStatus;
use crate::domain::request::Provider;
use crate::error::ValidationError;

/// Video object returned by the OpenAI videos API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiVideo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub progress: Option<Value>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub seconds: Option<Value>,
    #[serde(default)]
    pub size: Option<String>,
}

impl Normalizer for OpenAiVideo {
    fn normalize(&self, observed_at: DateTime<Utc>) -> Result<NormalizedStatus, ValidationError> {
        let (id, raw_status) =
            identify(Provider::OpenAi, self.id.as_deref(), self.status.as_deref())?;
        let status = JobStatus::from_raw(&raw_status);

        Ok(NormalizedStatus {
            id,
            provider: Provider::OpenAi,
            progress: progress_from(self.progress.as_ref(), &status),
            status,
            raw_status,
            model: self.model.clone(),
            created_at: created_at_from(self.created_at.as_ref(), observed_at),
            error: error_from(self.error.as_ref()),
            seconds: text_from(self.seconds.as_ref()),
            size: self.size.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::RawStatus;
    use serde_json::json;

    #[test]
    fn test_in_progress_video() {
        let raw = RawStatus::from_value(
            Provider::OpenAi,
            json!({
                "id": "video_123",
                "object": "video",
                "status": "in_progress",
                "progress": 40,
                "model": "sora-2",
                "created_at": 1_712_697_600,
                "seconds": "8",
                "size": "1280x720"
            }),
        )
        .unwrap();

        let normalized = raw.normalize(Utc::now()).unwrap();
        assert_eq!(normalized.id, "video_123");
        assert_eq!(normalized.status, JobStatus::InProgress);
        assert_eq!(normalized.progress, 40);
        assert_eq!(normalized.model.as_deref(), Some("sora-2"));
        assert_eq!(normalized.created_at.timestamp(), 1_712_697_600);
        assert_eq!(normalized.seconds.as_deref(), Some("8"));
        assert!(normalized.error.is_none());
    }

    #[test]
    fn test_failed_video_carries_error_message() {
        let video = OpenAiVideo {
            id: Some("video_9".to_string()),
            status: Some("failed".to_string()),
            error: Some(json!({"code": "moderation_blocked", "message": "Prompt was blocked"})),
            ..Default::default()
        };

        let normalized = video.normalize(Utc::now()).unwrap();
        assert_eq!(normalized.status, JobStatus::Failed);
        assert_eq!(normalized.error.as_deref(), Some("Prompt was blocked"));
    }

    #[test]
    fn test_completed_video_forces_full_progress() {
        let video = OpenAiVideo {
            id: Some("video_1".to_string()),
            status: Some("completed".to_string()),
            progress: Some(json!(87)),
            ..Default::default()
        };
        assert_eq!(video.normalize(Utc::now()).unwrap().progress, 100);
    }
}
