//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request::{GenerationRequest, Provider};

/// One tracked video-generation request
///
/// Owned by the tracker's registry; mutated only by normalized provider
/// observations and scheduler bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub provider: Provider,
    pub request: GenerationRequest,
    pub status: JobStatus,
    /// Last raw status string reported by the provider
    pub provider_status: Option<String>,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub error_message: Option<String>,
    pub artifact: Option<ArtifactRef>,
    pub next_poll_at: Option<DateTime<Utc>>,
    pub stall_notified: bool,
    pub fallback: FallbackState,
    /// Completion-path downloads that came back "not ready"
    pub completion_retries: u32,
}

impl Job {
    pub fn new(
        id: impl Into<String>,
        request: GenerationRequest,
        status: JobStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        let provider = request.provider;
        let status = match status {
            // Terminal and unknown states are only reached through observation
            JobStatus::Queued | JobStatus::InProgress => status,
            _ => JobStatus::Queued,
        };
        Self {
            id: id.into(),
            provider,
            request,
            status,
            provider_status: None,
            progress: 0,
            created_at,
            error_message: None,
            artifact: None,
            next_poll_at: None,
            stall_notified: false,
            fallback: FallbackState::default(),
            completion_retries: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn has_artifact(&self) -> bool {
        self.artifact.is_some()
    }

    /// Whether polling for this job has nothing left to do
    pub fn is_settled(&self) -> bool {
        self.is_terminal() || self.has_artifact()
    }

    /// Moves the job forward to `next`
    ///
    /// Returns the previous status when a transition happened. Backward moves,
    /// moves out of a terminal state, and unknown statuses are ignored.
    pub fn advance_status(&mut self, next: JobStatus) -> Option<JobStatus> {
        if !self.status.can_advance_to(&next) {
            return None;
        }
        if next == JobStatus::Failed && self.error_message.is_none() {
            self.error_message = Some("Unknown failure".to_string());
        }
        Some(std::mem::replace(&mut self.status, next))
    }

    /// Marks the job failed with `message`
    ///
    /// Returns false when the job was already terminal.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.error_message = Some(message.into());
        self.status = JobStatus::Failed;
        true
    }

    /// Time elapsed since the provider created the job
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.created_at).max(chrono::Duration::zero())
    }
}

/// Canonical, provider-agnostic job status
///
/// Raw provider values outside the mapping table are carried as `Unknown`
/// rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Unknown(String),
}

impl JobStatus {
    /// Maps a provider's raw status value onto the canonical status
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "starting" | "pending" | "queued" => Self::Queued,
            "processing" | "running" | "in_progress" => Self::InProgress,
            "succeeded" | "completed" => Self::Completed,
            "failed" | "canceled" => Self::Failed,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn rank(&self) -> Option<u8> {
        match self {
            Self::Queued => Some(0),
            Self::InProgress => Some(1),
            Self::Completed | Self::Failed => Some(2),
            Self::Unknown(_) => None,
        }
    }

    /// Whether moving from `self` to `next` is a forward transition
    pub fn can_advance_to(&self, next: &JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (Some(current), Some(next)) => next > current,
            _ => false,
        }
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        Self::from_raw(&raw)
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to downloaded media held by the tracker's artifact store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub handle: Uuid,
    pub content_type: String,
    pub size_bytes: u64,
    pub content_disposition: Option<String>,
    pub obtained_at: DateTime<Utc>,
}

impl ArtifactRef {
    /// File extension matching the content type
    pub fn file_extension(&self) -> &'static str {
        let essence = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "video/webm" => "webm",
            "video/quicktime" => "mov",
            "image/gif" => "gif",
            "image/png" => "png",
            "image/jpeg" => "jpg",
            _ => "mp4",
        }
    }
}

/// Bookkeeping for forced, time-triggered download attempts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackState {
    pub triggered: bool,
    pub attempt_count: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Overrides the default "created + fallback delay" deadline
    pub deadline: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(
            "job_1",
            GenerationRequest::new(Provider::OpenAi, "A"),
            JobStatus::Queued,
            Utc::now(),
        )
    }

    #[test]
    fn test_status_mapping_table() {
        for raw in ["starting", "pending", "queued"] {
            assert_eq!(JobStatus::from_raw(raw), JobStatus::Queued);
        }
        for raw in ["processing", "running", "in_progress"] {
            assert_eq!(JobStatus::from_raw(raw), JobStatus::InProgress);
        }
        for raw in ["succeeded", "completed"] {
            assert_eq!(JobStatus::from_raw(raw), JobStatus::Completed);
        }
        for raw in ["failed", "canceled"] {
            assert_eq!(JobStatus::from_raw(raw), JobStatus::Failed);
        }
        assert_eq!(
            JobStatus::from_raw("moderating"),
            JobStatus::Unknown("moderating".to_string())
        );
    }

    #[test]
    fn test_status_serde_passes_unknown_through() {
        let status: JobStatus = serde_json::from_str("\"moderating\"").unwrap();
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"moderating\"");
        let status: JobStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(status, JobStatus::InProgress);
    }

    #[test]
    fn test_forward_transitions_only() {
        let mut job = job();
        assert_eq!(
            job.advance_status(JobStatus::InProgress),
            Some(JobStatus::Queued)
        );
        assert_eq!(job.advance_status(JobStatus::Queued), None);
        assert_eq!(job.advance_status(JobStatus::InProgress), None);
        assert_eq!(
            job.advance_status(JobStatus::Unknown("x".to_string())),
            None
        );
        assert_eq!(job.status, JobStatus::InProgress);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut job = job();
        assert!(job.advance_status(JobStatus::Completed).is_some());
        assert_eq!(job.advance_status(JobStatus::Failed), None);
        assert!(!job.fail("late error"));
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.error_message.is_none());
    }

    #[test]
    fn test_fail_sets_message() {
        let mut job = job();
        assert!(job.fail("Status fetch failed"));
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("Status fetch failed"));
    }

    #[test]
    fn test_new_job_never_starts_terminal() {
        let job = Job::new(
            "job_2",
            GenerationRequest::new(Provider::OpenAi, "A"),
            JobStatus::Completed,
            Utc::now(),
        );
        assert_eq!(job.status, JobStatus::Queued);
    }

    #[test]
    fn test_artifact_extension() {
        let mut artifact = ArtifactRef {
            handle: Uuid::new_v4(),
            content_type: "video/webm; codecs=vp9".to_string(),
            size_bytes: 10,
            content_disposition: None,
            obtained_at: Utc::now(),
        };
        assert_eq!(artifact.file_extension(), "webm");
        artifact.content_type = "application/octet-stream".to_string();
        assert_eq!(artifact.file_extension(), "mp4");
    }
}
