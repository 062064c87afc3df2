//! Shared fixtures for tracker scenarios
//!
//! `ScriptedBackend` answers provider calls from queues. The last reply in a
//! queue is sticky, so a script like `[in_progress]` keeps reporting the job
//! as running for as long as the test needs.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use clipwatch_client::{ClientError, ContentFetch, VideoBackend, VideoContent};
use clipwatch_core::domain::request::{GenerationRequest, Provider};
use clipwatch_core::normalize::RawStatus;
use clipwatch_tracker::{Clock, Tracker, TrackerConfig};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub enum StatusReply {
    Payload(Value),
    TransportError(String),
}

#[derive(Debug, Clone)]
pub enum ContentReply {
    Ready(&'static [u8], &'static str),
    NotReady,
    /// A 404 surfaced as an error rather than `NotReady`
    NotFound,
    ServerError,
}

pub struct ScriptedBackend {
    create: Option<Value>,
    statuses: Mutex<VecDeque<StatusReply>>,
    contents: Mutex<VecDeque<ContentReply>>,
    status_calls: Mutex<Vec<Instant>>,
    content_calls: Mutex<Vec<Instant>>,
    status_delay: Duration,
    content_block: Duration,
    status_in_flight: AtomicUsize,
    max_status_in_flight: AtomicUsize,
}

/// Counts a status call as in flight until dropped, even when aborted
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedBackend {
    /// A backend whose Create call answers with `payload`
    pub fn new(payload: Value) -> Self {
        Self {
            create: Some(payload),
            statuses: Mutex::new(VecDeque::new()),
            contents: Mutex::new(VecDeque::from([ContentReply::NotReady])),
            status_calls: Mutex::new(Vec::new()),
            content_calls: Mutex::new(Vec::new()),
            status_delay: Duration::ZERO,
            content_block: Duration::ZERO,
            status_in_flight: AtomicUsize::new(0),
            max_status_in_flight: AtomicUsize::new(0),
        }
    }

    /// A backend with no credentials configured
    pub fn unconfigured() -> Self {
        Self {
            create: None,
            ..Self::new(Value::Null)
        }
    }

    pub fn with_statuses(self, replies: Vec<StatusReply>) -> Self {
        *self.statuses.lock().unwrap() = replies.into();
        self
    }

    pub fn with_contents(self, replies: Vec<ContentReply>) -> Self {
        *self.contents.lock().unwrap() = replies.into();
        self
    }

    /// Every status call waits `delay` (tokio time) before answering
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    /// Every content call blocks its worker thread for `block`
    pub fn with_blocking_content(mut self, block: Duration) -> Self {
        self.content_block = block;
        self
    }

    /// Highest number of status calls that were ever running at once
    pub fn max_status_in_flight(&self) -> usize {
        self.max_status_in_flight.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.lock().unwrap().len()
    }

    pub fn content_calls(&self) -> usize {
        self.content_calls.lock().unwrap().len()
    }

    pub fn content_call_times(&self) -> Vec<Instant> {
        self.content_calls.lock().unwrap().clone()
    }

    fn next<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
        let mut queue = queue.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl VideoBackend for ScriptedBackend {
    async fn create(&self, request: &GenerationRequest) -> clipwatch_client::Result<RawStatus> {
        request.validate()?;
        let payload = self.create.clone().ok_or_else(|| {
            ClientError::Configuration("Server is missing OPENAI_API_KEY configuration.".into())
        })?;
        Ok(RawStatus::from_value(request.provider, payload)?)
    }

    async fn status(&self, id: &str, provider: Provider) -> clipwatch_client::Result<RawStatus> {
        self.status_calls.lock().unwrap().push(Instant::now());
        let running = self.status_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_status_in_flight.fetch_max(running, Ordering::SeqCst);
        let _in_flight = InFlight(&self.status_in_flight);
        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }

        match Self::next(&self.statuses) {
            Some(StatusReply::Payload(payload)) => Ok(RawStatus::from_value(provider, payload)?),
            Some(StatusReply::TransportError(message)) => Err(ClientError::api_error(502, message)),
            None => Err(ClientError::NotFound(format!("no script for {id}"))),
        }
    }

    async fn content(&self, _id: &str, _provider: Provider) -> clipwatch_client::Result<ContentFetch> {
        self.content_calls.lock().unwrap().push(Instant::now());
        if !self.content_block.is_zero() {
            std::thread::sleep(self.content_block);
        }
        match Self::next(&self.contents) {
            Some(ContentReply::Ready(data, content_type)) => Ok(ContentFetch::Ready(VideoContent {
                bytes: Bytes::from_static(data),
                content_type: content_type.to_string(),
                content_disposition: None,
            })),
            Some(ContentReply::NotReady) | None => Ok(ContentFetch::NotReady),
            Some(ContentReply::NotFound) => Err(ClientError::NotFound("content".into())),
            Some(ContentReply::ServerError) => Err(ClientError::api_error(500, "upstream exploded")),
        }
    }
}

pub fn openai_status(status: &str) -> StatusReply {
    StatusReply::Payload(json!({ "id": "job_1", "object": "video", "status": status }))
}

pub fn openai_progress(status: &str, progress: u8) -> StatusReply {
    StatusReply::Payload(json!({ "id": "job_1", "status": status, "progress": progress }))
}

pub fn queued_job() -> Value {
    json!({ "id": "job_1", "object": "video", "status": "queued" })
}

pub fn video() -> ContentReply {
    ContentReply::Ready(b"\x00\x00\x00\x18ftypmp42", "video/mp4")
}

/// Wall time the tracker clock starts at
pub fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + chrono::TimeDelta::seconds(secs)
}

/// Builds a tracker over `backend` whose clock starts at [`t0`]
pub fn tracker(backend: ScriptedBackend, config: TrackerConfig) -> (Tracker, Arc<ScriptedBackend>) {
    let backend = Arc::new(backend);
    let tracker = Tracker::with_clock(backend.clone(), config, Clock::starting_at(t0()))
        .expect("valid config");
    (tracker, backend)
}

pub fn prompt(text: &str) -> GenerationRequest {
    GenerationRequest::new(Provider::OpenAi, text)
}

/// Lets paused time run forward by `secs`
pub async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}
