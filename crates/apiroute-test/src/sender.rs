//! A [`Sender`] that records the send protocol.
//!
//! [`RecordingSender`] keeps every [`SendEvent`] it receives and writes a line
//! per event to a shared journal. Background tasks can write to the same
//! journal, which makes the start, body, background ordering observable.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use serde_json::Value;

use apiroute_core::{ApiError, ApiResult};
use apiroute_http::{SendEvent, Sender};

/// A shared, ordered log of what happened during an emit.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Records the events of one emitted response.
///
/// # Examples
///
/// ```
/// use apiroute_http::{BackgroundTasks, Response};
/// use apiroute_test::sender::RecordingSender;
/// use http::StatusCode;
///
/// # #[tokio::main]
/// # async fn main() {
/// let mut sender = RecordingSender::new();
/// let journal = sender.journal();
///
/// let mut tasks = BackgroundTasks::new();
/// tasks.add_blocking(move || {
///     journal.lock().unwrap().push("background".into());
///     Ok(())
/// });
///
/// Response::text("done", StatusCode::OK)
///     .unwrap()
///     .with_background(tasks)
///     .emit(&mut sender)
///     .await
///     .unwrap();
///
/// assert_eq!(sender.journal_entries(), ["start", "body", "background"]);
/// assert_eq!(sender.text().as_deref(), Some("done"));
/// # }
/// ```
#[derive(Debug, Default)]
pub struct RecordingSender {
    events: Vec<SendEvent>,
    journal: Journal,
    fail_at: Option<usize>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose `index`-th send (zero based) fails.
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    /// A handle to the journal, for background tasks to write to.
    pub fn journal(&self) -> Journal {
        Arc::clone(&self.journal)
    }

    /// A snapshot of the journal.
    pub fn journal_entries(&self) -> Vec<String> {
        self.journal
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn events(&self) -> &[SendEvent] {
        &self.events
    }

    /// The status of the start event, if one was sent.
    pub fn status(&self) -> Option<StatusCode> {
        self.events.iter().find_map(|event| match event {
            SendEvent::Start { status, .. } => Some(*status),
            SendEvent::Body { .. } => None,
        })
    }

    /// Every header of the start event, as strings.
    pub fn headers(&self) -> Vec<(String, String)> {
        self.events
            .iter()
            .find_map(|event| match event {
                SendEvent::Start { headers, .. } => Some(
                    headers
                        .iter()
                        .map(|(name, value)| {
                            (
                                name.as_str().to_string(),
                                String::from_utf8_lossy(value.as_bytes()).into_owned(),
                            )
                        })
                        .collect(),
                ),
                SendEvent::Body { .. } => None,
            })
            .unwrap_or_default()
    }

    /// Every value sent for header `name`.
    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.headers()
            .into_iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
            .collect()
    }

    /// The first value sent for header `name`.
    pub fn header(&self, name: &str) -> Option<String> {
        self.header_values(name).into_iter().next()
    }

    /// The bytes of the body event, if one was sent.
    pub fn body(&self) -> Option<&Bytes> {
        self.events.iter().find_map(|event| match event {
            SendEvent::Body { body } => Some(body),
            SendEvent::Start { .. } => None,
        })
    }

    pub fn text(&self) -> Option<String> {
        self.body()
            .map(|body| String::from_utf8_lossy(body).into_owned())
    }

    /// The body parsed as JSON.
    pub fn json(&self) -> Option<Value> {
        self.body().and_then(|body| serde_json::from_slice(body).ok())
    }
}

#[async_trait]
impl Sender for RecordingSender {
    async fn send(&mut self, event: SendEvent) -> ApiResult<()> {
        if self.fail_at == Some(self.events.len()) {
            return Err(ApiError::Internal("client disconnected".to_string()));
        }
        let entry = match &event {
            SendEvent::Start { .. } => "start",
            SendEvent::Body { .. } => "body",
        };
        if let Ok(mut journal) = self.journal.lock() {
            journal.push(entry.to_string());
        }
        self.events.push(event);
        Ok(())
    }
}
