//! The three-phase send protocol.
//!
//! Every response leaves the crate as a [`WireResponse`]: a status, the final
//! header list, the rendered body, and optional background tasks. Emitting
//! one sends [`SendEvent::Start`], then [`SendEvent::Body`], and only then
//! runs the background tasks.
//!
//! Two transports are provided: [`WireResponse::emit`] drives any
//! [`Sender`], and the [`IntoResponse`] impl hands the response to axum,
//! running the background tasks once hyper has consumed the body.

use std::convert::Infallible;

use async_trait::async_trait;
use axum::body::Body;
use axum::response::IntoResponse;
use bytes::Bytes;
use futures_util::StreamExt;
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;

use apiroute_core::ApiResult;

use crate::background::BackgroundTasks;
use crate::headers::Headers;

/// One event of the send protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendEvent {
    /// The response start line and headers.
    Start {
        /// The response status.
        status: StatusCode,
        /// The headers, in the order they go on the wire.
        headers: Vec<(HeaderName, HeaderValue)>,
    },
    /// The complete response body.
    Body {
        /// The rendered bytes.
        body: Bytes,
    },
}

/// The receiving end of the send protocol.
#[async_trait]
pub trait Sender: Send {
    /// Delivers one event to the transport.
    async fn send(&mut self, event: SendEvent) -> ApiResult<()>;
}

/// A fully rendered response, ready to be sent.
#[derive(Debug, Default)]
pub struct WireResponse {
    /// The response status.
    pub status: StatusCode,
    /// The final header list.
    pub headers: Headers,
    /// The rendered body.
    pub body: Bytes,
    /// Tasks run after the body has been sent.
    pub background: Option<BackgroundTasks>,
}

impl WireResponse {
    /// Sends the start and body events, then runs the background tasks.
    ///
    /// A failing send aborts before the background tasks run.
    pub async fn emit<S: Sender + ?Sized>(self, sender: &mut S) -> ApiResult<()> {
        sender
            .send(SendEvent::Start {
                status: self.status,
                headers: self.headers.into_pairs(),
            })
            .await?;
        sender.send(SendEvent::Body { body: self.body }).await?;

        if let Some(tasks) = self.background {
            tasks.run().await?;
        }
        Ok(())
    }

    /// Converts into an axum response.
    pub fn into_axum(self) -> axum::response::Response {
        let body = match self.background {
            Some(tasks) if !tasks.is_empty() => {
                let mut guard = RunOnDrop {
                    tasks: Some(tasks),
                    armed: false,
                };
                let stream = futures_util::stream::iter([Ok::<_, Infallible>(self.body)]).map(
                    move |chunk| {
                        guard.armed = true;
                        chunk
                    },
                );
                Body::from_stream(stream)
            }
            _ => Body::from(self.body),
        };

        let mut response = axum::response::Response::new(body);
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        for (name, value) in self.headers.into_pairs() {
            headers.append(name, value);
        }
        response
    }
}

impl IntoResponse for WireResponse {
    fn into_response(self) -> axum::response::Response {
        self.into_axum()
    }
}

/// Spawns the background tasks when the response body is dropped, provided
/// the body chunk was handed to the transport.
struct RunOnDrop {
    tasks: Option<BackgroundTasks>,
    armed: bool,
}

impl Drop for RunOnDrop {
    fn drop(&mut self) {
        let Some(tasks) = self.tasks.take() else {
            return;
        };
        if !self.armed {
            tracing::debug!("response body never sent; skipping background tasks");
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = tasks.run().await {
                        tracing::error!(error = %e, "background tasks failed after response");
                    }
                });
            }
            Err(_) => tracing::warn!("no tokio runtime; background tasks dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use http_body_util::BodyExt;

    use apiroute_core::ApiError;

    use super::*;

    #[derive(Default)]
    struct Collect {
        events: Vec<SendEvent>,
        fail_on_body: bool,
    }

    #[async_trait]
    impl Sender for Collect {
        async fn send(&mut self, event: SendEvent) -> ApiResult<()> {
            if self.fail_on_body && matches!(event, SendEvent::Body { .. }) {
                return Err(ApiError::Internal("client went away".into()));
            }
            self.events.push(event);
            Ok(())
        }
    }

    fn wire_with_flag(flag: &Arc<Mutex<bool>>) -> WireResponse {
        let mut tasks = BackgroundTasks::new();
        let flag = Arc::clone(flag);
        tasks.add_task(move || async move {
            *flag.lock().unwrap() = true;
            Ok(())
        });
        WireResponse {
            status: StatusCode::CREATED,
            headers: Headers::from_pairs([("x-a", "1")]).unwrap(),
            body: Bytes::from_static(b"{}"),
            background: Some(tasks),
        }
    }

    #[tokio::test]
    async fn test_emit_order() {
        let ran = Arc::new(Mutex::new(false));
        let mut sender = Collect::default();
        wire_with_flag(&ran).emit(&mut sender).await.unwrap();

        assert_eq!(sender.events.len(), 2);
        match &sender.events[0] {
            SendEvent::Start { status, headers } => {
                assert_eq!(*status, StatusCode::CREATED);
                assert_eq!(headers[0].0.as_str(), "x-a");
            }
            SendEvent::Body { .. } => panic!("start must come first"),
        }
        assert_eq!(
            sender.events[1],
            SendEvent::Body {
                body: Bytes::from_static(b"{}")
            }
        );
        assert!(*ran.lock().unwrap());
    }

    #[tokio::test]
    async fn test_failed_send_skips_background() {
        let ran = Arc::new(Mutex::new(false));
        let mut sender = Collect {
            fail_on_body: true,
            ..Collect::default()
        };
        assert!(wire_with_flag(&ran).emit(&mut sender).await.is_err());
        assert!(!*ran.lock().unwrap());
    }

    #[tokio::test]
    async fn test_into_axum_runs_background_after_body() {
        let ran = Arc::new(Mutex::new(false));
        let response = wire_with_flag(&ran).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-a"], "1");
        assert!(!*ran.lock().unwrap());

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"{}");

        for _ in 0..50 {
            if *ran.lock().unwrap() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(*ran.lock().unwrap());
    }

    #[tokio::test]
    async fn test_unsent_body_skips_background() {
        let ran = Arc::new(Mutex::new(false));
        drop(wire_with_flag(&ran).into_response());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!*ran.lock().unwrap());
    }
}
