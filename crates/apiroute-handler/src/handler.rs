//! User handlers and what they return.
//!
//! Every handler receives its resolved arguments as a [`Values`] map and
//! returns a [`HandlerOutput`]. Async handlers are awaited on the calling
//! task; blocking handlers are dispatched to the
//! [`WorkerPool`](crate::worker_pool::WorkerPool).

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use apiroute_core::ApiResult;
use apiroute_http::{json, BoxFuture, Response, ResponseEnvelope};

use crate::dependencies::Values;

/// The value a handler produced.
#[derive(Debug)]
pub enum HandlerOutput {
    /// A fully rendered response, sent as is.
    Native(Response),
    /// An envelope whose body still goes through the response schema.
    Envelope(ResponseEnvelope),
    /// A plain value, serialized and wrapped in a native response.
    Value(Value),
}

impl HandlerOutput {
    /// Wraps any serializable value. Non-finite floats are rejected.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> ApiResult<Self> {
        Ok(Self::Value(json::to_value(value)?))
    }
}

impl From<Response> for HandlerOutput {
    fn from(response: Response) -> Self {
        Self::Native(response)
    }
}

impl From<ResponseEnvelope> for HandlerOutput {
    fn from(envelope: ResponseEnvelope) -> Self {
        Self::Envelope(envelope)
    }
}

impl From<Value> for HandlerOutput {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

type AsyncFn = dyn Fn(Values) -> BoxFuture<'static, ApiResult<HandlerOutput>> + Send + Sync;
type BlockingFn = dyn Fn(Values) -> ApiResult<HandlerOutput> + Send + Sync;

/// A route handler.
///
/// # Examples
///
/// ```
/// use apiroute_handler::Handler;
/// use serde_json::json;
///
/// let greet = Handler::from_async(|values| async move {
///     Ok(json!({"hello": values["name"]}))
/// });
/// assert!(greet.is_async());
///
/// let add = Handler::from_blocking(|values| {
///     let a = values["a"].as_i64().unwrap_or(0);
///     let b = values["b"].as_i64().unwrap_or(0);
///     Ok(json!(a + b))
/// });
/// assert!(!add.is_async());
/// ```
#[derive(Clone)]
pub enum Handler {
    /// Awaited directly.
    Async(Arc<AsyncFn>),
    /// Run on the worker pool.
    Blocking(Arc<BlockingFn>),
}

impl Handler {
    /// Wraps an async function.
    pub fn from_async<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Values) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<R>> + Send + 'static,
        R: Into<HandlerOutput> + Send + 'static,
    {
        Self::Async(Arc::new(
            move |values: Values| -> BoxFuture<'static, ApiResult<HandlerOutput>> {
                let fut = f(values);
                Box::pin(async move { fut.await.map(Into::into) })
            },
        ))
    }

    /// Wraps a blocking function.
    pub fn from_blocking<F, R>(f: F) -> Self
    where
        F: Fn(Values) -> ApiResult<R> + Send + Sync + 'static,
        R: Into<HandlerOutput> + Send + 'static,
    {
        Self::Blocking(Arc::new(move |values: Values| f(values).map(Into::into)))
    }

    pub const fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Async(_) => f.write_str("Handler::Async"),
            Self::Blocking(_) => f.write_str("Handler::Blocking"),
        }
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use serde_json::json;

    use apiroute_core::ApiError;

    use super::*;

    #[tokio::test]
    async fn test_async_handler_converts_output() {
        let handler = Handler::from_async(|_| async { Response::text("hi", StatusCode::OK) });
        let Handler::Async(f) = handler else {
            panic!("expected async");
        };
        assert!(matches!(f(Values::new()).await.unwrap(), HandlerOutput::Native(_)));
    }

    #[test]
    fn test_blocking_handler_passes_errors_through() {
        let handler = Handler::from_blocking(|_| -> ApiResult<Value> {
            Err(ApiError::Handler("nope".into()))
        });
        let Handler::Blocking(f) = handler else {
            panic!("expected blocking");
        };
        assert!(matches!(f(Values::new()), Err(ApiError::Handler(m)) if m == "nope"));
    }

    #[test]
    fn test_output_json() {
        #[derive(Serialize)]
        struct Item {
            id: u32,
        }
        let HandlerOutput::Value(v) = HandlerOutput::json(&Item { id: 3 }).unwrap() else {
            panic!("expected value");
        };
        assert_eq!(v, json!({"id": 3}));
        assert!(HandlerOutput::json(&f64::INFINITY).is_err());
    }

    #[test]
    fn test_output_from_envelope() {
        let output: HandlerOutput = ResponseEnvelope::new(json!(1)).into();
        assert!(matches!(output, HandlerOutput::Envelope(_)));
        assert_eq!(format!("{:?}", Handler::from_blocking(|_| Ok(json!(null)))), "Handler::Blocking");
    }
}
