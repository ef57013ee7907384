//! # apiroute
//!
//! A custom route layer for axum applications. Handlers return a native
//! response, a [`ResponseEnvelope`](http::ResponseEnvelope) whose body is
//! serialized at a single policy point, or a plain value; the request adapter
//! takes care of body extraction, dependency resolution, and response
//! materialization.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on the
//! individual crates for finer-grained control.

/// Errors, settings, and logging.
pub use apiroute_core as core;

/// Requests, responses, envelopes, cookies, and the send protocol.
pub use apiroute_http as http;

/// The request-handling adapter, routes, and server integration.
#[cfg(feature = "handler")]
pub use apiroute_handler as handler;

/// Test client, request factory, and test doubles.
#[cfg(feature = "testing")]
pub use apiroute_test as test;

// Third-party crates handlers are written against.
pub use async_trait;
pub use axum;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
pub use tracing_subscriber;

/// The types most applications need.
pub mod prelude {
    pub use apiroute_core::{ApiError, ApiResult, ErrorRecord, Settings};
    pub use apiroute_http::{
        BackgroundTasks, Cookie, Request, RequestBody, Response, ResponseClass, ResponseEnvelope,
    };

    #[cfg(feature = "handler")]
    pub use apiroute_handler::{
        ApiApp, ApiRoute, BodyField, Dependant, DependencyResolver, Handler, HandlerDescriptor,
        HandlerOutput, ResolvedDependencies, ResponseField, Values,
    };
}
