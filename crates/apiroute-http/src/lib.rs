//! # apiroute-http
//!
//! HTTP layer for apiroute. Provides the incoming [`Request`], the native
//! [`Response`], the deferred-serialization [`ResponseEnvelope`], cookies,
//! background tasks, and the three-phase send protocol both response types
//! emit through.

pub mod background;
pub mod cookies;
pub mod envelope;
pub mod form;
pub mod headers;
pub mod json;
pub mod multipart;
pub mod request;
pub mod response;
pub mod send;

pub use background::BackgroundTasks;
pub use cookies::Cookie;
pub use envelope::ResponseEnvelope;
pub use form::{FormData, FormValue, UploadedFile};
pub use headers::Headers;
pub use request::{BodyError, Request, RequestBody, RequestBuilder};
pub use response::{Response, ResponseClass};
pub use send::{SendEvent, Sender, WireResponse};

/// A boxed, sendable future, used for type-erased async callables.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
