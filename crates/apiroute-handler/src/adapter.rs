//! The request-handling adapter.
//!
//! [`get_request_handler`] turns a [`HandlerDescriptor`] into a function from
//! [`Request`] to [`RouteResponse`]. Every request goes through four stages in
//! order:
//!
//! 1. **Body extraction.** Only when the descriptor declares a body field.
//!    Form bodies are parsed as urlencoded or multipart data; anything else is
//!    parsed as JSON when non-empty. A parse failure becomes a 400 with a fixed
//!    detail message.
//! 2. **Dependency resolution.** Delegated to the [`DependencyResolver`]. Any
//!    reported error aborts the request with a validation error (422) before
//!    the handler runs.
//! 3. **Handler invocation.** Async handlers are awaited in place, blocking
//!    handlers run on the [`WorkerPool`].
//! 4. **Response materialization.** Depends on what the handler returned:
//!    a native [`Response`] is passed on (receiving the resolved background
//!    tasks if it has none of its own); a [`ResponseEnvelope`] has its body
//!    re-serialized through the response field and is otherwise left alone;
//!    any other value is serialized, wrapped in a response of the configured
//!    class and status, and merged with the dependencies' sub-response.

use std::sync::Arc;

use axum::response::IntoResponse;

use apiroute_core::{ApiError, ApiResult, RequestValidationError};
use apiroute_http::{
    BackgroundTasks, BoxFuture, Request, RequestBody, Response, ResponseEnvelope, Sender,
    WireResponse,
};

use crate::dependencies::{DependencyResolver, ResolvedDependencies, SubResponse, Values};
use crate::descriptor::{BodyKind, HandlerDescriptor};
use crate::handler::{Handler, HandlerOutput};
use crate::serialize::serialize_response;
use crate::worker_pool::WorkerPool;

/// The detail sent with every body-parse failure.
pub const BODY_PARSE_ERROR_DETAIL: &str = "There was an error parsing the body";

/// The response produced for one request.
#[derive(Debug)]
pub enum RouteResponse {
    /// A rendered response.
    Native(Response),
    /// An envelope, rendered when emitted.
    Envelope(ResponseEnvelope),
}

impl RouteResponse {
    pub const fn status(&self) -> http::StatusCode {
        match self {
            Self::Native(response) => response.status(),
            Self::Envelope(envelope) => envelope.status(),
        }
    }

    /// Renders the response for the wire.
    pub fn into_wire(self) -> ApiResult<WireResponse> {
        match self {
            Self::Native(response) => Ok(response.into_wire()),
            Self::Envelope(envelope) => envelope.into_wire(),
        }
    }

    /// Sends the response through `sender`: start, body, then background.
    pub async fn emit<S: Sender + ?Sized>(self, sender: &mut S) -> ApiResult<()> {
        self.into_wire()?.emit(sender).await
    }
}

impl IntoResponse for RouteResponse {
    fn into_response(self) -> axum::response::Response {
        match self.into_wire() {
            Ok(wire) => wire.into_axum(),
            Err(e) => error_response(&e).into_response(),
        }
    }
}

/// Renders `error` as a JSON error response, logging it first.
pub fn error_response(error: &ApiError) -> Response {
    if error.status_code() >= 500 {
        tracing::error!(error = %error, "request failed");
    } else {
        tracing::debug!(status = error.status_code(), error = %error, "request rejected");
    }
    Response::from_error(error)
}

/// A type-erased request handler, as produced by [`get_request_handler`].
pub type RequestHandlerFn =
    Arc<dyn Fn(Request) -> BoxFuture<'static, ApiResult<RouteResponse>> + Send + Sync>;

/// Builds the request handler for a route.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use apiroute_handler::dependencies::{
///     Dependant, DependencyOverridesProvider, DependencyResolver, ResolvedDependencies,
/// };
/// use apiroute_handler::{get_request_handler, Handler, HandlerDescriptor, WorkerPool};
/// use apiroute_http::{Request, RequestBody};
///
/// struct NoDeps;
///
/// #[async_trait::async_trait]
/// impl DependencyResolver for NoDeps {
///     async fn resolve(
///         &self,
///         _request: &Request,
///         _dependant: &Dependant,
///         _body: Option<&RequestBody>,
///         _overrides: Option<&dyn DependencyOverridesProvider>,
///     ) -> apiroute_core::ApiResult<ResolvedDependencies> {
///         Ok(ResolvedDependencies::default())
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let descriptor = HandlerDescriptor::builder(Handler::from_async(|_| async {
///     Ok(serde_json::json!({"status": "ok"}))
/// }))
/// .build();
/// let handle = get_request_handler(Arc::new(descriptor), Arc::new(NoDeps), WorkerPool::new(1));
///
/// let response = handle(Request::builder().build()).await.unwrap();
/// assert_eq!(response.status(), http::StatusCode::OK);
/// # }
/// ```
pub fn get_request_handler(
    descriptor: Arc<HandlerDescriptor>,
    resolver: Arc<dyn DependencyResolver>,
    pool: WorkerPool,
) -> RequestHandlerFn {
    Arc::new(
        move |request: Request| -> BoxFuture<'static, ApiResult<RouteResponse>> {
            let descriptor = Arc::clone(&descriptor);
            let resolver = Arc::clone(&resolver);
            let pool = pool.clone();
            Box::pin(async move { handle(&descriptor, resolver.as_ref(), &pool, request).await })
        },
    )
}

async fn handle(
    descriptor: &HandlerDescriptor,
    resolver: &dyn DependencyResolver,
    pool: &WorkerPool,
    request: Request,
) -> ApiResult<RouteResponse> {
    let body = extract_body(descriptor, &request)?;

    let ResolvedDependencies {
        values,
        errors,
        background_tasks,
        sub_response,
        ..
    } = resolver
        .resolve(
            &request,
            descriptor.dependant(),
            body.as_ref(),
            descriptor.dependency_overrides(),
        )
        .await?;

    if !errors.is_empty() {
        tracing::debug!(
            path = request.path(),
            errors = errors.len(),
            "dependency resolution reported validation errors"
        );
        return Err(RequestValidationError::new(errors).into());
    }

    let output = invoke(descriptor.handler(), values, pool).await?;
    materialize(descriptor, output, background_tasks, &sub_response)
}

fn extract_body(
    descriptor: &HandlerDescriptor,
    request: &Request,
) -> ApiResult<Option<RequestBody>> {
    let Some(field) = descriptor.body_field() else {
        return Ok(None);
    };

    let parsed = match field.kind {
        BodyKind::Form => request.form().map(|form| Some(RequestBody::Form(form))),
        BodyKind::Json => request.json().map(|value| value.map(RequestBody::Json)),
    };

    parsed.map_err(|e| {
        tracing::error!(field = %field.name, error = %e, "failed to parse request body");
        ApiError::http(400, BODY_PARSE_ERROR_DETAIL)
    })
}

async fn invoke(handler: &Handler, values: Values, pool: &WorkerPool) -> ApiResult<HandlerOutput> {
    match handler {
        Handler::Async(f) => f(values).await,
        Handler::Blocking(f) => {
            let f = Arc::clone(f);
            pool.run(move || f(values)).await?
        }
    }
}

fn materialize(
    descriptor: &HandlerDescriptor,
    output: HandlerOutput,
    background: Option<BackgroundTasks>,
    sub_response: &SubResponse,
) -> ApiResult<RouteResponse> {
    match output {
        HandlerOutput::Native(mut response) => {
            if !response.has_background() {
                response.set_background(background);
            }
            Ok(RouteResponse::Native(response))
        }
        HandlerOutput::Envelope(mut envelope) => {
            if background.as_ref().is_some_and(|tasks| !tasks.is_empty()) {
                tracing::debug!("envelope response keeps its own background; resolved tasks dropped");
            }
            let body = serialize(descriptor, envelope.take_body())?;
            envelope.set_body(body);
            Ok(RouteResponse::Envelope(envelope))
        }
        HandlerOutput::Value(value) => {
            let content = serialize(descriptor, value)?;
            let mut response =
                Response::new(descriptor.response_class(), &content, descriptor.status_code())?;
            response.set_background(background);
            response.headers_mut().merge_from(&sub_response.headers);
            if let Some(status) = sub_response.status_code {
                response.set_status(status);
            }
            Ok(RouteResponse::Native(response))
        }
    }
}

fn serialize(descriptor: &HandlerDescriptor, value: serde_json::Value) -> ApiResult<serde_json::Value> {
    serialize_response(
        descriptor.response_field(),
        value,
        descriptor.include(),
        descriptor.exclude(),
        descriptor.by_alias(),
        descriptor.exclude_unset(),
    )
}
