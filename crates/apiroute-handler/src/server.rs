//! HTTP server integration.
//!
//! [`ApiApp`] collects [`ApiRoute`]s and mounts them on an axum [`Router`].
//! Routing itself stays axum's: each route's methods are registered on its
//! path, and the matched request is buffered (up to
//! [`Settings::max_body_size`]) and handed to the route's request handler.
//! Errors are rendered through [`error_response`].
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use apiroute_core::Settings;
//! use apiroute_handler::dependencies::{
//!     Dependant, DependencyOverridesProvider, DependencyResolver, ResolvedDependencies,
//! };
//! use apiroute_handler::{ApiApp, ApiRoute, Handler, HandlerDescriptor};
//! use apiroute_http::{Request, RequestBody};
//!
//! struct NoDeps;
//!
//! #[async_trait::async_trait]
//! impl DependencyResolver for NoDeps {
//!     async fn resolve(
//!         &self,
//!         _request: &Request,
//!         _dependant: &Dependant,
//!         _body: Option<&RequestBody>,
//!         _overrides: Option<&dyn DependencyOverridesProvider>,
//!     ) -> apiroute_core::ApiResult<ResolvedDependencies> {
//!         Ok(ResolvedDependencies::default())
//!     }
//! }
//!
//! # async fn example() -> apiroute_core::ApiResult<()> {
//! let hello = HandlerDescriptor::builder(Handler::from_async(|_| async {
//!     Ok(serde_json::json!({"hello": "world"}))
//! }))
//! .build();
//!
//! let app = ApiApp::new(Settings::default(), Arc::new(NoDeps))
//!     .route(ApiRoute::new("/", hello));
//!
//! app.run("0.0.0.0:8000").await?;
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use axum::extract::RawPathParams;
use axum::response::IntoResponse;
use axum::routing::{MethodFilter, MethodRouter};
use axum::Router;
use http_body_util::LengthLimitError;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use apiroute_core::logging::request_span;
use apiroute_core::{ApiError, ApiResult, Settings};
use apiroute_http::Request;

use crate::adapter::{error_response, RequestHandlerFn};
use crate::dependencies::DependencyResolver;
use crate::route::ApiRoute;
use crate::worker_pool::WorkerPool;

/// The detail sent when a request body exceeds the configured limit.
pub const BODY_TOO_LARGE_DETAIL: &str = "Request body too large";

/// An application: settings, routes, the dependency resolver, and the
/// worker pool blocking handlers run on.
pub struct ApiApp {
    settings: Settings,
    routes: Vec<ApiRoute>,
    resolver: Arc<dyn DependencyResolver>,
    pool: WorkerPool,
}

impl ApiApp {
    /// Creates an application. The worker pool is sized from `settings`.
    pub fn new(settings: Settings, resolver: Arc<dyn DependencyResolver>) -> Self {
        let pool = WorkerPool::from_settings(&settings);
        Self {
            settings,
            routes: Vec::new(),
            resolver,
            pool,
        }
    }

    /// Adds a route.
    #[must_use]
    pub fn route(mut self, route: ApiRoute) -> Self {
        self.routes.push(route);
        self
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn routes(&self) -> &[ApiRoute] {
        &self.routes
    }

    pub const fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Builds the axum router.
    ///
    /// # Errors
    ///
    /// [`ApiError::ConfigurationError`] if a path does not start with `/`, a
    /// method cannot be routed, or two routes claim the same method on the
    /// same path.
    pub fn into_axum_router(self) -> ApiResult<Router> {
        let max_body_size = self.settings.max_body_size;
        let mut by_path: BTreeMap<String, (MethodRouter, HashSet<http::Method>)> = BTreeMap::new();

        for route in &self.routes {
            if !route.path().starts_with('/') {
                return Err(ApiError::ConfigurationError(format!(
                    "route path must start with '/': {:?}",
                    route.path()
                )));
            }

            let handle = route.get_route_handler(Arc::clone(&self.resolver), self.pool.clone());
            let (router, seen) = by_path
                .entry(route.path().to_string())
                .or_insert_with(|| (MethodRouter::new(), HashSet::new()));

            for method in route.method_list() {
                if !seen.insert(method.clone()) {
                    return Err(ApiError::ConfigurationError(format!(
                        "{method} {} is registered twice",
                        route.path()
                    )));
                }
                let filter = MethodFilter::try_from(method.clone()).map_err(|e| {
                    ApiError::ConfigurationError(format!("cannot route {method}: {e}"))
                })?;
                let handle = Arc::clone(&handle);
                let endpoint = move |params: RawPathParams, req: axum::extract::Request| {
                    let handle = Arc::clone(&handle);
                    async move { dispatch(handle, params, req, max_body_size).await }
                };
                *router = std::mem::replace(router, MethodRouter::new()).on(filter, endpoint);
            }

            tracing::debug!(
                path = route.path(),
                methods = ?route.method_list(),
                name = route.name_ref(),
                "mounted route"
            );
        }

        let router = by_path
            .into_iter()
            .fold(Router::new(), |app, (path, (methods, _))| app.route(&path, methods));
        Ok(router.layer(TraceLayer::new_for_http()))
    }

    /// Serves the application on `addr` until the server stops.
    ///
    /// # Errors
    ///
    /// [`ApiError::ConfigurationError`] if the address cannot be bound or the
    /// router cannot be built; [`ApiError::Internal`] if serving fails.
    pub async fn run(self, addr: &str) -> ApiResult<()> {
        let debug = self.settings.debug;
        let router = self.into_axum_router()?;
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            ApiError::ConfigurationError(format!("failed to bind to {addr}: {e}"))
        })?;

        if debug {
            tracing::info!("Starting development server at http://{addr}/");
        } else {
            tracing::info!(%addr, "listening");
        }

        axum::serve(listener, router)
            .await
            .map_err(|e| ApiError::Internal(format!("server error: {e}")))
    }
}

impl fmt::Debug for ApiApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiApp")
            .field("settings", &self.settings)
            .field("routes", &self.routes.len())
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

async fn dispatch(
    handle: RequestHandlerFn,
    params: RawPathParams,
    req: axum::extract::Request,
    max_body_size: usize,
) -> axum::response::Response {
    let span = request_span(req.method().as_str(), req.uri().path());
    let path_params = params
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    async move {
        let (parts, body) = req.into_parts();
        let bytes = match axum::body::to_bytes(body, max_body_size).await {
            Ok(bytes) => bytes,
            Err(e) if is_length_limit(&e) => {
                return error_response(&ApiError::http(413, BODY_TOO_LARGE_DETAIL)).into_response();
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read request body");
                return error_response(&ApiError::http(400, "Failed to read request body"))
                    .into_response();
            }
        };

        let mut request = Request::from_parts(parts, bytes);
        request.set_path_params(path_params);

        match handle(request).await {
            Ok(response) => response.into_response(),
            Err(e) => error_response(&e).into_response(),
        }
    }
    .instrument(span)
    .await
}

fn is_length_limit(error: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
