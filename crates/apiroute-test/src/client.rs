//! HTTP test client.
//!
//! [`TestClient`] sends simulated requests through an axum [`Router`] (usually
//! one built by [`ApiApp::into_axum_router`]) and collects each answer into a
//! [`TestResponse`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use apiroute_core::Settings;
//! use apiroute_handler::{ApiApp, ApiRoute, Handler, HandlerDescriptor};
//! use apiroute_test::client::TestClient;
//! use apiroute_test::resolver::StaticResolver;
//!
//! async fn example() {
//!     let hello = HandlerDescriptor::builder(Handler::from_async(|_| async {
//!         Ok(serde_json::json!({"hello": "world"}))
//!     }))
//!     .build();
//!     let app = ApiApp::new(Settings::default(), Arc::new(StaticResolver::empty()))
//!         .route(ApiRoute::new("/hello", hello));
//!     let client = TestClient::from_app(app).unwrap();
//!
//!     let response = client.get("/hello").await;
//!     assert_eq!(response.status_code(), 200);
//!     assert_eq!(response.text(), r#"{"hello":"world"}"#);
//! }
//! ```

use axum::Router;
use bytes::Bytes;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use apiroute_core::{ApiError, ApiResult};
use apiroute_handler::ApiApp;

/// Sends requests through a router without a network.
#[derive(Debug, Clone)]
pub struct TestClient {
    app: Router,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    pub fn new(app: Router) -> Self {
        Self {
            app,
            default_headers: Vec::new(),
        }
    }

    /// Builds the router of `app` and wraps it.
    pub fn from_app(app: ApiApp) -> ApiResult<Self> {
        Ok(Self::new(app.into_axum_router()?))
    }

    /// Adds a header sent with every request.
    #[must_use]
    pub fn with_default_header(mut self, name: &str, value: &str) -> Self {
        self.default_headers
            .push((name.to_string(), value.to_string()));
        self
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Method::GET, path, Bytes::new(), None).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request(Method::DELETE, path, Bytes::new(), None).await
    }

    /// Sends a POST with a JSON body.
    pub async fn post_json(&self, path: &str, json: &Value) -> TestResponse {
        self.request(
            Method::POST,
            path,
            Bytes::from(json.to_string()),
            Some("application/json"),
        )
        .await
    }

    /// Sends a POST with a raw body and content type.
    pub async fn post_raw(&self, path: &str, body: impl Into<Bytes>, content_type: &str) -> TestResponse {
        self.request(Method::POST, path, body.into(), Some(content_type))
            .await
    }

    /// Sends a request through the router and collects the response.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        for (name, value) in &self.default_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ct) = content_type {
            builder = builder.header(http::header::CONTENT_TYPE, ct);
        }

        let req = builder
            .body(axum::body::Body::from(body))
            .expect("request builder should not fail");

        let response = self
            .app
            .clone()
            .oneshot(req)
            .await
            .expect("router should not error");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .map_or_else(|_| Bytes::new(), http_body_util::Collected::to_bytes);

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// The response from a test request.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// The body as UTF-8 text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserializes the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> ApiResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::Serialization(e.to_string()))
    }

    /// The first value of header `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Every value of header `name`.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }
}
