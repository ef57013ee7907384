//! Request factory for building [`Request`] objects in tests.
//!
//! [`RequestFactory`] builds requests directly, bypassing axum. This is useful
//! when driving a request handler produced by
//! [`get_request_handler`](apiroute_handler::get_request_handler) in isolation.
//!
//! ## Example
//!
//! ```
//! use apiroute_test::request_factory::RequestFactory;
//!
//! let factory = RequestFactory::new().with_default_header("x-tenant", "acme");
//! let request = factory.get("/items?page=2");
//! assert_eq!(request.path(), "/items");
//! assert_eq!(request.query_string(), "page=2");
//! assert_eq!(request.header("x-tenant"), Some("acme"));
//! ```

use http::Method;
use serde_json::Value;

use apiroute_http::Request;

/// A factory for [`Request`]s with shared default headers.
#[derive(Debug, Clone, Default)]
pub struct RequestFactory {
    default_headers: Vec<(String, String)>,
}

impl RequestFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header included in every request.
    #[must_use]
    pub fn with_default_header(mut self, name: &str, value: &str) -> Self {
        self.default_headers
            .push((name.to_string(), value.to_string()));
        self
    }

    pub fn get(&self, path: &str) -> Request {
        self.build_request(Method::GET, path, None, None)
    }

    pub fn delete(&self, path: &str) -> Request {
        self.build_request(Method::DELETE, path, None, None)
    }

    /// A POST with a JSON body.
    pub fn post_json(&self, path: &str, json: &Value) -> Request {
        self.build_request(
            Method::POST,
            path,
            Some(json.to_string().into_bytes()),
            Some("application/json"),
        )
    }

    /// A PUT with a JSON body.
    pub fn put_json(&self, path: &str, json: &Value) -> Request {
        self.build_request(
            Method::PUT,
            path,
            Some(json.to_string().into_bytes()),
            Some("application/json"),
        )
    }

    /// A POST with a urlencoded form body.
    pub fn post_form(&self, path: &str, pairs: &[(&str, &str)]) -> Request {
        let mut builder = self.builder(Method::POST, path);
        builder = builder.form_body(pairs);
        builder.build()
    }

    /// A POST with an arbitrary body and content type.
    pub fn post_raw(&self, path: &str, body: impl Into<Vec<u8>>, content_type: &str) -> Request {
        self.build_request(Method::POST, path, Some(body.into()), Some(content_type))
    }

    fn build_request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        content_type: Option<&str>,
    ) -> Request {
        let mut builder = self.builder(method, path);
        if let Some(ct) = content_type {
            builder = builder.content_type(ct);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        builder.build()
    }

    fn builder(&self, method: Method, path: &str) -> apiroute_http::RequestBuilder {
        let (path, query) = path.split_once('?').unwrap_or((path, ""));
        let mut builder = Request::builder()
            .method(method)
            .path(path)
            .query_string(query);
        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_get_splits_query() {
        let request = RequestFactory::new().get("/search?q=rust&q=tokio");
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.query().get_list("q"), vec!["rust", "tokio"]);
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_post_json() {
        let request = RequestFactory::new().post_json("/items", &json!({"name": "widget"}));
        assert_eq!(request.content_type(), Some("application/json"));
        assert_eq!(request.json().unwrap(), Some(json!({"name": "widget"})));
    }

    #[test]
    fn test_post_form_keeps_default_headers() {
        let request = RequestFactory::new()
            .with_default_header("authorization", "Bearer t")
            .post_form("/login", &[("user", "ada")]);
        assert_eq!(request.header("authorization"), Some("Bearer t"));
        assert_eq!(request.form().unwrap().get_list("user"), vec!["ada"]);
    }

    #[test]
    fn test_post_raw() {
        let request = RequestFactory::new().post_raw("/upload", b"{oops".to_vec(), "application/json");
        assert!(request.json().is_err());
    }
}
