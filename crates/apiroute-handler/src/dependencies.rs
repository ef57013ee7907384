//! The dependency-resolution contract.
//!
//! Resolving a handler's inputs is delegated to a [`DependencyResolver`]. The
//! adapter only describes what a handler needs ([`Dependant`]), hands over the
//! request and its parsed body, and consumes the [`ResolvedDependencies`]:
//! the resolved values, any validation errors, background tasks queued by
//! dependencies, and a [`SubResponse`] whose headers and status are merged into
//! the final response.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use serde_json::Value;

use apiroute_core::{ApiResult, ErrorRecord};
use apiroute_http::{BackgroundTasks, Cookie, Headers, Request, RequestBody};

/// Resolved handler arguments, keyed by parameter name.
pub type Values = HashMap<String, Value>;

/// Where a declared parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSource {
    Path,
    Query,
    Header,
    Cookie,
    Body,
}

/// One declared handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// The argument name the handler receives it under.
    pub name: String,
    /// Where the value comes from.
    pub source: ParamSource,
    /// Whether a missing value is a validation error.
    pub required: bool,
    /// The value used when the parameter is absent and not required.
    pub default: Option<Value>,
}

impl Param {
    /// A required parameter.
    pub fn required(name: impl Into<String>, source: ParamSource) -> Self {
        Self {
            name: name.into(),
            source,
            required: true,
            default: None,
        }
    }

    /// An optional parameter with a default.
    pub fn optional(name: impl Into<String>, source: ParamSource, default: Value) -> Self {
        Self {
            name: name.into(),
            source,
            required: false,
            default: Some(default),
        }
    }
}

/// The declarative input graph of a handler or of a sub-dependency.
///
/// # Examples
///
/// ```
/// use apiroute_handler::dependencies::{Dependant, Param, ParamSource};
///
/// let auth = Dependant::new("current_user").param(Param::required("authorization", ParamSource::Header));
/// let dependant = Dependant::new("create_item")
///     .param(Param::required("item", ParamSource::Body))
///     .dependency(auth);
/// assert_eq!(dependant.dependencies.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dependant {
    /// A name for the dependency, used for overrides and caching.
    pub name: String,
    /// Parameters read directly from the request.
    pub params: Vec<Param>,
    /// Sub-dependencies resolved before this one.
    pub dependencies: Vec<Dependant>,
    /// Whether a result resolved once per request may be reused.
    pub use_cache: bool,
}

impl Dependant {
    /// Creates an empty dependant with caching enabled.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            dependencies: Vec::new(),
            use_cache: true,
        }
    }

    #[must_use]
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn dependency(mut self, dependency: Self) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Returns `true` if this dependant or any sub-dependency reads the body.
    pub fn reads_body(&self) -> bool {
        self.params.iter().any(|p| p.source == ParamSource::Body)
            || self.dependencies.iter().any(Self::reads_body)
    }
}

/// Supplies replacement dependants, typically in tests.
pub trait DependencyOverridesProvider: Send + Sync {
    /// Returns the replacement for the dependency named `name`, if any.
    fn dependency_override(&self, name: &str) -> Option<Dependant>;
}

impl DependencyOverridesProvider for HashMap<String, Dependant> {
    fn dependency_override(&self, name: &str) -> Option<Dependant> {
        self.get(name).cloned()
    }
}

/// The response-like object dependencies write headers and a status into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubResponse {
    /// Headers to merge into the final response.
    pub headers: Headers,
    /// A status that overrides the route's configured status.
    pub status_code: Option<StatusCode>,
}

impl SubResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing earlier values.
    pub fn set_header(&mut self, name: &str, value: &str) -> ApiResult<()> {
        self.headers.set(name, value)
    }

    /// Appends a `set-cookie` header.
    pub fn set_cookie(&mut self, cookie: &Cookie) -> ApiResult<()> {
        self.headers
            .append(http::header::SET_COOKIE.as_str(), &cookie.to_set_cookie_header())
    }

    /// Appends a `set-cookie` header that expires `name` on the client.
    pub fn delete_cookie(
        &mut self,
        name: &str,
        path: Option<&str>,
        domain: Option<&str>,
    ) -> ApiResult<()> {
        self.set_cookie(&Cookie::deletion(name, path, domain))
    }
}

/// Everything a resolver produces for one request.
#[derive(Debug, Default)]
pub struct ResolvedDependencies {
    /// Handler arguments by name.
    pub values: Values,
    /// Validation errors. Empty on success.
    pub errors: Vec<ErrorRecord>,
    /// Tasks queued by dependencies.
    pub background_tasks: Option<BackgroundTasks>,
    /// Headers and status set by dependencies.
    pub sub_response: SubResponse,
    /// Per-request cache of resolved dependency results. Not read by the
    /// handler adapter.
    pub dependency_cache: HashMap<String, Value>,
}

impl ResolvedDependencies {
    /// A successful resolution with the given values.
    pub fn with_values(values: Values) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    /// A failed resolution carrying `errors`.
    pub fn with_errors(errors: Vec<ErrorRecord>) -> Self {
        Self {
            errors,
            ..Self::default()
        }
    }
}

/// Resolves a [`Dependant`] against a request.
///
/// Validation failures belong in [`ResolvedDependencies::errors`]; an `Err`
/// return is reserved for failures of the resolver itself and propagates
/// unchanged.
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    async fn resolve(
        &self,
        request: &Request,
        dependant: &Dependant,
        body: Option<&RequestBody>,
        overrides: Option<&dyn DependencyOverridesProvider>,
    ) -> ApiResult<ResolvedDependencies>;
}

#[async_trait]
impl<T: DependencyResolver + ?Sized> DependencyResolver for Arc<T> {
    async fn resolve(
        &self,
        request: &Request,
        dependant: &Dependant,
        body: Option<&RequestBody>,
        overrides: Option<&dyn DependencyOverridesProvider>,
    ) -> ApiResult<ResolvedDependencies> {
        (**self).resolve(request, dependant, body, overrides).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_reads_body_is_recursive() {
        let inner = Dependant::new("payload").param(Param::required("data", ParamSource::Body));
        let outer = Dependant::new("handler")
            .param(Param::optional("page", ParamSource::Query, json!(1)))
            .dependency(inner);
        assert!(outer.reads_body());
        assert!(!Dependant::new("empty").reads_body());
    }

    #[test]
    fn test_override_map() {
        let mut overrides = HashMap::new();
        overrides.insert("db".to_string(), Dependant::new("fake_db"));
        let provider: &dyn DependencyOverridesProvider = &overrides;
        assert_eq!(provider.dependency_override("db").unwrap().name, "fake_db");
        assert!(provider.dependency_override("cache").is_none());
    }

    #[test]
    fn test_sub_response_cookies_and_headers() {
        let mut sub = SubResponse::new();
        sub.set_header("X-Trace", "abc").unwrap();
        sub.set_cookie(&Cookie::new("a", "1")).unwrap();
        sub.delete_cookie("b", Some("/"), None).unwrap();
        assert_eq!(sub.headers.get_str("x-trace"), Some("abc"));
        assert_eq!(sub.headers.get_all("set-cookie").count(), 2);
        assert!(sub.status_code.is_none());
    }

    #[test]
    fn test_resolved_constructors() {
        let ok = ResolvedDependencies::with_values(Values::from([("a".into(), json!(1))]));
        assert!(ok.errors.is_empty());
        assert_eq!(ok.values["a"], 1);

        let failed = ResolvedDependencies::with_errors(vec![ErrorRecord::new(
            ["query", "q"],
            "field required",
            "value_error.missing",
        )]);
        assert_eq!(failed.errors.len(), 1);
        assert!(failed.values.is_empty());
    }
}
