//! A scripted [`DependencyResolver`].
//!
//! [`StaticResolver`] answers every call from a closure instead of resolving a
//! real dependency graph, and counts how often it was called and what it saw.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use apiroute_core::{ApiResult, ErrorRecord};
use apiroute_handler::dependencies::{
    Dependant, DependencyOverridesProvider, DependencyResolver, ResolvedDependencies, Values,
};
use apiroute_http::{Request, RequestBody};

type Script = dyn Fn(
        &Request,
        &Dependant,
        Option<&RequestBody>,
        Option<&dyn DependencyOverridesProvider>,
    ) -> ApiResult<ResolvedDependencies>
    + Send
    + Sync;

/// A resolver driven by a closure.
///
/// # Examples
///
/// ```
/// use apiroute_handler::dependencies::{Dependant, DependencyResolver};
/// use apiroute_test::resolver::StaticResolver;
/// use apiroute_test::request_factory::RequestFactory;
///
/// # #[tokio::main]
/// # async fn main() {
/// let resolver = StaticResolver::body_as("item");
/// let request = RequestFactory::new().post_json("/items", &serde_json::json!({"id": 1}));
/// let body = apiroute_http::RequestBody::Json(request.json().unwrap().unwrap());
///
/// let resolved = resolver
///     .resolve(&request, &Dependant::new("create"), Some(&body), None)
///     .await
///     .unwrap();
/// assert_eq!(resolved.values["item"]["id"], 1);
/// assert_eq!(resolver.call_count(), 1);
/// # }
/// ```
pub struct StaticResolver {
    script: Box<Script>,
    calls: AtomicUsize,
    last_body: Mutex<Option<RequestBody>>,
    last_dependant: Mutex<Option<String>>,
    saw_overrides: Mutex<bool>,
}

impl StaticResolver {
    /// A resolver running `script` on every call.
    pub fn from_fn<F>(script: F) -> Self
    where
        F: Fn(
                &Request,
                &Dependant,
                Option<&RequestBody>,
                Option<&dyn DependencyOverridesProvider>,
            ) -> ApiResult<ResolvedDependencies>
            + Send
            + Sync
            + 'static,
    {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            last_body: Mutex::new(None),
            last_dependant: Mutex::new(None),
            saw_overrides: Mutex::new(false),
        }
    }

    /// Resolves nothing and reports no errors.
    pub fn empty() -> Self {
        Self::from_fn(|_, _, _, _| Ok(ResolvedDependencies::default()))
    }

    /// Always resolves to `values`.
    pub fn with_values(values: Values) -> Self {
        Self::from_fn(move |_, _, _, _| Ok(ResolvedDependencies::with_values(values.clone())))
    }

    /// Always reports `errors`.
    pub fn with_errors(errors: Vec<ErrorRecord>) -> Self {
        Self::from_fn(move |_, _, _, _| Ok(ResolvedDependencies::with_errors(errors.clone())))
    }

    /// Exposes the parsed body, as JSON, under `name`.
    pub fn body_as(name: &str) -> Self {
        let name = name.to_string();
        Self::from_fn(move |_, _, body, _| {
            let mut values = Values::new();
            if let Some(body) = body {
                values.insert(name.clone(), body.to_json());
            }
            Ok(ResolvedDependencies::with_values(values))
        })
    }

    /// How many times `resolve` ran.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The body passed to the most recent call.
    pub fn last_body(&self) -> Option<RequestBody> {
        self.last_body.lock().ok().and_then(|body| body.clone())
    }

    /// The name of the dependant passed to the most recent call.
    pub fn last_dependant(&self) -> Option<String> {
        self.last_dependant.lock().ok().and_then(|name| name.clone())
    }

    /// Whether the most recent call received an override provider.
    pub fn saw_overrides(&self) -> bool {
        self.saw_overrides.lock().map(|saw| *saw).unwrap_or(false)
    }
}

impl fmt::Debug for StaticResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticResolver")
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DependencyResolver for StaticResolver {
    async fn resolve(
        &self,
        request: &Request,
        dependant: &Dependant,
        body: Option<&RequestBody>,
        overrides: Option<&dyn DependencyOverridesProvider>,
    ) -> ApiResult<ResolvedDependencies> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_body.lock() {
            *last = body.cloned();
        }
        if let Ok(mut last) = self.last_dependant.lock() {
            *last = Some(dependant.name.clone());
        }
        if let Ok(mut saw) = self.saw_overrides.lock() {
            *saw = overrides.is_some();
        }
        (self.script)(request, dependant, body, overrides)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_counts_and_records() {
        let resolver = StaticResolver::empty();
        let request = Request::builder().build();
        resolver
            .resolve(&request, &Dependant::new("list"), None, None)
            .await
            .unwrap();
        resolver
            .resolve(&request, &Dependant::new("show"), None, None)
            .await
            .unwrap();
        assert_eq!(resolver.call_count(), 2);
        assert_eq!(resolver.last_dependant().as_deref(), Some("show"));
        assert!(resolver.last_body().is_none());
        assert!(!resolver.saw_overrides());
    }

    #[tokio::test]
    async fn test_with_errors() {
        let resolver = StaticResolver::with_errors(vec![ErrorRecord::new(
            ["query", "limit"],
            "value is not a valid integer",
            "type_error.integer",
        )]);
        let resolved = resolver
            .resolve(&Request::builder().build(), &Dependant::default(), None, None)
            .await
            .unwrap();
        assert_eq!(resolved.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_with_values_each_call() {
        let resolver = StaticResolver::with_values(Values::from([("n".to_string(), json!(3))]));
        for _ in 0..2 {
            let resolved = resolver
                .resolve(&Request::builder().build(), &Dependant::default(), None, None)
                .await
                .unwrap();
            assert_eq!(resolved.values["n"], 3);
        }
    }
}
