//! Route binding.
//!
//! An [`ApiRoute`] pairs a path and a set of methods with the
//! [`HandlerDescriptor`] that serves them. Matching stays with the router; the
//! route only produces the request handler the router calls.

use std::sync::Arc;

use http::Method;

use crate::adapter::{get_request_handler, RequestHandlerFn};
use crate::dependencies::DependencyResolver;
use crate::descriptor::HandlerDescriptor;
use crate::worker_pool::WorkerPool;

/// A path, its methods, and the handler serving them.
///
/// # Examples
///
/// ```
/// use apiroute_handler::{ApiRoute, Handler, HandlerDescriptor};
/// use http::Method;
///
/// let descriptor = HandlerDescriptor::builder(Handler::from_blocking(|_| {
///     Ok(serde_json::json!([]))
/// }))
/// .build();
/// let route = ApiRoute::new("/items", descriptor)
///     .methods([Method::GET, Method::HEAD])
///     .name("list_items");
///
/// assert_eq!(route.path(), "/items");
/// assert_eq!(route.name_ref(), Some("list_items"));
/// ```
#[derive(Debug, Clone)]
pub struct ApiRoute {
    path: String,
    methods: Vec<Method>,
    name: Option<String>,
    descriptor: Arc<HandlerDescriptor>,
}

impl ApiRoute {
    /// Creates a `GET` route.
    pub fn new(path: impl Into<String>, descriptor: HandlerDescriptor) -> Self {
        Self {
            path: path.into(),
            methods: vec![Method::GET],
            name: None,
            descriptor: Arc::new(descriptor),
        }
    }

    /// Replaces the methods this route answers.
    #[must_use]
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method_list(&self) -> &[Method] {
        &self.methods
    }

    pub fn name_ref(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub const fn descriptor(&self) -> &Arc<HandlerDescriptor> {
        &self.descriptor
    }

    /// Produces the request handler for this route.
    pub fn get_route_handler(
        &self,
        resolver: Arc<dyn DependencyResolver>,
        pool: WorkerPool,
    ) -> RequestHandlerFn {
        get_request_handler(Arc::clone(&self.descriptor), resolver, pool)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::handler::Handler;

    use super::*;

    fn route() -> ApiRoute {
        ApiRoute::new(
            "/items/{id}",
            HandlerDescriptor::builder(Handler::from_blocking(|_| Ok(json!(1)))).build(),
        )
    }

    #[test]
    fn test_defaults_to_get() {
        let route = route();
        assert_eq!(route.method_list(), &[Method::GET]);
        assert!(route.name_ref().is_none());
    }

    #[test]
    fn test_builder() {
        let route = route().methods([Method::PUT, Method::PATCH]).name("update_item");
        assert_eq!(route.path(), "/items/{id}");
        assert_eq!(route.method_list(), &[Method::PUT, Method::PATCH]);
        assert_eq!(route.name_ref(), Some("update_item"));
    }

    #[test]
    fn test_clones_share_descriptor() {
        let a = route();
        let b = a.clone();
        assert!(Arc::ptr_eq(a.descriptor(), b.descriptor()));
    }
}
