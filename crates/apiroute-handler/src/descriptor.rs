//! Per-route handler configuration.
//!
//! A [`HandlerDescriptor`] is built once when a route is registered and then
//! shared read-only by every request the route serves.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;

use apiroute_http::ResponseClass;

use crate::dependencies::{Dependant, DependencyOverridesProvider};
use crate::handler::Handler;
use crate::serialize::ResponseField;

/// How a declared body is parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyKind {
    /// Raw bytes, parsed as JSON when non-empty.
    #[default]
    Json,
    /// A urlencoded or multipart form.
    Form,
}

/// The declared request body of a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyField {
    pub name: String,
    pub kind: BodyKind,
}

impl BodyField {
    pub fn json(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: BodyKind::Json,
        }
    }

    pub fn form(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: BodyKind::Form,
        }
    }
}

/// Immutable configuration of one route's handler.
///
/// # Examples
///
/// ```
/// use apiroute_handler::{Handler, HandlerDescriptor};
/// use apiroute_handler::descriptor::BodyField;
/// use http::StatusCode;
///
/// let descriptor = HandlerDescriptor::builder(Handler::from_async(|values| async move {
///     Ok(values["item"].clone())
/// }))
/// .body_field(BodyField::json("item"))
/// .status_code(StatusCode::CREATED)
/// .exclude(["secret"])
/// .build();
///
/// assert_eq!(descriptor.status_code(), StatusCode::CREATED);
/// assert!(descriptor.by_alias());
/// ```
pub struct HandlerDescriptor {
    handler: Handler,
    dependant: Dependant,
    body_field: Option<BodyField>,
    status_code: StatusCode,
    response_class: ResponseClass,
    response_field: Option<ResponseField>,
    include: Option<HashSet<String>>,
    exclude: HashSet<String>,
    by_alias: bool,
    exclude_unset: bool,
    dependency_overrides: Option<Arc<dyn DependencyOverridesProvider>>,
}

impl HandlerDescriptor {
    /// Starts a descriptor for `handler` with the default options.
    pub fn builder(handler: Handler) -> HandlerDescriptorBuilder {
        HandlerDescriptorBuilder {
            inner: Self {
                handler,
                dependant: Dependant::default(),
                body_field: None,
                status_code: StatusCode::OK,
                response_class: ResponseClass::default(),
                response_field: None,
                include: None,
                exclude: HashSet::new(),
                by_alias: true,
                exclude_unset: false,
                dependency_overrides: None,
            },
        }
    }

    pub const fn handler(&self) -> &Handler {
        &self.handler
    }

    pub const fn dependant(&self) -> &Dependant {
        &self.dependant
    }

    pub const fn body_field(&self) -> Option<&BodyField> {
        self.body_field.as_ref()
    }

    pub const fn status_code(&self) -> StatusCode {
        self.status_code
    }

    pub const fn response_class(&self) -> ResponseClass {
        self.response_class
    }

    pub const fn response_field(&self) -> Option<&ResponseField> {
        self.response_field.as_ref()
    }

    pub const fn include(&self) -> Option<&HashSet<String>> {
        self.include.as_ref()
    }

    pub const fn exclude(&self) -> &HashSet<String> {
        &self.exclude
    }

    pub const fn by_alias(&self) -> bool {
        self.by_alias
    }

    pub const fn exclude_unset(&self) -> bool {
        self.exclude_unset
    }

    pub fn dependency_overrides(&self) -> Option<&dyn DependencyOverridesProvider> {
        self.dependency_overrides.as_deref()
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("handler", &self.handler)
            .field("dependant", &self.dependant.name)
            .field("body_field", &self.body_field)
            .field("status_code", &self.status_code)
            .field("response_class", &self.response_class)
            .field("response_field", &self.response_field.as_ref().map(|f| &f.name))
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .field("by_alias", &self.by_alias)
            .field("exclude_unset", &self.exclude_unset)
            .field("dependency_overrides", &self.dependency_overrides.is_some())
            .finish()
    }
}

/// Builder for [`HandlerDescriptor`].
#[derive(Debug)]
pub struct HandlerDescriptorBuilder {
    inner: HandlerDescriptor,
}

impl HandlerDescriptorBuilder {
    #[must_use]
    pub fn dependant(mut self, dependant: Dependant) -> Self {
        self.inner.dependant = dependant;
        self
    }

    #[must_use]
    pub fn body_field(mut self, body_field: BodyField) -> Self {
        self.inner.body_field = Some(body_field);
        self
    }

    #[must_use]
    pub const fn status_code(mut self, status: StatusCode) -> Self {
        self.inner.status_code = status;
        self
    }

    #[must_use]
    pub const fn response_class(mut self, class: ResponseClass) -> Self {
        self.inner.response_class = class;
        self
    }

    #[must_use]
    pub fn response_field(mut self, field: ResponseField) -> Self {
        self.inner.response_field = Some(field);
        self
    }

    /// Keeps only these response fields.
    #[must_use]
    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.include = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Drops these response fields.
    #[must_use]
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn by_alias(mut self, by_alias: bool) -> Self {
        self.inner.by_alias = by_alias;
        self
    }

    #[must_use]
    pub const fn exclude_unset(mut self, exclude_unset: bool) -> Self {
        self.inner.exclude_unset = exclude_unset;
        self
    }

    #[must_use]
    pub fn dependency_overrides(mut self, provider: Arc<dyn DependencyOverridesProvider>) -> Self {
        self.inner.dependency_overrides = Some(provider);
        self
    }

    pub fn build(self) -> HandlerDescriptor {
        self.inner
    }
}
