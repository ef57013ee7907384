//! # apiroute-handler
//!
//! The request-handling adapter for apiroute. Given a [`HandlerDescriptor`],
//! [`get_request_handler`] produces a function that extracts the body, resolves
//! dependencies, invokes the handler (async or on the [`WorkerPool`]), and
//! materializes the result into a [`RouteResponse`].
//!
//! ## Modules
//!
//! - [`adapter`] - The four-stage request pipeline
//! - [`dependencies`] - The dependency-resolver contract and sub-response
//! - [`descriptor`] - Per-route handler configuration
//! - [`handler`] - Handler callables and their outputs
//! - [`route`] - Route binding
//! - [`serialize`] - Response-field validation and serialization
//! - [`server`] - Mounting routes on an axum router
//! - [`worker_pool`] - The bounded pool for blocking handlers

pub mod adapter;
pub mod dependencies;
pub mod descriptor;
pub mod handler;
pub mod route;
pub mod serialize;
pub mod server;
pub mod worker_pool;

pub use adapter::{
    error_response, get_request_handler, RequestHandlerFn, RouteResponse, BODY_PARSE_ERROR_DETAIL,
};
pub use dependencies::{
    Dependant, DependencyOverridesProvider, DependencyResolver, Param, ParamSource,
    ResolvedDependencies, SubResponse, Values,
};
pub use descriptor::{BodyField, BodyKind, HandlerDescriptor, HandlerDescriptorBuilder};
pub use handler::{Handler, HandlerOutput};
pub use route::ApiRoute;
pub use serialize::{serialize_response, FieldKind, ModelSchema, ResponseField, SchemaField};
pub use server::ApiApp;
pub use worker_pool::WorkerPool;
