//! # apiroute-test
//!
//! Testing utilities for apiroute. Provides a test client that drives an axum
//! router in memory, a request factory for calling request handlers directly,
//! a sender that records the send protocol, and a scripted dependency
//! resolver.

pub mod client;
pub mod request_factory;
pub mod resolver;
pub mod sender;

pub use client::{TestClient, TestResponse};
pub use request_factory::RequestFactory;
pub use resolver::StaticResolver;
pub use sender::{Journal, RecordingSender};
