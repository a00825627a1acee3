//! service-core: configuration, HTTP errors, middleware and tracing setup
//! shared by the service binaries.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
