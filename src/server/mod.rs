//! Server module for exposing expandable resources over HTTP
//!
//! This module provides a `ServerBuilder` that wires a schema registry, a
//! resource service and a population gateway into an axum router with:
//! - list/get/create routes for every declared resource
//! - health check routes

pub mod builder;
pub mod handlers;
pub mod router;

pub use builder::ServerBuilder;
pub use handlers::AppState;
pub use router::build_router;
