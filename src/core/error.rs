//! Typed error handling for unfold-rs
//!
//! Parsing anomalies (malformed filters, over-depth include paths, unknown
//! sort tokens) never reach this module: they are recovered where they occur.
//! What remains are request-level failures that abort the whole pipeline.
//!
//! # Error Categories
//!
//! - [`ResourceError`]: the requested resource or record does not exist
//! - [`PopulateError`]: the population gateway failed; no partial envelope is produced
//! - [`ConfigError`]: schema or configuration declarations are invalid
//! - [`RequestError`]: malformed HTTP input handled by the REST layer
//!
//! # Example
//!
//! ```rust,ignore
//! match pipeline.get("articles", &id, &query).await {
//!     Ok(envelope) => Json(envelope).into_response(),
//!     Err(e) => e.into_response(),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// The main error type for unfold-rs
#[derive(Debug)]
pub enum UnfoldError {
    /// Resource lookup errors
    Resource(ResourceError),

    /// Population gateway failures
    Populate(PopulateError),

    /// Configuration errors
    Config(ConfigError),

    /// HTTP/Request errors
    Request(RequestError),

    /// Internal errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for UnfoldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnfoldError::Resource(e) => write!(f, "{}", e),
            UnfoldError::Populate(e) => write!(f, "{}", e),
            UnfoldError::Config(e) => write!(f, "{}", e),
            UnfoldError::Request(e) => write!(f, "{}", e),
            UnfoldError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for UnfoldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UnfoldError::Resource(e) => Some(e),
            UnfoldError::Populate(e) => Some(e),
            UnfoldError::Config(e) => Some(e),
            UnfoldError::Request(e) => Some(e),
            UnfoldError::Internal(_) => None,
        }
    }
}

/// Error response body for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl UnfoldError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            UnfoldError::Resource(e) => e.status_code(),
            UnfoldError::Populate(e) => e.status_code(),
            UnfoldError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            UnfoldError::Request(e) => e.status_code(),
            UnfoldError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            UnfoldError::Resource(e) => e.error_code(),
            UnfoldError::Populate(e) => e.error_code(),
            UnfoldError::Config(_) => "CONFIG_ERROR",
            UnfoldError::Request(e) => e.error_code(),
            UnfoldError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            UnfoldError::Resource(ResourceError::NotFound { resource, id }) => {
                Some(serde_json::json!({ "resource": resource, "id": id }))
            }
            UnfoldError::Populate(PopulateError::UnknownRelation { resource, relation }) => {
                Some(serde_json::json!({ "resource": resource, "relation": relation }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for UnfoldError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Resource Errors
// =============================================================================

/// Errors related to resource lookups
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("{resource} with id '{id}' not found")]
    NotFound { resource: String, id: String },

    #[error("Unknown resource: {resource}")]
    UnknownResource { resource: String },
}

impl ResourceError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::NOT_FOUND
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ResourceError::NotFound { .. } => "RESOURCE_NOT_FOUND",
            ResourceError::UnknownResource { .. } => "UNKNOWN_RESOURCE",
        }
    }
}

impl From<ResourceError> for UnfoldError {
    fn from(err: ResourceError) -> Self {
        UnfoldError::Resource(err)
    }
}

// =============================================================================
// Populate Errors
// =============================================================================

/// Failures of a population gateway
///
/// Any of these aborts the request: population is all-or-nothing.
#[derive(Debug, thiserror::Error)]
pub enum PopulateError {
    /// The gateway does not know how to populate a requested relation
    #[error("Relation '{relation}' is not defined for {resource}")]
    UnknownRelation { resource: String, relation: String },

    /// The gateway did not answer within the configured budget
    #[error("Population timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// Backend-specific failure
    #[error("Population failed: {message}")]
    Backend { message: String },
}

impl PopulateError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PopulateError::UnknownRelation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            PopulateError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            PopulateError::Backend { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PopulateError::UnknownRelation { .. } => "UNKNOWN_RELATION",
            PopulateError::Timeout { .. } => "POPULATE_TIMEOUT",
            PopulateError::Backend { .. } => "POPULATE_FAILED",
        }
    }
}

impl From<PopulateError> for UnfoldError {
    fn from(err: PopulateError) -> Self {
        UnfoldError::Populate(err)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration and schema declarations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    /// A relation names a resource that is not registered
    #[error("Relation '{relation}' of '{resource}' references unknown resource '{target}'")]
    UnknownReference {
        resource: String,
        relation: String,
        target: String,
    },

    /// Relation names must be plain identifiers (no dots, colons or parentheses)
    #[error("Invalid relation name '{relation}' in '{resource}'")]
    InvalidRelationName { resource: String, relation: String },

    /// A resource reaches itself through relations and declares no depth cap
    #[error("Schema '{resource}' is cyclic and must declare an explicit depth")]
    UnboundedDepth { resource: String },

    #[error("IO error: {message}")]
    IoError { message: String },
}

impl From<ConfigError> for UnfoldError {
    fn from(err: ConfigError) -> Self {
        UnfoldError::Config(err)
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Errors related to HTTP requests
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("Invalid entity ID format: '{id}'")]
    InvalidEntityId { id: String },

    #[error("Invalid request body: {message}")]
    InvalidBody { message: String },
}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::InvalidEntityId { .. } => "INVALID_ENTITY_ID",
            RequestError::InvalidBody { .. } => "INVALID_BODY",
        }
    }
}

impl From<RequestError> for UnfoldError {
    fn from(err: RequestError) -> Self {
        UnfoldError::Request(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<std::io::Error> for UnfoldError {
    fn from(err: std::io::Error) -> Self {
        UnfoldError::Config(ConfigError::IoError {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for UnfoldError {
    fn from(err: serde_yaml::Error) -> Self {
        UnfoldError::Config(ConfigError::ParseError {
            message: err.to_string(),
        })
    }
}

impl From<anyhow::Error> for UnfoldError {
    fn from(err: anyhow::Error) -> Self {
        UnfoldError::Internal(err.to_string())
    }
}

/// A specialized Result type for unfold-rs operations
pub type UnfoldResult<T> = Result<T, UnfoldError>;
