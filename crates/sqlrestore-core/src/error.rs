//! Unified error handling for sqlrestore-core
//!
//! Remote failures are never retried by the workflow; they surface here and
//! propagate to the caller once cleanup has run.
//!
//! # Example
//!
//! ```rust
//! use sqlrestore_core::CoreError;
//!
//! let err = CoreError::Api {
//!     status: 404,
//!     code: Some("ResourceNotFound".to_string()),
//!     message: "gone".to_string(),
//! };
//! assert!(err.is_not_found());
//! assert!(!err.is_timeout());
//! ```

use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;

/// Core error type for control-plane operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// Transport-level failure talking to the control plane
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The control plane answered with a non-success status
    #[error("API error ({status}{}): {message}", fmt_code(.code))]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Token acquisition failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A long-running operation finished in a failed or cancelled state
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// A long-running operation did not finish in time
    #[error("Operation timed out after {0:?}")]
    OperationTimeout(Duration),

    /// A request could not be built from the observed state
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Response body did not match the expected shape
    #[error("Invalid response body: {0}")]
    Json(#[from] serde_json::Error),

    /// A URL could not be built
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

fn fmt_code(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" {c}")).unwrap_or_default()
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    fn status(&self) -> Option<u16> {
        match self {
            CoreError::Api { status, .. } => Some(*status),
            CoreError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if this is a "not found" error (404)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns true if this is an authentication/authorization error (401/403)
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CoreError::Auth(_)) || matches!(self.status(), Some(401 | 403))
    }

    /// Returns true if this is a conflict error (409), e.g. a name already taken
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Returns true if this is a timeout error
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            CoreError::OperationTimeout(_) => true,
            CoreError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}
