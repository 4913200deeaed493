//! Configuration for the restore walkthrough
//!
//! # Features
//!
//! - Optional TOML settings file with defaults for every field
//! - Platform-specific config file location
//! - Service-principal credentials resolved from the environment

pub mod credential;
pub mod error;
pub mod settings;

// Re-export main types for convenience
pub use credential::Credentials;
pub use error::{ConfigError, Result};
pub use settings::{ClientSettings, Settings, WorkflowSettings};
