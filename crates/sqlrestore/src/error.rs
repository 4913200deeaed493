//! Error types for the sqlrestore binary

use colored::Colorize;
use sqlrestore_core::{ConfigError, CoreError};
use thiserror::Error;

/// Cargo-style diagnostic printed to stderr
///
/// ```text
/// error: Missing credential: set CLIENT_SECRET
///
///   tip: export the service principal's secret, or pass --client-secret
/// ```
pub struct CliDiagnostic {
    message: String,
    tips: Vec<String>,
}

impl CliDiagnostic {
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            tips: Vec::new(),
        }
    }

    pub fn tip(mut self, text: &str) -> Self {
        self.tips.push(text.to_string());
        self
    }

    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        for tip in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", tip);
        }
    }
}

/// Main error type for the sqlrestore binary
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("API error: {message}")]
    ApiError { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Output error: {message}")]
    OutputError { message: String },
}

pub type Result<T> = std::result::Result<T, CliError>;

impl CliError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            CliError::Config(ConfigError::MissingCredential { env_var }) => vec![
                format!(
                    "Export {} or pass --{}",
                    env_var,
                    env_var.to_lowercase().replace('_', "-")
                ),
                "Create a service principal: az ad sp create-for-rbac --role Contributor"
                    .to_string(),
            ],
            CliError::Config(ConfigError::ParseError(_) | ConfigError::InvalidSetting { .. }) => {
                vec![
                    "Check the effective settings: sqlrestore show-config".to_string(),
                    "Remove the file to fall back to defaults".to_string(),
                ]
            }
            CliError::AuthenticationFailed { .. } => vec![
                "Verify CLIENT_ID, CLIENT_SECRET and TENANT_ID belong to the same app registration"
                    .to_string(),
                "Check that the client secret has not expired".to_string(),
                "Make sure the principal has Contributor on the subscription".to_string(),
            ],
            CliError::ConnectionError { .. } => vec![
                "Check network connectivity".to_string(),
                "Verify the endpoint and authority URLs: sqlrestore show-config".to_string(),
            ],
            CliError::Timeout { .. } => vec![
                "Raise client.lro_timeout_secs in the config file".to_string(),
                "Look for leftover resource groups named rgSQLServer* and delete them".to_string(),
            ],
            CliError::ApiError { .. } => vec![
                "Look for leftover resource groups named rgSQLServer* and delete them".to_string(),
            ],
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&self.to_string());
        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion);
        }
        diag.print();
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        if err.is_unauthorized() {
            return CliError::AuthenticationFailed {
                message: err.to_string(),
            };
        }

        match err {
            CoreError::Config(e) => CliError::Config(e),
            CoreError::Validation(message) => CliError::InvalidInput { message },
            CoreError::OperationTimeout(duration) => CliError::Timeout {
                message: format!("Operation timed out after {} seconds", duration.as_secs()),
            },
            CoreError::Http(e) => CliError::ConnectionError {
                message: e.to_string(),
            },
            other => CliError::ApiError {
                message: other.to_string(),
            },
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::OutputError {
            message: format!("{err:#}"),
        }
    }
}
