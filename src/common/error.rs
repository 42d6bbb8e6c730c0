//! Error types for the parity probe
//!
//! Errors fall into two families that the runner reports differently:
//! assertion failures (the environments disagree or miss an expectation)
//! and transport failures (a request never produced a usable response).

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the parity probe
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("No bearer token configured. Set 'token' in the config file, PARITY_PROBE_TOKEN, or pass --token")]
    MissingToken,

    // === Scenario Errors ===
    #[error("Invalid scenario: {0}")]
    Scenario(String),

    #[error("Unknown placeholder '{{{0}}}'")]
    UnknownPlaceholder(String),

    // === Transport Errors ===
    #[error("Request to '{environment}' failed: {source}")]
    Transport {
        environment: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Response from '{environment}' is not valid JSON: {reason}")]
    ResponseDecode { environment: String, reason: String },

    // === Assertion Errors ===
    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("{failed} of {total} scenarios failed")]
    ScenariosFailed { failed: usize, total: usize },

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a transport error for a named environment
    pub fn transport(environment: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            environment: environment.to_string(),
            source,
        }
    }

    /// Create a response decode error for a named environment
    pub fn response_decode(environment: &str, reason: impl ToString) -> Self {
        Self::ResponseDecode {
            environment: environment.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an assertion error, optionally prefixed with a step message
    pub fn assertion(context: Option<&str>, detail: impl AsRef<str>) -> Self {
        match context {
            Some(ctx) => Self::Assertion(format!("{}: {}", ctx, detail.as_ref())),
            None => Self::Assertion(detail.as_ref().to_string()),
        }
    }

    /// Whether this error means a request never produced a usable response
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. } | Error::InvalidUrl { .. } | Error::ResponseDecode { .. }
        )
    }

    /// Whether this error is an expectation mismatch
    pub fn is_assertion(&self) -> bool {
        matches!(self, Error::Assertion(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assertion_prefixes_context() {
        let err = Error::assertion(Some("Expected 404"), "dev returned 200");
        assert_eq!(err.to_string(), "Assertion failed: Expected 404: dev returned 200");

        let err = Error::assertion(None, "dev returned 200");
        assert_eq!(err.to_string(), "Assertion failed: dev returned 200");
    }

    #[test]
    fn test_classification() {
        assert!(Error::assertion(None, "x").is_assertion());
        assert!(!Error::assertion(None, "x").is_transport());
        assert!(Error::response_decode("dev", "eof").is_transport());
        assert!(!Error::Config("bad".into()).is_transport());
    }

    #[test]
    fn test_unknown_placeholder_message() {
        let err = Error::UnknownPlaceholder("capture.item_id".into());
        assert_eq!(err.to_string(), "Unknown placeholder '{capture.item_id}'");
    }
}
