//! Error types for the Authsignal provider.

use thiserror::Error;

use crate::client::ApiError;
use crate::schema::Diagnostic;

/// Errors surfaced by provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested object was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider is missing or has invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is not served here.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A state or plan document could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The gRPC transport failed.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The operation is not allowed in the current state.
    #[error("Failed precondition: {summary}")]
    FailedPrecondition {
        /// Short description of the failure.
        summary: String,
        /// Guidance for the operator.
        detail: String,
    },

    /// The operation is not supported.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// The host sent a malformed request, such as a bad import identifier.
    #[error("Invalid request: {summary}")]
    InvalidRequest {
        /// Short description of the failure.
        summary: String,
        /// What was expected.
        detail: String,
    },

    /// A call to the management API failed.
    #[error("{summary}: {source}")]
    Api {
        /// What the provider was trying to do.
        summary: String,
        /// The underlying client error.
        #[source]
        source: ApiError,
    },
}

impl ProviderError {
    /// Wrap an API error with the operation that produced it.
    pub fn api(summary: impl Into<String>, source: ApiError) -> Self {
        Self::Api {
            summary: summary.into(),
            source,
        }
    }

    /// Build a failed-precondition error.
    pub fn precondition(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::FailedPrecondition {
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// Build an invalid-request error.
    pub fn invalid_request(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidRequest {
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// Convert the error into the diagnostic reported to the host.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Api { summary, source } => {
                Diagnostic::error(summary.clone()).with_detail(source.to_string())
            },
            Self::FailedPrecondition { summary, detail }
            | Self::InvalidRequest { summary, detail } => {
                Diagnostic::error(summary.clone()).with_detail(detail.clone())
            },
            other => Diagnostic::error(other.to_string()),
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            },
            ProviderError::FailedPrecondition { summary, .. } => {
                tonic::Status::failed_precondition(summary)
            },
            ProviderError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
            ProviderError::InvalidRequest { summary, .. } => {
                tonic::Status::invalid_argument(summary)
            },
            ProviderError::Api { summary, source } => {
                let message = format!("{}: {}", summary, source);
                match source.status() {
                    Some(404) => tonic::Status::not_found(message),
                    Some(401) => tonic::Status::unauthenticated(message),
                    Some(403) => tonic::Status::permission_denied(message),
                    Some(429) => tonic::Status::resource_exhausted(message),
                    Some(code) if code >= 500 => tonic::Status::unavailable(message),
                    Some(_) => tonic::Status::failed_precondition(message),
                    None => tonic::Status::unavailable(message),
                }
            },
        }
    }
}
