//! Authsignal management API client.
//!
//! [`ManagementApi`] is the seam between the provider and the remote service.
//! [`HttpClient`] talks to the real API; tests use
//! [`crate::testing::InMemoryApi`].

mod http;
#[allow(missing_docs)]
pub mod models;
mod nullable;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpClient;
pub use models::*;
pub use nullable::{Meaningful, Nullable, WriteMode};

/// Errors returned by the management API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the response could not be read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not the expected JSON.
    #[error("invalid response body: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered with a non-success status.
    #[error("Authsignal API returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body.
        message: String,
    },

    /// The configured host is not a usable base URL.
    #[error("invalid Authsignal host {0:?}")]
    InvalidUrl(String),
}

impl ApiError {
    /// The HTTP status code, if the API answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the API reported that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Operations the provider needs from the management API.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Create an action configuration.
    async fn create_action_configuration(
        &self,
        input: &ActionConfigurationInput,
    ) -> Result<ActionConfiguration, ApiError>;

    /// Fetch an action configuration by action code.
    async fn get_action_configuration(
        &self,
        action_code: &str,
    ) -> Result<ActionConfiguration, ApiError>;

    /// Patch an action configuration.
    async fn update_action_configuration(
        &self,
        action_code: &str,
        input: &ActionConfigurationInput,
    ) -> Result<ActionConfiguration, ApiError>;

    /// Delete an action configuration.
    async fn delete_action_configuration(&self, action_code: &str) -> Result<(), ApiError>;

    /// Create a rule on an action.
    async fn create_rule(&self, action_code: &str, input: &RuleInput) -> Result<Rule, ApiError>;

    /// Fetch a rule.
    async fn get_rule(&self, action_code: &str, rule_id: &str) -> Result<Rule, ApiError>;

    /// Patch a rule.
    async fn update_rule(
        &self,
        action_code: &str,
        rule_id: &str,
        input: &RuleInput,
    ) -> Result<Rule, ApiError>;

    /// Delete a rule.
    async fn delete_rule(&self, action_code: &str, rule_id: &str) -> Result<(), ApiError>;

    /// Create a value list. The API derives the alias from the name.
    async fn create_value_list(&self, input: &ValueListInput) -> Result<ValueList, ApiError>;

    /// Fetch a value list by alias.
    async fn get_value_list(&self, alias: &str) -> Result<ValueList, ApiError>;

    /// Patch a value list.
    async fn update_value_list(
        &self,
        alias: &str,
        input: &ValueListInput,
    ) -> Result<ValueList, ApiError>;

    /// Delete a value list.
    async fn delete_value_list(&self, alias: &str) -> Result<(), ApiError>;

    /// Create a custom data point.
    async fn create_custom_data_point(
        &self,
        input: &CustomDataPointInput,
    ) -> Result<CustomDataPoint, ApiError>;

    /// Fetch a custom data point by id.
    async fn get_custom_data_point(&self, id: &str) -> Result<CustomDataPoint, ApiError>;

    /// Delete a custom data point.
    async fn delete_custom_data_point(&self, id: &str) -> Result<(), ApiError>;

    /// Fetch the tenant theme.
    async fn get_theme(&self) -> Result<Theme, ApiError>;

    /// Patch the tenant theme.
    async fn update_theme(&self, theme: &Theme) -> Result<Theme, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let err = ApiError::Status {
            status: 404,
            message: "Not Found".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));

        let err = ApiError::InvalidUrl("nope".to_string());
        assert!(!err.is_not_found());
        assert_eq!(err.status(), None);
    }
}
