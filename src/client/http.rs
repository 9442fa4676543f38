//! reqwest transport for the management API.
//!
//! Non-success responses become [`ApiError::Status`], with the message taken
//! from the JSON error body when there is one.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::models::*;
use super::{ApiError, ManagementApi};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// [`ManagementApi`] over HTTPS.
///
/// Requests authenticate with HTTP basic auth, the API secret as username
/// and an empty password.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: Url,
    tenant_id: String,
    api_secret: String,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("tenant_id", &self.tenant_id)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Build a client for the given host, e.g.
    /// `https://api.authsignal.com/v1/management`.
    pub fn new(
        host: &str,
        tenant_id: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(host).map_err(|_| ApiError::InvalidUrl(host.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(host.to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            tenant_id: tenant_id.into(),
            api_secret: api_secret.into(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        debug!(method = %method, path = url.path(), tenant_id = %self.tenant_id, "Calling Authsignal API");
        self.http
            .request(method, url)
            .basic_auth(&self.api_secret, Some(""))
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = check_status(request.send().await?).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        self.execute(self.request(Method::GET, segments)).await
    }

    async fn send<B, T>(&self, method: Method, segments: &[&str], body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(self.request(method, segments).json(body)).await
    }

    async fn delete(&self, segments: &[&str]) -> Result<(), ApiError> {
        check_status(self.request(Method::DELETE, segments).send().await?).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        message: error_message(status, &body),
    })
}

/// Pull a human-readable message out of an error body.
fn error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["errorDescription", "message", "error"]
                .iter()
                .find_map(|key| value.get(*key)?.as_str().map(str::to_string))
        });

    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        None => body.trim().to_string(),
    }
}

#[async_trait]
impl ManagementApi for HttpClient {
    async fn create_action_configuration(
        &self,
        input: &ActionConfigurationInput,
    ) -> Result<ActionConfiguration, ApiError> {
        self.send(Method::POST, &["actions"], input).await
    }

    async fn get_action_configuration(
        &self,
        action_code: &str,
    ) -> Result<ActionConfiguration, ApiError> {
        self.get(&["actions", action_code]).await
    }

    async fn update_action_configuration(
        &self,
        action_code: &str,
        input: &ActionConfigurationInput,
    ) -> Result<ActionConfiguration, ApiError> {
        self.send(Method::PATCH, &["actions", action_code], input)
            .await
    }

    async fn delete_action_configuration(&self, action_code: &str) -> Result<(), ApiError> {
        self.delete(&["actions", action_code]).await
    }

    async fn create_rule(&self, action_code: &str, input: &RuleInput) -> Result<Rule, ApiError> {
        self.send(Method::POST, &["actions", action_code, "rules"], input)
            .await
    }

    async fn get_rule(&self, action_code: &str, rule_id: &str) -> Result<Rule, ApiError> {
        self.get(&["actions", action_code, "rules", rule_id]).await
    }

    async fn update_rule(
        &self,
        action_code: &str,
        rule_id: &str,
        input: &RuleInput,
    ) -> Result<Rule, ApiError> {
        self.send(
            Method::PATCH,
            &["actions", action_code, "rules", rule_id],
            input,
        )
        .await
    }

    async fn delete_rule(&self, action_code: &str, rule_id: &str) -> Result<(), ApiError> {
        self.delete(&["actions", action_code, "rules", rule_id])
            .await
    }

    async fn create_value_list(&self, input: &ValueListInput) -> Result<ValueList, ApiError> {
        self.send(Method::POST, &["value-lists"], input).await
    }

    async fn get_value_list(&self, alias: &str) -> Result<ValueList, ApiError> {
        self.get(&["value-lists", alias]).await
    }

    async fn update_value_list(
        &self,
        alias: &str,
        input: &ValueListInput,
    ) -> Result<ValueList, ApiError> {
        self.send(Method::PATCH, &["value-lists", alias], input)
            .await
    }

    async fn delete_value_list(&self, alias: &str) -> Result<(), ApiError> {
        self.delete(&["value-lists", alias]).await
    }

    async fn create_custom_data_point(
        &self,
        input: &CustomDataPointInput,
    ) -> Result<CustomDataPoint, ApiError> {
        self.send(Method::POST, &["custom-data-points"], input)
            .await
    }

    async fn get_custom_data_point(&self, id: &str) -> Result<CustomDataPoint, ApiError> {
        self.get(&["custom-data-points", id]).await
    }

    async fn delete_custom_data_point(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&["custom-data-points", id]).await
    }

    async fn get_theme(&self) -> Result<Theme, ApiError> {
        self.get(&["theme"]).await
    }

    async fn update_theme(&self, theme: &Theme) -> Result<Theme, ApiError> {
        self.send(Method::PATCH, &["theme"], theme).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unusable_hosts() {
        assert!(matches!(
            HttpClient::new("not a url", "tenant", "secret"),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpClient::new("mailto:ops@example.com", "tenant", "secret"),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let client =
            HttpClient::new("https://api.authsignal.com/v1/management/", "t", "s").unwrap();
        assert_eq!(
            client.endpoint(&["actions", "sign in", "rules"]).as_str(),
            "https://api.authsignal.com/v1/management/actions/sign%20in/rules"
        );

        let client = HttpClient::new("http://127.0.0.1:8080", "t", "s").unwrap();
        assert_eq!(
            client.endpoint(&["theme"]).as_str(),
            "http://127.0.0.1:8080/theme"
        );
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(
                StatusCode::BAD_REQUEST,
                r#"{"error":"invalid_request","errorDescription":"priority is taken"}"#
            ),
            "priority is taken"
        );
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, ""),
            "Not Found"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down\n"),
            "upstream down"
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let client = HttpClient::new("https://example.com", "tenant-1", "super-secret").unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("tenant-1"));
        assert!(!debug.contains("super-secret"));
    }
}
