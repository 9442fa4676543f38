//! Provider block configuration and credential resolution.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Environment variable consulted when `host` is not configured.
pub const HOST_ENV: &str = "AUTHSIGNAL_HOST";
/// Environment variable consulted when `tenant_id` is not configured.
pub const TENANT_ID_ENV: &str = "AUTHSIGNAL_TENANT_ID";
/// Environment variable consulted when `api_secret` is not configured.
pub const API_SECRET_ENV: &str = "AUTHSIGNAL_API_SECRET";

/// The provider block as written by the user. Every field may be null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Management API base URL.
    pub host: Option<String>,
    /// Tenant the secret belongs to.
    pub tenant_id: Option<String>,
    /// Management API secret.
    pub api_secret: Option<String>,
}

/// Fully resolved, non-empty connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Management API base URL.
    pub host: String,
    /// Tenant the secret belongs to.
    pub tenant_id: String,
    /// Management API secret.
    pub api_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("tenant_id", &self.tenant_id)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl ProviderConfig {
    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Interact with the Authsignal management API.")
            .with_attribute(
                "host",
                Attribute::optional_string().with_description(format!(
                    "Management API URI. May also be provided via the {} environment variable.",
                    HOST_ENV
                )),
            )
            .with_attribute(
                "tenant_id",
                Attribute::optional_string().with_description(format!(
                    "Tenant ID. May also be provided via the {} environment variable.",
                    TENANT_ID_ENV
                )),
            )
            .with_attribute(
                "api_secret",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(format!(
                        "Management API secret. May also be provided via the {} environment variable.",
                        API_SECRET_ENV
                    )),
            )
    }

    /// Parse the provider block. A null document is an empty configuration.
    pub fn from_value(value: &Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Fill unset values using `env` and check them.
    ///
    /// A configured value wins over the environment, even when it is empty.
    /// All three values are checked so every problem is reported at once.
    pub fn resolve_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Credentials, Vec<Diagnostic>> {
        let pick = |configured: &Option<String>, var: &str| {
            configured
                .clone()
                .or_else(|| env(var))
                .unwrap_or_default()
        };

        let host = pick(&self.host, HOST_ENV);
        let tenant_id = pick(&self.tenant_id, TENANT_ID_ENV);
        let api_secret = pick(&self.api_secret, API_SECRET_ENV);

        let mut diagnostics = Vec::new();
        if host.is_empty() {
            diagnostics.push(missing("host", "Host", "API host", HOST_ENV));
        }
        if tenant_id.is_empty() {
            diagnostics.push(missing("tenant_id", "Tenant ID", "API Tenant ID", TENANT_ID_ENV));
        }
        if api_secret.is_empty() {
            diagnostics.push(missing("api_secret", "Secret", "API Secret", API_SECRET_ENV));
        }

        if diagnostics.is_empty() {
            Ok(Credentials {
                host,
                tenant_id,
                api_secret,
            })
        } else {
            Err(diagnostics)
        }
    }
}

fn missing(attribute: &str, title: &str, described: &str, env: &str) -> Diagnostic {
    Diagnostic::error(format!("Missing Authsignal API {}", title))
        .with_detail(format!(
            "The provider cannot create the Authsignal API client as there is a missing or empty value for the Authsignal {}. \
             Set the {} value in the configuration or use the {} environment variable. \
             If either is already set, ensure the value is not empty.",
            described, attribute, env
        ))
        .with_attribute(attribute)
}
