//! The Authsignal provider: dispatches host requests to resources and data
//! sources through a configured [`ManagementApi`].

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::client::{HttpClient, ManagementApi};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::plan;
use crate::resources::{all_data_sources, all_resources, DataSource, Resource};
use crate::schema::{has_errors, Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities};
use crate::validation;

type EnvLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Provider type name used in the host configuration.
pub const PROVIDER_NAME: &str = "authsignal";

/// Serves the `authsignal_*` resources and data sources.
pub struct AuthsignalProvider {
    version: String,
    client: RwLock<Option<Arc<dyn ManagementApi>>>,
    env: Box<EnvLookup>,
    resources: HashMap<&'static str, Arc<dyn Resource>>,
    data_sources: HashMap<&'static str, Arc<dyn DataSource>>,
}

impl AuthsignalProvider {
    /// An unconfigured provider. `configure` must succeed before any resource
    /// or data source call.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            client: RwLock::new(None),
            env: Box::new(|name| std::env::var(name).ok()),
            resources: all_resources()
                .into_iter()
                .map(|r| (r.type_name(), r))
                .collect(),
            data_sources: all_data_sources()
                .into_iter()
                .map(|d| (d.type_name(), d))
                .collect(),
        }
    }

    /// A provider already wired to `api`, skipping `configure`.
    pub fn with_client(api: Arc<dyn ManagementApi>) -> Self {
        let provider = Self::new(env!("CARGO_PKG_VERSION"));
        Self {
            client: RwLock::new(Some(api)),
            ..provider
        }
    }

    /// Replace the environment lookup used to fill unset provider settings.
    pub fn with_env(
        mut self,
        env: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.env = Box::new(env);
        self
    }

    async fn client(&self) -> Result<Arc<dyn ManagementApi>, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration(
                "the Authsignal provider must be configured before use".to_string(),
            )
        })
    }

    fn resource(&self, resource_type: &str) -> Result<&Arc<dyn Resource>, ProviderError> {
        self.resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&Arc<dyn DataSource>, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

fn sorted_names<T: ?Sized>(map: &HashMap<&'static str, Arc<T>>) -> Vec<String> {
    let mut names: Vec<String> = map.keys().map(|name| name.to_string()).collect();
    names.sort();
    names
}

#[async_trait::async_trait]
impl ProviderService for AuthsignalProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        let schema = self
            .resources
            .iter()
            .fold(schema, |schema, (name, r)| schema.with_resource(*name, r.schema()));
        self.data_sources
            .iter()
            .fold(schema, |schema, (name, d)| schema.with_data_source(*name, d.schema()))
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            resources: sorted_names(&self.resources),
            data_sources: sorted_names(&self.data_sources),
            capabilities: ServerCapabilities { plan_destroy: true },
        }
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validation::validate(&ProviderConfig::schema(), &config))
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validation::validate(&ProviderConfig::schema(), &config);
        if has_errors(&diagnostics) {
            return Ok(diagnostics);
        }

        let resolved = ProviderConfig::from_value(&config)?.resolve_with(self.env.as_ref());
        let credentials = match resolved {
            Ok(credentials) => credentials,
            Err(missing) => {
                diagnostics.extend(missing);
                return Ok(diagnostics);
            },
        };

        let client = match HttpClient::new(
            &credentials.host,
            credentials.tenant_id.clone(),
            credentials.api_secret.clone(),
        ) {
            Ok(client) => client,
            Err(err) => {
                diagnostics.push(
                    Diagnostic::error("Unable to Create Authsignal API Client")
                        .with_detail(err.to_string())
                        .with_attribute("host"),
                );
                return Ok(diagnostics);
            },
        };

        *self.client.write().await = Some(Arc::new(client));
        info!(
            provider = PROVIDER_NAME,
            version = %self.version,
            authsignal_host = %credentials.host,
            authsignal_tenant_id = %credentials.tenant_id,
            "Configured Authsignal client"
        );
        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.client.write().await.take();
        debug!("Released Authsignal client");
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let mut diagnostics = validation::validate(&resource.schema(), &config);
        diagnostics.extend(resource.validate(&config));
        Ok(diagnostics)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let schema = resource.schema();
        let mut result = plan::plan(&schema, prior_state.as_ref(), &proposed_state);

        let prior = prior_state.as_ref().filter(|prior| !prior.is_null());
        if let Some(prior) = prior {
            if !result.planned_state.is_null()
                && !result.requires_replace
                && resource.requires_replace(prior, &result.planned_state)
            {
                result.requires_replace = true;
                result.planned_state = plan::plan(&schema, None, &proposed_state).planned_state;
            }
        }
        Ok(result)
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let api = self.client().await?;
        resource.create(api.as_ref(), planned_state).await
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let api = self.client().await?;
        match resource.read(api.as_ref(), current_state).await? {
            Some(state) => Ok(state),
            None => {
                info!(resource_type, "Remote object no longer exists, removing from state");
                Ok(Value::Null)
            },
        }
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let api = self.client().await?;
        resource.update(api.as_ref(), prior_state, planned_state).await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let api = self.client().await?;
        resource.delete(api.as_ref(), current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let api = self.client().await?;

        let partial = resource.import_state(id)?;
        match resource.read(api.as_ref(), partial).await? {
            Some(state) => Ok(vec![ImportedResource::new(resource_type, state)]),
            None => Err(ProviderError::NotFound(format!("{} {:?}", resource_type, id))),
        }
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        Ok(validation::validate(&data_source.schema(), &config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        let api = self.client().await?;
        data_source.read(api.as_ref(), config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryApi;
    use serde_json::json;

    fn configured() -> (Arc<InMemoryApi>, AuthsignalProvider) {
        let api = Arc::new(InMemoryApi::default());
        (api.clone(), AuthsignalProvider::with_client(api))
    }

    #[tokio::test]
    async fn test_calls_before_configure_fail() {
        let provider = AuthsignalProvider::new("0.0.0").with_env(|_| None);

        let err = provider
            .read("authsignal_rule", json!({"action_code": "a", "rule_id": "b"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        let err = provider
            .read_data_source("authsignal_theme", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        let diags = provider
            .validate_resource_config("authsignal_rule", json!({}))
            .await
            .unwrap();
        assert!(has_errors(&diags));
    }

    #[tokio::test]
    async fn test_unknown_types() {
        let (_, provider) = configured();

        let err = provider.create("authsignal_widget", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(name) if name == "authsignal_widget"));

        let err = provider
            .validate_data_source_config("authsignal_widget", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_configure_from_environment() {
        let provider = AuthsignalProvider::new("0.0.0").with_env(|name| match name {
            "AUTHSIGNAL_HOST" => Some("https://api.example.com/v1/management".to_string()),
            "AUTHSIGNAL_TENANT_ID" => Some("tenant".to_string()),
            "AUTHSIGNAL_API_SECRET" => Some("secret".to_string()),
            _ => None,
        });

        let diags = provider.configure(json!({"host": null})).await.unwrap();
        assert!(diags.is_empty());
        assert!(provider.client().await.is_ok());

        provider.stop().await.unwrap();
        assert!(provider.client().await.is_err());
    }

    #[tokio::test]
    async fn test_configure_reports_bad_host() {
        let provider = AuthsignalProvider::new("0.0.0").with_env(|_| None);
        let diags = provider
            .configure(json!({"host": "not a url", "tenant_id": "t", "api_secret": "s"}))
            .await
            .unwrap();

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Unable to Create Authsignal API Client");
        assert_eq!(diags[0].attribute.as_deref(), Some("host"));
        assert!(provider.client().await.is_err());
    }

    #[tokio::test]
    async fn test_configure_rejects_wrong_types() {
        let provider = AuthsignalProvider::new("0.0.0");
        let diags = provider.configure(json!({"host": 1})).await.unwrap();
        assert!(has_errors(&diags));
    }

    #[tokio::test]
    async fn test_read_of_missing_object_is_null() {
        let (_, provider) = configured();
        let state = provider
            .read("authsignal_custom_data_point", json!({"id": "cdp-404"}))
            .await
            .unwrap();
        assert_eq!(state, Value::Null);
    }

    #[tokio::test]
    async fn test_plan_applies_resource_replacement_rules() {
        let (_, provider) = configured();
        let prior = json!({
            "name": "Allowed",
            "alias": "allowed",
            "item_type": "string",
            "is_active": true,
            "value_list_items_strings": ["a"],
            "value_list_items_numbers": null
        });
        let mut proposed = prior.clone();
        proposed["value_list_items_strings"] = Value::Null;
        proposed["value_list_items_numbers"] = json!([1.0]);

        let result = provider
            .plan("authsignal_value_list", Some(prior.clone()), proposed, Value::Null)
            .await
            .unwrap();
        assert!(result.requires_replace);
        assert_eq!(result.planned_state["alias"], Value::Null);

        let mut proposed = prior.clone();
        proposed["is_active"] = json!(false);
        let result = provider
            .plan("authsignal_value_list", Some(prior), proposed, Value::Null)
            .await
            .unwrap();
        assert!(!result.requires_replace);
        assert_eq!(result.planned_state["alias"], "allowed");
    }

    #[tokio::test]
    async fn test_import_reads_the_object() {
        let (api, provider) = configured();
        let state = provider
            .create(
                "authsignal_custom_data_point",
                json!({"name": "Plan", "data_type": "text", "model_type": "user"}),
            )
            .await
            .unwrap();
        let id = state["id"].as_str().unwrap();

        let imported = provider
            .import_resource("authsignal_custom_data_point", id)
            .await
            .unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].resource_type, "authsignal_custom_data_point");
        assert_eq!(imported[0].state["name"], "Plan");

        api.delete_custom_data_point(id).await.unwrap();
        let err = provider
            .import_resource("authsignal_custom_data_point", id)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[test]
    fn test_schema_and_metadata_agree() {
        let provider = AuthsignalProvider::new("0.0.0");
        let schema = provider.schema();
        let metadata = provider.metadata();

        assert_eq!(metadata.resources.len(), schema.resources.len());
        assert_eq!(metadata.data_sources.len(), schema.data_sources.len());
        assert_eq!(metadata.resources[0], "authsignal_action_configuration");
        assert!(metadata.capabilities.plan_destroy);
        assert!(schema.provider.block.attributes.contains_key("api_secret"));
    }
}
