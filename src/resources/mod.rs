//! Resources and data sources served by the provider.
//!
//! Each module owns one Authsignal object type: its schemas, the typed state
//! model and the translation between state and management API bodies.

mod action_configuration;
mod custom_data_point;
mod rule;
mod theme;
mod value_list;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::client::{ApiError, ManagementApi};
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

pub use action_configuration::{ActionConfigurationDataSource, ActionConfigurationResource};
pub use custom_data_point::{CustomDataPointDataSource, CustomDataPointResource};
pub use rule::{RuleDataSource, RuleResource};
pub use theme::{ThemeDataSource, ThemeResource};
pub use value_list::{ValueListDataSource, ValueListResource};

/// A managed Authsignal object.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name, e.g. `authsignal_rule`.
    fn type_name(&self) -> &'static str;

    /// Schema of the resource block.
    fn schema(&self) -> Schema;

    /// Checks beyond what the schema expresses.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let _ = config;
        Vec::new()
    }

    /// Replacement rules beyond `force_new` attributes.
    fn requires_replace(&self, prior: &Value, planned: &Value) -> bool {
        let _ = (prior, planned);
        false
    }

    /// Create the object and return its state.
    async fn create(&self, api: &dyn ManagementApi, planned: Value) -> Result<Value, ProviderError>;

    /// Refresh state. `None` means the object no longer exists.
    async fn read(
        &self,
        api: &dyn ManagementApi,
        current: Value,
    ) -> Result<Option<Value>, ProviderError>;

    /// Apply a planned update and return the new state.
    async fn update(
        &self,
        api: &dyn ManagementApi,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the object.
    async fn delete(&self, api: &dyn ManagementApi, current: Value) -> Result<(), ProviderError>;

    /// Turn an import identifier into the partial state that `read` completes.
    fn import_state(&self, id: &str) -> Result<Value, ProviderError>;
}

/// A read-only lookup of an Authsignal object.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Type name, e.g. `authsignal_rule`.
    fn type_name(&self) -> &'static str;

    /// Schema of the data source block.
    fn schema(&self) -> Schema;

    /// Look the object up and return the full data source state.
    async fn read(&self, api: &dyn ManagementApi, config: Value) -> Result<Value, ProviderError>;
}

/// Every resource the provider serves.
pub fn all_resources() -> Vec<Arc<dyn Resource>> {
    vec![
        Arc::new(ActionConfigurationResource),
        Arc::new(RuleResource),
        Arc::new(ThemeResource),
        Arc::new(CustomDataPointResource),
        Arc::new(ValueListResource),
    ]
}

/// Every data source the provider serves.
pub fn all_data_sources() -> Vec<Arc<dyn DataSource>> {
    vec![
        Arc::new(ActionConfigurationDataSource),
        Arc::new(RuleDataSource),
        Arc::new(ThemeDataSource),
        Arc::new(CustomDataPointDataSource),
        Arc::new(ValueListDataSource),
    ]
}

pub(crate) fn from_state<T: DeserializeOwned>(value: Value) -> Result<T, ProviderError> {
    Ok(serde_json::from_value(value)?)
}

pub(crate) fn to_state<T: Serialize>(state: &T) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(state)?)
}

/// Treat a 404 as "gone".
pub(crate) fn found<T>(
    result: Result<T, ApiError>,
    summary: &str,
) -> Result<Option<T>, ProviderError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(ProviderError::api(summary, err)),
    }
}

/// A required identifier from state or config.
pub(crate) fn required<'a>(
    value: &'a Option<String>,
    name: &str,
) -> Result<&'a str, ProviderError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProviderError::Validation(format!("{} is required", name)))
}

/// The resource schema with every attribute made read-only, the starting
/// point of each data source schema.
pub(crate) fn read_only(schema: Schema) -> Schema {
    Schema {
        block: schema.block.map_attributes(&Attribute::into_computed),
        ..schema
    }
}

/// `None` for empty strings.
pub(crate) fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// `None` for empty lists.
pub(crate) fn non_empty_list<T>(values: Vec<T>) -> Option<Vec<T>> {
    (!values.is_empty()).then_some(values)
}

/// Parse an optional JSON string attribute. Empty strings count as absent.
pub(crate) fn parse_json(
    text: Option<&str>,
    summary: &str,
) -> Result<Option<Value>, ProviderError> {
    match text.filter(|t| !t.is_empty()) {
        None => Ok(None),
        Some(text) => serde_json::from_str(text)
            .map(Some)
            .map_err(|err| ProviderError::invalid_request(summary, err.to_string())),
    }
}

/// Serialize a JSON document from the API back into a state string.
pub(crate) fn render_json(
    value: Option<&Value>,
    summary: &str,
) -> Result<Option<String>, ProviderError> {
    match value.filter(|v| !v.is_null()) {
        None => Ok(None),
        Some(value) => serde_json::to_string(value)
            .map(Some)
            .map_err(|err| ProviderError::invalid_request(summary, err.to_string())),
    }
}
