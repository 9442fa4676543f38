//! `authsignal_custom_data_point`: a tenant-defined field usable in rule conditions.
//!
//! Custom data points are immutable; every configurable attribute forces
//! replacement.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{found, from_state, non_empty, read_only, required, to_state};
use super::{DataSource, Resource};
use crate::client::{CustomDataPoint, CustomDataPointInput, ManagementApi};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema, Validator};

const TYPE_NAME: &str = "authsignal_custom_data_point";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct CustomDataPointState {
    id: Option<String>,
    name: Option<String>,
    data_type: Option<String>,
    model_type: Option<String>,
    description: Option<String>,
}

impl CustomDataPointState {
    fn refresh(&mut self, point: CustomDataPoint) {
        self.id = non_empty(point.id).or(self.id.take());
        self.name = Some(point.name);
        self.data_type = Some(point.data_type);
        self.model_type = Some(point.model_type);
        self.description = non_empty(point.description);
    }
}

fn resource_schema() -> Schema {
    Schema::v0()
        .with_description("Manages an Authsignal custom data point.")
        .with_attribute(
            "id",
            Attribute::computed_string().with_state_for_unknown(),
        )
        .with_attribute("name", Attribute::required_string().with_force_new())
        .with_attribute(
            "data_type",
            Attribute::required_string()
                .with_force_new()
                .with_validator(Validator::one_of(&["text", "number", "boolean", "multiselect"])),
        )
        .with_attribute(
            "model_type",
            Attribute::required_string()
                .with_force_new()
                .with_validator(Validator::one_of(&["action", "user"])),
        )
        .with_attribute("description", Attribute::optional_string().with_force_new())
}

/// The custom data point resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomDataPointResource;

#[async_trait]
impl Resource for CustomDataPointResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        resource_schema()
    }

    async fn create(
        &self,
        api: &dyn ManagementApi,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let mut state: CustomDataPointState = from_state(planned)?;
        let input = CustomDataPointInput {
            name: required(&state.name, "name")?.to_string().into(),
            data_type: required(&state.data_type, "data_type")?.to_string().into(),
            model_type: required(&state.model_type, "model_type")?.to_string().into(),
            description: state.description.clone().unwrap_or_default().into(),
        };

        let created = api
            .create_custom_data_point(&input)
            .await
            .map_err(|err| ProviderError::api("Error creating custom data point", err))?;
        debug!(id = %created.id, "created custom data point");

        state.id = Some(created.id);
        to_state(&state)
    }

    async fn read(
        &self,
        api: &dyn ManagementApi,
        current: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let mut state: CustomDataPointState = from_state(current)?;
        let id = required(&state.id, "id")?;

        let Some(point) = found(
            api.get_custom_data_point(id).await,
            "Unable to Read Authsignal CustomDataPoint",
        )?
        else {
            return Ok(None);
        };

        state.refresh(point);
        Ok(Some(to_state(&state)?))
    }

    async fn update(
        &self,
        _api: &dyn ManagementApi,
        _prior: Value,
        _planned: Value,
    ) -> Result<Value, ProviderError> {
        Err(ProviderError::Unimplemented(
            "Authsignal Custom Data Points cannot be updated".to_string(),
        ))
    }

    async fn delete(&self, api: &dyn ManagementApi, current: Value) -> Result<(), ProviderError> {
        let state: CustomDataPointState = from_state(current)?;
        api.delete_custom_data_point(required(&state.id, "id")?)
            .await
            .map_err(|err| ProviderError::api("Error Deleting Authsignal custom data point", err))
    }

    fn import_state(&self, id: &str) -> Result<Value, ProviderError> {
        Ok(json!({ "id": id }))
    }
}

/// Looks up a custom data point by id.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomDataPointDataSource;

#[async_trait]
impl DataSource for CustomDataPointDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        read_only(resource_schema())
            .with_description("Reads an Authsignal custom data point.")
            .with_attribute("id", Attribute::required_string())
    }

    async fn read(&self, api: &dyn ManagementApi, config: Value) -> Result<Value, ProviderError> {
        let mut state: CustomDataPointState = from_state(config)?;
        let point = api
            .get_custom_data_point(required(&state.id, "id")?)
            .await
            .map_err(|err| ProviderError::api("Unable to Read Authsignal CustomDataPoint", err))?;

        state.refresh(point);
        to_state(&state)
    }
}
