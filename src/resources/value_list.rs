//! `authsignal_value_list`: a named list of strings or numbers referenced by rules.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{found, from_state, read_only, required, to_state};
use super::{DataSource, Resource};
use crate::client::{ManagementApi, Nullable, ValueList, ValueListInput, WriteMode};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};

const TYPE_NAME: &str = "authsignal_value_list";

const STRINGS: &str = "value_list_items_strings";
const NUMBERS: &str = "value_list_items_numbers";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct ValueListState {
    name: Option<String>,
    alias: Option<String>,
    item_type: Option<String>,
    is_active: Option<bool>,
    value_list_items_strings: Option<Vec<String>>,
    value_list_items_numbers: Option<Vec<f64>>,
}

fn both_lists_set() -> Diagnostic {
    Diagnostic::error("Invalid value list items").with_detail(format!(
        "Only one of {:?} or {:?} can be set",
        STRINGS, NUMBERS
    ))
}

impl ValueListState {
    fn strings(&self) -> &[String] {
        self.value_list_items_strings.as_deref().unwrap_or_default()
    }

    fn numbers(&self) -> &[f64] {
        self.value_list_items_numbers.as_deref().unwrap_or_default()
    }

    fn item_type(&self) -> Result<&'static str, ProviderError> {
        match (self.strings().is_empty(), self.numbers().is_empty()) {
            (false, false) => {
                let diag = both_lists_set();
                Err(ProviderError::invalid_request(
                    diag.summary,
                    diag.detail.unwrap_or_default(),
                ))
            },
            (_, false) => Ok("number"),
            _ => Ok("string"),
        }
    }

    fn items(&self) -> Vec<Value> {
        if self.numbers().is_empty() {
            self.strings().iter().map(|s| json!(s)).collect()
        } else {
            self.numbers().iter().map(|n| json!(n)).collect()
        }
    }

    fn set_server_fields(&mut self, list: &ValueList) {
        self.alias = Some(list.alias.clone());
        self.is_active = Some(list.is_active);
        self.item_type = Some(list.item_type.clone());
    }

    fn refresh(&mut self, list: ValueList) {
        self.set_server_fields(&list);
        self.name = Some(list.name);

        self.value_list_items_strings = None;
        self.value_list_items_numbers = None;
        if list.value_list_items.is_empty() {
            return;
        }
        if list.item_type == "number" {
            self.value_list_items_numbers =
                Some(list.value_list_items.iter().filter_map(Value::as_f64).collect());
        } else {
            self.value_list_items_strings = Some(
                list.value_list_items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect(),
            );
        }
    }
}

/// Whether a list attribute holds no items, treating `[]` like null.
fn no_items(state: &Value, name: &str) -> bool {
    match state.get(name) {
        Some(Value::Array(items)) => items.is_empty(),
        _ => true,
    }
}

fn resource_schema() -> Schema {
    Schema::v0()
        .with_description("Manages an Authsignal value list.")
        .with_attribute(
            "name",
            Attribute::required_string()
                .with_force_new()
                .with_description("Display name. The alias is derived from it."),
        )
        .with_attribute(
            "alias",
            Attribute::computed_string()
                .with_state_for_unknown()
                .with_description("Identifier used to reference the list from rules."),
        )
        .with_attribute(
            "item_type",
            Attribute::computed_string()
                .with_state_for_unknown()
                .with_description("Either `string` or `number`."),
        )
        .with_attribute("is_active", Attribute::required_bool())
        .with_attribute(STRINGS, Attribute::optional_list(AttributeType::String))
        .with_attribute(NUMBERS, Attribute::optional_list(AttributeType::Float64))
}

/// The value list resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueListResource;

#[async_trait]
impl Resource for ValueListResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        resource_schema()
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        if no_items(config, STRINGS) || no_items(config, NUMBERS) {
            return Vec::new();
        }
        vec![both_lists_set()]
    }

    fn requires_replace(&self, prior: &Value, planned: &Value) -> bool {
        [STRINGS, NUMBERS]
            .iter()
            .any(|name| no_items(prior, name) != no_items(planned, name))
    }

    async fn create(
        &self,
        api: &dyn ManagementApi,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let mut state: ValueListState = from_state(planned)?;
        let input = ValueListInput {
            name: required(&state.name, "name")?.to_string().into(),
            is_active: state.is_active.map_or(Nullable::Null, Nullable::Value),
            item_type: state.item_type()?.to_string().into(),
            value_list_items: WriteMode::Create.apply(Some(state.items())),
        };

        let created = api
            .create_value_list(&input)
            .await
            .map_err(|err| ProviderError::api("Error creating value list", err))?;
        debug!(alias = %created.alias, "created value list");

        state.set_server_fields(&created);
        to_state(&state)
    }

    async fn read(
        &self,
        api: &dyn ManagementApi,
        current: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let mut state: ValueListState = from_state(current)?;
        let alias = required(&state.alias, "alias")?;

        match found(api.get_value_list(alias).await, "Unable to Read Authsignal ValueList")? {
            Some(list) => {
                state.refresh(list);
                Ok(Some(to_state(&state)?))
            },
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        api: &dyn ManagementApi,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let prior: ValueListState = from_state(prior)?;
        let mut state: ValueListState = from_state(planned)?;
        let alias = required(&prior.alias, "alias")?;
        state.item_type()?;

        let input = ValueListInput {
            is_active: state.is_active.map_or(Nullable::Null, Nullable::Value),
            value_list_items: WriteMode::Update.apply(Some(state.items())),
            ..Default::default()
        };
        let updated = api
            .update_value_list(alias, &input)
            .await
            .map_err(|err| ProviderError::api("Error updating value list", err))?;

        state.set_server_fields(&updated);
        to_state(&state)
    }

    async fn delete(&self, api: &dyn ManagementApi, current: Value) -> Result<(), ProviderError> {
        let state: ValueListState = from_state(current)?;
        api.delete_value_list(required(&state.alias, "alias")?)
            .await
            .map_err(|err| ProviderError::api("Error Deleting Authsignal value list", err))
    }

    fn import_state(&self, id: &str) -> Result<Value, ProviderError> {
        Ok(json!({ "alias": id }))
    }
}

/// Looks up a value list by alias.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueListDataSource;

#[async_trait]
impl DataSource for ValueListDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        read_only(resource_schema())
            .with_description("Reads an Authsignal value list.")
            .with_attribute("alias", Attribute::required_string())
    }

    async fn read(&self, api: &dyn ManagementApi, config: Value) -> Result<Value, ProviderError> {
        let mut state: ValueListState = from_state(config)?;
        let list = api
            .get_value_list(required(&state.alias, "alias")?)
            .await
            .map_err(|err| ProviderError::api("Unable to Read Authsignal ValueList", err))?;

        state.refresh(list);
        to_state(&state)
    }
}
