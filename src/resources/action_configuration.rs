//! `authsignal_action_configuration`: per-action defaults and messaging templates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{found, from_state, non_empty, parse_json, read_only, render_json, required, to_state};
use super::{DataSource, Resource};
use crate::client::{
    ActionConfiguration, ActionConfigurationInput, ManagementApi, Nullable, WriteMode,
};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema, Validator};

const TYPE_NAME: &str = "authsignal_action_configuration";

/// Outcomes an action can default to when no rule matches.
pub(crate) const ACTION_RESULTS: &[&str] = &["ALLOW", "CHALLENGE", "REVIEW", "BLOCK"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct ActionConfigurationState {
    action_code: Option<String>,
    default_user_action_result: Option<String>,
    last_action_created_at: Option<String>,
    tenant_id: Option<String>,
    messaging_templates: Option<String>,
}

impl ActionConfigurationState {
    fn input(&self, mode: WriteMode, templates: Option<Value>) -> ActionConfigurationInput {
        ActionConfigurationInput {
            action_code: match mode {
                WriteMode::Create => mode.apply(self.action_code.clone()),
                _ => Nullable::Unset,
            },
            default_user_action_result: mode.apply(self.default_user_action_result.clone()),
            messaging_templates: mode.apply(templates),
        }
    }

    fn set_server_fields(&mut self, action: &ActionConfiguration) {
        self.default_user_action_result = non_empty(action.default_user_action_result.clone());
        self.last_action_created_at = non_empty(action.last_action_created_at.clone());
        self.tenant_id = non_empty(action.tenant_id.clone());
    }

    fn refresh(&mut self, action: ActionConfiguration, summary: &str) -> Result<(), ProviderError> {
        self.set_server_fields(&action);
        self.messaging_templates = render_json(action.messaging_templates.as_ref(), summary)?;
        Ok(())
    }
}

fn resource_schema() -> Schema {
    Schema::v0()
        .with_description("Configures the default behaviour of an Authsignal action.")
        .with_attribute(
            "action_code",
            Attribute::required_string()
                .with_force_new()
                .with_description("The action's code."),
        )
        .with_attribute(
            "default_user_action_result",
            Attribute::required_string()
                .with_validator(Validator::one_of(ACTION_RESULTS))
                .with_description("The result applied when no rule matches."),
        )
        .with_attribute(
            "last_action_created_at",
            Attribute::computed_string().with_description("When the action was last tracked."),
        )
        .with_attribute(
            "tenant_id",
            Attribute::computed_string()
                .with_state_for_unknown()
                .with_description("The tenant the action belongs to."),
        )
        .with_attribute(
            "messaging_templates",
            Attribute::optional_string()
                .with_semantic_json()
                .with_description("Messaging templates, as a JSON document."),
        )
}

/// The action configuration resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionConfigurationResource;

#[async_trait]
impl Resource for ActionConfigurationResource {
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
        let mut state: ActionConfigurationState = from_state(planned)?;
        let templates = parse_json(
            state.messaging_templates.as_deref(),
            "Unable to unmarshal messaging templates",
        )?;

        let created = api
            .create_action_configuration(&state.input(WriteMode::Create, templates))
            .await
            .map_err(|err| ProviderError::api("Error creating action configuration", err))?;
        debug!(action_code = %created.action_code, "created action configuration");

        state.set_server_fields(&created);
        to_state(&state)
    }

    async fn read(
        &self,
        api: &dyn ManagementApi,
        current: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let mut state: ActionConfigurationState = from_state(current)?;
        let action_code = required(&state.action_code, "action_code")?;

        let Some(action) = found(
            api.get_action_configuration(action_code).await,
            "Error Reading action configuration",
        )?
        else {
            return Ok(None);
        };

        state.refresh(action, "Unable to marshal messaging templates")?;
        Ok(Some(to_state(&state)?))
    }

    async fn update(
        &self,
        api: &dyn ManagementApi,
        _prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let mut state: ActionConfigurationState = from_state(planned)?;
        let action_code = required(&state.action_code, "action_code")?.to_string();
        let templates = parse_json(
            state.messaging_templates.as_deref(),
            "Unable to unmarshal messaging templates",
        )?;

        api.update_action_configuration(&action_code, &state.input(WriteMode::Update, templates))
            .await
            .map_err(|err| {
                ProviderError::api("Error Updating Authsignal action configuration", err)
            })?;

        let fresh = api
            .get_action_configuration(&action_code)
            .await
            .map_err(|err| {
                ProviderError::api("Error Reading Authsignal action configuration", err)
            })?;

        state.action_code = non_empty(fresh.action_code.clone()).or(Some(action_code));
        state.set_server_fields(&fresh);
        to_state(&state)
    }

    async fn delete(&self, api: &dyn ManagementApi, current: Value) -> Result<(), ProviderError> {
        let state: ActionConfigurationState = from_state(current)?;
        let action_code = required(&state.action_code, "action_code")?;

        api.delete_action_configuration(action_code)
            .await
            .map_err(|err| {
                ProviderError::api("Error Deleting Authsignal action configuration", err)
            })
    }

    fn import_state(&self, id: &str) -> Result<Value, ProviderError> {
        Ok(json!({ "action_code": id }))
    }
}

/// Looks up an action configuration by action code.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionConfigurationDataSource;

#[async_trait]
impl DataSource for ActionConfigurationDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        read_only(resource_schema())
            .with_description("Reads an Authsignal action configuration.")
            .with_attribute("action_code", Attribute::required_string())
            .with_attribute(
                "messaging_templates",
                Attribute::optional_string()
                    .with_semantic_json()
                    .into_optional_computed(),
            )
    }

    async fn read(&self, api: &dyn ManagementApi, config: Value) -> Result<Value, ProviderError> {
        let mut state: ActionConfigurationState = from_state(config)?;
        let action = api
            .get_action_configuration(required(&state.action_code, "action_code")?)
            .await
            .map_err(|err| {
                ProviderError::api("Unable to Read Authsignal Action Configuration", err)
            })?;

        state.refresh(action, "Unable to marshal messaging templates")?;
        to_state(&state)
    }
}
