//! `authsignal_rule`: a rule evaluated when an action is tracked.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::action_configuration::ACTION_RESULTS;
use super::{
    found, from_state, non_empty, non_empty_list, parse_json, read_only, render_json, required,
    to_state,
};
use super::{DataSource, Resource};
use crate::client::{ManagementApi, Nullable, Rule, RuleInput, WriteMode};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Schema, Validator};

const TYPE_NAME: &str = "authsignal_rule";

const VERIFICATION_METHODS: &[&str] = &[
    "SMS",
    "AUTHENTICATOR_APP",
    "EMAIL_MAGIC_LINK",
    "EMAIL_OTP",
    "PUSH",
    "SECURITY_KEY",
    "PASSKEY",
    "VERIFF",
    "IPROOV",
    "REDROCK",
    "IDVERSE",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct RuleState {
    action_code: Option<String>,
    rule_id: Option<String>,
    tenant_id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    is_active: Option<bool>,
    priority: Option<i64>,
    #[serde(rename = "type")]
    rule_type: Option<String>,
    verification_methods: Option<Vec<String>>,
    prompt_to_enroll_verification_methods: Option<Vec<String>>,
    default_verification_method: Option<String>,
    conditions: Option<String>,
}

/// Send a value even when it is falsy; `false` and `0` are real settings here.
fn always<T>(value: Option<T>) -> Nullable<T> {
    value.map_or(Nullable::Null, Nullable::Value)
}

impl RuleState {
    fn input(&self, mode: WriteMode, conditions: Option<Value>) -> RuleInput {
        RuleInput {
            name: mode.apply(self.name.clone()),
            description: mode.apply(self.description.clone()),
            is_active: always(self.is_active),
            priority: always(self.priority),
            r#type: always(self.rule_type.clone()),
            verification_methods: mode.apply(self.verification_methods.clone()),
            prompt_to_enroll_verification_methods: mode
                .apply(self.prompt_to_enroll_verification_methods.clone()),
            default_verification_method: mode.apply(self.default_verification_method.clone()),
            conditions: match mode {
                WriteMode::Create => mode.apply(conditions),
                _ => always(conditions),
            },
        }
    }

    fn refresh(&mut self, rule: Rule, summary: &str) -> Result<(), ProviderError> {
        self.action_code = non_empty(rule.action_code).or(self.action_code.take());
        self.rule_id = non_empty(rule.rule_id).or(self.rule_id.take());
        self.tenant_id = non_empty(rule.tenant_id);
        self.name = Some(rule.name);
        self.description = non_empty(rule.description);
        self.is_active = Some(rule.is_active);
        self.priority = Some(rule.priority);
        self.rule_type = Some(rule.r#type);
        self.verification_methods = non_empty_list(rule.verification_methods);
        self.prompt_to_enroll_verification_methods =
            non_empty_list(rule.prompt_to_enroll_verification_methods);
        self.default_verification_method = non_empty(rule.default_verification_method);
        self.conditions = render_json(rule.conditions.as_ref(), summary)?;
        Ok(())
    }
}

fn resource_schema() -> Schema {
    Schema::v0()
        .with_description("Manages a rule on an Authsignal action.")
        .with_attribute(
            "action_code",
            Attribute::required_string()
                .with_force_new()
                .with_description("The action the rule belongs to."),
        )
        .with_attribute(
            "rule_id",
            Attribute::computed_string().with_state_for_unknown(),
        )
        .with_attribute(
            "tenant_id",
            Attribute::computed_string().with_state_for_unknown(),
        )
        .with_attribute("name", Attribute::required_string())
        .with_attribute("description", Attribute::optional_string())
        .with_attribute(
            "is_active",
            Attribute::required_bool().with_description("Whether the rule is evaluated."),
        )
        .with_attribute(
            "priority",
            Attribute::required_int64()
                .with_validator(Validator::Between { min: 0, max: 99 })
                .with_description("Evaluation order; lower numbers run first."),
        )
        .with_attribute(
            "type",
            Attribute::required_string()
                .with_validator(Validator::one_of(ACTION_RESULTS))
                .with_description("The result applied when the rule matches."),
        )
        .with_attribute(
            "verification_methods",
            Attribute::optional_list(AttributeType::String)
                .with_validator(Validator::each_one_of(VERIFICATION_METHODS)),
        )
        .with_attribute(
            "prompt_to_enroll_verification_methods",
            Attribute::optional_list(AttributeType::String)
                .with_validator(Validator::each_one_of(&["PASSKEY"])),
        )
        .with_attribute(
            "default_verification_method",
            Attribute::optional_string().with_validator(Validator::one_of(VERIFICATION_METHODS)),
        )
        .with_attribute(
            "conditions",
            Attribute::required_string()
                .with_semantic_json()
                .with_description("The rule's conditions, as a JSON logic document."),
        )
}

/// The rule resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleResource;

#[async_trait]
impl Resource for RuleResource {
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
        let mut state: RuleState = from_state(planned)?;
        let action_code = required(&state.action_code, "action_code")?.to_string();
        let conditions = parse_json(state.conditions.as_deref(), "Unable to marshal conditions")?;

        let created = api
            .create_rule(&action_code, &state.input(WriteMode::Create, conditions))
            .await
            .map_err(|err| ProviderError::api("Error creating rule", err))?;
        debug!(action_code = %action_code, rule_id = %created.rule_id, "created rule");

        state.rule_id = Some(created.rule_id);
        state.tenant_id = non_empty(created.tenant_id);
        to_state(&state)
    }

    async fn read(
        &self,
        api: &dyn ManagementApi,
        current: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let mut state: RuleState = from_state(current)?;
        let action_code = required(&state.action_code, "action_code")?;
        let rule_id = required(&state.rule_id, "rule_id")?;

        let fetched = api.get_rule(action_code, rule_id).await;
        let Some(rule) = found(fetched, "Error Reading rule")? else {
            return Ok(None);
        };

        state.refresh(rule, "Unable to marshal conditions")?;
        Ok(Some(to_state(&state)?))
    }

    async fn update(
        &self,
        api: &dyn ManagementApi,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let prior: RuleState = from_state(prior)?;
        let mut state: RuleState = from_state(planned)?;
        let action_code = required(&state.action_code, "action_code")?.to_string();
        let rule_id = required(&prior.rule_id, "rule_id")?;
        let conditions = parse_json(state.conditions.as_deref(), "Unable to marshal conditions")?;

        api.update_rule(&action_code, rule_id, &state.input(WriteMode::Update, conditions))
            .await
            .map_err(|err| ProviderError::api("Error Updating Authsignal rule", err))?;

        let fresh = api
            .get_rule(&action_code, rule_id)
            .await
            .map_err(|err| ProviderError::api("Error Reading Authsignal rule", err))?;

        state.rule_id = non_empty(fresh.rule_id).or_else(|| prior.rule_id.clone());
        state.tenant_id = non_empty(fresh.tenant_id);
        to_state(&state)
    }

    async fn delete(&self, api: &dyn ManagementApi, current: Value) -> Result<(), ProviderError> {
        let state: RuleState = from_state(current)?;
        let action_code = required(&state.action_code, "action_code")?;
        let rule_id = required(&state.rule_id, "rule_id")?;

        api.delete_rule(action_code, rule_id)
            .await
            .map_err(|err| ProviderError::api("Error Deleting Authsignal rule", err))
    }

    fn import_state(&self, id: &str) -> Result<Value, ProviderError> {
        match id.split('/').collect::<Vec<_>>().as_slice() {
            [action_code, rule_id] if !action_code.is_empty() && !rule_id.is_empty() => {
                Ok(json!({ "action_code": action_code, "rule_id": rule_id }))
            },
            _ => Err(ProviderError::invalid_request(
                "Unexpected Import Identifier",
                format!(
                    "Expected import identifier with format: action_code/rule_id. Got: {:?}",
                    id
                ),
            )),
        }
    }
}

/// Looks up a rule by action code and rule id.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleDataSource;

#[async_trait]
impl DataSource for RuleDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        read_only(resource_schema())
            .with_description("Reads a rule on an Authsignal action.")
            .with_attribute("action_code", Attribute::required_string())
            .with_attribute("rule_id", Attribute::required_string())
    }

    async fn read(&self, api: &dyn ManagementApi, config: Value) -> Result<Value, ProviderError> {
        let mut state: RuleState = from_state(config)?;
        let rule = api
            .get_rule(
                required(&state.action_code, "action_code")?,
                required(&state.rule_id, "rule_id")?,
            )
            .await
            .map_err(|err| ProviderError::api("Unable to Read Authsignal Rule", err))?;

        state.refresh(rule, "Unable to marshal conditions")?;
        to_state(&state)
    }
}
