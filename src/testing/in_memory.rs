//! An in-process stand-in for the management API.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::client::*;

/// A [`ManagementApi`] that keeps one tenant in memory.
///
/// It behaves like the remote service where the provider can observe it:
/// aliases are derived from names, objects are stamped with the tenant id,
/// missing objects answer 404, and PATCH bodies leave unset fields alone,
/// clear null fields and replace the rest.
#[derive(Debug)]
pub struct InMemoryApi {
    tenant_id: String,
    state: Mutex<Tenant>,
}

#[derive(Debug, Default)]
struct Tenant {
    actions: BTreeMap<String, ActionConfiguration>,
    rules: BTreeMap<(String, String), Rule>,
    value_lists: BTreeMap<String, ValueList>,
    custom_data_points: BTreeMap<String, CustomDataPoint>,
    theme: Option<Theme>,
    next_id: u64,
    last_body: Option<Value>,
}

impl Default for InMemoryApi {
    fn default() -> Self {
        Self::new("test-tenant")
    }
}

impl InMemoryApi {
    /// An empty tenant with no theme.
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            state: Mutex::new(Tenant::default()),
        }
    }

    /// Seed the tenant theme.
    pub fn with_theme(self, theme: Theme) -> Self {
        self.lock().theme = Some(theme);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Tenant> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The body of the most recent create or patch call, as sent on the wire.
    pub fn last_body(&self) -> Option<Value> {
        self.lock().last_body.clone()
    }

    /// Stored action configuration, if any.
    pub fn action_configuration(&self, action_code: &str) -> Option<ActionConfiguration> {
        self.lock().actions.get(action_code).cloned()
    }

    /// Stored rule, if any.
    pub fn rule(&self, action_code: &str, rule_id: &str) -> Option<Rule> {
        self.lock()
            .rules
            .get(&(action_code.to_string(), rule_id.to_string()))
            .cloned()
    }

    /// Stored value list, if any.
    pub fn value_list(&self, alias: &str) -> Option<ValueList> {
        self.lock().value_lists.get(alias).cloned()
    }

    /// Stored custom data point, if any.
    pub fn custom_data_point(&self, id: &str) -> Option<CustomDataPoint> {
        self.lock().custom_data_points.get(id).cloned()
    }

    /// Stored theme, if any.
    pub fn theme(&self) -> Option<Theme> {
        self.lock().theme.clone()
    }

    /// Remove an object behind the provider's back.
    pub fn forget_rule(&self, action_code: &str, rule_id: &str) {
        self.lock()
            .rules
            .remove(&(action_code.to_string(), rule_id.to_string()));
    }
}

fn not_found() -> ApiError {
    ApiError::Status {
        status: 404,
        message: "Not Found".to_string(),
    }
}

fn bad_request(message: &str) -> ApiError {
    ApiError::Status {
        status: 400,
        message: message.to_string(),
    }
}

fn conflict(message: &str) -> ApiError {
    ApiError::Status {
        status: 409,
        message: message.to_string(),
    }
}

fn record<T: Serialize>(tenant: &mut Tenant, body: &T) -> Result<(), ApiError> {
    tenant.last_body = Some(serde_json::to_value(body)?);
    Ok(())
}

/// Apply a PATCH field to a plain response field.
fn patch<T: Default>(current: &mut T, field: &Nullable<T>)
where
    T: Clone,
{
    match field {
        Nullable::Unset => {},
        Nullable::Null => *current = T::default(),
        Nullable::Value(value) => *current = value.clone(),
    }
}

fn patch_option<T: Clone>(current: &mut Option<T>, field: &Nullable<T>) {
    match field {
        Nullable::Unset => {},
        Nullable::Null => *current = None,
        Nullable::Value(value) => *current = Some(value.clone()),
    }
}

/// Lowercase the name and join alphanumeric runs with hyphens.
fn alias_for(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn patch_theme(current: Theme, patch: Theme) -> Theme {
    Theme {
        name: current.name.patched(patch.name),
        logo_url: current.logo_url.patched(patch.logo_url),
        watermark_url: current.watermark_url.patched(patch.watermark_url),
        favicon_url: current.favicon_url.patched(patch.favicon_url),
        primary_color: current.primary_color.patched(patch.primary_color),
        colors: current.colors.patched(patch.colors),
        container: current.container.patched(patch.container),
        borders: current.borders.patched(patch.borders),
        typography: current.typography.patched(patch.typography),
        page_background: current.page_background.patched(patch.page_background),
        dark_mode: current.dark_mode.patched(patch.dark_mode),
    }
}

#[async_trait]
impl ManagementApi for InMemoryApi {
    async fn create_action_configuration(
        &self,
        input: &ActionConfigurationInput,
    ) -> Result<ActionConfiguration, ApiError> {
        let mut tenant = self.lock();
        record(&mut tenant, input)?;
        let action_code = input
            .action_code
            .as_value()
            .cloned()
            .ok_or_else(|| bad_request("actionCode is required"))?;
        if tenant.actions.contains_key(&action_code) {
            return Err(conflict("action configuration already exists"));
        }

        let created = ActionConfiguration {
            action_code: action_code.clone(),
            tenant_id: self.tenant_id.clone(),
            default_user_action_result: input
                .default_user_action_result
                .as_value()
                .cloned()
                .unwrap_or_default(),
            last_action_created_at: String::new(),
            messaging_templates: input.messaging_templates.as_value().cloned(),
        };
        tenant.actions.insert(action_code, created.clone());
        Ok(created)
    }

    async fn get_action_configuration(
        &self,
        action_code: &str,
    ) -> Result<ActionConfiguration, ApiError> {
        self.lock().actions.get(action_code).cloned().ok_or_else(not_found)
    }

    async fn update_action_configuration(
        &self,
        action_code: &str,
        input: &ActionConfigurationInput,
    ) -> Result<ActionConfiguration, ApiError> {
        let mut tenant = self.lock();
        record(&mut tenant, input)?;
        let current = tenant.actions.get_mut(action_code).ok_or_else(not_found)?;
        patch(&mut current.default_user_action_result, &input.default_user_action_result);
        patch_option(&mut current.messaging_templates, &input.messaging_templates);
        Ok(current.clone())
    }

    async fn delete_action_configuration(&self, action_code: &str) -> Result<(), ApiError> {
        let mut tenant = self.lock();
        tenant.actions.remove(action_code).ok_or_else(not_found)?;
        tenant.rules.retain(|(code, _), _| code != action_code);
        Ok(())
    }

    async fn create_rule(&self, action_code: &str, input: &RuleInput) -> Result<Rule, ApiError> {
        let mut tenant = self.lock();
        record(&mut tenant, input)?;
        tenant.next_id += 1;
        let rule_id = format!("rule-{}", tenant.next_id);

        let mut rule = Rule {
            rule_id: rule_id.clone(),
            tenant_id: self.tenant_id.clone(),
            action_code: action_code.to_string(),
            ..Default::default()
        };
        apply_rule_patch(&mut rule, input);
        tenant
            .rules
            .insert((action_code.to_string(), rule_id), rule.clone());
        Ok(rule)
    }

    async fn get_rule(&self, action_code: &str, rule_id: &str) -> Result<Rule, ApiError> {
        self.lock()
            .rules
            .get(&(action_code.to_string(), rule_id.to_string()))
            .cloned()
            .ok_or_else(not_found)
    }

    async fn update_rule(
        &self,
        action_code: &str,
        rule_id: &str,
        input: &RuleInput,
    ) -> Result<Rule, ApiError> {
        let mut tenant = self.lock();
        record(&mut tenant, input)?;
        let rule = tenant
            .rules
            .get_mut(&(action_code.to_string(), rule_id.to_string()))
            .ok_or_else(not_found)?;
        apply_rule_patch(rule, input);
        Ok(rule.clone())
    }

    async fn delete_rule(&self, action_code: &str, rule_id: &str) -> Result<(), ApiError> {
        self.lock()
            .rules
            .remove(&(action_code.to_string(), rule_id.to_string()))
            .map(|_| ())
            .ok_or_else(not_found)
    }

    async fn create_value_list(&self, input: &ValueListInput) -> Result<ValueList, ApiError> {
        let mut tenant = self.lock();
        record(&mut tenant, input)?;
        let name = input
            .name
            .as_value()
            .cloned()
            .ok_or_else(|| bad_request("name is required"))?;
        let alias = alias_for(&name);
        if tenant.value_lists.contains_key(&alias) {
            return Err(conflict("value list already exists"));
        }

        let list = ValueList {
            name,
            alias: alias.clone(),
            item_type: input
                .item_type
                .as_value()
                .cloned()
                .unwrap_or_else(|| "string".to_string()),
            is_active: input.is_active.as_value().copied().unwrap_or(true),
            value_list_items: input.value_list_items.as_value().cloned().unwrap_or_default(),
        };
        tenant.value_lists.insert(alias, list.clone());
        Ok(list)
    }

    async fn get_value_list(&self, alias: &str) -> Result<ValueList, ApiError> {
        self.lock().value_lists.get(alias).cloned().ok_or_else(not_found)
    }

    async fn update_value_list(
        &self,
        alias: &str,
        input: &ValueListInput,
    ) -> Result<ValueList, ApiError> {
        let mut tenant = self.lock();
        record(&mut tenant, input)?;
        let list = tenant.value_lists.get_mut(alias).ok_or_else(not_found)?;
        patch(&mut list.is_active, &input.is_active);
        patch(&mut list.value_list_items, &input.value_list_items);
        Ok(list.clone())
    }

    async fn delete_value_list(&self, alias: &str) -> Result<(), ApiError> {
        self.lock()
            .value_lists
            .remove(alias)
            .map(|_| ())
            .ok_or_else(not_found)
    }

    async fn create_custom_data_point(
        &self,
        input: &CustomDataPointInput,
    ) -> Result<CustomDataPoint, ApiError> {
        let mut tenant = self.lock();
        record(&mut tenant, input)?;
        tenant.next_id += 1;
        let point = CustomDataPoint {
            id: format!("cdp-{}", tenant.next_id),
            name: input.name.as_value().cloned().unwrap_or_default(),
            data_type: input.data_type.as_value().cloned().unwrap_or_default(),
            model_type: input.model_type.as_value().cloned().unwrap_or_default(),
            description: input.description.as_value().cloned().unwrap_or_default(),
        };
        tenant
            .custom_data_points
            .insert(point.id.clone(), point.clone());
        Ok(point)
    }

    async fn get_custom_data_point(&self, id: &str) -> Result<CustomDataPoint, ApiError> {
        self.lock()
            .custom_data_points
            .get(id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn delete_custom_data_point(&self, id: &str) -> Result<(), ApiError> {
        self.lock()
            .custom_data_points
            .remove(id)
            .map(|_| ())
            .ok_or_else(not_found)
    }

    async fn get_theme(&self) -> Result<Theme, ApiError> {
        self.lock().theme.clone().ok_or_else(not_found)
    }

    async fn update_theme(&self, theme: &Theme) -> Result<Theme, ApiError> {
        let mut tenant = self.lock();
        record(&mut tenant, theme)?;
        let current = tenant.theme.take().unwrap_or_default();
        let updated = patch_theme(current, theme.clone());
        tenant.theme = Some(updated.clone());
        Ok(updated)
    }
}

fn apply_rule_patch(rule: &mut Rule, input: &RuleInput) {
    patch(&mut rule.name, &input.name);
    patch(&mut rule.description, &input.description);
    patch(&mut rule.is_active, &input.is_active);
    patch(&mut rule.priority, &input.priority);
    patch(&mut rule.r#type, &input.r#type);
    patch(&mut rule.verification_methods, &input.verification_methods);
    patch(
        &mut rule.prompt_to_enroll_verification_methods,
        &input.prompt_to_enroll_verification_methods,
    );
    patch(&mut rule.default_verification_method, &input.default_verification_method);
    patch_option(&mut rule.conditions, &input.conditions);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alias_generation() {
        assert_eq!(alias_for("Blocked IPs"), "blocked-ips");
        assert_eq!(alias_for("  VIP users (2024) "), "vip-users-2024");
    }

    #[tokio::test]
    async fn test_rule_patch_semantics() {
        let api = InMemoryApi::default();
        let rule = api
            .create_rule(
                "signIn",
                &RuleInput {
                    name: "Tor".to_string().into(),
                    description: "first".to_string().into(),
                    priority: 3.into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(rule.tenant_id, "test-tenant");
        assert_eq!(rule.rule_id, "rule-1");

        let updated = api
            .update_rule(
                "signIn",
                &rule.rule_id,
                &RuleInput {
                    description: Nullable::Null,
                    priority: 5.into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Tor");
        assert_eq!(updated.description, "");
        assert_eq!(updated.priority, 5);
        assert_eq!(api.last_body(), Some(json!({"description": null, "priority": 5})));
    }

    #[tokio::test]
    async fn test_missing_objects_are_not_found() {
        let api = InMemoryApi::default();
        assert!(api.get_rule("signIn", "nope").await.unwrap_err().is_not_found());
        assert!(api.get_theme().await.unwrap_err().is_not_found());
        assert!(api.delete_value_list("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_deleting_an_action_drops_its_rules() {
        let api = InMemoryApi::default();
        api.create_action_configuration(&ActionConfigurationInput {
            action_code: "signIn".to_string().into(),
            ..Default::default()
        })
        .await
        .unwrap();
        let rule = api.create_rule("signIn", &RuleInput::default()).await.unwrap();

        api.delete_action_configuration("signIn").await.unwrap();
        assert!(api.rule("signIn", &rule.rule_id).is_none());
    }
}
