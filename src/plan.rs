//! Schema-driven planning.
//!
//! The protocol has no separate "unknown" marker, so a computed value the
//! provider cannot predict is planned as `null` and filled in by apply.

use serde_json::{Map, Value};

use crate::schema::{Attribute, Block, Schema};
use crate::types::{AttributeChange, PlanResult};

static NULL: Value = Value::Null;

fn field<'a>(object: &'a Value, name: &str) -> &'a Value {
    object.get(name).unwrap_or(&NULL)
}

/// Plan a resource change from its schema alone.
///
/// Replacement triggered by resource-specific rules is layered on top by the
/// caller.
pub fn plan(schema: &Schema, prior_state: Option<&Value>, proposed_state: &Value) -> PlanResult {
    let prior_state = prior_state.filter(|prior| !prior.is_null());

    match (prior_state, proposed_state) {
        (None, Value::Null) => PlanResult::no_change(Value::Null),
        (Some(prior), Value::Null) => plan_destroy(prior),
        (None, proposed) => plan_create(&schema.block, proposed),
        (Some(prior), proposed) => plan_update(&schema.block, prior, proposed),
    }
}

fn plan_destroy(prior: &Value) -> PlanResult {
    let changes = prior
        .as_object()
        .into_iter()
        .flatten()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| AttributeChange::removed(name.clone(), value.clone()))
        .collect();
    PlanResult::with_changes(Value::Null, changes, false)
}

fn plan_create(block: &Block, proposed: &Value) -> PlanResult {
    let planned = normalize(block, proposed, None);
    let changes = planned
        .as_object()
        .into_iter()
        .flatten()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| AttributeChange::added(name.clone(), value.clone()))
        .collect();
    PlanResult::with_changes(planned, changes, false)
}

fn plan_update(block: &Block, prior: &Value, proposed: &Value) -> PlanResult {
    let planned = normalize(block, proposed, Some(prior));

    let mut names: Vec<&String> = block
        .attributes
        .iter()
        .filter(|(_, attr)| !attr.flags.is_computed_only())
        .map(|(name, _)| name)
        .chain(block.blocks.keys())
        .collect();
    names.sort();

    let mut changes = Vec::new();
    let mut requires_replace = false;
    for name in names {
        let before = field(prior, name);
        let after = field(&planned, name);
        if before == after {
            continue;
        }
        if block.attributes.get(name).is_some_and(|attr| attr.force_new) {
            requires_replace = true;
        }
        changes.push(match (before.is_null(), after.is_null()) {
            (true, _) => AttributeChange::added(name.clone(), after.clone()),
            (_, true) => AttributeChange::removed(name.clone(), before.clone()),
            _ => AttributeChange::modified(name.clone(), before.clone(), after.clone()),
        });
    }

    if requires_replace {
        // The replacement is a fresh object; nothing carries over from state.
        let planned = normalize(block, proposed, None);
        return PlanResult::with_changes(planned, changes, true);
    }
    PlanResult::with_changes(planned, changes, false)
}

/// Build the planned object for `block`: every schema key present, computed
/// values resolved against `prior`, JSON strings kept stable.
fn normalize(block: &Block, proposed: &Value, prior: Option<&Value>) -> Value {
    let mut planned = Map::new();

    for (name, attr) in &block.attributes {
        let value = field(proposed, name);
        let prior_value = prior.map(|p| field(p, name));
        planned.insert(name.clone(), plan_attribute(attr, value, prior_value));
    }

    for (name, nested) in &block.blocks {
        let value = match field(proposed, name) {
            Value::Null => Value::Null,
            inner => {
                let prior_inner = prior.map(|p| field(p, name)).filter(|v| !v.is_null());
                normalize(&nested.block, inner, prior_inner)
            },
        };
        planned.insert(name.clone(), value);
    }

    Value::Object(planned)
}

fn plan_attribute(attr: &Attribute, proposed: &Value, prior: Option<&Value>) -> Value {
    if attr.flags.is_computed_only() {
        return match prior {
            Some(prior) if attr.use_state_for_unknown => prior.clone(),
            _ => Value::Null,
        };
    }

    if attr.semantic_json {
        if let (Some(prior), Value::String(proposed_text)) = (prior, proposed) {
            if let Value::String(prior_text) = prior {
                if json_equal(prior_text, proposed_text) {
                    return prior.clone();
                }
            }
        }
    }

    proposed.clone()
}

/// Whether two JSON documents are equal once parsed.
pub fn json_equal(a: &str, b: &str) -> bool {
    match (serde_json::from_str::<Value>(a), serde_json::from_str::<Value>(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
