//! Configuration validation against a [`Schema`].
//!
//! # Example
//!
//! ```
//! use hemmer_provider_authsignal::schema::{Attribute, Schema, Validator};
//! use hemmer_provider_authsignal::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute(
//!         "priority",
//!         Attribute::required_int64().with_validator(Validator::Between { min: 0, max: 99 }),
//!     );
//!
//! assert!(validate(&schema, &json!({"name": "block tor", "priority": 10})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "block tor", "priority": 120}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("priority".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Block, Diagnostic, NestedBlock, Schema, Validator};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// - Required attributes must be present and non-null
/// - Computed-only attributes are skipped (provider sets these)
/// - Attribute types must match the schema
/// - Validators run on present values of the right type
/// - Nested blocks are validated recursively
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            let mut diagnostic = Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", value_type_name(value)));
            if !path.is_empty() {
                diagnostic = diagnostic.with_attribute(path);
            }
            diagnostics.push(diagnostic);
            return;
        },
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);
    }

    for (name, nested) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested, obj.get(name), &block_path, diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            if diagnostics.len() == before {
                for validator in &attr.validators {
                    if let Some(diagnostic) = check_validator(validator, v, path) {
                        diagnostics.push(diagnostic);
                    }
                }
            }
        },
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Float64 => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "float64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "list", value));
            }
        },
    }
}

fn check_validator(validator: &Validator, value: &Value, path: &str) -> Option<Diagnostic> {
    match validator {
        Validator::OneOf(allowed) => {
            let s = value.as_str()?;
            (!allowed.iter().any(|a| a == s)).then(|| not_one_of(path, s, allowed))
        },
        Validator::EachOneOf(allowed) => value
            .as_array()?
            .iter()
            .enumerate()
            .filter_map(|(i, item)| Some((i, item.as_str()?)))
            .find(|(_, s)| !allowed.iter().any(|a| a == s))
            .map(|(i, s)| not_one_of(&format!("{}.{}", path, i), s, allowed)),
        Validator::Between { min, max } => {
            let n = value.as_f64()? as i64;
            (n < *min || n > *max).then(|| {
                Diagnostic::error("Invalid Attribute Value")
                    .with_detail(format!(
                        "Attribute {} value must be between {} and {}, got: {}",
                        path, min, max, n
                    ))
                    .with_attribute(path)
            })
        },
        Validator::Json => {
            let s = value.as_str()?;
            serde_json::from_str::<Value>(s).err().map(|err| {
                Diagnostic::error("Invalid JSON String Value")
                    .with_detail(format!("Attribute {} must be valid JSON: {}", path, err))
                    .with_attribute(path)
            })
        },
    }
}

fn not_one_of(path: &str, got: &str, allowed: &[String]) -> Diagnostic {
    let quoted: Vec<String> = allowed.iter().map(|a| format!("\"{}\"", a)).collect();
    Diagnostic::error("Invalid Attribute Value Match")
        .with_detail(format!(
            "Attribute {} value must be one of: [{}], got: \"{}\"",
            path,
            quoted.join(" "),
            got
        ))
        .with_attribute(path)
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some(v) = value.filter(|v| !v.is_null()) {
        validate_block(&nested.block, v, path, diagnostics);
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) if n.is_i64() => true,
        Value::Number(n) => n
            .as_f64()
            .is_some_and(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64),
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Block, NestedBlock, Schema};
    use serde_json::json;

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate(&schema, &json!({"name": "test"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        assert_eq!(validate(&schema, &json!({"name": null})).len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_optional_attribute() {
        let schema = Schema::v0().with_attribute("count", Attribute::optional_int64());

        assert!(validate(&schema, &json!({"count": 42})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"count": null})).is_empty());
        assert_eq!(validate(&schema, &json!({"count": "not a number"})).len(), 1);
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("rule_id", Attribute::computed_string());

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"rule_id": 123})).is_empty());
    }

    #[test]
    fn test_validate_int64() {
        let schema = Schema::v0().with_attribute("priority", Attribute::required_int64());

        assert!(validate(&schema, &json!({"priority": 42})).is_empty());
        assert!(validate(&schema, &json!({"priority": 42.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"priority": 42.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"priority": "42"})).len(), 1);
    }

    #[test]
    fn test_validate_list_elements() {
        let schema = Schema::v0().with_attribute(
            "value_list_items_numbers",
            Attribute::optional_list(AttributeType::Float64),
        );

        assert!(validate(&schema, &json!({"value_list_items_numbers": [1, 2.5]})).is_empty());

        let diagnostics = validate(&schema, &json!({"value_list_items_numbers": [1, "two"]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("value_list_items_numbers.1".to_string())
        );

        assert_eq!(
            validate(&schema, &json!({"value_list_items_numbers": "1"})).len(),
            1
        );
    }

    #[test]
    fn test_one_of_validator() {
        let schema = Schema::v0().with_attribute(
            "type",
            Attribute::required_string().with_validator(Validator::one_of(&["ALLOW", "BLOCK"])),
        );

        assert!(validate(&schema, &json!({"type": "BLOCK"})).is_empty());

        let diagnostics = validate(&schema, &json!({"type": "DENY"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid Attribute Value Match");
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .unwrap()
            .contains(r#"["ALLOW" "BLOCK"], got: "DENY""#));
    }

    #[test]
    fn test_each_one_of_validator() {
        let schema = Schema::v0().with_attribute(
            "verification_methods",
            Attribute::optional_list(AttributeType::String)
                .with_validator(Validator::each_one_of(&["SMS", "PASSKEY"])),
        );

        assert!(validate(&schema, &json!({"verification_methods": ["SMS", "PASSKEY"]})).is_empty());

        let diagnostics = validate(&schema, &json!({"verification_methods": ["SMS", "FAX"]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("verification_methods.1".to_string())
        );
    }

    #[test]
    fn test_between_validator() {
        let schema = Schema::v0().with_attribute(
            "priority",
            Attribute::required_int64().with_validator(Validator::Between { min: 0, max: 99 }),
        );

        assert!(validate(&schema, &json!({"priority": 0})).is_empty());
        assert!(validate(&schema, &json!({"priority": 99})).is_empty());
        assert_eq!(validate(&schema, &json!({"priority": 100})).len(), 1);
        assert_eq!(validate(&schema, &json!({"priority": -1})).len(), 1);
    }

    #[test]
    fn test_json_validator() {
        let schema = Schema::v0().with_attribute(
            "conditions",
            Attribute::required_string().with_semantic_json(),
        );

        assert!(validate(&schema, &json!({"conditions": r#"{"and": []}"#})).is_empty());

        let diagnostics = validate(&schema, &json!({"conditions": "{not json"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid JSON String Value");
    }

    #[test]
    fn test_validators_skip_wrong_types() {
        let schema = Schema::v0().with_attribute(
            "type",
            Attribute::required_string().with_validator(Validator::one_of(&["ALLOW"])),
        );

        // Only the type error is reported.
        let diagnostics = validate(&schema, &json!({"type": 7}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_nested_block_single() {
        let schema = Schema::v0().with_block(
            "container",
            NestedBlock::single(
                Block::new().with_attribute(
                    "position",
                    Attribute::optional_string()
                        .with_validator(Validator::one_of(&["inside", "outside"])),
                ),
            ),
        );

        assert!(validate(&schema, &json!({"container": {"position": "inside"}})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());

        let diagnostics = validate(&schema, &json!({"container": {"position": "above"}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("container.position".to_string()));

        let diagnostics = validate(&schema, &json!({"container": "inside"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Expected object");
    }

    #[test]
    fn test_absent_block_is_valid() {
        let schema = Schema::v0().with_block(
            "typography",
            NestedBlock::single(
                Block::new().with_attribute("font_url", Attribute::required_string()),
            ),
        );

        assert!(validate(&schema, &json!({"typography": null})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());
        assert_eq!(validate(&schema, &json!({"typography": {}})).len(), 1);
    }

    #[test]
    fn test_validate_multiple_errors() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("priority", Attribute::required_int64())
            .with_attribute("is_active", Attribute::required_bool());

        let diagnostics = validate(
            &schema,
            &json!({"name": 123, "priority": "not a number", "is_active": "yes"}),
        );
        assert_eq!(diagnostics.len(), 3);
        assert!(!is_valid(&schema, &json!({})));
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
        assert_eq!(diagnostics[0].attribute, None);
    }
}
