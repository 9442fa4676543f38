//! Request and response bodies of the Authsignal management API.
//!
//! Request types wrap every field in [`Nullable`] so callers decide per field
//! whether to leave it alone, clear it, or set it. Response types use plain
//! fields with defaults, except for the theme, whose sections are read back
//! through the same tri-state types they are written with.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::nullable::Nullable;

/// Read an explicit `null` as the field's default, like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Declare a camelCase body whose fields are all [`Nullable`].
macro_rules! nullable_struct {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                pub $field:ident: $ty:ty,
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            $(
                $(#[$field_meta])*
                #[serde(default, skip_serializing_if = "Nullable::is_unset")]
                pub $field: Nullable<$ty>,
            )*
        }
    };
}

// Action configurations

nullable_struct! {
    /// Body of `POST /actions` and `PATCH /actions/{action_code}`.
    pub struct ActionConfigurationInput {
        pub action_code: String,
        pub default_user_action_result: String,
        pub messaging_templates: Value,
    }
}

/// An action configuration as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionConfiguration {
    #[serde(deserialize_with = "null_as_default")]
    pub action_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tenant_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub default_user_action_result: String,
    #[serde(deserialize_with = "null_as_default")]
    pub last_action_created_at: String,
    pub messaging_templates: Option<Value>,
}

// Rules

nullable_struct! {
    /// Body of rule create and patch calls.
    pub struct RuleInput {
        pub name: String,
        pub description: String,
        pub is_active: bool,
        pub priority: i64,
        pub r#type: String,
        pub verification_methods: Vec<String>,
        pub prompt_to_enroll_verification_methods: Vec<String>,
        pub default_verification_method: String,
        pub conditions: Value,
    }
}

/// A rule as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rule {
    #[serde(deserialize_with = "null_as_default")]
    pub rule_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tenant_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub action_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_active: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub priority: i64,
    pub r#type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub verification_methods: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub prompt_to_enroll_verification_methods: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub default_verification_method: String,
    pub conditions: Option<Value>,
}

// Value lists

nullable_struct! {
    /// Body of value list create and patch calls.
    ///
    /// Items are strings or numbers depending on `item_type`.
    pub struct ValueListInput {
        pub name: String,
        pub is_active: bool,
        pub item_type: String,
        pub value_list_items: Vec<Value>,
    }
}

/// A value list as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValueList {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub alias: String,
    #[serde(deserialize_with = "null_as_default")]
    pub item_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_active: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub value_list_items: Vec<Value>,
}

// Custom data points

nullable_struct! {
    /// Body of `POST /custom-data-points`.
    pub struct CustomDataPointInput {
        pub name: String,
        pub data_type: String,
        pub model_type: String,
        pub description: String,
    }
}

/// A custom data point as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomDataPoint {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub data_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub model_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
}

// Theme

nullable_struct! {
    /// The tenant theme. Used for both `GET /theme` and `PATCH /theme`.
    pub struct Theme {
        pub name: String,
        pub logo_url: String,
        pub watermark_url: String,
        pub favicon_url: String,
        pub primary_color: String,
        pub colors: Colors,
        pub container: Container,
        pub borders: Borders,
        pub typography: Typography,
        pub page_background: PageBackground,
        pub dark_mode: DarkMode,
    }
}

nullable_struct! {
    /// Overrides applied when the pre-built UI renders in dark mode.
    pub struct DarkMode {
        pub logo_url: String,
        pub watermark_url: String,
        pub favicon_url: String,
        pub primary_color: String,
        pub colors: Colors,
        pub container: Container,
        pub borders: Borders,
        pub typography: Typography,
        pub page_background: PageBackground,
    }
}

nullable_struct! {
    pub struct Colors {
        pub button_primary_text: String,
        pub button_primary_border: String,
        pub button_secondary_text: String,
        pub button_secondary_background: String,
        pub button_secondary_border: String,
        pub card_background: String,
        pub card_border: String,
        pub input_background: String,
        pub input_border: String,
        pub link: String,
        pub heading_text: String,
        pub body_text: String,
        pub container_background: String,
        pub container_border: String,
        pub divider: String,
        pub icon: String,
        pub loader: String,
        pub positive: String,
        pub critical: String,
        pub information: String,
        pub hover: String,
        pub focus: String,
    }
}

nullable_struct! {
    pub struct Container {
        pub content_alignment: String,
        pub position: String,
        pub padding: i64,
        pub logo_alignment: String,
        pub logo_position: String,
        pub logo_height: i64,
    }
}

nullable_struct! {
    pub struct Borders {
        pub button_border_radius: i64,
        pub button_border_width: i64,
        pub card_border_radius: i64,
        pub card_border_width: i64,
        pub input_border_radius: i64,
        pub input_border_width: i64,
        pub container_border_radius: i64,
    }
}

nullable_struct! {
    pub struct Typography {
        pub display: Display,
    }
}

nullable_struct! {
    pub struct Display {
        pub font_url: String,
    }
}

nullable_struct! {
    pub struct PageBackground {
        pub background_color: String,
        pub background_image_url: String,
    }
}
