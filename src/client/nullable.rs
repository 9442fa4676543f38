//! Tri-state request fields.
//!
//! The management API treats a missing field as "leave unchanged" and an
//! explicit `null` as "clear". [`Nullable`] models both plus a concrete value,
//! and [`WriteMode`] decides which one a plan value turns into.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A request field that is left out, sent as `null`, or sent with a value.
///
/// Struct fields of this type must carry
/// `#[serde(default, skip_serializing_if = "Nullable::is_unset")]` so that
/// [`Nullable::Unset`] is omitted from the body. The `nullable_struct!` macro
/// in `client::models` adds that for you.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Nullable<T> {
    /// Omitted from the request.
    #[default]
    Unset,
    /// Sent as JSON `null`.
    Null,
    /// Sent as the contained value.
    Value(T),
}

impl<T> Nullable<T> {
    /// Whether the field will be omitted.
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Whether the field will be sent as `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the value if one is set.
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Apply a patch: unset keeps `self`, null clears, a value replaces.
    pub fn patched(self, patch: Nullable<T>) -> Nullable<T> {
        match patch {
            Self::Unset => self,
            other => other,
        }
    }
}

impl<T: Meaningful + Clone> Nullable<T> {
    /// The value, if set and meaningful.
    ///
    /// Responses report "not configured" as an empty string or a zero, which
    /// the provider stores as null.
    pub fn meaningful(&self) -> Option<T> {
        self.as_value().filter(|v| v.is_meaningful()).cloned()
    }
}

impl<T> From<T> for Nullable<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T: Serialize> Serialize for Nullable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(value) => value.serialize(serializer),
            Self::Unset | Self::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Nullable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // A missing field never reaches here; `#[serde(default)]` yields Unset.
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Self::Value(value),
            None => Self::Null,
        })
    }
}

/// Whether a plan value carries information worth sending.
pub trait Meaningful {
    /// `false` for empty strings, zero integers, empty lists and JSON null.
    fn is_meaningful(&self) -> bool;
}

impl Meaningful for String {
    fn is_meaningful(&self) -> bool {
        !self.is_empty()
    }
}

impl Meaningful for i64 {
    fn is_meaningful(&self) -> bool {
        *self != 0
    }
}

impl Meaningful for bool {
    fn is_meaningful(&self) -> bool {
        true
    }
}

impl<T> Meaningful for Vec<T> {
    fn is_meaningful(&self) -> bool {
        !self.is_empty()
    }
}

impl Meaningful for serde_json::Value {
    fn is_meaningful(&self) -> bool {
        !self.is_null()
    }
}

/// How optional plan values map onto request fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Send meaningful values, omit the rest.
    Create,
    /// Send meaningful values, clear the rest.
    Update,
    /// Clear everything.
    Clear,
}

impl WriteMode {
    /// Turn an optional plan value into a request field.
    pub fn apply<T: Meaningful>(self, value: Option<T>) -> Nullable<T> {
        let value = value.filter(|v| v.is_meaningful());
        match (self, value) {
            (Self::Clear, _) => Nullable::Null,
            (_, Some(value)) => Nullable::Value(value),
            (Self::Create, None) => Nullable::Unset,
            (Self::Update, None) => Nullable::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Body {
        #[serde(default, skip_serializing_if = "Nullable::is_unset")]
        name: Nullable<String>,
        #[serde(default, skip_serializing_if = "Nullable::is_unset")]
        padding: Nullable<i64>,
    }

    #[test]
    fn test_serialize_tri_state() {
        let body = Body {
            name: Nullable::Value("dark".to_string()),
            padding: Nullable::Unset,
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"name": "dark"}));

        let body = Body {
            name: Nullable::Null,
            padding: Nullable::Value(8),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"name": null, "padding": 8})
        );

        assert_eq!(serde_json::to_value(Body::default()).unwrap(), json!({}));
    }

    #[test]
    fn test_deserialize_tri_state() {
        let body: Body = serde_json::from_value(json!({"name": null})).unwrap();
        assert!(body.name.is_null());
        assert!(body.padding.is_unset());

        let body: Body = serde_json::from_value(json!({"padding": 4})).unwrap();
        assert_eq!(body.padding, Nullable::Value(4));
    }

    #[test]
    fn test_write_modes() {
        let empty = Some(String::new());
        let set = Some("ALLOW".to_string());

        assert_eq!(WriteMode::Create.apply(set.clone()), Nullable::Value("ALLOW".to_string()));
        assert_eq!(WriteMode::Create.apply(empty.clone()), Nullable::Unset);
        assert_eq!(WriteMode::Create.apply(None::<String>), Nullable::Unset);

        assert_eq!(WriteMode::Update.apply(set.clone()), Nullable::Value("ALLOW".to_string()));
        assert_eq!(WriteMode::Update.apply(empty), Nullable::Null);
        assert_eq!(WriteMode::Update.apply(None::<i64>), Nullable::Null);
        assert_eq!(WriteMode::Update.apply(Some(0_i64)), Nullable::Null);

        assert_eq!(WriteMode::Clear.apply(set), Nullable::Null);
    }

    #[test]
    fn test_meaningful_and_patch() {
        assert_eq!(Nullable::Value(String::new()).meaningful(), None);
        assert_eq!(Nullable::Value(0_i64).meaningful(), None);
        assert_eq!(Nullable::Value(12_i64).meaningful(), Some(12));
        assert_eq!(Nullable::<String>::Null.meaningful(), None);

        let current = Nullable::Value("a".to_string());
        assert_eq!(current.clone().patched(Nullable::Unset), current);
        assert_eq!(current.clone().patched(Nullable::Null), Nullable::Null);
        assert_eq!(
            current.patched(Nullable::Value("b".to_string())),
            Nullable::Value("b".to_string())
        );
    }
}
