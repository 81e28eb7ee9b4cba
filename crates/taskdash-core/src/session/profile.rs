//! Canonical user profile.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The user attached to a session.
///
/// `id`, `name` and `email` are the canonical fields; anything else the
/// server sent is kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Builds a profile from an already-cleaned JSON object.
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        let id = map.remove("id").as_ref().and_then(scalar_to_string);
        let name = take_string(&mut map, "name");
        let email = take_string(&mut map, "email");
        Self {
            id,
            name,
            email,
            extra: map,
        }
    }

    /// Name to greet the user with.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("User")
    }
}

/// Renders a string or number as a string; other JSON kinds are ignored.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::String(_) | Value::Null) | None => None,
        Some(other) => {
            map.insert(key.to_string(), other);
            None
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_to_string))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_map_splits_canonical_fields() {
        let Value::Object(map) = json!({"id": 7, "name": "Alice", "role": "admin"}) else {
            unreachable!()
        };
        let profile = UserProfile::from_map(map);
        assert_eq!(profile.id.as_deref(), Some("7"));
        assert_eq!(profile.name.as_deref(), Some("Alice"));
        assert_eq!(profile.email, None);
        assert_eq!(profile.extra.get("role"), Some(&json!("admin")));
    }

    #[test]
    fn test_serialization_omits_missing_fields() {
        let profile = UserProfile {
            name: Some("Alice".to_string()),
            email: Some("a@b.com".to_string()),
            ..UserProfile::default()
        };
        assert_eq!(
            serde_json::to_value(&profile).unwrap(),
            json!({"name": "Alice", "email": "a@b.com"})
        );
    }

    #[test]
    fn test_numeric_id_deserializes_as_string() {
        let profile: UserProfile = serde_json::from_str(r#"{"id": 3, "email": "x@y.z"}"#).unwrap();
        assert_eq!(profile.id.as_deref(), Some("3"));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut profile = UserProfile::default();
        assert_eq!(profile.display_name(), "User");
        profile.email = Some("a@b.com".to_string());
        assert_eq!(profile.display_name(), "a@b.com");
    }
}
