// Principal assembly: the outward-facing identity payload. Raw provider
// attributes pass through, but email, name, and avatar_url are taken from
// the persisted user so that stale or synthesized values never reach the
// caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use identity_link_core::models::User;

/// The single authority every resolved principal carries.
pub const ROLE_USER: &str = "ROLE_USER";

/// The resolved, DB-authoritative identity payload returned after login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub authorities: Vec<String>,
    pub attributes: Map<String, Value>,
    /// The attribute used as the principal's unique key (`"email"`).
    pub name_attribute_key: String,
}

impl Principal {
    /// The value of the name attribute, i.e. the principal's email.
    pub fn name(&self) -> Option<&str> {
        self.attributes
            .get(&self.name_attribute_key)
            .and_then(Value::as_str)
    }
}

/// Merge the raw attribute map with DB-authoritative fields.
pub fn build_principal(raw_attributes: &Map<String, Value>, user: &User) -> Principal {
    let mut attributes = raw_attributes.clone();
    attributes.insert("email".into(), Value::String(user.email.clone()));
    attributes.insert("name".into(), Value::String(user.display_name.clone()));
    attributes.insert(
        "avatar_url".into(),
        user.avatar_url
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
    );

    Principal {
        authorities: vec![ROLE_USER.to_string()],
        attributes,
        name_attribute_key: "email".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: Value) -> Map<String, Value> {
        json.as_object().unwrap().clone()
    }

    #[test]
    fn db_values_override_provider_values() {
        let mut user = User::new("db@x.com", "DB Name", Some("https://db/avatar".into()));
        user.id = "u1".into();

        let principal = build_principal(
            &raw(serde_json::json!({
                "email": "stale@x.com",
                "name": "Stale Name",
                "avatar_url": "https://stale/avatar",
                "login": "octocat"
            })),
            &user,
        );

        assert_eq!(principal.attributes["email"], "db@x.com");
        assert_eq!(principal.attributes["name"], "DB Name");
        assert_eq!(principal.attributes["avatar_url"], "https://db/avatar");
        // Other raw attributes pass through untouched.
        assert_eq!(principal.attributes["login"], "octocat");
    }

    #[test]
    fn missing_avatar_surfaces_as_null() {
        let user = User::new("a@x.com", "Alice", None);
        let principal = build_principal(&Map::new(), &user);
        assert_eq!(principal.attributes["avatar_url"], Value::Null);
    }

    #[test]
    fn fixed_authority_and_name_key() {
        let user = User::new("a@x.com", "Alice", None);
        let principal = build_principal(&Map::new(), &user);
        assert_eq!(principal.authorities, vec![ROLE_USER.to_string()]);
        assert_eq!(principal.name_attribute_key, "email");
        assert_eq!(principal.name(), Some("a@x.com"));
    }
}
