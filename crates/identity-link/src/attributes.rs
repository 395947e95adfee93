// Provider attribute normalization — maps heterogeneous provider attribute
// schemas (Google vs GitHub vs others) into one canonical tuple.

use serde_json::{Map, Value};

/// Canonical provider attributes after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderAttributes {
    /// Lowercase provider name, used for dispatch (`"google"`, `"github"`).
    pub provider: String,
    /// Uppercase provider tag, used as the stored link key (`"GOOGLE"`).
    pub provider_key: String,
    /// The provider's subject identifier; empty string when absent.
    pub provider_user_id: String,
    /// Email as reported in the attribute payload, if any.
    pub email: Option<String>,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Normalize a raw provider attribute map.
///
/// Subject id: Google sends `sub`, GitHub sends `id` (a number); unknown
/// providers fall back to `id`. Display name: `name`, then `login`, first
/// non-blank wins, else a `"<Capitalized-Provider> User"` placeholder.
/// Avatar: `picture` (Google), then `avatar_url` (GitHub), else none.
pub fn normalize_attributes(provider: &str, attributes: &Map<String, Value>) -> ProviderAttributes {
    let provider = if provider.trim().is_empty() {
        "unknown".to_string()
    } else {
        provider.to_lowercase()
    };

    let provider_user_id = match provider.as_str() {
        "google" => attr_string(attributes, "sub"),
        _ => attr_string(attributes, "id"),
    }
    .unwrap_or_default();

    let email = attr_string(attributes, "email").filter(|e| !e.trim().is_empty());

    let display_name = non_blank(attr_string(attributes, "name"))
        .or_else(|| non_blank(attr_string(attributes, "login")))
        .unwrap_or_else(|| format!("{} User", capitalize(&provider)));

    let avatar_url = non_blank(attr_string(attributes, "picture"))
        .or_else(|| non_blank(attr_string(attributes, "avatar_url")));

    ProviderAttributes {
        provider_key: provider.to_uppercase(),
        provider,
        provider_user_id,
        email,
        display_name,
        avatar_url,
    }
}

/// Read an attribute as a string, stringifying numbers and booleans
/// (GitHub's `id` arrives as a JSON number).
fn attr_string(attributes: &Map<String, Value>, key: &str) -> Option<String> {
    match attributes.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
