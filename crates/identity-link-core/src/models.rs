// The two persisted rows: `User` (one per logical human account) and
// `ProviderLink` (one per external provider account linked to a user).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::id::generate_id;

/// One logical human account.
///
/// `email` is unique across all users and is the merge key: a login from a
/// new provider that resolves to an existing user's email attaches to that
/// user instead of creating a duplicate. It may be reassigned later when a
/// provider reports a changed email on re-login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque identifier, assigned on creation, immutable.
    pub id: String,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Set once at creation, immutable thereafter.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation (store implementations call [`User::touch`]).
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        email: impl Into<String>,
        display_name: impl Into<String>,
        avatar_url: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            email: email.into(),
            display_name: display_name.into(),
            avatar_url,
            bio: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// One link between an external provider account and a [`User`].
///
/// Links are owned by their user: deleting a user cascade-deletes its links
/// (see [`crate::store::IdentityStore::delete_user_cascade`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderLink {
    pub id: String,
    /// Canonical uppercase provider tag, e.g. `"GOOGLE"`, `"GITHUB"`.
    pub provider: String,
    /// The provider's stable subject identifier. Empty string when the
    /// provider supplied none; never absent.
    pub provider_user_id: String,
    /// Last-seen email reported by this provider account. May legitimately
    /// differ from the owning user's email.
    pub provider_email: String,
    pub user_id: String,
}

impl ProviderLink {
    pub fn new(
        provider: impl Into<String>,
        provider_user_id: impl Into<String>,
        provider_email: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_id(),
            provider: provider.into(),
            provider_user_id: provider_user_id.into(),
            provider_email: provider_email.into(),
            user_id: user_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_has_fresh_id_and_timestamps() {
        let user = User::new("a@x.com", "Alice", None);
        assert!(!user.id.is_empty());
        assert_eq!(user.created_at, user.updated_at);
        assert!(user.bio.is_none());
    }

    #[test]
    fn touch_advances_updated_at_only() {
        let mut user = User::new("a@x.com", "Alice", None);
        let created = user.created_at;
        user.touch();
        assert_eq!(user.created_at, created);
        assert!(user.updated_at >= created);
    }

    #[test]
    fn users_get_distinct_ids() {
        let a = User::new("a@x.com", "Alice", None);
        let b = User::new("b@x.com", "Bob", None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn user_serializes_camel_case() {
        let user = User::new("a@x.com", "Alice", Some("https://img".into()));
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["displayName"], "Alice");
        assert_eq!(json["avatarUrl"], "https://img");
        assert!(json.get("createdAt").is_some());
        // bio is None and skipped
        assert!(json.get("bio").is_none());
    }

    #[test]
    fn link_serializes_camel_case() {
        let link = ProviderLink::new("GITHUB", "123", "a@x.com", "u1");
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["provider"], "GITHUB");
        assert_eq!(json["providerUserId"], "123");
        assert_eq!(json["providerEmail"], "a@x.com");
        assert_eq!(json["userId"], "u1");
    }
}
