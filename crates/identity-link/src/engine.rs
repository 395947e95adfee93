// The engine entrypoint: one login event in, one resolved principal out.
//
// normalize → resolve email (may call the provider's secondary API) →
// link (one transaction) → build principal.

use std::sync::Arc;

use serde_json::{Map, Value};

use identity_link_core::error::Result;
use identity_link_core::store::IdentityStore;
use identity_link_core::LinkLogger;

use crate::attributes::normalize_attributes;
use crate::email::EmailResolver;
use crate::linker::{CanonicalIdentity, IdentityLinker, LinkPolicy};
use crate::principal::{build_principal, Principal};

/// A login event as handed over by the OAuth2 handshake layer, after token
/// exchange and verification.
#[derive(Debug, Clone)]
pub struct LoginEvent {
    /// Provider registration id, any casing (`"google"`, `"github"`).
    pub provider: String,
    /// The raw attribute map from the provider's userinfo payload.
    pub attributes: Map<String, Value>,
    /// Bearer credential for the provider's secondary email endpoint.
    pub access_token: Option<String>,
}

/// The identity-resolution engine.
#[derive(Debug, Clone)]
pub struct IdentityEngine {
    linker: IdentityLinker,
    emails: EmailResolver,
}

impl IdentityEngine {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self {
            linker: IdentityLinker::new(store),
            emails: EmailResolver::new(),
        }
    }

    pub fn with_policy(mut self, policy: LinkPolicy) -> Self {
        self.linker = self.linker.with_policy(policy);
        self
    }

    pub fn with_email_resolver(mut self, resolver: EmailResolver) -> Self {
        self.emails = resolver;
        self
    }

    pub fn with_logger(mut self, logger: LinkLogger) -> Self {
        self.linker = self.linker.with_logger(logger.clone());
        self.emails = self.emails.clone().with_logger(logger);
        self
    }

    /// Resolve a login event to a principal.
    ///
    /// Fails only on store errors; a concurrent login racing on the same
    /// provider account or email surfaces as a retryable
    /// [`identity_link_core::IdentityError::Conflict`], and re-invoking
    /// resolution then observes the committed row.
    pub async fn handle_login(&self, event: &LoginEvent) -> Result<Principal> {
        let normalized = normalize_attributes(&event.provider, &event.attributes);

        let resolved = self
            .emails
            .resolve(
                &normalized.provider,
                normalized.email.as_deref(),
                &normalized.provider_user_id,
                event.access_token.as_deref(),
            )
            .await;

        // Carry the resolved email in the attribute map so the principal
        // reflects it even for providers that omitted it.
        let mut attributes = event.attributes.clone();
        attributes.insert("email".into(), Value::String(resolved.email.clone()));

        let identity = CanonicalIdentity {
            provider_key: normalized.provider_key,
            provider_user_id: normalized.provider_user_id,
            email: resolved.email,
            display_name: normalized.display_name,
            avatar_url: normalized.avatar_url,
        };

        let user = self.linker.resolve(&identity).await?;

        Ok(build_principal(&attributes, &user))
    }
}
