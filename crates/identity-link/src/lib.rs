//! OAuth2 identity-resolution and account-linking engine.
//!
//! Given a login event from an external identity provider, the engine
//! determines which local account the event belongs to, merging or creating
//! accounts as needed, and returns a normalized, DB-authoritative
//! [`Principal`]. The caller (an OAuth2 handshake layer) is expected to have
//! already exchanged and verified the provider's tokens; the engine only
//! receives the verified attribute map plus a bearer token usable for the
//! provider's secondary email-list endpoint.
//!
//! ```no_run
//! use std::sync::Arc;
//! use identity_link::{IdentityEngine, LoginEvent};
//! use identity_link_memory::MemoryStore;
//!
//! # async fn run() -> identity_link_core::Result<()> {
//! let engine = IdentityEngine::new(Arc::new(MemoryStore::new()));
//! let event = LoginEvent {
//!     provider: "github".into(),
//!     attributes: serde_json::json!({"id": 42, "login": "octocat"})
//!         .as_object().unwrap().clone(),
//!     access_token: Some("gho_token".into()),
//! };
//! let principal = engine.handle_login(&event).await?;
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod email;
pub mod engine;
pub mod linker;
pub mod principal;

pub use attributes::{normalize_attributes, ProviderAttributes};
pub use email::{pick_email, placeholder_email, EmailResolver, ProviderEmail, ResolvedEmail};
pub use engine::{IdentityEngine, LoginEvent};
pub use linker::{CanonicalIdentity, IdentityLinker, LinkDecision, LinkPolicy};
pub use principal::{build_principal, Principal, ROLE_USER};

pub use identity_link_core::{IdentityError, Result};
