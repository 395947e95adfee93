// The persistence boundary: repository traits every store backend implements.
//
// The linker receives these as explicit dependencies, which keeps the merge
// state machine testable against in-memory fakes. All mutations during a
// login go through a single `StoreTransaction` so a concurrent login can
// never observe a half-created user/link pair.

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ProviderLink, User};

/// A store of users and provider links.
///
/// Implementations must enforce three uniqueness invariants as hard
/// constraints, failing with [`crate::IdentityError::Conflict`] rather than
/// corrupting state:
///
/// - `User.email` is unique;
/// - `(provider, provider_user_id)` is unique when `provider_user_id` is
///   non-empty;
/// - at most one link exists per `(user_id, provider)` pair.
#[async_trait]
pub trait IdentityStore: Send + Sync + fmt::Debug {
    /// Begin a transaction covering one login resolution.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    /// Delete a user and cascade-delete all of its provider links.
    ///
    /// Not exercised by login flows, but the lifetime of a link is bound to
    /// its user, and embedders removing accounts need the cascade.
    async fn delete_user_cascade(&self, user_id: &str) -> Result<()>;
}

/// The operation surface available inside one login transaction.
///
/// Either every write in the transaction commits or none do. Update
/// operations refresh the row's `updated_at`.
#[async_trait]
pub trait StoreTransaction: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>>;

    async fn create_user(&self, user: User) -> Result<User>;

    /// Update an existing user row (matched by `id`).
    async fn update_user(&self, user: User) -> Result<User>;

    /// Look up a link by the provider account it claims.
    async fn find_link_by_provider_account(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<ProviderLink>>;

    /// Look up the (at most one) link a user holds for a given provider.
    async fn find_link_by_user_and_provider(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<ProviderLink>>;

    async fn create_link(&self, link: ProviderLink) -> Result<ProviderLink>;

    /// Update an existing link row (matched by `id`).
    async fn update_link(&self, link: ProviderLink) -> Result<ProviderLink>;

    /// Commit the transaction.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Roll back the transaction, discarding all writes.
    async fn rollback(self: Box<Self>) -> Result<()>;
}
