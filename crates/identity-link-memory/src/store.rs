// In-memory store: two Vec-backed tables behind a tokio RwLock.
//
// Transactions take a snapshot of the tables plus the store version at
// begin. Writes run against the snapshot with constraint checks applied on
// every create/update. Commit re-acquires the parent lock and applies the
// snapshot only if the version is unchanged; a concurrent commit in between
// surfaces as `IdentityError::Conflict`, which the caller may retry.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use identity_link_core::error::{IdentityError, Result};
use identity_link_core::models::{ProviderLink, User};
use identity_link_core::store::{IdentityStore, StoreTransaction};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: Vec<User>,
    links: Vec<ProviderLink>,
}

#[derive(Debug, Default)]
struct Versioned {
    version: u64,
    tables: Tables,
}

/// In-memory identity store.
///
/// Data is lost when the store is dropped. Cloning shares the underlying
/// tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Versioned>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all user rows (for tests and debugging).
    pub async fn users(&self) -> Vec<User> {
        self.inner.read().await.tables.users.clone()
    }

    /// Snapshot of all link rows.
    pub async fn links(&self) -> Vec<ProviderLink> {
        self.inner.read().await.tables.links.clone()
    }

    pub async fn user_count(&self) -> usize {
        self.inner.read().await.tables.users.len()
    }

    pub async fn link_count(&self) -> usize {
        self.inner.read().await.tables.links.len()
    }

    /// Clear all data.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.tables = Tables::default();
        inner.version += 1;
    }
}

/// Reject a user row that would duplicate another user's email.
fn check_user_constraints(tables: &Tables, candidate: &User) -> Result<()> {
    if tables
        .users
        .iter()
        .any(|u| u.id != candidate.id && u.email == candidate.email)
    {
        return Err(IdentityError::Conflict(format!(
            "a user with email {} already exists",
            candidate.email
        )));
    }
    Ok(())
}

/// Reject a link row that would claim an already-linked provider account or
/// duplicate a (user, provider) pair.
fn check_link_constraints(tables: &Tables, candidate: &ProviderLink) -> Result<()> {
    if !candidate.provider_user_id.is_empty()
        && tables.links.iter().any(|l| {
            l.id != candidate.id
                && l.provider == candidate.provider
                && l.provider_user_id == candidate.provider_user_id
        })
    {
        return Err(IdentityError::Conflict(format!(
            "provider account {}/{} is already linked",
            candidate.provider, candidate.provider_user_id
        )));
    }
    if tables
        .links
        .iter()
        .any(|l| l.id != candidate.id && l.user_id == candidate.user_id && l.provider == candidate.provider)
    {
        return Err(IdentityError::Conflict(format!(
            "user {} already has a {} link",
            candidate.user_id, candidate.provider
        )));
    }
    Ok(())
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let inner = self.inner.read().await;
        Ok(Box::new(MemoryTransaction {
            parent: self.inner.clone(),
            base_version: inner.version,
            work: RwLock::new(inner.tables.clone()),
        }))
    }

    async fn delete_user_cascade(&self, user_id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.tables.users.retain(|u| u.id != user_id);
        inner.tables.links.retain(|l| l.user_id != user_id);
        inner.version += 1;
        Ok(())
    }
}

struct MemoryTransaction {
    parent: Arc<RwLock<Versioned>>,
    base_version: u64,
    work: RwLock<Tables>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.work.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let tables = self.work.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, user: User) -> Result<User> {
        let mut tables = self.work.write().await;
        check_user_constraints(&tables, &user)?;
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, mut user: User) -> Result<User> {
        let mut tables = self.work.write().await;
        check_user_constraints(&tables, &user)?;
        let slot = tables
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| IdentityError::MissingRecord(format!("user {}", user.id)))?;
        user.created_at = slot.created_at;
        user.touch();
        *slot = user.clone();
        Ok(user)
    }

    async fn find_link_by_provider_account(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<ProviderLink>> {
        let tables = self.work.read().await;
        Ok(tables
            .links
            .iter()
            .find(|l| l.provider == provider && l.provider_user_id == provider_user_id)
            .cloned())
    }

    async fn find_link_by_user_and_provider(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<ProviderLink>> {
        let tables = self.work.read().await;
        Ok(tables
            .links
            .iter()
            .find(|l| l.user_id == user_id && l.provider == provider)
            .cloned())
    }

    async fn create_link(&self, link: ProviderLink) -> Result<ProviderLink> {
        let mut tables = self.work.write().await;
        check_link_constraints(&tables, &link)?;
        tables.links.push(link.clone());
        Ok(link)
    }

    async fn update_link(&self, link: ProviderLink) -> Result<ProviderLink> {
        let mut tables = self.work.write().await;
        check_link_constraints(&tables, &link)?;
        let slot = tables
            .links
            .iter_mut()
            .find(|l| l.id == link.id)
            .ok_or_else(|| IdentityError::MissingRecord(format!("link {}", link.id)))?;
        *slot = link.clone();
        Ok(link)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction {
            parent,
            base_version,
            work,
        } = *self;
        let tables = work.into_inner();
        let mut parent = parent.write().await;
        if parent.version != base_version {
            return Err(IdentityError::Conflict(
                "store changed since transaction began".into(),
            ));
        }
        parent.tables = tables;
        parent.version += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        // Snapshot is discarded
        Ok(())
    }
}
