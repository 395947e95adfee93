// The merge/create state machine. Given a canonical identity, resolves to
// exactly one persisted user, creating or updating provider links as
// required. The three-way decision is computed first from transactional
// reads, then its side effects are applied, all inside one transaction.

use std::sync::Arc;

use identity_link_core::error::{IdentityError, Result};
use identity_link_core::models::{ProviderLink, User};
use identity_link_core::store::{IdentityStore, StoreTransaction};
use identity_link_core::LinkLogger;

/// The canonical tuple the linker consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalIdentity {
    /// Uppercase provider tag (`"GOOGLE"`, `"GITHUB"`).
    pub provider_key: String,
    /// Provider subject id; empty string when unknown.
    pub provider_user_id: String,
    /// Resolved, non-empty email.
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Policy switches with user-visible identity implications.
#[derive(Debug, Clone)]
pub struct LinkPolicy {
    /// On re-login through a known provider account, treat the
    /// provider-reported email as authoritative and overwrite the user's
    /// primary email when it changed. Default on, but this silently changes
    /// the account's primary email, so it is a switch rather than a given.
    pub overwrite_user_email: bool,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self {
            overwrite_user_email: true,
        }
    }
}

/// The three-way resolution outcome, computed before any write.
#[derive(Debug, Clone)]
pub enum LinkDecision {
    /// The provider account is already linked; the owning user is
    /// authoritative.
    Known { link: ProviderLink, user: User },
    /// No link for this provider account, but a user already owns the
    /// resolved email: attach (or repair) a link instead of creating a
    /// duplicate user.
    Merge {
        user: User,
        existing_link: Option<ProviderLink>,
    },
    /// First-time registration: create the user and its first link.
    Register,
}

/// Resolves logins to users. All store mutations of the engine go through
/// here.
#[derive(Debug, Clone)]
pub struct IdentityLinker {
    store: Arc<dyn IdentityStore>,
    policy: LinkPolicy,
    logger: LinkLogger,
}

impl IdentityLinker {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self {
            store,
            policy: LinkPolicy::default(),
            logger: LinkLogger::default(),
        }
    }

    pub fn with_policy(mut self, policy: LinkPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_logger(mut self, logger: LinkLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Resolve a canonical identity to exactly one persisted user.
    ///
    /// Either every write for this login commits or none do. A concurrent
    /// login racing on the same provider account or email surfaces as a
    /// retryable [`IdentityError::Conflict`].
    pub async fn resolve(&self, identity: &CanonicalIdentity) -> Result<User> {
        let tx = self.store.begin().await?;
        let decision = decide(tx.as_ref(), identity).await?;
        let user = self.apply(tx.as_ref(), decision, identity).await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn apply(
        &self,
        tx: &dyn StoreTransaction,
        decision: LinkDecision,
        identity: &CanonicalIdentity,
    ) -> Result<User> {
        match decision {
            LinkDecision::Known { mut link, mut user } => {
                self.logger.debug(&format!(
                    "known provider account {}/{}",
                    identity.provider_key, identity.provider_user_id
                ));
                if link.provider_email != identity.email {
                    link.provider_email = identity.email.clone();
                    tx.update_link(link).await?;
                }
                if self.policy.overwrite_user_email && user.email != identity.email {
                    user.email = identity.email.clone();
                    user = tx.update_user(user).await?;
                }
                Ok(user)
            }
            LinkDecision::Merge {
                user,
                existing_link,
            } => {
                self.logger.debug(&format!(
                    "merging {} login into user {}",
                    identity.provider_key, user.id
                ));
                match existing_link {
                    None => {
                        tx.create_link(ProviderLink::new(
                            &identity.provider_key,
                            &identity.provider_user_id,
                            &identity.email,
                            &user.id,
                        ))
                        .await?;
                    }
                    Some(mut link) => {
                        // A prior link for this user+provider may carry an
                        // empty subject id; backfill it rather than adding a
                        // second row.
                        let mut changed = false;
                        if link.provider_user_id.is_empty() && !identity.provider_user_id.is_empty()
                        {
                            link.provider_user_id = identity.provider_user_id.clone();
                            changed = true;
                        }
                        if link.provider_email != identity.email {
                            link.provider_email = identity.email.clone();
                            changed = true;
                        }
                        if changed {
                            tx.update_link(link).await?;
                        }
                    }
                }
                Ok(user)
            }
            LinkDecision::Register => {
                self.logger.debug(&format!(
                    "registering new user for {} login",
                    identity.provider_key
                ));
                let user = tx
                    .create_user(User::new(
                        &identity.email,
                        &identity.display_name,
                        identity.avatar_url.clone(),
                    ))
                    .await?;
                tx.create_link(ProviderLink::new(
                    &identity.provider_key,
                    &identity.provider_user_id,
                    &identity.email,
                    &user.id,
                ))
                .await?;
                Ok(user)
            }
        }
    }
}

/// Compute the three-way decision from transactional reads only.
pub async fn decide(
    tx: &dyn StoreTransaction,
    identity: &CanonicalIdentity,
) -> Result<LinkDecision> {
    if let Some(link) = tx
        .find_link_by_provider_account(&identity.provider_key, &identity.provider_user_id)
        .await?
    {
        let user = tx.find_user_by_id(&link.user_id).await?.ok_or_else(|| {
            IdentityError::MissingRecord(format!("user {} owning link {}", link.user_id, link.id))
        })?;
        return Ok(LinkDecision::Known { link, user });
    }

    if let Some(user) = tx.find_user_by_email(&identity.email).await? {
        let existing_link = tx
            .find_link_by_user_and_provider(&user.id, &identity.provider_key)
            .await?;
        return Ok(LinkDecision::Merge {
            user,
            existing_link,
        });
    }

    Ok(LinkDecision::Register)
}
