// Error types shared across the identity-link crates.

/// Unified result type for identity-link operations.
pub type Result<T> = std::result::Result<T, IdentityError>;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// A uniqueness constraint was violated: `User.email`,
    /// `(provider, providerUserId)`, or `(userId, provider)`.
    ///
    /// Retryable: the engine performs no automatic retry, but a re-invoked
    /// resolution will observe the committed row and take the known-account
    /// or merge path instead.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store failed.
    #[error("store error: {0}")]
    Store(String),

    /// A record that must exist within the current transaction is missing
    /// (e.g. a provider link whose owning user row is gone).
    #[error("missing record: {0}")]
    MissingRecord(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl IdentityError {
    /// Whether the caller may simply re-invoke resolution.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
