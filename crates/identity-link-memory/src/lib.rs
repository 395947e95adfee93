//! In-memory [`IdentityStore`](identity_link_core::IdentityStore) backend.
//!
//! Enforces the uniqueness invariants as hard constraints and implements
//! transactions as version-stamped snapshots: two logins racing on the same
//! provider account or email both begin from the same snapshot, one commit
//! wins, the other fails with a retryable conflict.

mod store;

pub use store::MemoryStore;
