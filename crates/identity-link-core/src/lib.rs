//! Core abstractions for the identity-link engine: the `User` and
//! `ProviderLink` rows, the repository traits every store backend
//! implements, and the shared error and logging primitives.

pub mod error;
pub mod logger;
pub mod models;
pub mod store;
pub mod utils;

// Re-exports for convenience
pub use error::{IdentityError, Result};
pub use logger::{LinkLogger, LogHandler, LogLevel, LoggerConfig};
pub use models::{ProviderLink, User};
pub use store::{IdentityStore, StoreTransaction};
