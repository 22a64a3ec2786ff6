//! SQLite persistence layer.

pub mod credential;
pub mod pool;

pub use credential::SqliteCredentialStore;
pub use pool::DatabasePool;
