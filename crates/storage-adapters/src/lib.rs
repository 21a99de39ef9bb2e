//! # storage-adapters
//!
//! Implementations of the `TopicStore` and `ProfileDirectory` ports.
//! The in-memory adapters are always compiled; Postgres sits behind the
//! `db-postgres` feature.

pub mod memory;
pub mod profiles;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::MemoryTopicStore;
pub use profiles::MemoryProfileDirectory;

#[cfg(feature = "db-postgres")]
pub use postgres::{PgProfileDirectory, PgTopicStore};
