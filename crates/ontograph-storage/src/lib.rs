//! Ontograph Storage - Storage backends for the relation graph
//!
//! Each backend persists relations keyed by `(source, target, type)` and
//! doubles as the local entity catalog the validator resolves ids against.

#![allow(clippy::result_large_err)]

pub mod error;
pub mod traits;

#[cfg(feature = "redb")]
pub mod redb;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub mod memory;

pub use error::{StorageError, StorageResult};
pub use traits::StorageBackend;

#[cfg(feature = "redb")]
pub use redb::RedbStorage;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;

pub use memory::MemoryStorage;
