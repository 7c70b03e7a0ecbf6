//! Persistence contracts and their storage implementations.
//!
//! # Responsibility
//! - Define the key-value slot contract used to persist collections.
//! - Isolate SQL details from the persistence orchestration in `crate::persist`.
//!
//! # Invariants
//! - Repository APIs return semantic errors alongside DB transport errors.

pub mod slot_repo;

pub use slot_repo::{InMemoryKvStore, KvSlot, RepoError, RepoResult, SqliteKvStore};
