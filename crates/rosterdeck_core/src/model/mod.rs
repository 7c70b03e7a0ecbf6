//! Domain model for managed dashboard collections.
//!
//! # Responsibility
//! - Define the entity contract and the user/task records built on it.
//! - Define remote record shapes and the error-as-data value.
//!
//! # Invariants
//! - Every entity is identified by a stable `EntityId`.
//! - Entity updates go through typed patches; the id is never patchable.

pub mod entity;
pub mod error_info;
pub mod fetched;
pub mod task;
pub mod user;
