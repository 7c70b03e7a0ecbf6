//! Entity contract shared by every managed collection.
//!
//! # Responsibility
//! - Define identity, typed create/update inputs and toggleable flags.
//! - Keep collection logic generic over users and tasks.
//!
//! # Invariants
//! - `id()` is stable for the entity lifetime; `patched` never changes it.
//! - Patches are typed per entity kind, so unknown fields cannot be merged.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Stable identifier for one record inside a collection.
pub type EntityId = u64;

/// Result of an identity-keyed mutation.
///
/// Missing ids are treated as no-ops; `NotFound` lets callers tell a silent
/// miss apart from an applied change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    NotFound,
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Record stored in an identity-keyed collection.
pub trait Entity:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Create-time input; fields absent from the draft take entity defaults.
    type Draft: Send + 'static;
    /// Partial update; every field is optional and the id is not patchable.
    type Patch: Clone + Debug + Default + Send + Sync + 'static;
    /// Boolean fields that can be inverted in place.
    type Flag: Copy + Debug + Send + Sync + 'static;

    /// Fixed key used for the persisted collection slot.
    const COLLECTION: &'static str;

    fn id(&self) -> EntityId;

    /// Builds a new record from a draft merged over defaults.
    fn from_draft(id: EntityId, draft: Self::Draft, created_at: DateTime<Utc>) -> Self;

    /// Returns a shallow copy with every `Some` field of `patch` applied.
    fn patched(&self, patch: &Self::Patch) -> Self;

    fn flag(&self, flag: Self::Flag) -> bool;

    /// Returns a shallow copy with `flag` inverted.
    fn with_flag_toggled(&self, flag: Self::Flag) -> Self;

    /// Primary human-readable label, used for sorting projections.
    fn display_name(&self) -> &str;
}
