//! Collection persistence on top of key-value slots.
//!
//! # Responsibility
//! - Load a collection from its slot at startup, falling back to a seed.
//! - Write the full collection back whenever the store publishes a new one.
//!
//! # Invariants
//! - The stored layout is a plain JSON list under `E::COLLECTION`.
//! - Unreadable or malformed slots never abort startup; the seed is used.
//! - Write-back happens only when the collection `Arc` changes, so selection,
//!   loading and error updates never touch storage.

use crate::model::entity::Entity;
use crate::model::error_info::ErrorInfo;
use crate::repo::{KvSlot, RepoError};
use crate::store::{AppState, Collection, StatePatch, Store, Subscription};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};

pub type PersistResult<T> = Result<T, PersistError>;

/// Failure while loading or saving a collection.
#[derive(Debug)]
pub enum PersistError {
    Repo(RepoError),
    /// Stored payload is not a valid list for this entity kind.
    Serde(serde_json::Error),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Serde(err) => write!(f, "malformed stored collection: {err}"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Serde(err) => Some(err),
        }
    }
}

impl From<RepoError> for PersistError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

/// Reads the stored collection; `Ok(None)` when the slot is empty.
pub fn load_collection<E, K>(slot: &K) -> PersistResult<Option<Vec<E>>>
where
    E: Entity,
    K: KvSlot + ?Sized,
{
    let Some(payload) = slot.read_slot(E::COLLECTION)? else {
        return Ok(None);
    };
    let items = serde_json::from_str(&payload)?;
    Ok(Some(items))
}

/// Serializes `items` as one JSON list and replaces the slot.
pub fn save_collection<E, K>(slot: &K, items: &[Arc<E>]) -> PersistResult<u64>
where
    E: Entity,
    K: KvSlot + ?Sized,
{
    let records: Vec<&E> = items.iter().map(Arc::as_ref).collect();
    let payload = serde_json::to_string(&records)?;
    Ok(slot.write_slot(E::COLLECTION, &payload)?)
}

/// Returns the stored collection, or `seed()` when nothing usable is stored.
pub fn load_or_seed<E, K, F>(slot: &K, seed: F) -> Vec<E>
where
    E: Entity,
    K: KvSlot,
    F: FnOnce() -> Vec<E>,
{
    match load_collection::<E, K>(slot) {
        Ok(Some(items)) => {
            info!(
                "event=collection_load module=persist status=ok collection={} count={}",
                E::COLLECTION,
                items.len()
            );
            items
        }
        Ok(None) => {
            info!(
                "event=collection_load module=persist status=seeded reason=empty collection={}",
                E::COLLECTION
            );
            seed()
        }
        Err(err) => {
            warn!(
                "event=collection_load module=persist status=seeded reason=unreadable collection={} error={err}",
                E::COLLECTION
            );
            seed()
        }
    }
}

/// Subscribes a write-back that saves the collection whenever it changes.
///
/// Save failures are logged and surfaced as a `Storage` error on the store.
pub fn persist_on_change<E, K>(store: &Store<AppState<E>>, slot: K) -> Subscription
where
    E: Entity,
    K: KvSlot + 'static,
{
    let last_saved: Mutex<Collection<E>> = Mutex::new(Arc::clone(&store.get_state().collection));
    let writer = store.clone();

    store.subscribe(move |state: &Arc<AppState<E>>| {
        let mut last = last_saved.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::ptr_eq(&last, &state.collection) {
            return;
        }
        *last = Arc::clone(&state.collection);
        drop(last);

        match save_collection(&slot, state.collection.as_slice()) {
            Ok(revision) => info!(
                "event=collection_save module=persist status=ok collection={} count={} revision={revision}",
                E::COLLECTION,
                state.collection.len()
            ),
            Err(err) => {
                error!(
                    "event=collection_save module=persist status=error collection={} error={err}",
                    E::COLLECTION
                );
                writer.set_state(
                    StatePatch::new().error(Some(ErrorInfo::storage(err.to_string()))),
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{Task, TaskDraft};
    use crate::repo::InMemoryKvStore;
    use chrono::Utc;

    fn task(id: u64, title: &str) -> Task {
        Task::from_draft(
            id,
            TaskDraft {
                title: Some(title.to_string()),
                ..TaskDraft::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn malformed_payload_falls_back_to_seed() {
        let slot = InMemoryKvStore::new();
        slot.write_slot("todos", "{not json").unwrap();

        let items: Vec<Task> = load_or_seed(&slot, || vec![task(1, "seed")]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "seed");
    }

    #[test]
    fn stored_list_wins_over_seed() {
        let slot = InMemoryKvStore::new();
        save_collection(&slot, &[Arc::new(task(5, "stored"))]).unwrap();

        let items: Vec<Task> = load_or_seed(&slot, || vec![task(1, "seed")]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 5);
        assert_eq!(items[0].title, "stored");
    }

    #[test]
    fn write_back_skips_non_collection_updates() {
        let slot = InMemoryKvStore::new();
        let store = Store::new(AppState::new(vec![task(1, "a")]));
        let _subscription = persist_on_change(&store, slot.clone());

        store.set_state(StatePatch::new().loading(true).selection(Some(1)));
        assert_eq!(slot.revision("todos").unwrap(), 0);

        let items = vec![Arc::new(task(1, "a")), Arc::new(task(2, "b"))];
        store.set_state(StatePatch::new().items(items));
        assert_eq!(slot.revision("todos").unwrap(), 1);

        let stored: Vec<Task> = load_collection(&slot).unwrap().unwrap();
        assert_eq!(stored.len(), 2);
    }
}
