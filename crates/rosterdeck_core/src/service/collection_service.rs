//! Identity-keyed CRUD use-cases over a collection store.
//!
//! # Responsibility
//! - Create, update, delete, select, toggle and import entities through the
//!   store's notify path.
//! - Assign collision-free, time-derived ids.
//!
//! # Invariants
//! - Ids are unique within the collection and never change after creation.
//! - Missing ids are no-ops reported as `Outcome::NotFound`; they never
//!   write or notify.
//! - `Outcome` is decided against the snapshot current at call time. A call
//!   made from inside a subscriber is queued; if its id is gone by the time
//!   the write runs, the write is skipped even though `Applied` was returned.
//! - Ids are never reissued: when `max_id + 1` would overflow, the lowest id
//!   unused by the collection and by earlier issues is taken instead.
//! - Deleting the selected entity clears the selection in the same write.
//! - Collection order is insertion order; update keeps position.

use crate::model::entity::{Entity, EntityId, Outcome};
use crate::model::error_info::ErrorInfo;
use crate::model::task::{Task, TaskPatch, TaskStatus};
use crate::store::{AppState, StatePatch, Store};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Time source used for ids and creation timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// CRUD facade over one `Store<AppState<E>>`.
pub struct CollectionService<E: Entity> {
    store: Store<AppState<E>>,
    clock: Clock,
    issued: Mutex<IssuedIds>,
}

/// Ids handed out by `create`, including writes that are still queued.
#[derive(Default)]
struct IssuedIds {
    last: Option<EntityId>,
    /// Ids taken below `last` after the sequence ran out.
    reused: HashSet<EntityId>,
}

impl<E: Entity> CollectionService<E> {
    /// Creates a service over `store` using the system clock.
    pub fn new(store: Store<AppState<E>>) -> Self {
        Self::with_clock(store, Arc::new(Utc::now))
    }

    pub fn with_clock(store: Store<AppState<E>>, clock: Clock) -> Self {
        Self {
            store,
            clock,
            issued: Mutex::new(IssuedIds::default()),
        }
    }

    pub fn store(&self) -> &Store<AppState<E>> {
        &self.store
    }

    pub fn state(&self) -> Arc<AppState<E>> {
        self.store.get_state()
    }

    pub fn get(&self, id: EntityId) -> Option<Arc<E>> {
        self.state().find(id).cloned()
    }

    /// Appends a new entity built from `draft` and returns its id.
    pub fn create(&self, draft: E::Draft) -> EntityId {
        let now = (self.clock)();
        let id = self.next_id(now);
        let entity = Arc::new(E::from_draft(id, draft, now));

        self.store.update_state(move |state| {
            let mut items: Vec<Arc<E>> = state.collection.iter().cloned().collect();
            items.push(entity);
            Some(StatePatch::new().items(items))
        });
        info!(
            "event=entity_create module=collection_service status=ok collection={} id={id}",
            E::COLLECTION
        );
        id
    }

    /// Shallow-merges `patch` into the entity with `id`, keeping its position.
    pub fn update(&self, id: EntityId, patch: E::Patch) -> Outcome {
        if self.state().position(id).is_none() {
            return self.not_found("entity_update", id);
        }

        self.store.update_state(move |state| {
            let index = state.position(id)?;
            let mut items: Vec<Arc<E>> = state.collection.iter().cloned().collect();
            items[index] = Arc::new(items[index].patched(&patch));
            Some(StatePatch::new().items(items))
        });
        info!(
            "event=entity_update module=collection_service status=ok collection={} id={id}",
            E::COLLECTION
        );
        Outcome::Applied
    }

    /// Removes the entity with `id`, clearing the selection if it pointed there.
    pub fn delete(&self, id: EntityId) -> Outcome {
        if self.state().position(id).is_none() {
            return self.not_found("entity_delete", id);
        }

        self.store.update_state(move |state| {
            state.position(id)?;
            let items: Vec<Arc<E>> = state
                .collection
                .iter()
                .filter(|item| item.id() != id)
                .cloned()
                .collect();
            let mut patch = StatePatch::new().items(items);
            if state.selection == Some(id) {
                patch = patch.selection(None);
            }
            Some(patch)
        });
        info!(
            "event=entity_delete module=collection_service status=ok collection={} id={id}",
            E::COLLECTION
        );
        Outcome::Applied
    }

    pub fn select(&self, id: EntityId) -> Outcome {
        if self.state().position(id).is_none() {
            return self.not_found("entity_select", id);
        }
        self.store.set_state(StatePatch::new().selection(Some(id)));
        Outcome::Applied
    }

    pub fn clear_selection(&self) {
        self.store
            .update_state(|state| state.selection.map(|_| StatePatch::new().selection(None)));
    }

    /// Inverts `flag` on the entity with `id`.
    pub fn toggle(&self, id: EntityId, flag: E::Flag) -> Outcome {
        let outcome = self.store.toggle_entity_flag(id, flag);
        if outcome.is_applied() {
            debug!(
                "event=entity_toggle module=collection_service status=ok collection={} id={id} flag={flag:?}",
                E::COLLECTION
            );
        }
        outcome
    }

    /// Appends every record whose id is not already present.
    ///
    /// Returns how many records were appended. Duplicate ids within
    /// `records` keep their first occurrence.
    pub fn import(&self, records: Vec<E>) -> usize {
        let fresh = fresh_records(&self.state(), records);
        let count = fresh.len();
        if count == 0 {
            debug!(
                "event=entity_import module=collection_service status=noop collection={}",
                E::COLLECTION
            );
            return 0;
        }

        self.store.update_state(move |state| {
            let fresh = fresh_records(state, fresh);
            if fresh.is_empty() {
                return None;
            }
            let mut items: Vec<Arc<E>> = state.collection.iter().cloned().collect();
            items.extend(fresh.into_iter().map(Arc::new));
            Some(StatePatch::new().items(items))
        });
        info!(
            "event=entity_import module=collection_service status=ok collection={} imported={count}",
            E::COLLECTION
        );
        count
    }

    pub fn set_loading(&self, loading: bool) {
        self.store.set_state(StatePatch::new().loading(loading));
    }

    /// Records a failure (or clears it) and ends any loading phase.
    pub fn set_error(&self, error: Option<ErrorInfo>) {
        self.store.set_state(StatePatch::new().error(error).loading(false));
    }

    /// Issues `max(now_ms, max_id + 1)`, also staying above ids issued for
    /// writes that are still queued.
    fn next_id(&self, now: DateTime<Utc>) -> EntityId {
        let now_ms = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let state = self.state();
        let max_id = state.collection.iter().map(|item| item.id()).max().unwrap_or(0);

        let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
        let after_last = match issued.last {
            Some(last) => last.checked_add(1),
            None => Some(0),
        };
        let sequential = max_id
            .checked_add(1)
            .zip(after_last)
            .map(|(floor, after_last)| floor.max(after_last).max(now_ms));

        let id = match sequential {
            Some(id) => id,
            None => {
                let taken: HashSet<EntityId> =
                    state.collection.iter().map(|item| item.id()).collect();
                // A collection cannot hold u64::MAX entities, so a free id exists.
                let id = (1..=u64::MAX)
                    .find(|id| !taken.contains(id) && !issued.reused.contains(id))
                    .unwrap_or_default();
                warn!(
                    "event=entity_id_issue module=collection_service status=reused collection={} id={id}",
                    E::COLLECTION
                );
                issued.reused.insert(id);
                id
            }
        };
        issued.last = Some(issued.last.map_or(id, |last| last.max(id)));
        id
    }

    fn not_found(&self, event: &str, id: EntityId) -> Outcome {
        debug!(
            "event={event} module=collection_service status=noop reason=not_found collection={} id={id}",
            E::COLLECTION
        );
        Outcome::NotFound
    }
}

impl CollectionService<Task> {
    /// Moves the task with `id` to `status`.
    pub fn set_status(&self, id: EntityId, status: TaskStatus) -> Outcome {
        self.update(
            id,
            TaskPatch {
                status: Some(status),
                ..TaskPatch::default()
            },
        )
    }
}

fn fresh_records<E: Entity>(state: &AppState<E>, records: Vec<E>) -> Vec<E> {
    let mut seen: HashSet<EntityId> = state.collection.iter().map(|item| item.id()).collect();
    records
        .into_iter()
        .filter(|record| seen.insert(record.id()))
        .collect()
}
