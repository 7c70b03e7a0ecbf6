//! Application state snapshot for one managed collection.

use super::{Mergeable, Store};
use crate::model::entity::{Entity, EntityId, Outcome};
use crate::model::error_info::ErrorInfo;
use log::debug;
use std::sync::Arc;

/// Ordered entity list; unchanged entities keep their `Arc` identity across
/// snapshots so downstream equality checks stay cheap.
pub type Collection<E> = Arc<Vec<Arc<E>>>;

/// Store snapshot for one entity kind.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState<E> {
    pub collection: Collection<E>,
    pub loading: bool,
    pub error: Option<ErrorInfo>,
    pub selection: Option<EntityId>,
}

impl<E> AppState<E> {
    pub fn new(items: Vec<E>) -> Self {
        Self {
            collection: Arc::new(items.into_iter().map(Arc::new).collect()),
            loading: false,
            error: None,
            selection: None,
        }
    }
}

impl<E: Entity> AppState<E> {
    pub fn find(&self, id: EntityId) -> Option<&Arc<E>> {
        self.collection.iter().find(|item| item.id() == id)
    }

    pub fn position(&self, id: EntityId) -> Option<usize> {
        self.collection.iter().position(|item| item.id() == id)
    }

    /// Returns the selected entity, if the selection still resolves.
    pub fn selected(&self) -> Option<&Arc<E>> {
        self.selection.and_then(|id| self.find(id))
    }
}

/// Typed partial update for [`AppState`].
///
/// Unset fields keep their current value.
#[derive(Debug, Clone)]
pub struct StatePatch<E> {
    collection: Option<Collection<E>>,
    loading: Option<bool>,
    error: Option<Option<ErrorInfo>>,
    selection: Option<Option<EntityId>>,
}

impl<E> Default for StatePatch<E> {
    fn default() -> Self {
        Self {
            collection: None,
            loading: None,
            error: None,
            selection: None,
        }
    }
}

impl<E> StatePatch<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(mut self, collection: Collection<E>) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn items(self, items: Vec<Arc<E>>) -> Self {
        self.collection(Arc::new(items))
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = Some(loading);
        self
    }

    pub fn error(mut self, error: Option<ErrorInfo>) -> Self {
        self.error = Some(error);
        self
    }

    pub fn selection(mut self, selection: Option<EntityId>) -> Self {
        self.selection = Some(selection);
        self
    }
}

impl<E: Send + Sync + 'static> Mergeable for AppState<E> {
    type Patch = StatePatch<E>;

    fn merge(&self, patch: StatePatch<E>) -> Self {
        Self {
            collection: patch
                .collection
                .unwrap_or_else(|| Arc::clone(&self.collection)),
            loading: patch.loading.unwrap_or(self.loading),
            error: patch.error.unwrap_or_else(|| self.error.clone()),
            selection: patch.selection.unwrap_or(self.selection),
        }
    }
}

impl<E: Entity> Store<AppState<E>> {
    /// Inverts `flag` on the entity matching `id`.
    ///
    /// Only the matching entity is replaced; every other entity keeps its
    /// `Arc` identity. A missing id leaves the collection untouched and
    /// triggers no notification.
    ///
    /// The outcome is decided against the current snapshot. When called from
    /// inside a subscriber the write is queued, and it is skipped if the id
    /// is gone by the time it runs.
    pub fn toggle_entity_flag(&self, id: EntityId, flag: E::Flag) -> Outcome {
        if self.get_state().position(id).is_none() {
            debug!(
                "event=toggle_flag module=store status=noop reason=not_found collection={} id={id}",
                E::COLLECTION
            );
            return Outcome::NotFound;
        }

        self.update_state(move |state| {
            let index = state.position(id)?;
            let mut items: Vec<Arc<E>> = state.collection.iter().cloned().collect();
            items[index] = Arc::new(items[index].with_flag_toggled(flag));
            Some(StatePatch::new().items(items))
        });
        Outcome::Applied
    }
}
