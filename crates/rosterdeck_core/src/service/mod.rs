//! Use-case services over the observable store.
//!
//! # Responsibility
//! - Compose identity-keyed CRUD on top of `Store<AppState<E>>`.
//! - Provide list projections and form validators used by dashboard views.
//!
//! # See also
//! - `crate::store` for the notification contract these services write through.

pub mod collection_service;
pub mod projection;
pub mod validators;

pub use collection_service::{Clock, CollectionService};
pub use projection::{
    filter_collection, sections_by_flag, sorted_by_name, Filterable, TaskStats, TaskStatusFilter,
    UserStats, UserStatusFilter,
};
