//! Client-side state and data-synchronization core for rosterdeck dashboards.
//! Stores, loaders and forms here are the single source of truth for UI state.

pub mod config;
pub mod db;
pub mod form;
pub mod logging;
pub mod model;
pub mod persist;
pub mod repo;
pub mod resource;
pub mod service;
pub mod store;

pub use config::{ConfigError, CoreConfig};
pub use form::{
    FieldErrors, FieldKind, FieldSpec, FieldValue, FormController, FormError, FormSchema,
    FormState, FormValues, SubmitOutcome,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::entity::{Entity, EntityId, Outcome};
pub use model::error_info::{ErrorInfo, ErrorKind};
pub use model::task::{Priority, Task, TaskDraft, TaskFlag, TaskPatch, TaskStatus};
pub use model::user::{Role, User, UserDraft, UserFlag, UserPatch};
pub use persist::{load_or_seed, persist_on_change, PersistError};
pub use repo::{InMemoryKvStore, KvSlot, RepoError, SqliteKvStore};
pub use resource::{Fetch, FetchError, FetchRequest, InvokeOutcome, ResourceLoader, ResourceState};
#[cfg(feature = "http")]
pub use resource::HttpFetcher;
pub use service::{CollectionService, TaskStats, TaskStatusFilter, UserStats, UserStatusFilter};
pub use store::{AppState, Mergeable, StatePatch, Store, Subscription};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
