//! Key-value slot contracts with SQLite and in-memory implementations.
//!
//! # Responsibility
//! - Store one opaque text payload per fixed key.
//! - Track a per-key revision that grows by one on every write.
//!
//! # Invariants
//! - A write replaces the whole payload; there are no partial updates.
//! - Reads never interpret the payload; decoding belongs to callers.

use crate::db::DbError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, RwLock};

pub type RepoResult<T> = Result<T, RepoError>;

/// Slot storage failure.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// A previous writer panicked while holding the slot lock.
    LockPoisoned(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::LockPoisoned(store) => write!(f, "{store} lock poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::LockPoisoned(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistent key-value slot store.
pub trait KvSlot: Send + Sync {
    fn read_slot(&self, key: &str) -> RepoResult<Option<String>>;

    /// Replaces the payload under `key` and returns its new revision.
    fn write_slot(&self, key: &str, payload: &str) -> RepoResult<u64>;

    /// Returns `true` when a slot was removed.
    fn remove_slot(&self, key: &str) -> RepoResult<bool>;

    /// Revision of `key`; `0` when the slot was never written.
    fn revision(&self, key: &str) -> RepoResult<u64>;
}

impl<K: KvSlot + ?Sized> KvSlot for Arc<K> {
    fn read_slot(&self, key: &str) -> RepoResult<Option<String>> {
        (**self).read_slot(key)
    }

    fn write_slot(&self, key: &str, payload: &str) -> RepoResult<u64> {
        (**self).write_slot(key, payload)
    }

    fn remove_slot(&self, key: &str) -> RepoResult<bool> {
        (**self).remove_slot(key)
    }

    fn revision(&self, key: &str) -> RepoResult<u64> {
        (**self).revision(key)
    }
}

/// SQLite-backed slot store over the `kv_slots` table.
///
/// Owns its connection so it can be shared with store subscribers.
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    /// Wraps a connection returned by [`crate::db::open_db`] or
    /// [`crate::db::open_db_in_memory`].
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn with_conn<T>(&self, run: impl FnOnce(&Connection) -> RepoResult<T>) -> RepoResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| RepoError::LockPoisoned("sqlite slot"))?;
        run(&conn)
    }
}

impl KvSlot for SqliteKvStore {
    fn read_slot(&self, key: &str) -> RepoResult<Option<String>> {
        self.with_conn(|conn| {
            let payload = conn
                .query_row(
                    "SELECT payload FROM kv_slots WHERE slot_key = ?1;",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(payload)
        })
    }

    fn write_slot(&self, key: &str, payload: &str) -> RepoResult<u64> {
        self.with_conn(|conn| {
            let revision = conn.query_row(
                "INSERT INTO kv_slots (slot_key, payload, updated_at, revision)
                 VALUES (?1, ?2, ?3, 1)
                 ON CONFLICT(slot_key) DO UPDATE SET
                     payload = excluded.payload,
                     updated_at = excluded.updated_at,
                     revision = kv_slots.revision + 1
                 RETURNING revision;",
                params![key, payload, Utc::now().timestamp_millis()],
                |row| row.get::<_, i64>(0),
            )?;
            Ok(revision.max(0) as u64)
        })
    }

    fn remove_slot(&self, key: &str) -> RepoResult<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM kv_slots WHERE slot_key = ?1;", params![key])?;
            Ok(removed > 0)
        })
    }

    fn revision(&self, key: &str) -> RepoResult<u64> {
        self.with_conn(|conn| {
            let revision = conn
                .query_row(
                    "SELECT revision FROM kv_slots WHERE slot_key = ?1;",
                    params![key],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            Ok(revision.unwrap_or(0).max(0) as u64)
        })
    }
}

struct StoredSlot {
    payload: String,
    revision: u64,
}

/// HashMap-backed slot store for tests and ephemeral sessions.
///
/// Clones share the same slots.
#[derive(Clone, Default)]
pub struct InMemoryKvStore {
    slots: Arc<RwLock<HashMap<String, StoredSlot>>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvSlot for InMemoryKvStore {
    fn read_slot(&self, key: &str) -> RepoResult<Option<String>> {
        let slots = self
            .slots
            .read()
            .map_err(|_| RepoError::LockPoisoned("in-memory slot"))?;
        Ok(slots.get(key).map(|slot| slot.payload.clone()))
    }

    fn write_slot(&self, key: &str, payload: &str) -> RepoResult<u64> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| RepoError::LockPoisoned("in-memory slot"))?;
        let revision = slots.get(key).map_or(1, |slot| slot.revision + 1);
        slots.insert(
            key.to_string(),
            StoredSlot {
                payload: payload.to_string(),
                revision,
            },
        );
        Ok(revision)
    }

    fn remove_slot(&self, key: &str) -> RepoResult<bool> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| RepoError::LockPoisoned("in-memory slot"))?;
        Ok(slots.remove(key).is_some())
    }

    fn revision(&self, key: &str) -> RepoResult<u64> {
        let slots = self
            .slots
            .read()
            .map_err(|_| RepoError::LockPoisoned("in-memory slot"))?;
        Ok(slots.get(key).map_or(0, |slot| slot.revision))
    }
}
