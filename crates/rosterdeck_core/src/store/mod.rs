//! Observable snapshot store.
//!
//! # Responsibility
//! - Hold one immutable snapshot of state behind an explicit instance.
//! - Merge typed patches into new snapshots and notify subscribers
//!   synchronously, in registration order.
//!
//! # Invariants
//! - Every write produces a new `Arc` snapshot; callers detect change by
//!   pointer difference.
//! - Each applied write triggers exactly one notification round.
//! - Writes issued from inside a subscriber are queued and applied after the
//!   current round completes, in FIFO order.
//! - Subscriber callbacks run with no internal lock held.

mod app_state;

pub use app_state::{AppState, Collection, StatePatch};

use log::{debug, trace};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

/// State shape that can absorb a typed partial update.
pub trait Mergeable: Sized + Send + Sync + 'static {
    type Patch: Send + 'static;

    /// Returns a new value with `patch` shallowly merged over `self`.
    fn merge(&self, patch: Self::Patch) -> Self;
}

type Callback<S> = Arc<dyn Fn(&Arc<S>) + Send + Sync>;
type Update<S> = Box<dyn FnOnce(&S) -> Option<<S as Mergeable>::Patch> + Send>;

struct Registry<S> {
    entries: Vec<(u64, Callback<S>)>,
    next_id: u64,
}

impl<S> Registry<S> {
    fn contains(&self, id: u64) -> bool {
        self.entries.iter().any(|(entry_id, _)| *entry_id == id)
    }
}

struct DispatchQueue<S: Mergeable> {
    dispatching: bool,
    pending: VecDeque<Update<S>>,
}

struct Shared<S: Mergeable> {
    state: RwLock<Arc<S>>,
    registry: Mutex<Registry<S>>,
    queue: Mutex<DispatchQueue<S>>,
    disposed: AtomicBool,
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64) -> bool;
}

impl<S: Mergeable> Detach for Shared<S> {
    fn detach(&self, id: u64) -> bool {
        let mut registry = lock(&self.registry);
        let before = registry.entries.len();
        registry.entries.retain(|(entry_id, _)| *entry_id != id);
        registry.entries.len() != before
    }
}

/// Handle for one subscriber registration.
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`]
/// when the consumer is torn down.
pub struct Subscription {
    id: u64,
    owner: Weak<dyn Detach>,
}

impl Subscription {
    /// Removes exactly this registration.
    ///
    /// Returns `true` the first time; later calls are no-ops returning `false`.
    pub fn unsubscribe(&self) -> bool {
        match self.owner.upgrade() {
            Some(owner) => owner.detach(self.id),
            None => false,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Explicitly constructed observable store.
///
/// Cloning yields another handle to the same store.
pub struct Store<S: Mergeable> {
    shared: Arc<Shared<S>>,
}

impl<S: Mergeable> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: Mergeable> Store<S> {
    /// Creates a store holding `initial` as its first snapshot.
    pub fn new(initial: S) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(Arc::new(initial)),
                registry: Mutex::new(Registry {
                    entries: Vec::new(),
                    next_id: 1,
                }),
                queue: Mutex::new(DispatchQueue {
                    dispatching: false,
                    pending: VecDeque::new(),
                }),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the current snapshot.
    pub fn get_state(&self) -> Arc<S> {
        Arc::clone(&read(&self.shared.state))
    }

    /// Merges `patch` into a new snapshot and notifies every subscriber once.
    pub fn set_state(&self, patch: S::Patch) {
        self.enqueue(Box::new(move |_| Some(patch)));
    }

    /// Computes a patch from the snapshot current at apply time.
    ///
    /// Returning `None` skips the write and its notification round. Use this
    /// for read-modify-write operations so queued writes are never lost.
    pub fn update_state<F>(&self, update: F)
    where
        F: FnOnce(&S) -> Option<S::Patch> + Send + 'static,
    {
        self.enqueue(Box::new(update));
    }

    /// Registers `callback` and returns its registration handle.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Arc<S>) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = lock(&self.shared.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            if !self.is_disposed() {
                registry.entries.push((id, Arc::new(callback)));
            }
            id
        };
        trace!("event=store_subscribe module=store status=ok subscriber_id={id}");

        let shared: Arc<dyn Detach> = self.shared.clone();
        Subscription {
            id,
            owner: Arc::downgrade(&shared),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared.registry).entries.len()
    }

    /// Tears the store down: drops all subscribers and ignores later writes.
    ///
    /// The last snapshot stays readable through [`Store::get_state`].
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        lock(&self.shared.registry).entries.clear();
        lock(&self.shared.queue).pending.clear();
        debug!("event=store_dispose module=store status=ok");
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }

    fn enqueue(&self, update: Update<S>) {
        if self.is_disposed() {
            debug!("event=store_write module=store status=skipped reason=disposed");
            return;
        }

        {
            let mut queue = lock(&self.shared.queue);
            queue.pending.push_back(update);
            if queue.dispatching {
                trace!(
                    "event=store_write module=store status=queued pending={}",
                    queue.pending.len()
                );
                return;
            }
            queue.dispatching = true;
        }

        self.drain();
    }

    fn drain(&self) {
        let _guard = DrainGuard {
            queue: &self.shared.queue,
        };

        loop {
            let update = {
                let mut queue = lock(&self.shared.queue);
                match queue.pending.pop_front() {
                    Some(update) => update,
                    None => {
                        queue.dispatching = false;
                        return;
                    }
                }
            };

            // Only one drainer runs at a time, so no write can land between
            // reading `current` and publishing `next`.
            let current = self.get_state();
            let Some(patch) = update(&current) else {
                continue;
            };
            let next = Arc::new(current.merge(patch));
            *write(&self.shared.state) = Arc::clone(&next);

            self.notify(&next);
        }
    }

    fn notify(&self, snapshot: &Arc<S>) {
        let callbacks: Vec<(u64, Callback<S>)> = lock(&self.shared.registry)
            .entries
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect();

        for (id, callback) in callbacks {
            // A subscriber may unsubscribe another one mid-round.
            if !lock(&self.shared.registry).contains(id) {
                continue;
            }
            callback(snapshot);
        }
    }
}

/// Resets the dispatch flag if a subscriber panics mid-round.
struct DrainGuard<'a, S: Mergeable> {
    queue: &'a Mutex<DispatchQueue<S>>,
}

impl<S: Mergeable> Drop for DrainGuard<'_, S> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut queue = lock(self.queue);
            queue.dispatching = false;
            queue.pending.clear();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
