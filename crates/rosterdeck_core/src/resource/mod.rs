//! Async resource loader with staleness guarding.
//!
//! # Responsibility
//! - Run one external retrieval per invocation and expose its progress as a
//!   reactive `{data, loading, error}` snapshot.
//! - Discard results that arrive after a newer invocation or after teardown.
//!
//! # Invariants
//! - Every invocation starts from a fresh state: `loading=true`, no data, no
//!   error.
//! - Only the latest invocation may settle the state, and it sets exactly one
//!   of `data` or `error` together with `loading=false`.
//! - After `dispose`, no pending result mutates the state.

mod fetch;
#[cfg(feature = "http")]
mod http;

pub use fetch::{decode_json, Fetch, FetchError, FetchRequest};
#[cfg(feature = "http")]
pub use http::HttpFetcher;

use crate::model::error_info::ErrorInfo;
use crate::store::{Mergeable, Store, Subscription};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Progress snapshot of one resource.
#[derive(Debug)]
pub struct ResourceState<T> {
    pub data: Option<Arc<T>>,
    pub loading: bool,
    pub error: Option<ErrorInfo>,
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// Transitions applied to a [`ResourceState`].
#[derive(Debug)]
pub enum ResourcePatch<T> {
    Started,
    Loaded(Arc<T>),
    Failed(ErrorInfo),
}

impl<T: Send + Sync + 'static> Mergeable for ResourceState<T> {
    type Patch = ResourcePatch<T>;

    fn merge(&self, patch: ResourcePatch<T>) -> Self {
        match patch {
            ResourcePatch::Started => Self {
                data: None,
                loading: true,
                error: None,
            },
            ResourcePatch::Loaded(data) => Self {
                data: Some(data),
                loading: false,
                error: None,
            },
            ResourcePatch::Failed(error) => Self {
                data: None,
                loading: false,
                error: Some(error),
            },
        }
    }
}

/// How one invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// The result settled the resource state.
    Applied,
    /// A newer invocation started first; the result was discarded.
    Superseded,
    /// The loader was disposed; the result was discarded.
    Disposed,
}

struct LoaderInner<T: Send + Sync + 'static, F> {
    fetcher: F,
    request: FetchRequest,
    store: Store<ResourceState<T>>,
    generation: AtomicU64,
    disposed: AtomicBool,
}

/// Loader bound to one fetcher and one request.
///
/// Clones share the same state, generation counter and lifecycle.
pub struct ResourceLoader<T: Send + Sync + 'static, F> {
    inner: Arc<LoaderInner<T, F>>,
}

impl<T: Send + Sync + 'static, F> Clone for ResourceLoader<T, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, F> ResourceLoader<T, F>
where
    T: Send + Sync + 'static,
    F: Fetch<T>,
{
    /// Creates an idle loader; nothing is fetched until [`Self::invoke`].
    pub fn new(fetcher: F, request: FetchRequest) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                fetcher,
                request,
                store: Store::new(ResourceState::default()),
                generation: AtomicU64::new(0),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn request(&self) -> &FetchRequest {
        &self.inner.request
    }

    pub fn state(&self) -> Arc<ResourceState<T>> {
        self.inner.store.get_state()
    }

    pub fn subscribe<C>(&self, callback: C) -> Subscription
    where
        C: Fn(&Arc<ResourceState<T>>) + Send + Sync + 'static,
    {
        self.inner.store.subscribe(callback)
    }

    /// Starts one retrieval and settles the state when it completes.
    pub async fn invoke(&self) -> InvokeOutcome {
        if self.is_disposed() {
            return InvokeOutcome::Disposed;
        }

        let token = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.store.set_state(ResourcePatch::Started);
        debug!(
            "event=resource_invoke module=resource status=start generation={token} url={}",
            self.inner.request.url
        );

        let result = self.inner.fetcher.fetch(&self.inner.request).await;

        if self.is_disposed() {
            debug!(
                "event=resource_invoke module=resource status=discarded reason=disposed generation={token}"
            );
            return InvokeOutcome::Disposed;
        }
        let latest = self.inner.generation.load(Ordering::SeqCst);
        if latest != token {
            debug!(
                "event=resource_invoke module=resource status=discarded reason=superseded generation={token} latest={latest}"
            );
            return InvokeOutcome::Superseded;
        }

        match result {
            Ok(data) => {
                self.inner
                    .store
                    .set_state(ResourcePatch::Loaded(Arc::new(data)));
                debug!("event=resource_invoke module=resource status=ok generation={token}");
            }
            Err(err) => {
                warn!(
                    "event=resource_invoke module=resource status=error generation={token} error_code={} error={}",
                    err.code(),
                    err
                );
                self.inner
                    .store
                    .set_state(ResourcePatch::Failed(err.to_error_info()));
            }
        }
        InvokeOutcome::Applied
    }

    /// Re-runs the retrieval from scratch; any in-flight result becomes stale.
    pub async fn refetch(&self) -> InvokeOutcome {
        self.invoke().await
    }

    /// Tears the loader down; pending and future results are discarded.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.store.dispose();
        debug!(
            "event=resource_dispose module=resource status=ok url={}",
            self.inner.request.url
        );
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::error_info::ErrorKind;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    type Reply = Result<Vec<u32>, FetchError>;

    /// Hands out one pre-registered reply channel per call, in call order.
    struct ScriptedFetcher {
        replies: Mutex<VecDeque<oneshot::Receiver<Reply>>>,
    }

    impl ScriptedFetcher {
        fn new(replies: Vec<oneshot::Receiver<Reply>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    impl Fetch<Vec<u32>> for ScriptedFetcher {
        fn fetch(&self, _request: &FetchRequest) -> impl Future<Output = Reply> + Send {
            let reply = self.replies.lock().unwrap().pop_front();
            async move {
                match reply {
                    Some(receiver) => receiver
                        .await
                        .unwrap_or_else(|_| Err(FetchError::Transport("sender dropped".into()))),
                    None => Err(FetchError::Transport("no scripted reply".into())),
                }
            }
        }
    }

    fn loader(replies: Vec<oneshot::Receiver<Reply>>) -> ResourceLoader<Vec<u32>, ScriptedFetcher> {
        ResourceLoader::new(
            ScriptedFetcher::new(replies),
            FetchRequest::new("memory://numbers"),
        )
    }

    #[tokio::test]
    async fn success_sets_data_and_clears_loading() {
        let (tx, rx) = oneshot::channel();
        let loader = loader(vec![rx]);
        tx.send(Ok(vec![1, 2, 3])).unwrap();

        assert_eq!(loader.invoke().await, InvokeOutcome::Applied);

        let state = loader.state();
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(state.data.as_deref(), Some(&vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn failure_sets_retrieval_error_without_data() {
        let (tx, rx) = oneshot::channel();
        let loader = loader(vec![rx]);
        tx.send(Err(FetchError::Status {
            status: 404,
            url: "memory://numbers".into(),
        }))
        .unwrap();

        loader.invoke().await;

        let state = loader.state();
        assert!(!state.loading);
        assert!(state.data.is_none());
        let error = state.error.as_ref().unwrap();
        assert_eq!(error.kind, ErrorKind::Retrieval);
        assert!(error.message.contains("404"));
    }

    #[tokio::test]
    async fn refetch_exposes_loading_and_recovers_from_error() {
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        let loader = loader(vec![rx1, rx2]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let _subscription = loader.subscribe(move |state: &Arc<ResourceState<Vec<u32>>>| {
            log.lock()
                .unwrap()
                .push((state.loading, state.error.is_some(), state.data.is_some()));
        });

        tx1.send(Err(FetchError::Transport("offline".into()))).unwrap();
        loader.invoke().await;
        tx2.send(Ok(vec![7])).unwrap();
        loader.refetch().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (true, false, false),
                (false, true, false),
                (true, false, false),
                (false, false, true),
            ]
        );
    }

    #[tokio::test]
    async fn superseded_result_is_discarded() {
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        let loader = loader(vec![rx1, rx2]);

        let resolve_out_of_order = async {
            tx2.send(Ok(vec![2])).unwrap();
            tokio::task::yield_now().await;
            tx1.send(Ok(vec![1])).unwrap();
        };
        let (first, second, ()) =
            tokio::join!(loader.invoke(), loader.refetch(), resolve_out_of_order);

        assert_eq!(first, InvokeOutcome::Superseded);
        assert_eq!(second, InvokeOutcome::Applied);
        assert_eq!(loader.state().data.as_deref(), Some(&vec![2]));
    }

    #[tokio::test]
    async fn later_invocation_wins_even_when_it_resolves_last() {
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        let loader = loader(vec![rx1, rx2]);

        let resolve_in_order = async {
            tx1.send(Ok(vec![1])).unwrap();
            tokio::task::yield_now().await;
            tx2.send(Ok(vec![2])).unwrap();
        };
        let (first, second, ()) = tokio::join!(loader.invoke(), loader.refetch(), resolve_in_order);

        assert_eq!(first, InvokeOutcome::Superseded);
        assert_eq!(second, InvokeOutcome::Applied);
        assert_eq!(loader.state().data.as_deref(), Some(&vec![2]));
    }

    #[tokio::test]
    async fn dispose_discards_pending_result() {
        let (tx, rx) = oneshot::channel();
        let loader = loader(vec![rx]);
        let teardown = async {
            loader.dispose();
            tx.send(Ok(vec![9])).unwrap();
        };

        let (outcome, ()) = tokio::join!(loader.invoke(), teardown);

        assert_eq!(outcome, InvokeOutcome::Disposed);
        assert!(loader.state().data.is_none());
        assert_eq!(loader.invoke().await, InvokeOutcome::Disposed);
    }

    #[tokio::test]
    async fn independent_loaders_do_not_interfere() {
        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        let a = loader(vec![rx_a]);
        let b = loader(vec![rx_b]);
        let resolve = async {
            tx_b.send(Ok(vec![20])).unwrap();
            tx_a.send(Ok(vec![10])).unwrap();
        };

        let (outcome_a, outcome_b, ()) = tokio::join!(a.invoke(), b.invoke(), resolve);

        assert_eq!(outcome_a, InvokeOutcome::Applied);
        assert_eq!(outcome_b, InvokeOutcome::Applied);
        assert_eq!(a.state().data.as_deref(), Some(&vec![10]));
        assert_eq!(b.state().data.as_deref(), Some(&vec![20]));
    }
}
