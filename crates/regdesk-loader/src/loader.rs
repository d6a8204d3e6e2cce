//! The guarded loader.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::watch;

use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::observer::LoaderObserver;
use crate::signal::CancelSignal;
use crate::state::LoaderState;

type FetchFn<T, K> =
    dyn Fn(CancelSignal, K) -> BoxFuture<'static, Result<T, LoadError>> + Send + Sync;

/// The attempt that is allowed to settle.
#[derive(Debug)]
struct Attempt {
    generation: u64,
    signal: CancelSignal,
}

/// An attempt minted under the control lock, not yet handed to the fetch.
struct Pending<K> {
    generation: u64,
    signal: CancelSignal,
    key: K,
}

#[derive(Debug)]
struct Control<K> {
    /// Incremented for every started attempt.
    generation: u64,
    current: Option<Attempt>,
    /// Cleared on teardown; no attempt may settle afterwards.
    mounted: bool,
    /// Dependency key the next attempt is started for.
    key: K,
}

/// State shared between a loader and its in-flight attempt tasks.
struct Core<T, K> {
    label: String,
    timeout: Duration,
    auto_load: bool,
    fetch: Box<FetchFn<T, K>>,
    observers: Vec<Arc<dyn LoaderObserver<T>>>,
    control: Mutex<Control<K>>,
    state: watch::Sender<LoaderState<T>>,
}

impl<T, K> Core<T, K> {
    fn control(&self) -> MutexGuard<'_, Control<K>> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Signal the current attempt and forget it.
    fn cancel_current(&self, teardown: bool) {
        let mut control = self.control();
        if teardown {
            control.mounted = false;
        }
        if let Some(attempt) = control.current.take() {
            attempt.signal.cancel();
            tracing::debug!(
                loader = %self.label,
                attempt = attempt.generation,
                teardown,
                "cancelled in-flight attempt"
            );
            if !teardown {
                self.state.send_modify(LoaderState::abandon);
            }
        }
    }
}

impl<T, K> Core<T, K>
where
    T: Clone + Send + Sync + 'static,
    K: Clone + Send + 'static,
{
    /// Start an attempt unless one is in flight and `force` is false.
    fn start(self: &Arc<Self>, force: bool) {
        let pending = self.begin(&mut self.control(), force);
        if let Some(pending) = pending {
            self.launch(pending);
        }
    }

    /// Supersede the current attempt and mint the next one.
    ///
    /// Runs under the control lock so the attempt and its key snapshot are
    /// taken together.
    fn begin(&self, control: &mut Control<K>, force: bool) -> Option<Pending<K>> {
        if !control.mounted {
            return None;
        }
        if control.current.is_some() && !force {
            tracing::trace!(loader = %self.label, "load already in flight");
            return None;
        }
        if let Some(previous) = control.current.take() {
            previous.signal.cancel();
            tracing::debug!(
                loader = %self.label,
                attempt = previous.generation,
                "superseded in-flight attempt"
            );
        }

        control.generation += 1;
        let generation = control.generation;
        let signal = CancelSignal::new();
        control.current = Some(Attempt {
            generation,
            signal: signal.clone(),
        });
        self.state.send_modify(LoaderState::begin);

        Some(Pending {
            generation,
            signal,
            key: control.key.clone(),
        })
    }

    /// Invoke the fetch for a minted attempt and run it to settlement.
    fn launch(self: &Arc<Self>, pending: Pending<K>) {
        let Pending {
            generation,
            signal,
            key,
        } = pending;
        tracing::debug!(loader = %self.label, attempt = generation, "starting load");

        let call = AssertUnwindSafe(|| (self.fetch)(signal.clone(), key));
        let fetch = match panic::catch_unwind(call) {
            Ok(fetch) => fetch,
            Err(payload) => {
                signal.cancel();
                self.settle(generation, Err(panicked(&*payload)), Duration::ZERO);
                return;
            }
        };

        let core = Arc::clone(self);
        tokio::spawn(async move { core.run(generation, signal, fetch).await });
    }

    /// Race the fetch against the deadline and the attempt's signal.
    async fn run(
        self: Arc<Self>,
        generation: u64,
        signal: CancelSignal,
        fetch: BoxFuture<'static, Result<T, LoadError>>,
    ) {
        let started = Instant::now();
        let fetch = AssertUnwindSafe(fetch)
            .catch_unwind()
            .map(|result| result.unwrap_or_else(|payload| Err(panicked(&*payload))));

        let outcome = tokio::select! {
            biased;
            _ = signal.cancelled() => Err(LoadError::Cancelled),
            result = tokio::time::timeout(self.timeout, fetch) => match result {
                Ok(result) => result,
                Err(_) => Err(LoadError::DeadlineExceeded(self.timeout)),
            },
        };

        if matches!(outcome, Err(LoadError::DeadlineExceeded(_))) {
            // Lets the fetch stop any work it handed off elsewhere.
            signal.cancel();
        }

        self.settle(generation, outcome, started.elapsed());
    }

    /// Apply the outcome of an attempt if it is still the current one.
    fn settle(&self, generation: u64, outcome: Result<T, LoadError>, elapsed: Duration) {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        {
            let mut control = self.control();
            let is_current = control.mounted
                && control
                    .current
                    .as_ref()
                    .is_some_and(|attempt| attempt.generation == generation);
            if !is_current {
                tracing::trace!(
                    loader = %self.label,
                    attempt = generation,
                    "dropping settlement of abandoned attempt"
                );
                return;
            }
            control.current = None;

            match &outcome {
                Ok(data) => {
                    let data = data.clone();
                    self.state.send_modify(|state| state.succeed(data));
                }
                Err(LoadError::Cancelled) => self.state.send_modify(LoaderState::abandon),
                Err(error) => {
                    let error = error.clone();
                    self.state.send_modify(|state| state.fail(error));
                }
            }
        }

        match outcome {
            Ok(data) => {
                tracing::debug!(
                    loader = %self.label,
                    attempt = generation,
                    elapsed_ms,
                    "load succeeded"
                );
                for observer in &self.observers {
                    observer.on_success(&data);
                }
            }
            Err(LoadError::Cancelled) => {
                tracing::debug!(
                    loader = %self.label,
                    attempt = generation,
                    "fetch reported cancellation"
                );
            }
            Err(error) => {
                tracing::warn!(
                    loader = %self.label,
                    attempt = generation,
                    elapsed_ms,
                    kind = %error.kind(),
                    error = %error,
                    "load failed"
                );
                for observer in &self.observers {
                    observer.on_error(&error);
                }
            }
        }
    }
}

/// Turn a panic payload from a fetch into an operation failure.
fn panicked(payload: &(dyn Any + Send)) -> LoadError {
    let reason = payload
        .downcast_ref::<&str>()
        .map(|reason| reason.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    LoadError::Operation(format!("Fetch panicked: {}", reason))
}

/// Cancellable, deduplicated, timeout-bounded loader for one data source.
///
/// A loader owns exactly one [`LoaderState`] and runs at most one current
/// attempt of its fetch operation at a time. Every attempt races the fetch
/// against the configured deadline; a later `load(true)`, `reload()`,
/// `cancel()` or dependency key change supersedes an earlier attempt before
/// that attempt can touch state, whatever order their I/O completes in.
///
/// A fetch that panics settles its attempt as an operation failure.
///
/// Dropping the loader tears it down: the current attempt is signalled and
/// no pending continuation can mutate state afterwards.
///
/// Attempts run as tokio tasks, so loads must be started from within a tokio
/// runtime.
pub struct GuardedLoader<T, K = ()>
where
    T: Clone + Send + Sync + 'static,
{
    core: Arc<Core<T, K>>,
}

impl<T> GuardedLoader<T, ()>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start building a loader around a fetch operation.
    ///
    /// The fetch receives the attempt's [`CancelSignal`] and should check it
    /// before dispatching work; see [`CancelSignal`] for what happens when it
    /// does not.
    pub fn builder<F, Fut, E>(fetch: F) -> LoaderBuilder<T, ()>
    where
        F: Fn(CancelSignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<LoadError> + 'static,
    {
        LoaderBuilder::new((), move |signal, ()| fetch(signal))
    }
}

impl<T, K> GuardedLoader<T, K>
where
    T: Clone + Send + Sync + 'static,
    K: Clone + Send + 'static,
{
    /// Start building a loader whose fetch depends on a key.
    ///
    /// Every attempt receives the key that was current when it started.
    /// Changing the key with [`set_dependency_key`](Self::set_dependency_key)
    /// restarts the load for the new key when auto-load is enabled.
    ///
    /// ```rust,ignore
    /// let loader = GuardedLoader::keyed(event_id, move |signal, event_id: u32| {
    ///     let client = client.clone();
    ///     async move { dispatch(&signal, || client.participants(event_id)).await }
    /// })
    /// .build();
    /// ```
    pub fn keyed<F, Fut, E>(key: K, fetch: F) -> LoaderBuilder<T, K>
    where
        F: Fn(CancelSignal, K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<LoadError> + 'static,
    {
        LoaderBuilder::new(key, fetch)
    }

    /// Begin a load attempt.
    ///
    /// Without `force`, does nothing while an attempt is in flight. With
    /// `force`, or when idle, supersedes any in-flight attempt and starts a
    /// new one. Failures never propagate to the caller; they land in
    /// [`LoaderState::error`].
    pub fn load(&self, force: bool) {
        self.core.start(force);
    }

    /// Force a fresh attempt.
    pub fn reload(&self) {
        self.load(true);
    }

    /// Abandon the in-flight attempt, if any.
    ///
    /// Its eventual settlement is never applied. `loading` is cleared; data
    /// and error are left as they were.
    pub fn cancel(&self) {
        self.core.cancel_current(false);
    }

    /// Overwrite the data directly, bypassing the fetch.
    ///
    /// A later successful load replaces it.
    pub fn set_data(&self, value: T) {
        self.core.state.send_modify(|state| state.data = Some(value));
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> LoaderState<T> {
        self.core.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<LoaderState<T>> {
        self.core.state.subscribe()
    }

    /// Wait until no attempt is in flight and return the state at that point.
    pub async fn settled(&self) -> LoaderState<T> {
        let mut rx = self.core.state.subscribe();
        if let Ok(state) = rx.wait_for(|state| !state.loading).await {
            return state.clone();
        }
        self.state()
    }

    /// Check whether an attempt is in flight.
    pub fn is_loading(&self) -> bool {
        self.core.control().current.is_some()
    }

    /// Get the label used in logs.
    pub fn label(&self) -> &str {
        &self.core.label
    }

    /// Get the attempt deadline.
    pub fn timeout(&self) -> Duration {
        self.core.timeout
    }

    /// Get the current dependency key.
    pub fn dependency_key(&self) -> K {
        self.core.control().key.clone()
    }
}

impl<T, K> GuardedLoader<T, K>
where
    T: Clone + Send + Sync + 'static,
    K: Clone + PartialEq + Send + 'static,
{
    /// Replace the dependency key.
    ///
    /// When the key differs from the previous one and auto-load is enabled,
    /// a fresh attempt for the new key supersedes any in-flight one.
    pub fn set_dependency_key(&self, key: K) {
        let pending = {
            let mut control = self.core.control();
            if control.key == key {
                return;
            }
            control.key = key;
            if !self.core.auto_load {
                return;
            }
            tracing::debug!(loader = %self.core.label, "dependency key changed");
            self.core.begin(&mut control, true)
        };

        if let Some(pending) = pending {
            self.core.launch(pending);
        }
    }
}

impl<T, K> Drop for GuardedLoader<T, K>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.core.cancel_current(true);
    }
}

impl<T, K> std::fmt::Debug for GuardedLoader<T, K>
where
    T: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedLoader")
            .field("label", &self.core.label)
            .field("timeout", &self.core.timeout)
            .field("auto_load", &self.core.auto_load)
            .field("state", &*self.core.state.borrow())
            .finish()
    }
}

/// Builder for [`GuardedLoader`].
pub struct LoaderBuilder<T, K = ()> {
    fetch: Box<FetchFn<T, K>>,
    config: LoaderConfig,
    key: K,
    observers: Vec<Arc<dyn LoaderObserver<T>>>,
}

impl<T> LoaderBuilder<T, ()>
where
    T: Clone + Send + Sync + 'static,
{
    /// Set an initial dependency key for a fetch that does not read it.
    ///
    /// Key changes still restart the load; use [`GuardedLoader::keyed`] when
    /// the fetch needs the key itself.
    pub fn dependency_key<K>(self, key: K) -> LoaderBuilder<T, K>
    where
        K: Clone + Send + 'static,
    {
        let fetch = self.fetch;
        LoaderBuilder {
            fetch: Box::new(move |signal: CancelSignal, _key: K| fetch(signal, ())),
            config: self.config,
            key,
            observers: self.observers,
        }
    }
}

impl<T, K> LoaderBuilder<T, K>
where
    T: Clone + Send + Sync + 'static,
    K: Clone + Send + 'static,
{
    fn new<F, Fut, E>(key: K, fetch: F) -> Self
    where
        F: Fn(CancelSignal, K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<LoadError> + 'static,
    {
        let fetch: Box<FetchFn<T, K>> = Box::new(move |signal: CancelSignal, key: K| {
            fetch(signal, key)
                .map(|result| result.map_err(Into::<LoadError>::into))
                .boxed()
        });

        Self {
            fetch,
            config: LoaderConfig::default(),
            key,
            observers: Vec::new(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the attempt deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_timeout(timeout);
        self
    }

    /// Set whether loads start on creation and on key changes.
    pub fn auto_load(mut self, auto_load: bool) -> Self {
        self.config.auto_load = auto_load;
        self
    }

    /// Set the label used in logs.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.config.label = label.into();
        self
    }

    /// Add an observer. Observers are notified in insertion order.
    pub fn observer(mut self, observer: impl LoaderObserver<T> + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Build the loader, starting the first load when auto-load is enabled.
    ///
    /// # Panics
    ///
    /// With auto-load enabled, panics when called outside a tokio runtime.
    pub fn build(self) -> GuardedLoader<T, K> {
        let (state, _) = watch::channel(LoaderState::default());
        let auto_load = self.config.auto_load;

        let loader = GuardedLoader {
            core: Arc::new(Core {
                label: self.config.label.clone(),
                timeout: self.config.timeout(),
                auto_load,
                fetch: self.fetch,
                observers: self.observers,
                control: Mutex::new(Control {
                    generation: 0,
                    current: None,
                    mounted: true,
                    key: self.key,
                }),
                state,
            }),
        };

        if auto_load {
            loader.load(false);
        }
        loader
    }
}
