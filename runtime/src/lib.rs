//! # Sliceflow Runtime
//!
//! Runtime implementation for the Sliceflow architecture.
//!
//! This crate provides the Store runtime that routes actions through the
//! middleware pipeline, runs the root reducer and executes effects.
//!
//! ## Core Components
//!
//! - **Store**: The single state container and dispatch entry point
//! - **Middleware pipeline**: Fixed, ordered interceptors folded at construction
//! - **Effect Executor**: Executes effect descriptions and feeds actions back into the store
//! - **`LoggerMiddleware`**: Emits pre-state, action and post-state for every dispatch
//!
//! ## Example
//!
//! ```ignore
//! use sliceflow_runtime::{LoggerMiddleware, Store};
//!
//! let store = Store::builder(initial_state, root_reducer, environment)
//!     .with_middleware(LoggerMiddleware::tracing())
//!     .build();
//!
//! store.send(Action::DoSomething).await?;
//! let value = store.state(|s| s.some_field).await;
//! ```

use sliceflow_core::{effect::Effect, middleware::MiddlewareChain, reducer::Reducer};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

/// Logging middleware and sinks
pub mod logger;

pub use logger::{LogEntry, LogSink, LoggerMiddleware, TracingSink};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for an action or for effects to settle
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Configuration for Store instances
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of effect-produced actions buffered for observers
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects of one
/// action to complete. An `Effect::Future` counts as complete once the
/// action it produced has itself been dispatched.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(UserAction::Fetch.into()).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // The fetch has settled and its outcome has been reduced
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a new effect handle together with its tracking context
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    ///
    /// Useful for initialization in loops where you need a `last_handle`.
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Every tracker is gone, nothing can still be running
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements effect counter on drop
///
/// Ensures the effect counter is always decremented, even if the effect panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store module - The runtime for a root reducer
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicU64, AtomicUsize, DecrementGuard, Duration,
        Effect, EffectHandle, EffectTracking, MiddlewareChain, Ordering, Reducer, RwLock,
        StoreConfig, StoreError,
    };
    use sliceflow_core::middleware::Middleware;
    use sliceflow_core::Effects;
    use std::cell::RefCell;
    use tokio::sync::{broadcast, watch};

    /// The Store - single process-wide state container
    ///
    /// The Store manages:
    /// 1. State (an immutable snapshot behind `RwLock`, replaced on change)
    /// 2. Root reducer (transition logic)
    /// 3. Environment (injected dependencies)
    /// 4. Middleware pipeline (fixed at construction)
    /// 5. Effect execution (with feedback loop)
    ///
    /// Every action, including actions produced by effects, enters the
    /// pipeline at the outermost middleware. The terminal stage runs the
    /// reducer on a working copy and only publishes a new snapshot when the
    /// copy differs from the current state, so unchanged dispatches keep the
    /// previous `Arc<S>`.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<Arc<S>>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        middleware: MiddlewareChain<S, A>,
        version: Arc<AtomicU64>,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        default_shutdown_timeout: Duration,
        /// Action broadcast channel for observing actions produced by effects.
        action_broadcast: broadcast::Sender<A>,
    }

    /// Builder collecting middleware before the pipeline is frozen
    pub struct StoreBuilder<S, A, E, R> {
        initial_state: S,
        reducer: R,
        environment: E,
        middleware: Vec<Arc<dyn Middleware<S, A>>>,
        config: StoreConfig,
    }

    impl<S, A, E, R> StoreBuilder<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Clone + Send + Sync + std::fmt::Debug + 'static,
        S: Clone + PartialEq + Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Append a middleware; earlier middleware wrap later ones
        #[must_use]
        pub fn with_middleware<M>(mut self, middleware: M) -> Self
        where
            M: Middleware<S, A> + 'static,
        {
            self.middleware.push(Arc::new(middleware));
            self
        }

        /// Append an already shared middleware
        #[must_use]
        pub fn with_shared_middleware(mut self, middleware: Arc<dyn Middleware<S, A>>) -> Self {
            self.middleware.push(middleware);
            self
        }

        /// Replace the runtime configuration
        #[must_use]
        pub fn with_config(mut self, config: StoreConfig) -> Self {
            self.config = config;
            self
        }

        /// Freeze the pipeline and create the store
        #[must_use]
        pub fn build(self) -> Store<S, A, E, R> {
            let (action_broadcast, _) = broadcast::channel(self.config.broadcast_capacity.max(1));

            tracing::debug!(middleware = self.middleware.len(), "Building store");

            Store {
                state: Arc::new(RwLock::new(Arc::new(self.initial_state))),
                reducer: Arc::new(self.reducer),
                environment: Arc::new(self.environment),
                middleware: MiddlewareChain::new(self.middleware),
                version: Arc::new(AtomicU64::new(0)),
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                default_shutdown_timeout: self.config.default_shutdown_timeout,
                action_broadcast,
            }
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Clone + Send + Sync + std::fmt::Debug + 'static,
        S: Clone + PartialEq + Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store without middleware
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::builder(initial_state, reducer, environment).build()
        }

        /// Start building a store with a middleware pipeline
        #[must_use]
        pub fn builder(initial_state: S, reducer: R, environment: E) -> StoreBuilder<S, A, E, R> {
            StoreBuilder {
                initial_state,
                reducer,
                environment,
                middleware: Vec::new(),
                config: StoreConfig::default(),
            }
        }

        /// The injected environment
        #[must_use]
        pub fn environment(&self) -> &E {
            &self.environment
        }

        /// Number of times a new state snapshot has been published
        #[must_use]
        pub fn version(&self) -> u64 {
            self.version.load(Ordering::Acquire)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Sets the shutdown flag (rejecting new actions) and waits for
        /// pending effects to complete.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(20);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timeout");
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Shut down using the configured default timeout
        ///
        /// # Errors
        ///
        /// See [`Store::shutdown`].
        pub async fn shutdown_default(&self) -> Result<(), StoreError> {
            self.shutdown(self.default_shutdown_timeout).await
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Runs the middleware pipeline; its terminal stage calls the reducer
        /// 3. Publishes the new state if it changed
        /// 4. Executes the collected effects asynchronously
        ///
        /// Concurrent `send()` calls serialize at the pipeline, so no two
        /// reducer calls ever overlap.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        ///
        /// # Panics
        ///
        /// A panicking reducer or middleware propagates to the caller.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.actions.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let effects = {
                let mut current = self.state.write().await;
                tracing::trace!("Acquired write lock on state");
                self.dispatch_locked(&mut current, action)
            };

            // Note: Precision loss acceptable for metrics (effect counts < 2^52)
            #[allow(clippy::cast_precision_loss)]
            metrics::histogram!("store.effects.count").record(effects.len() as f64);

            for effect in effects {
                self.execute_effect(effect, tracking.clone());
            }

            Ok(handle)
        }

        /// Run the pipeline while the write lock is held
        fn dispatch_locked(&self, current: &mut Arc<S>, action: A) -> Effects<A> {
            let cell = RefCell::new(Arc::clone(current));

            let terminal = |action: A| -> Effects<A> {
                let before = Arc::clone(&cell.borrow());
                let mut working = S::clone(&before);

                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut working, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                if working == *before {
                    tracing::trace!("Reducer left state unchanged");
                } else {
                    *cell.borrow_mut() = Arc::new(working);
                    self.version.fetch_add(1, Ordering::AcqRel);
                }

                effects.into_iter().filter(|e| !e.is_none()).collect()
            };
            let snapshot = || Arc::clone(&cell.borrow());

            let effects = self.middleware.dispatch(action, &terminal, &snapshot);

            *current = cell.into_inner();
            effects
        }

        /// Send an action and wait for a matching action produced by effects
        ///
        /// Subscribes before sending so the result cannot be missed.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: Timeout expired before a matching action arrived
        /// - [`StoreError::ChannelClosed`]: Action broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: Store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to all actions produced by effects
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let count = store.state(|s| s.counter_data.count).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// Current state snapshot
        ///
        /// Two snapshots taken around a dispatch that changed nothing are
        /// the same allocation (`Arc::ptr_eq`).
        pub async fn snapshot(&self) -> Arc<S> {
            Arc::clone(&*self.state.read().await)
        }

        /// Feed an effect-produced action back into the store
        async fn feed_back(&self, action: A) {
            let _ = self.action_broadcast.send(action.clone());

            if let Err(error) = self.send(action).await {
                tracing::warn!(error = %error, "Dropped effect-produced action");
            }
        }

        /// Execute an effect with tracking
        ///
        /// Uses [`DecrementGuard`] to ensure the effect counter is always
        /// decremented, even if the effect panics.
        #[allow(clippy::needless_pass_by_value)] // tracking is cloned into spawned tasks
        fn execute_effect(&self, effect: Effect<A>, tracking: EffectTracking) {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    tracking.increment();

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                    let guard = DecrementGuard(tracking);
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = guard;
                        let _pending_guard = pending_guard;

                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            store.feed_back(action).await;
                        } else {
                            tracing::trace!("Effect::Future completed with no action");
                        }
                    });
                },
                Effect::Delay { duration, action } => {
                    tracing::trace!(?duration, "Executing Effect::Delay");
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    tracking.increment();

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                    let guard = DecrementGuard(tracking);
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = guard;
                        let _pending_guard = pending_guard;

                        tokio::time::sleep(duration).await;
                        store.feed_back(*action).await;
                    });
                },
                Effect::Parallel(effects) => {
                    tracing::trace!(count = effects.len(), "Executing Effect::Parallel");
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);

                    for effect in effects {
                        self.execute_effect(effect, tracking.clone());
                    }
                },
                Effect::Sequential(effects) => {
                    let effect_count = effects.len();
                    tracing::trace!(count = effect_count, "Executing Effect::Sequential");
                    metrics::counter!("store.effects.executed", "type" => "sequential").increment(1);
                    tracking.increment();

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                    let guard = DecrementGuard(tracking);
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = guard;
                        let _pending_guard = pending_guard;

                        for (idx, effect) in effects.into_iter().enumerate() {
                            tracing::trace!("Executing sequential effect {} of {}", idx + 1, effect_count);

                            let (sub_tx, mut sub_rx) = watch::channel(());
                            let sub_tracking = EffectTracking {
                                counter: Arc::new(AtomicUsize::new(0)),
                                notifier: sub_tx,
                            };

                            store.execute_effect(effect, sub_tracking.clone());

                            while sub_tracking.counter.load(Ordering::SeqCst) > 0 {
                                if sub_rx.changed().await.is_err() {
                                    break;
                                }
                            }
                        }
                    });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                middleware: self.middleware.clone(),
                version: Arc::clone(&self.version),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                default_shutdown_timeout: self.default_shutdown_timeout,
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::{Store, StoreBuilder};
