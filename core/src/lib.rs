//! # Sliceflow Core
//!
//! Core traits and types for the Sliceflow store architecture.
//!
//! This crate provides the building blocks for a unidirectional state
//! container: slice reducers, effect descriptions, middleware and the
//! environment traits that keep reducers free of hidden I/O.
//!
//! ## Core Concepts
//!
//! - **State**: A slice of the combined application state
//! - **Action**: Tagged description of an intended transition
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Middleware**: Pipeline stage observing or augmenting every dispatched action
//! - **Environment**: Injected dependencies via traits
//!
//! ## Example
//!
//! ```
//! use sliceflow_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct TallyState {
//!     total: u64,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum TallyAction {
//!     Add(u64),
//! }
//!
//! struct TallyReducer;
//!
//! impl Reducer for TallyReducer {
//!     type State = TallyState;
//!     type Action = TallyAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut TallyState,
//!         action: TallyAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<TallyAction>; 4]> {
//!         match action {
//!             TallyAction::Add(n) => state.total += n,
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! let mut state = TallyState::default();
//! let _ = TallyReducer.reduce(&mut state, TallyAction::Add(3), &());
//! assert_eq!(state.total, 3);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{smallvec, SmallVec};

/// Reducer composition utilities
pub mod composition;

/// Declarative macros for effect construction
pub mod effect_macros;

/// Dispatch pipeline interceptors
pub mod middleware;

/// Effects returned from a single reduction
pub type Effects<A> = SmallVec<[effect::Effect<A>; 4]>;

/// Reducer module - The core trait for state transitions
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all transition logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Type Parameters
    ///
    /// - `State`: The slice state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Inspects the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers (or appended by middleware) and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the store
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::None => write!(f, "Effect::None"),
                Self::Parallel(effects) => f.debug_tuple("Effect::Parallel").field(effects).finish(),
                Self::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Self::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Self::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Self>) -> Self {
            Self::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Self>) -> Self {
            Self::Sequential(effects)
        }

        /// Whether this effect does nothing when executed
        #[must_use]
        pub fn is_none(&self) -> bool {
            match self {
                Self::None => true,
                Self::Parallel(effects) | Self::Sequential(effects) => {
                    effects.iter().all(Self::is_none)
                },
                Self::Delay { .. } | Self::Future(_) => false,
            }
        }
    }

    impl<Action: Send + 'static> Effect<Action> {
        /// Lift this effect into a parent action type
        ///
        /// Used when a slice reducer runs inside a combined reducer: every
        /// action the effect eventually produces is wrapped with `f`.
        #[must_use]
        pub fn map<Parent, F>(self, f: F) -> Effect<Parent>
        where
            Parent: 'static,
            F: Fn(Action) -> Parent + Clone + Send + Sync + 'static,
        {
            match self {
                Self::None => Effect::None,
                Self::Parallel(effects) => Effect::Parallel(
                    effects.into_iter().map(|e| e.map(f.clone())).collect(),
                ),
                Self::Sequential(effects) => Effect::Sequential(
                    effects.into_iter().map(|e| e.map(f.clone())).collect(),
                ),
                Self::Delay { duration, action } => Effect::Delay {
                    duration,
                    action: Box::new(f(*action)),
                },
                Self::Future(fut) => Effect::Future(Box::pin(async move { fut.await.map(f) })),
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};
    use thiserror::Error;

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by [`Utc::now`]
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Source of fresh, collision-resistant identifiers
    pub trait IdGenerator: Send + Sync {
        /// Produce an id that has not been handed out before
        fn next_id(&self) -> String;
    }

    /// Errors raised by a [`KeyValueStorage`] backend
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StorageError {
        /// The backing medium could not be read
        #[error("Storage read failed: {0}")]
        ReadFailed(String),

        /// The backing medium could not be written
        #[error("Storage write failed: {0}")]
        WriteFailed(String),
    }

    /// Opaque key → string persistence surface
    ///
    /// Mirrors browser local storage: values are plain strings and the
    /// caller owns their encoding.
    pub trait KeyValueStorage: Send + Sync {
        /// Read the value stored under `key`, if any
        ///
        /// # Errors
        ///
        /// Returns [`StorageError::ReadFailed`] if the backend is unreadable.
        fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

        /// Store `value` under `key`, replacing any previous value
        ///
        /// # Errors
        ///
        /// Returns [`StorageError::WriteFailed`] if the backend rejects the write.
        fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    }
}
