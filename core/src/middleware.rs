//! Dispatch pipeline interceptors
//!
//! A middleware sees every action before the reducer does. It may read the
//! current state, forward the action to the rest of the pipeline, append
//! effects to whatever the pipeline returned, or swallow the action entirely
//! by never calling [`Next::run`].
//!
//! Middleware are composed once, in order, into a [`MiddlewareChain`]. The first
//! middleware in the chain is the outermost stage: it observes the action first
//! and the returned effects last.
//!
//! # Example
//!
//! ```
//! use sliceflow_core::middleware::{Middleware, MiddlewareChain, Next};
//! use sliceflow_core::{Effects, SmallVec};
//! use std::sync::Arc;
//!
//! struct DropOdd;
//!
//! impl Middleware<u64, u64> for DropOdd {
//!     fn handle(&self, action: u64, next: &Next<'_, u64, u64>) -> Effects<u64> {
//!         if action % 2 == 1 {
//!             return SmallVec::new();
//!         }
//!         next.run(action)
//!     }
//! }
//!
//! let chain = MiddlewareChain::new(vec![Arc::new(DropOdd) as Arc<dyn Middleware<u64, u64>>]);
//! let seen = std::cell::Cell::new(0);
//! let terminal = |action: u64| -> Effects<u64> {
//!     seen.set(action);
//!     SmallVec::new()
//! };
//! let state = || Arc::new(0_u64);
//!
//! let _ = chain.dispatch(3, &terminal, &state);
//! assert_eq!(seen.get(), 0);
//! let _ = chain.dispatch(4, &terminal, &state);
//! assert_eq!(seen.get(), 4);
//! ```

use crate::Effects;
use std::sync::Arc;

/// A dispatch pipeline stage
///
/// Implementations must return whatever [`Next::run`] returned (optionally
/// extended) unless they deliberately intercept the action.
pub trait Middleware<S, A>: Send + Sync {
    /// Handle one dispatched action
    fn handle(&self, action: A, next: &Next<'_, S, A>) -> Effects<A>;
}

/// The remainder of the pipeline as seen from one middleware
pub struct Next<'a, S, A> {
    chain: &'a [Arc<dyn Middleware<S, A>>],
    terminal: &'a dyn Fn(A) -> Effects<A>,
    state: &'a dyn Fn() -> Arc<S>,
}

impl<S, A> Next<'_, S, A> {
    /// Snapshot of the store state at the time of the call
    ///
    /// Calling this before and after [`Next::run`] yields the pre- and
    /// post-dispatch states.
    #[must_use]
    pub fn state(&self) -> Arc<S> {
        (self.state)()
    }

    /// Forward `action` to the next stage and return its effects
    pub fn run(&self, action: A) -> Effects<A> {
        match self.chain.split_first() {
            Some((stage, rest)) => stage.handle(
                action,
                &Next {
                    chain: rest,
                    terminal: self.terminal,
                    state: self.state,
                },
            ),
            None => (self.terminal)(action),
        }
    }
}

/// An ordered, immutable list of middleware
pub struct MiddlewareChain<S, A> {
    stages: Arc<[Arc<dyn Middleware<S, A>>]>,
}

impl<S, A> MiddlewareChain<S, A> {
    /// Freeze `stages` into a chain; the first stage is outermost
    #[must_use]
    pub fn new(stages: Vec<Arc<dyn Middleware<S, A>>>) -> Self {
        Self {
            stages: stages.into(),
        }
    }

    /// A chain that forwards straight to the terminal stage
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of stages
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run `action` through every stage and finally through `terminal`
    pub fn dispatch(
        &self,
        action: A,
        terminal: &dyn Fn(A) -> Effects<A>,
        state: &dyn Fn() -> Arc<S>,
    ) -> Effects<A> {
        Next {
            chain: &self.stages,
            terminal,
            state,
        }
        .run(action)
    }
}

impl<S, A> Clone for MiddlewareChain<S, A> {
    fn clone(&self) -> Self {
        Self {
            stages: Arc::clone(&self.stages),
        }
    }
}

impl<S, A> Default for MiddlewareChain<S, A> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S, A> std::fmt::Debug for MiddlewareChain<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("stages", &self.stages.len())
            .finish()
    }
}
