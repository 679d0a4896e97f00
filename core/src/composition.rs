//! Reducer composition utilities
//!
//! This module provides utilities for building a root reducer out of slices:
//! - **`scope_reducer`**: Focus a slice reducer on one key of a combined state,
//!   one variant of a combined action and one part of a combined environment
//! - **`combine_reducers`**: Run multiple reducers on the same state/action
//!
//! # Example
//!
//! ```
//! use sliceflow_core::composition::{combine_reducers, scope_reducer, Scope, SharedReducer};
//! use sliceflow_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//! use std::sync::Arc;
//!
//! #[derive(Clone, Default)]
//! struct CountState { count: u64 }
//!
//! #[derive(Clone)]
//! enum CountAction { Bump }
//!
//! struct CountReducer;
//!
//! impl Reducer for CountReducer {
//!     type State = CountState;
//!     type Action = CountAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut CountState, _action: CountAction, _env: &()) -> SmallVec<[Effect<CountAction>; 4]> {
//!         state.count += 1;
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! #[derive(Clone, Default)]
//! struct RootState { counter: CountState }
//!
//! #[derive(Clone)]
//! enum RootAction { Count(CountAction) }
//!
//! let counter: SharedReducer<RootState, RootAction, ()> = Arc::new(scope_reducer(
//!     CountReducer,
//!     Scope {
//!         state: |root: &mut RootState| &mut root.counter,
//!         action: |action: RootAction| match action {
//!             RootAction::Count(a) => Some(a),
//!         },
//!         embed: RootAction::Count,
//!         environment: |env: &()| env,
//!     },
//! ));
//! let root = combine_reducers(vec![counter]);
//!
//! let mut state = RootState::default();
//! let _ = root.reduce(&mut state, RootAction::Count(CountAction::Bump), &());
//! assert_eq!(state.counter.count, 1);
//! ```

use crate::effect::Effect;
use crate::reducer::Reducer;
use smallvec::SmallVec;
use std::sync::Arc;

/// Shared, type-erased reducer handle accepted by [`combine_reducers`]
pub type SharedReducer<S, A, E> = Arc<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Each reducer is run in sequence, and all effects are collected and concatenated.
/// Reducers that produce only `Effect::None` contribute nothing.
#[must_use]
pub fn combine_reducers<S, A, E>(reducers: Vec<SharedReducer<S, A, E>>) -> CombinedReducer<S, A, E>
where
    A: Clone,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A, E> {
    reducers: Vec<SharedReducer<S, A, E>>,
}

impl<S, A, E> Clone for CombinedReducer<S, A, E> {
    fn clone(&self) -> Self {
        Self {
            reducers: self.reducers.clone(),
        }
    }
}

impl<S, A, E> CombinedReducer<S, A, E> {
    /// Number of reducers in the combination
    #[must_use]
    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    /// Whether the combination holds no reducers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }
}

impl<S, A, E> Reducer for CombinedReducer<S, A, E>
where
    A: Clone,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let mut all_effects = SmallVec::new();

        for reducer in &self.reducers {
            let effects = reducer.reduce(state, action.clone(), env);
            all_effects.extend(effects.into_iter().filter(|e| !e.is_none()));
        }

        all_effects
    }
}

/// Projections that embed a slice into a combined store
///
/// - `state`: borrow the slice out of the combined state
/// - `action`: extract the slice action, `None` if the action targets another slice
/// - `embed`: wrap a slice action produced by an effect back into the combined action
/// - `environment`: borrow the slice dependencies out of the combined environment
pub struct Scope<S, SubS, A, SubA, E, SubE> {
    /// Slice state lens
    pub state: fn(&mut S) -> &mut SubS,
    /// Slice action extractor
    pub action: fn(A) -> Option<SubA>,
    /// Slice action embedder
    pub embed: fn(SubA) -> A,
    /// Slice environment lens
    pub environment: fn(&E) -> &SubE,
}

impl<S, SubS, A, SubA, E, SubE> Clone for Scope<S, SubS, A, SubA, E, SubE> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, SubS, A, SubA, E, SubE> Copy for Scope<S, SubS, A, SubA, E, SubE> {}

/// Scopes a slice reducer to operate on part of a larger state.
///
/// Actions that do not target the slice are ignored and produce no effects.
/// Effects returned by the slice are lifted into the parent action type.
pub const fn scope_reducer<S, SubS, A, SubA, E, SubE, R>(
    reducer: R,
    scope: Scope<S, SubS, A, SubA, E, SubE>,
) -> ScopedReducer<S, SubS, A, SubA, E, SubE, R>
where
    R: Reducer<State = SubS, Action = SubA, Environment = SubE>,
{
    ScopedReducer { reducer, scope }
}

/// A scoped reducer that operates on a slice of the combined state.
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<S, SubS, A, SubA, E, SubE, R> {
    reducer: R,
    scope: Scope<S, SubS, A, SubA, E, SubE>,
}

impl<S, SubS, A, SubA, E, SubE, R: Clone> Clone for ScopedReducer<S, SubS, A, SubA, E, SubE, R> {
    fn clone(&self) -> Self {
        Self {
            reducer: self.reducer.clone(),
            scope: self.scope,
        }
    }
}

impl<S, SubS, A, SubA, E, SubE, R> Reducer for ScopedReducer<S, SubS, A, SubA, E, SubE, R>
where
    R: Reducer<State = SubS, Action = SubA, Environment = SubE>,
    A: Send + 'static,
    SubA: Send + 'static,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let Some(sub_action) = (self.scope.action)(action) else {
            return SmallVec::new();
        };

        let effects = self.reducer.reduce(
            (self.scope.state)(state),
            sub_action,
            (self.scope.environment)(env),
        );

        effects
            .into_iter()
            .map(|effect| effect.map(self.scope.embed))
            .collect()
    }
}
