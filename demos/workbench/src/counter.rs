//! Counter slice
//!
//! A single non-negative count. Decrementing below zero is a no-op, and
//! `Set` parses its input; input that is not a non-negative integer keeps
//! the current count and records why in `last_error`.

use serde::{Deserialize, Serialize};
use sliceflow_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};

/// Counter state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterState {
    /// Current count value
    pub count: u64,
    /// Why the last `Set` was rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl CounterState {
    /// State holding `count`
    #[must_use]
    pub const fn with_count(count: u64) -> Self {
        Self {
            count,
            last_error: None,
        }
    }
}

/// Counter actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterAction {
    /// Add `by` to the count
    Increment {
        /// Amount to add
        by: u64,
    },
    /// Subtract `by`, unless that would go below zero
    Decrement {
        /// Amount to subtract
        by: u64,
    },
    /// Replace the count with user input
    Set {
        /// Raw input text
        value: String,
    },
}

/// Counter reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterReducer;

impl Reducer for CounterReducer {
    type State = CounterState;
    type Action = CounterAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CounterAction::Increment { by } => {
                state.count = state.count.saturating_add(by);
                state.last_error = None;
            },
            CounterAction::Decrement { by } => {
                if let Some(count) = state.count.checked_sub(by) {
                    state.count = count;
                }
                state.last_error = None;
            },
            CounterAction::Set { value } => match value.trim().parse::<u64>() {
                Ok(count) => {
                    state.count = count;
                    state.last_error = None;
                },
                Err(e) => {
                    tracing::debug!(%value, error = %e, "Rejected counter input");
                    state.last_error = Some(format!("invalid count {value:?}: {e}"));
                },
            },
        }

        smallvec![Effect::None]
    }
}
