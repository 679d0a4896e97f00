//! Action logging middleware
//!
//! [`LoggerMiddleware`] records the state before an action, the action
//! itself and the state after the rest of the pipeline has run. Where the
//! entry goes is decided by a [`LogSink`]; the default sink writes a
//! `DEBUG` event through `tracing`.

use sliceflow_core::middleware::{Middleware, Next};
use sliceflow_core::Effects;
use std::fmt::Debug;
use std::sync::Arc;

/// One logged dispatch
#[derive(Debug)]
pub struct LogEntry<'a, S, A> {
    /// State before the action reached the reducer
    pub before: &'a S,
    /// The dispatched action
    pub action: &'a A,
    /// State after the reducer (and every inner middleware) ran
    pub after: &'a S,
    /// Whether a new state snapshot was published
    pub state_changed: bool,
}

/// Destination for log entries
pub trait LogSink<S, A>: Send + Sync {
    /// Record one dispatch
    fn record(&self, entry: LogEntry<'_, S, A>);
}

/// Sink writing entries as `tracing` events
///
/// Events use the `sliceflow::logger` target so they can be enabled on
/// their own, e.g. `RUST_LOG=sliceflow::logger=debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl<S: Debug, A: Debug> LogSink<S, A> for TracingSink {
    fn record(&self, entry: LogEntry<'_, S, A>) {
        tracing::debug!(
            target: "sliceflow::logger",
            before = ?entry.before,
            action = ?entry.action,
            after = ?entry.after,
            changed = entry.state_changed,
            "action dispatched"
        );
    }
}

/// Middleware logging every dispatch
pub struct LoggerMiddleware<S, A> {
    sink: Arc<dyn LogSink<S, A>>,
}

impl<S: Debug + 'static, A: Debug + 'static> LoggerMiddleware<S, A> {
    /// Logger writing to `tracing`
    #[must_use]
    pub fn tracing() -> Self {
        Self::with_sink(TracingSink)
    }
}

impl<S, A> LoggerMiddleware<S, A> {
    /// Logger writing to a custom sink
    #[must_use]
    pub fn with_sink<K>(sink: K) -> Self
    where
        K: LogSink<S, A> + 'static,
    {
        Self {
            sink: Arc::new(sink),
        }
    }
}

impl<S, A> Middleware<S, A> for LoggerMiddleware<S, A>
where
    A: Clone,
{
    fn handle(&self, action: A, next: &Next<'_, S, A>) -> Effects<A> {
        let before = next.state();
        let logged = action.clone();

        let effects = next.run(action);

        let after = next.state();
        self.sink.record(LogEntry {
            before: &before,
            action: &logged,
            after: &after,
            state_changed: !Arc::ptr_eq(&before, &after),
        });

        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sliceflow_core::middleware::MiddlewareChain;
    use sliceflow_core::SmallVec;
    use std::cell::RefCell;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Captured {
        entries: Mutex<Vec<(i32, i32, i32, bool)>>,
    }

    impl LogSink<i32, i32> for Arc<Captured> {
        fn record(&self, entry: LogEntry<'_, i32, i32>) {
            if let Ok(mut entries) = self.entries.lock() {
                entries.push((*entry.before, *entry.action, *entry.after, entry.state_changed));
            }
        }
    }

    fn run(chain: &MiddlewareChain<i32, i32>, action: i32, state: &RefCell<Arc<i32>>) {
        let terminal = |delta: i32| -> Effects<i32> {
            if delta != 0 {
                let next = **state.borrow() + delta;
                *state.borrow_mut() = Arc::new(next);
            }
            SmallVec::new()
        };
        let snapshot = || Arc::clone(&state.borrow());
        let _ = chain.dispatch(action, &terminal, &snapshot);
    }

    #[test]
    fn test_records_before_action_after() {
        let captured = Arc::new(Captured::default());
        let chain = MiddlewareChain::new(vec![
            Arc::new(LoggerMiddleware::with_sink(Arc::clone(&captured))) as Arc<dyn Middleware<i32, i32>>,
        ]);
        let state = RefCell::new(Arc::new(10));

        run(&chain, 5, &state);
        run(&chain, 0, &state);

        let entries = captured.entries.lock().map(|e| e.clone()).unwrap_or_default();
        assert_eq!(entries, vec![(10, 5, 15, true), (15, 0, 15, false)]);
    }
}
