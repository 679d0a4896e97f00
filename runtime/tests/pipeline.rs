//! Integration tests for the middleware pipeline and state publication

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use sliceflow_core::middleware::{Middleware, Next};
use sliceflow_core::{effect::Effect, reducer::Reducer, smallvec, Effects, SmallVec};
use sliceflow_runtime::{LogEntry, LogSink, LoggerMiddleware, Store};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Add(u32),
    Noop,
    /// Swallowed by the gate middleware
    Blocked,
    /// Produces `Add(1)` from an effect
    Echo,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct State {
    total: u32,
}

struct TotalReducer {
    seen: Arc<Mutex<Vec<String>>>,
}

impl Reducer for TotalReducer {
    type State = State;
    type Action = Action;
    type Environment = ();

    fn reduce(&self, state: &mut State, action: Action, _env: &()) -> SmallVec<[Effect<Action>; 4]> {
        self.seen.lock().unwrap().push(format!("reducer:{action:?}"));
        match action {
            Action::Add(n) => state.total += n,
            Action::Noop | Action::Blocked => {},
            Action::Echo => {
                return smallvec![Effect::Future(Box::pin(async { Some(Action::Add(1)) }))];
            },
        }
        smallvec![Effect::None]
    }
}

struct Tag {
    name: &'static str,
    seen: Arc<Mutex<Vec<String>>>,
}

impl Middleware<State, Action> for Tag {
    fn handle(&self, action: Action, next: &Next<'_, State, Action>) -> Effects<Action> {
        self.seen.lock().unwrap().push(format!("{}:{action:?}", self.name));
        next.run(action)
    }
}

struct Gate;

impl Middleware<State, Action> for Gate {
    fn handle(&self, action: Action, next: &Next<'_, State, Action>) -> Effects<Action> {
        if action == Action::Blocked {
            return SmallVec::new();
        }
        next.run(action)
    }
}

#[derive(Clone, Default)]
struct RecordingSink {
    entries: Arc<Mutex<Vec<(u32, Action, u32, bool)>>>,
}

impl LogSink<State, Action> for RecordingSink {
    fn record(&self, entry: LogEntry<'_, State, Action>) {
        self.entries.lock().unwrap().push((
            entry.before.total,
            entry.action.clone(),
            entry.after.total,
            entry.state_changed,
        ));
    }
}

fn build(seen: &Arc<Mutex<Vec<String>>>, sink: RecordingSink) -> Store<State, Action, (), TotalReducer> {
    Store::builder(State::default(), TotalReducer { seen: Arc::clone(seen) }, ())
        .with_middleware(LoggerMiddleware::with_sink(sink))
        .with_middleware(Tag { name: "first", seen: Arc::clone(seen) })
        .with_middleware(Gate)
        .with_middleware(Tag { name: "last", seen: Arc::clone(seen) })
        .build()
}

#[tokio::test]
async fn test_middleware_runs_in_registration_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let store = build(&seen, RecordingSink::default());

    store.send(Action::Add(2)).await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["first:Add(2)", "last:Add(2)", "reducer:Add(2)"]
    );
    assert_eq!(store.state(|s| s.total).await, 2);
}

#[tokio::test]
async fn test_swallowed_action_never_reaches_reducer() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = RecordingSink::default();
    let store = build(&seen, sink.clone());

    let before = store.snapshot().await;
    store.send(Action::Blocked).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["first:Blocked"]);
    assert!(Arc::ptr_eq(&before, &store.snapshot().await));
    assert_eq!(*sink.entries.lock().unwrap(), vec![(0, Action::Blocked, 0, false)]);
}

#[tokio::test]
async fn test_unchanged_state_keeps_snapshot() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let store = build(&seen, RecordingSink::default());

    let before = store.snapshot().await;
    store.send(Action::Noop).await.unwrap();
    store.send(Action::Add(0)).await.unwrap();
    let after = store.snapshot().await;

    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(store.version(), 0);

    store.send(Action::Add(1)).await.unwrap();
    assert!(!Arc::ptr_eq(&after, &store.snapshot().await));
    assert_eq!(store.version(), 1);
}

#[tokio::test]
async fn test_logger_sees_pre_and_post_state() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = RecordingSink::default();
    let store = build(&seen, sink.clone());

    store.send(Action::Add(3)).await.unwrap();
    store.send(Action::Add(4)).await.unwrap();

    assert_eq!(
        *sink.entries.lock().unwrap(),
        vec![(0, Action::Add(3), 3, true), (3, Action::Add(4), 7, true)]
    );
}

#[tokio::test]
async fn test_effect_actions_reenter_at_outermost_middleware() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = RecordingSink::default();
    let store = build(&seen, sink.clone());

    let mut handle = store.send(Action::Echo).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    assert_eq!(store.state(|s| s.total).await, 1);
    let logged: Vec<Action> = sink.entries.lock().unwrap().iter().map(|e| e.1.clone()).collect();
    assert_eq!(logged, vec![Action::Echo, Action::Add(1)]);
    assert!(seen.lock().unwrap().contains(&"first:Add(1)".to_string()));
}
