//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when a reducer hands async work or a
//! delayed follow-up action to the runtime.

/// Create an `Effect::Future` from an async block
///
/// The block evaluates to `Option<Action>`; `Some` is dispatched back into the store.
///
/// # Example
///
/// ```rust,ignore
/// use sliceflow_core::async_effect;
///
/// async_effect! {
///     match directory.fetch_users().await {
///         Ok(users) => Some(UserAction::Fulfilled { generation, users }),
///         Err(error) => Some(UserAction::Rejected { generation, error: error.to_string() }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use sliceflow_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(1),
///     action: CounterAction::Increment { by: 1 }
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}
