//! # Workbench
//!
//! Four small features sharing one Sliceflow store:
//!
//! - [`counter`]: a non-negative count
//! - [`employee`]: an editable employee list
//! - [`users`]: a hand-written fetch state machine over `GET /users`
//! - [`posts`]: the same kind of data through the declarative remote client
//!
//! [`app::build_store`] composes them, restores the persisted slices and
//! installs the logger, remote client and persistence middleware.

pub mod app;
pub mod config;
pub mod counter;
pub mod employee;
pub mod persist;
pub mod posts;
pub mod storage;
pub mod users;

pub use app::{app_reducer, build_store, AppAction, AppDependencies, AppEnvironment, AppReducer, AppState, AppStore};
pub use config::{ConfigError, WorkbenchConfig};
pub use persist::{restore_state, PersistMiddleware, COUNT_KEY, EMPLOYEE_KEY};
pub use storage::FileStorage;
