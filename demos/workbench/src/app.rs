//! Store composition
//!
//! The combined state holds one key per slice plus the reserved `baseApi`
//! cache key. Dispatch runs through the logger, the remote data client and
//! persistence, in that order, before the root reducer sees the action.
//!
//! Each slice sits behind its own `Arc`. The slice lenses go through
//! [`Arc::make_mut`], so a dispatch copies only the slice it targets and the
//! next published state shares every other slice with the previous one.

use serde::Serialize;
use sliceflow_core::composition::{combine_reducers, scope_reducer, CombinedReducer, Scope, SharedReducer};
use sliceflow_core::environment::{Clock, IdGenerator, KeyValueStorage};
use sliceflow_query::{ApiAction, ApiLens, ApiMiddleware, ApiReducer, ApiState, Transport};
use sliceflow_runtime::{LoggerMiddleware, Store};
use std::sync::Arc;

use crate::counter::{CounterAction, CounterReducer, CounterState};
use crate::employee::{EmployeeAction, EmployeeEnvironment, EmployeeReducer, EmployeeState};
use crate::persist::{restore_state, PersistMiddleware};
use crate::posts;
use crate::users::{RemoteUserDirectory, UserAction, UserEnvironment, UserReducer, UserState};

/// The combined state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    /// Counter slice
    pub counter_data: Arc<CounterState>,
    /// Employee slice
    pub employee_data: Arc<EmployeeState>,
    /// User fetch slice
    pub user_data: Arc<UserState>,
    /// Remote data cache
    pub base_api: Arc<ApiState>,
}

/// Every action the store accepts
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Counter slice action
    Counter(CounterAction),
    /// Employee slice action
    Employee(EmployeeAction),
    /// User fetch slice action
    User(UserAction),
    /// Remote data cache action
    Api(ApiAction),
}

impl From<CounterAction> for AppAction {
    fn from(action: CounterAction) -> Self {
        Self::Counter(action)
    }
}

impl From<EmployeeAction> for AppAction {
    fn from(action: EmployeeAction) -> Self {
        Self::Employee(action)
    }
}

impl From<UserAction> for AppAction {
    fn from(action: UserAction) -> Self {
        Self::User(action)
    }
}

impl From<ApiAction> for AppAction {
    fn from(action: ApiAction) -> Self {
        Self::Api(action)
    }
}

/// Dependencies of the slice reducers
#[derive(Clone)]
pub struct AppEnvironment {
    /// Employee slice dependencies
    pub employees: EmployeeEnvironment,
    /// User slice dependencies
    pub users: UserEnvironment,
}

/// The root reducer
pub type AppReducer = CombinedReducer<AppState, AppAction, AppEnvironment>;

/// The application store
pub type AppStore = Store<AppState, AppAction, AppEnvironment, AppReducer>;

fn counter_state(state: &mut AppState) -> &mut CounterState {
    Arc::make_mut(&mut state.counter_data)
}

fn counter_action(action: AppAction) -> Option<CounterAction> {
    match action {
        AppAction::Counter(action) => Some(action),
        _ => None,
    }
}

fn employee_state(state: &mut AppState) -> &mut EmployeeState {
    Arc::make_mut(&mut state.employee_data)
}

fn employee_action(action: AppAction) -> Option<EmployeeAction> {
    match action {
        AppAction::Employee(action) => Some(action),
        _ => None,
    }
}

fn employee_env(env: &AppEnvironment) -> &EmployeeEnvironment {
    &env.employees
}

fn user_state(state: &mut AppState) -> &mut UserState {
    Arc::make_mut(&mut state.user_data)
}

fn user_action(action: AppAction) -> Option<UserAction> {
    match action {
        AppAction::User(action) => Some(action),
        _ => None,
    }
}

fn user_env(env: &AppEnvironment) -> &UserEnvironment {
    &env.users
}

fn api_state(state: &mut AppState) -> &mut ApiState {
    Arc::make_mut(&mut state.base_api)
}

fn api_action(action: AppAction) -> Option<ApiAction> {
    match action {
        AppAction::Api(action) => Some(action),
        _ => None,
    }
}

fn no_env(_env: &AppEnvironment) -> &() {
    &()
}

fn api_state_ref(state: &AppState) -> &ApiState {
    &state.base_api
}

fn api_action_ref(action: &AppAction) -> Option<&ApiAction> {
    match action {
        AppAction::Api(action) => Some(action),
        _ => None,
    }
}

/// Build the root reducer from the four slice reducers
#[must_use]
pub fn app_reducer() -> AppReducer {
    let counter: SharedReducer<AppState, AppAction, AppEnvironment> = Arc::new(scope_reducer(
        CounterReducer,
        Scope {
            state: counter_state,
            action: counter_action,
            embed: AppAction::Counter,
            environment: no_env,
        },
    ));
    let employees: SharedReducer<AppState, AppAction, AppEnvironment> = Arc::new(scope_reducer(
        EmployeeReducer,
        Scope {
            state: employee_state,
            action: employee_action,
            embed: AppAction::Employee,
            environment: employee_env,
        },
    ));
    let users: SharedReducer<AppState, AppAction, AppEnvironment> = Arc::new(scope_reducer(
        UserReducer,
        Scope {
            state: user_state,
            action: user_action,
            embed: AppAction::User,
            environment: user_env,
        },
    ));
    let api: SharedReducer<AppState, AppAction, AppEnvironment> = Arc::new(scope_reducer(
        ApiReducer,
        Scope {
            state: api_state,
            action: api_action,
            embed: AppAction::Api,
            environment: no_env,
        },
    ));

    combine_reducers(vec![counter, employees, users, api])
}

/// External services the store is wired to
#[derive(Clone)]
pub struct AppDependencies {
    /// Remote request execution
    pub transport: Arc<dyn Transport>,
    /// Persistence for the counter and employee slices
    pub storage: Arc<dyn KeyValueStorage>,
    /// Employee id source
    pub ids: Arc<dyn IdGenerator>,
    /// Timestamps for cached responses
    pub clock: Arc<dyn Clock>,
}

/// Restore persisted state and build the store with its middleware pipeline
#[must_use]
pub fn build_store(deps: AppDependencies) -> AppStore {
    let initial = restore_state(deps.storage.as_ref());

    let environment = AppEnvironment {
        employees: EmployeeEnvironment {
            ids: Arc::clone(&deps.ids),
        },
        users: UserEnvironment::new(RemoteUserDirectory::new(Arc::clone(&deps.transport))),
    };

    let api = ApiMiddleware::new(
        Arc::new(posts::api()),
        Arc::clone(&deps.transport),
        Arc::clone(&deps.clock),
        ApiLens {
            state: api_state_ref,
            action: api_action_ref,
            embed: AppAction::Api,
        },
    );

    Store::builder(initial, app_reducer(), environment)
        .with_middleware(LoggerMiddleware::tracing())
        .with_middleware(api)
        .with_middleware(PersistMiddleware::new(deps.storage))
        .build()
}
