//! Employee slice
//!
//! An ordered list of `{id, name}` records. Updating a record removes it and
//! appends it again with the new name, so updated records move to the end.

use serde::{Deserialize, Serialize};
use sliceflow_core::environment::IdGenerator;
use sliceflow_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use std::sync::Arc;
use uuid::Uuid;

/// Opaque, unique employee identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(String);

impl EmployeeId {
    /// Wrap an existing id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One employee record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique id
    pub id: EmployeeId,
    /// Display name; any string is accepted
    #[serde(alias = "employeeName")]
    pub name: String,
}

/// Employee list state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeState {
    /// Records in insertion order (updates re-append)
    pub employees: Vec<Employee>,
}

impl EmployeeState {
    /// Record with `id`, if present
    #[must_use]
    pub fn get(&self, id: &EmployeeId) -> Option<&Employee> {
        self.employees.iter().find(|e| &e.id == id)
    }
}

/// Employee actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmployeeAction {
    /// Append a record with a fresh id
    Add {
        /// Name of the new employee
        name: String,
    },
    /// Remove the record with `id`; unknown ids are ignored
    Remove {
        /// Record to remove
        id: EmployeeId,
    },
    /// Drop the record with `id` and append `{id, name}`
    Update {
        /// Record to replace
        id: EmployeeId,
        /// New name
        name: String,
    },
    /// Replace the whole list
    ReplaceAll {
        /// New list
        employees: Vec<Employee>,
    },
}

/// Employee environment
#[derive(Clone)]
pub struct EmployeeEnvironment {
    /// Source of fresh ids
    pub ids: Arc<dyn IdGenerator>,
}

impl EmployeeEnvironment {
    /// Create an environment around `ids`
    pub fn new(ids: impl IdGenerator + 'static) -> Self {
        Self { ids: Arc::new(ids) }
    }
}

/// Random UUID v4 ids
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Employee reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct EmployeeReducer;

impl Reducer for EmployeeReducer {
    type State = EmployeeState;
    type Action = EmployeeAction;
    type Environment = EmployeeEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            EmployeeAction::Add { name } => {
                let id = EmployeeId(env.ids.next_id());
                state.employees.push(Employee { id, name });
            },
            EmployeeAction::Remove { id } => {
                state.employees.retain(|e| e.id != id);
            },
            EmployeeAction::Update { id, name } => {
                state.employees.retain(|e| e.id != id);
                state.employees.push(Employee { id, name });
            },
            EmployeeAction::ReplaceAll { employees } => {
                state.employees = employees;
            },
        }

        smallvec![Effect::None]
    }
}
