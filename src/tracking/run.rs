//! Run and task records kept by the [`super::Tracker`].

use std::collections::HashMap;

use strum::{Display, IntoStaticStr};
use uuid::Uuid;

use crate::engine::canonicalize;

/// A probe argument or result, as the facade sees a boxed value.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskValue {
    /// `null`, and the result of void methods
    Null,
    /// Boxed `boolean`
    Bool(bool),
    /// Boxed `byte`, `short`, `int` or `long`
    Int(i64),
    /// Boxed `float` or `double`
    Float(f64),
    /// Boxed `char`
    Char(char),
    /// A `java.lang.String`
    Str(String),
    /// Any other reference, by class name
    Object(String),
}

/// A throwable reported through the error probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskError {
    /// Binary class name of the throwable
    pub class_name: String,
    /// Detail message, if any
    pub message: Option<String>,
}

impl TaskError {
    /// Creates an error record.
    #[must_use]
    pub fn new(class_name: impl Into<String>, message: Option<&str>) -> Self {
        TaskError {
            class_name: class_name.into(),
            message: message.map(str::to_string),
        }
    }
}

/// Lifecycle of one tracked invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TaskState {
    /// Entered, not yet returned
    Running,
    /// Returned normally
    Success,
    /// Threw
    Failed,
}

/// One tracked invocation of a marked method.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRun {
    /// Unique id of this invocation
    pub id: Uuid,
    /// Binary name of the declaring unit
    pub owner: String,
    /// Long method name as reported by the before probe
    pub method: String,
    /// Correlation key derived from `method`
    pub key: String,
    /// Boxed arguments
    pub args: Vec<TaskValue>,
    /// Current state
    pub state: TaskState,
    /// Return value once the task succeeded
    pub result: Option<TaskValue>,
    /// Throwable once the task failed
    pub error: Option<TaskError>,
}

/// A tracking run: every task reported between start and cleanup.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    /// Unique run id
    pub id: Uuid,
    /// Run name at the time the run started
    pub name: String,
    /// True if the run was started implicitly by an event arriving without a run
    pub agentless: bool,
    /// Tasks in the order they were entered
    pub tasks: Vec<TaskRun>,
    /// Metrics logged during the run, last value wins
    pub metrics: HashMap<String, String>,
    open: HashMap<String, Vec<usize>>,
}

impl Run {
    pub(crate) fn new(name: &str, agentless: bool) -> Self {
        Run {
            id: Uuid::new_v4(),
            name: name.to_string(),
            agentless,
            tasks: Vec::new(),
            metrics: HashMap::new(),
            open: HashMap::new(),
        }
    }

    pub(crate) fn enter(&mut self, owner: &str, method: &str, args: Vec<TaskValue>) -> Uuid {
        let key = canonicalize(method);
        let id = Uuid::new_v4();
        self.open.entry(key.clone()).or_default().push(self.tasks.len());
        self.tasks.push(TaskRun {
            id,
            owner: owner.to_string(),
            method: method.to_string(),
            key,
            args,
            state: TaskState::Running,
            result: None,
            error: None,
        });
        id
    }

    /// Close the innermost open task matching `method`'s key.
    pub(crate) fn close(&mut self, method: &str) -> Option<&mut TaskRun> {
        let key = canonicalize(method);
        let index = self.open.get_mut(&key)?.pop()?;
        self.tasks.get_mut(index)
    }

    /// Tasks still running.
    #[must_use]
    pub fn open_tasks(&self) -> usize {
        self.open.values().map(Vec::len).sum()
    }

    /// Find the first task with the given correlation key.
    #[must_use]
    pub fn task(&self, key: &str) -> Option<&TaskRun> {
        self.tasks.iter().find(|task| task.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_calls_close_innermost_first() {
        let mut run = Run::new("r", false);
        let outer = run.enter("a.B", "a.B.step(int)", vec![TaskValue::Int(1)]);
        let inner = run.enter("a.B", "a.B.step(int)", vec![TaskValue::Int(2)]);
        assert_eq!(run.open_tasks(), 2);

        assert_eq!(run.close("a.B.step(int)").map(|t| t.id), Some(inner));
        assert_eq!(run.close("a.B.step(").map(|t| t.id), Some(outer));
        assert!(run.close("a.B.step(int)").is_none());
        assert_eq!(run.open_tasks(), 0);
    }
}
