//! Reference tracking facade.
//!
//! Rewritten code calls `beforeTask`, `afterTask` and `errorTask` on the facade singleton it
//! captured in the hook field. [`TrackingFacade`] is the Rust side of that contract and
//! [`Tracker`] the in-process implementation: it owns the run state and correlates the three
//! events of one invocation through the method identity key, so an `afterTask` reported with a
//! differently rendered argument list still closes the right task.
//!
//! Probes never fail. An event arriving without an active run starts an agentless run, and an
//! `afterTask` or `errorTask` without a matching `beforeTask` is logged and dropped.
//!
//! # Examples
//!
//! ```rust
//! use probeweave::tracking::{TaskState, TaskValue, Tracker, TrackingFacade};
//!
//! let tracker = Tracker::new();
//! tracker.before_task("a.b.Job", "a.b.Job.run(java.lang.String)", &[TaskValue::Str("x".into())]);
//! tracker.after_task("a.b.Job.run(String)", &TaskValue::Null);
//!
//! let run = tracker.current_run().expect("agentless run");
//! assert_eq!(run.tasks[0].state, TaskState::Success);
//! ```

mod run;

pub use run::{Run, TaskError, TaskRun, TaskState, TaskValue};

use std::sync::{OnceLock, RwLock};

use uuid::Uuid;

/// Probe contract between rewritten code and the tracking backend.
pub trait TrackingFacade: Send + Sync {
    /// A marked method was entered.
    fn before_task(&self, owner: &str, method: &str, args: &[TaskValue]);
    /// A marked method returned `result` (`Null` for void methods).
    fn after_task(&self, method: &str, result: &TaskValue);
    /// A marked method threw `error`.
    fn error_task(&self, method: &str, error: &TaskError);
}

#[derive(Debug)]
struct TrackerState {
    run_name: String,
    run: Option<Run>,
}

fn generate_run_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("probeweave-{}", &id[..12])
}

/// In-process tracking backend.
#[derive(Debug)]
pub struct Tracker {
    state: RwLock<TrackerState>,
}

static INSTANCE: OnceLock<Tracker> = OnceLock::new();

impl Default for Tracker {
    fn default() -> Self {
        Tracker::new()
    }
}

impl Tracker {
    /// Creates a tracker with a fresh run name and no active run.
    #[must_use]
    pub fn new() -> Self {
        Tracker {
            state: RwLock::new(TrackerState {
                run_name: generate_run_name(),
                run: None,
            }),
        }
    }

    /// The process-wide tracker, as returned by the facade's `instance()` accessor.
    pub fn instance() -> &'static Tracker {
        INSTANCE.get_or_init(Tracker::new)
    }

    /// Name the next run will be started with.
    #[must_use]
    pub fn run_name(&self) -> String {
        read_lock!(self.state).run_name.clone()
    }

    /// Snapshot of the active run.
    #[must_use]
    pub fn current_run(&self) -> Option<Run> {
        read_lock!(self.state).run.clone()
    }

    /// Start a run explicitly, replacing any active one. Returns its id.
    pub fn start_run(&self, name: Option<&str>) -> Uuid {
        let mut state = write_lock!(self.state);
        if let Some(name) = name {
            state.run_name = name.to_string();
        }
        let run = Run::new(&state.run_name, false);
        let id = run.id;
        log::info!("Started run {} ({id})", state.run_name);
        state.run = Some(run);
        id
    }

    /// Record a metric on the active run, starting an agentless run if needed.
    pub fn log_metric(&self, key: &str, value: &str) {
        let mut state = write_lock!(self.state);
        Self::active_run(&mut state)
            .metrics
            .insert(key.to_string(), value.to_string());
    }

    /// End the active run and pick a new run name for the next one.
    pub fn cleanup(&self) {
        let mut state = write_lock!(self.state);
        if let Some(run) = state.run.take() {
            if run.open_tasks() > 0 {
                log::warn!(
                    "Run {} ended with {} unfinished tasks",
                    run.name,
                    run.open_tasks()
                );
            }
        }
        state.run_name = generate_run_name();
    }

    fn active_run(state: &mut TrackerState) -> &mut Run {
        let name = state.run_name.clone();
        state.run.get_or_insert_with(|| {
            log::debug!("No active run, starting agentless run {name}");
            Run::new(&name, true)
        })
    }
}

impl TrackingFacade for Tracker {
    fn before_task(&self, owner: &str, method: &str, args: &[TaskValue]) {
        let mut state = write_lock!(self.state);
        Self::active_run(&mut state).enter(owner, method, args.to_vec());
    }

    fn after_task(&self, method: &str, result: &TaskValue) {
        let mut state = write_lock!(self.state);
        match state.run.as_mut().and_then(|run| run.close(method)) {
            Some(task) => {
                task.state = TaskState::Success;
                task.result = Some(result.clone());
            }
            None => log::debug!("afterTask for {method} without matching beforeTask"),
        }
    }

    fn error_task(&self, method: &str, error: &TaskError) {
        let mut state = write_lock!(self.state);
        match state.run.as_mut().and_then(|run| run.close(method)) {
            Some(task) => {
                task.state = TaskState::Failed;
                task.error = Some(error.clone());
            }
            None => log::debug!("errorTask for {method} without matching beforeTask"),
        }
    }
}
