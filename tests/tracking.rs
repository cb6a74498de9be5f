//! Run lifecycle and event correlation of the reference tracker.

use probeweave::tracking::{TaskError, TaskState, TaskValue, Tracker, TrackingFacade};

#[test]
fn run_name_changes_after_cleanup() {
    let tracker = Tracker::new();
    let first = tracker.run_name();
    tracker.start_run(None);
    tracker.cleanup();
    assert_ne!(tracker.run_name(), first);
    assert!(tracker.current_run().is_none());
}

#[test]
fn events_correlate_across_argument_rendering() {
    let tracker = Tracker::new();
    tracker.start_run(Some("etl"));
    tracker.before_task(
        "com.acme.Pipeline",
        "com.acme.Pipeline.execute(java.lang.String)",
        &[TaskValue::Str("input.csv".to_string())],
    );
    tracker.after_task("com.acme.Pipeline.execute(String)", &TaskValue::Int(12));

    let run = tracker.current_run().expect("explicit run");
    assert_eq!(run.name, "etl");
    assert!(!run.agentless);
    let task = run.task("com.acme.Pipeline.execute(").expect("task recorded");
    assert_eq!(task.state, TaskState::Success);
    assert_eq!(task.result, Some(TaskValue::Int(12)));
    assert_eq!(run.open_tasks(), 0);
}

#[test]
fn failures_are_recorded_and_other_tasks_stay_open() {
    let tracker = Tracker::new();
    tracker.before_task("a.Job", "a.Job.outer()", &[]);
    tracker.before_task("a.Job", "a.Job.inner(int)", &[TaskValue::Int(3)]);
    tracker.error_task(
        "a.Job.inner(int)",
        &TaskError::new("java.lang.IllegalStateException", Some("boom")),
    );

    let run = tracker.current_run().expect("agentless run");
    assert!(run.agentless);
    assert_eq!(run.task("a.Job.inner(").map(|t| t.state), Some(TaskState::Failed));
    assert_eq!(run.task("a.Job.outer(").map(|t| t.state), Some(TaskState::Running));
    assert_eq!(run.open_tasks(), 1);
}

#[test]
fn facade_is_usable_as_trait_object() {
    let tracker = Tracker::new();
    let facade: &dyn TrackingFacade = &tracker;
    facade.before_task("a.Job", "a.Job.run()", &[]);
    facade.after_task("a.Job.run()", &TaskValue::Null);
    assert_eq!(tracker.current_run().map(|r| r.tasks.len()), Some(1));
}
