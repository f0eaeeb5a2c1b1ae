// ABOUTME: Integration tests for combinator task trees under the runner
// ABOUTME: Covers parallel wait modes, loops, branches, and progress shape

use tickflow::builder::{all_of, any_of, branch, repeat_until, sequence, steps, tracked};
use tickflow::{Runner, TaskStatus};

mod common;
use common::{counter, counting_task, frames_task, init_tracing, tick_until_settled};

#[test]
fn test_parallel_all_completes_with_slowest_child() {
    init_tracing();
    let mut runner = Runner::new();
    let group = all_of(vec![frames_task(3), frames_task(5)]);
    let probe = group.clone();
    runner.submit(group).unwrap();

    let ticks = tick_until_settled(&mut runner, 0.0, 20);
    assert_eq!(ticks, 5);
    assert_eq!(probe.status(), TaskStatus::Completed);
}

#[test]
fn test_parallel_any_completes_with_fastest_child() {
    init_tracing();
    let mut runner = Runner::new();
    let fast = frames_task(3);
    let slow = frames_task(5);
    let slow_probe = slow.clone();
    let group = any_of(vec![fast, slow]);
    let probe = group.clone();
    runner.submit(group).unwrap();

    let ticks = tick_until_settled(&mut runner, 0.0, 20);
    assert_eq!(ticks, 3);
    assert_eq!(probe.status(), TaskStatus::Completed);
    // the loser is not cancelled; it stays owned and re-usable
    assert_eq!(slow_probe.status(), TaskStatus::Running);
}

#[test]
fn test_parallel_progress_is_mean_of_children() {
    init_tracing();
    let (a, gauge_a) = tracked();
    let (b, gauge_b) = tracked();
    let group = all_of(vec![a, b]);
    let probe = group.clone();
    let mut runner = Runner::new();
    runner.submit(group).unwrap();

    gauge_a.set(0.5);
    runner.tick(0.0);
    assert!((probe.progress() - 0.25).abs() < 1e-3);

    gauge_b.set(0.5);
    runner.tick(0.0);
    assert!((probe.progress() - 0.5).abs() < 1e-3);
}

#[test]
fn test_repeat_until_stops_on_predicate() {
    init_tracing();
    let hits = counter();
    let probe = std::rc::Rc::clone(&hits);
    let task = repeat_until(counting_task(&hits), move || probe.get() >= 3);
    let task_probe = task.clone();

    let mut runner = Runner::new();
    runner.submit(task).unwrap();
    tick_until_settled(&mut runner, 0.0, 20);

    assert_eq!(hits.get(), 3);
    assert_eq!(task_probe.status(), TaskStatus::Completed);
}

#[test]
fn test_nested_combinators_settle() {
    init_tracing();
    let log = counter();
    let stage_one = all_of(vec![counting_task(&log), counting_task(&log)]);
    let stage_two = branch(|| true, counting_task(&log), counting_task(&log));
    let tree = sequence(vec![stage_one, stage_two]);
    let probe = tree.clone();

    let mut runner = Runner::new();
    runner.submit(tree).unwrap();
    tick_until_settled(&mut runner, 0.0, 20);

    // both parallel children plus the selected branch
    assert_eq!(log.get(), 3);
    assert_eq!(probe.status(), TaskStatus::Completed);
}

#[test]
fn test_stepwise_source_advances_one_item_per_tick() {
    init_tracing();
    let collected = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = std::rc::Rc::clone(&collected);
    let task = steps(move || {
        let sink = std::rc::Rc::clone(&sink);
        (1..=3).map(move |item| sink.borrow_mut().push(item))
    });
    let probe = task.clone();

    let mut runner = Runner::new();
    runner.submit(task).unwrap();

    runner.tick(0.0);
    assert_eq!(*collected.borrow(), vec![1]);
    let ticks = tick_until_settled(&mut runner, 0.0, 20);
    assert_eq!(*collected.borrow(), vec![1, 2, 3]);
    // two remaining items plus the exhausted step
    assert_eq!(ticks, 3);
    assert_eq!(probe.status(), TaskStatus::Completed);
}

#[test]
fn test_sequence_cancels_after_child_retries_exhausted() {
    init_tracing();
    let attempts = counter();
    let probe_attempts = std::rc::Rc::clone(&attempts);
    let doomed = tickflow::builder::run_fallible(move || {
        probe_attempts.set(probe_attempts.get() + 1);
        anyhow::bail!("never works");
    })
    .with_retry(1);
    let unreached = counter();
    let seq = doomed.clone().then(counting_task(&unreached));
    let seq_probe = seq.clone();

    let mut runner = Runner::new();
    runner.submit(seq).unwrap();
    tick_until_settled(&mut runner, 0.0, 20);

    // initial attempt plus one retry, observed by the sequence only after
    // the budget is spent
    assert_eq!(attempts.get(), 2);
    assert_eq!(doomed.status(), TaskStatus::Failed);
    assert_eq!(unreached.get(), 0);
    assert_eq!(seq_probe.status(), TaskStatus::Cancelled);
}

#[test]
fn test_progress_events_fire_with_debounce() {
    init_tracing();
    let reports = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = std::rc::Rc::clone(&reports);
    let task = tickflow::builder::wait(1.0).on_progress(move |_, progress| {
        sink.borrow_mut().push(progress);
    });

    let mut runner = Runner::new();
    runner.submit(task).unwrap();
    runner.tick(0.5);
    runner.tick(0.5);

    let seen = reports.borrow();
    assert!(!seen.is_empty());
    // progress never decreases within a run
    for pair in seen.windows(2) {
        assert!(pair[1] >= pair[0]);
    }
    assert_eq!(*seen.last().unwrap(), 1.0);
}

#[test]
fn test_cancelling_parent_leaves_children_resettable() {
    init_tracing();
    let child = frames_task(100);
    let group = all_of(vec![child.clone()]);
    let mut runner = Runner::new();
    let id = group.id();
    runner.submit(group).unwrap();
    runner.tick(0.0);

    runner.cancel(id).unwrap();
    assert_eq!(child.status(), TaskStatus::Running);

    child.reset();
    assert_eq!(child.status(), TaskStatus::Pending);
}
