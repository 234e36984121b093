use forklore::{Forklore, StrategyKind};
use std::collections::HashSet;

mod common;
use common::{DEADLOCK_TIMEOUT, Recorder, RendezvousTempo, expect_deadlock, watcher};

#[test]
fn test_left_right_table_deadlocks_in_one_round() {
    let seats = 5;
    let (harness, on_deadlock) = watcher();
    let (recorder, observer) = Recorder::new();

    // The rendezvous tempo makes every seat hold its left fork before
    // any seat reaches for its right, so the circular wait is certain
    let _dinner = Forklore::new()
        .seats(seats)
        .strategy(StrategyKind::LeftRight)
        .tempo(RendezvousTempo::new(seats))
        .observer(observer)
        .on_deadlock(on_deadlock)
        .serve()
        .expect("Failed to start dinner");

    let info = expect_deadlock(&harness, DEADLOCK_TIMEOUT);

    // The cycle spans the whole table, every thread exactly once
    assert_eq!(
        info.thread_cycle.len(),
        seats,
        "Deadlock should involve all {seats} philosophers"
    );
    let threads: HashSet<_> = info.thread_cycle.iter().copied().collect();
    assert_eq!(threads.len(), seats, "Cycle must not repeat a thread");

    // Every member is blocked on a distinct fork lock
    assert_eq!(info.waiting_for.len(), seats);
    for (_, name) in &info.waiting_for {
        assert!(name.starts_with("fork_"), "Unexpected lock name {name}");
    }
    let names: HashSet<_> = info
        .waiting_for
        .iter()
        .map(|(_, name)| name.clone())
        .collect();
    assert_eq!(names.len(), seats, "Every seat waits on a distinct fork");

    // Each seat reported exactly its first fork as held, and nothing
    // was ever reported free
    let events = recorder.snapshot();
    assert_eq!(events.len(), seats, "One held report per seat, no more");
    assert!(events.iter().all(|e| e.owner.is_some()));
    let held: HashSet<_> = events.iter().map(|e| e.fork).collect();
    assert_eq!(held.len(), seats, "All forks end up held");
    let owners: HashSet<_> = events
        .iter()
        .filter_map(|e| e.owner.map(|o| o.seat))
        .collect();
    assert_eq!(owners.len(), seats, "All seats end up holding a fork");

    println!("Test complete - philosophers are intentionally left running in a deadlock.");
}

#[test]
fn test_minimum_ring_of_two_deadlocks() {
    let (harness, on_deadlock) = watcher();

    let _dinner = Forklore::new()
        .seats(2)
        .strategy(StrategyKind::LeftRight)
        .tempo(RendezvousTempo::new(2))
        .on_deadlock(on_deadlock)
        .serve()
        .expect("Failed to start dinner");

    let info = expect_deadlock(&harness, DEADLOCK_TIMEOUT);
    assert_eq!(info.thread_cycle.len(), 2);
    assert_eq!(info.waiting_for.len(), 2);

    println!("Test complete - philosophers are intentionally left running in a deadlock.");
}
