//! Cross-thread properties of the work queue: exactly-once execution,
//! barrier semantics, and shutdown under real worker threads.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use vermilion_tasks::WorkQueue;

/// Polls `predicate` for up to five seconds.
fn wait_until(predicate: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    predicate()
}

#[test]
fn each_item_executes_exactly_once_under_workers() {
    const ITEMS: usize = 200;
    const WORKERS: usize = 4;

    let mut queue = WorkQueue::new();
    queue.start_threads(WORKERS);
    assert_eq!(queue.num_threads(), WORKERS);

    let counters: Vec<Arc<AtomicU32>> =
        (0..ITEMS).map(|_| Arc::new(AtomicU32::new(0))).collect();

    for (i, counter) in counters.iter().enumerate() {
        let mut item = queue.get_free_item();
        item.priority = (i % 7) as u32;
        let counter = Arc::clone(counter);
        item.set_work(move |_thread| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        queue.add_work_item(item).expect("item has a callable");
    }

    queue.complete(0);

    for counter in &counters {
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }
    assert!(queue.is_completed(0));
    assert_eq!(queue.pending_count(), 0);
}

#[test]
fn complete_is_a_join_barrier() {
    let mut queue = WorkQueue::new();
    queue.start_threads(2);

    let mut handles = Vec::new();
    for i in 0..32u32 {
        let mut item = queue.get_free_item();
        item.priority = i % 3 + 4;
        item.set_work(move |_| {
            // Small, uneven amounts of work.
            std::thread::sleep(Duration::from_micros(u64::from(i % 5) * 100));
        });
        handles.push(queue.add_work_item(item).expect("item has a callable"));
    }

    queue.complete(4);
    for handle in &handles {
        assert!(handle.is_completed());
    }
}

#[test]
fn workers_drain_submissions_without_a_barrier() {
    let mut queue = WorkQueue::new();
    queue.start_threads(2);

    let counter = Arc::new(AtomicU32::new(0));
    let mut handles = Vec::new();
    for _ in 0..16 {
        let mut item = queue.get_free_item();
        item.priority = 1;
        let counter = Arc::clone(&counter);
        item.set_work(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        handles.push(queue.add_work_item(item).expect("item has a callable"));
    }

    // Submission alone unpauses the workers; no complete() needed.
    assert!(wait_until(|| handles.iter().all(|h| h.is_completed())));
    assert_eq!(counter.load(Ordering::Relaxed), 16);
}

#[test]
fn thread_indices_stay_in_range() {
    let mut queue = WorkQueue::new();
    queue.start_threads(3);

    let saw_bad_index = Arc::new(AtomicU32::new(0));
    for _ in 0..64 {
        let mut item = queue.get_free_item();
        item.priority = 1;
        let saw_bad_index = Arc::clone(&saw_bad_index);
        item.set_work(move |thread_index| {
            // Indices 1..=3 belong to workers; 0 is reserved for the main
            // thread, which also claims items inside complete().
            if thread_index > 3 {
                saw_bad_index.fetch_add(1, Ordering::Relaxed);
            }
        });
        queue.add_work_item(item).expect("item has a callable");
    }
    queue.complete(0);
    assert_eq!(saw_bad_index.load(Ordering::Relaxed), 0);
}

#[test]
fn start_threads_twice_is_a_noop() {
    let mut queue = WorkQueue::new();
    queue.start_threads(2);
    queue.start_threads(8);
    assert_eq!(queue.num_threads(), 2);
}

#[test]
fn drop_joins_idle_workers() {
    let mut queue = WorkQueue::new();
    queue.start_threads(4);
    // Dropping with parked workers must wake and join them without hanging.
    drop(queue);
}

#[test]
fn drop_after_work_joins_cleanly() {
    let mut queue = WorkQueue::new();
    queue.start_threads(2);

    let counter = Arc::new(AtomicU32::new(0));
    for _ in 0..8 {
        let mut item = queue.get_free_item();
        item.priority = 2;
        let counter = Arc::clone(&counter);
        item.set_work(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        queue.add_work_item(item).expect("item has a callable");
    }
    queue.complete(0);
    drop(queue);
    assert_eq!(counter.load(Ordering::Relaxed), 8);
}

#[test]
fn pause_resume_complete_does_not_deadlock() {
    let mut queue = WorkQueue::new();
    queue.start_threads(2);

    queue.pause();
    let counter = Arc::new(AtomicU32::new(0));
    for _ in 0..4 {
        let mut item = queue.get_free_item();
        item.priority = 1;
        let counter = Arc::clone(&counter);
        item.set_work(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        queue.add_work_item(item).expect("item has a callable");
    }
    queue.resume();
    queue.complete(0);
    assert_eq!(counter.load(Ordering::Relaxed), 4);
}
