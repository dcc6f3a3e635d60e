//! Host wiring of the work queue into the frame loop: the queue's
//! `begin_frame` hook subscribes to `CoreSignals::begin_frame`, so one
//! `FramePump::run_frame` call drains the no-thread queue and fires
//! completion events.

use std::cell::RefCell;
use std::rc::Rc;

use vermilion_core::{CoreSignals, FramePump};
use vermilion_tasks::WorkQueue;

#[test]
fn frame_pump_drives_cooperative_drain() {
    let signals = CoreSignals::new();
    let mut pump = FramePump::new();

    let mut queue = WorkQueue::new();
    queue.set_non_threaded_work_time(100);
    let queue = Rc::new(queue);

    // Subscribe the queue to the frame boundary, the way a host engine does.
    let frame_conn = {
        let queue = Rc::clone(&queue);
        signals.begin_frame.connect(move |frame| queue.begin_frame(frame))
    };

    let completions = Rc::new(RefCell::new(Vec::new()));

    let c = Rc::clone(&completions);
    let done_conn = queue
        .item_completed()
        .connect(move |done| c.borrow_mut().push(done.priority));

    let log = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    for priority in [3u32, 9, 6] {
        let mut item = queue.get_free_item();
        item.priority = priority;
        item.send_event = true;
        let log = std::sync::Arc::clone(&log);
        item.set_work(move |_| log.lock().push(priority));
        queue.add_work_item(item).expect("item has a callable");
    }

    pump.run_frame(&signals);

    // Executed highest-priority first, all purged, all events fired.
    assert_eq!(*log.lock(), vec![9, 6, 3]);
    assert!(queue.is_completed(0));
    assert_eq!(*completions.borrow(), vec![9, 6, 3]);

    // A second frame with nothing queued is a quiet no-op.
    pump.run_frame(&signals);
    assert_eq!(pump.frame_number(), 2);

    drop(done_conn);
    drop(frame_conn);
}

#[test]
fn disconnected_queue_stops_receiving_frames() {
    let signals = CoreSignals::new();
    let mut pump = FramePump::new();

    let mut queue = WorkQueue::new();
    queue.set_non_threaded_work_time(100);
    let queue = Rc::new(queue);

    let frame_conn = {
        let queue = Rc::clone(&queue);
        signals.begin_frame.connect(move |frame| queue.begin_frame(frame))
    };
    drop(frame_conn); // host tears the subsystem down

    let log = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let mut item = queue.get_free_item();
    item.priority = 1;
    let l = std::sync::Arc::clone(&log);
    item.set_work(move |_| l.lock().push(1));
    queue.add_work_item(item).expect("item has a callable");

    pump.run_frame(&signals);
    assert!(log.lock().is_empty());
    assert_eq!(queue.pending_count(), 1);
}
