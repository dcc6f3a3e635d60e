//! Minimal host loop: a frame pump, the core signal bus, and a work queue
//! splitting a checksum across worker threads.
//!
//! Run with `RUST_LOG=debug cargo run --example frame_loop` to see the
//! queue's logging.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use vermilion_core::{CoreSignals, FramePump};
use vermilion_tasks::WorkQueue;

fn main() {
    env_logger::init();

    let signals = CoreSignals::new();
    let mut pump = FramePump::new();

    let mut queue = WorkQueue::new();
    queue.start_threads(3);
    let queue = Rc::new(queue);

    // Per-frame hook: cooperative drain (no-op with workers) and purge.
    let _frame = {
        let queue = Rc::clone(&queue);
        signals
            .begin_frame
            .connect(move |frame| queue.begin_frame(frame))
    };
    let _completed = queue
        .item_completed()
        .connect(|done| println!("completed item {} (priority {})", done.id, done.priority));

    // Checksum a large buffer in 8 chunks.
    let data: Vec<u64> = (0..1_000_000).collect();
    let data = Arc::new(data);
    let sum = Arc::new(AtomicU64::new(0));

    for (i, chunk_range) in (0..8usize).map(|i| (i, i * 125_000..(i + 1) * 125_000)) {
        let mut item = queue.get_free_item();
        item.priority = i as u32;
        item.send_event = true;
        let data = Arc::clone(&data);
        let sum = Arc::clone(&sum);
        item.set_work(move |thread| {
            let partial: u64 = data[chunk_range].iter().sum();
            sum.fetch_add(partial, Ordering::Relaxed);
            log::debug!("chunk {i} summed on thread {thread}");
        });
        queue.add_work_item(item);
    }

    // Join-barrier, then a frame to purge and fire the completion events.
    queue.complete(0);
    pump.run_frame(&signals);

    println!(
        "checksum = {} after frame {}",
        sum.load(Ordering::Relaxed),
        pump.frame_number()
    );
}
