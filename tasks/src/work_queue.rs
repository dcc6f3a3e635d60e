//! Multi-producer, multi-worker priority work queue.
//!
//! [`WorkQueue`] executes independent tasks across zero or more worker
//! threads, integrated with a single-threaded frame loop:
//!
//! - submitters obtain a descriptor from the pool
//!   ([`get_free_item`](WorkQueue::get_free_item)), fill it in, and submit
//!   it ([`add_work_item`](WorkQueue::add_work_item));
//! - worker threads (and the main thread inside
//!   [`complete`](WorkQueue::complete)) always claim the current
//!   highest-priority pending item, FIFO within equal priority;
//! - [`complete`](WorkQueue::complete) is a join-barrier: on return, no
//!   item at or above the threshold is unfinished;
//! - with zero workers, [`begin_frame`](WorkQueue::begin_frame) drains the
//!   queue cooperatively on the main thread under a millisecond budget,
//!   once per frame.
//!
//! Completions are announced on the [`item_completed`](WorkQueue::item_completed)
//! signal during the purge pass, never mid-frame from a worker thread.
//!
//! All shared state sits behind a single mutex; workers park on a condition
//! variable while the queue is paused or empty, and the barrier waits on a
//! second condition variable for in-flight items. Contention is queue-wide
//! by design.
//!
//! # Example
//!
//! ```
//! use vermilion_tasks::WorkQueue;
//!
//! let queue = WorkQueue::new(); // zero workers: synchronous drain
//! let mut item = queue.get_free_item();
//! item.priority = 1;
//! item.set_work(|_thread| println!("hello"));
//! queue.add_work_item(item);
//! queue.complete(0);
//! assert!(queue.is_completed(0));
//! ```

use std::collections::{BinaryHeap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use vermilion_core::frame::BeginFrame;
use vermilion_core::signal::Signal;

use crate::work_item::{WorkFn, WorkHandle, WorkItem, WorkItemCompleted, WorkItemId};

/// Thread index reported to callables run on the main thread.
pub const MAIN_THREAD_INDEX: usize = 0;

/// Default time budget for the no-worker cooperative drain in
/// [`WorkQueue::begin_frame`].
pub const DEFAULT_NON_THREADED_WORK_MS: u64 = 5;

/// Default headroom the descriptor pool may grow by between frames before
/// [`WorkQueue::begin_frame`] shrinks it.
pub const DEFAULT_POOL_TOLERANCE: usize = 10;

/// A submitted, not-yet-claimed item.
struct Pending {
    id: WorkItemId,
    priority: u32,
    work: WorkFn,
    send_event: bool,
    completed: Arc<AtomicBool>,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.id == other.id
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    /// Max-heap order: highest priority first, then lowest sequence number
    /// (FIFO within equal priority).
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            .then(other.id.cmp(&self.id))
    }
}

/// An executed item awaiting the purge pass.
struct Finished {
    id: WorkItemId,
    priority: u32,
    send_event: bool,
}

struct QueueState {
    /// Unclaimed items, claimed in priority order.
    pending: BinaryHeap<Pending>,
    /// Priorities of items currently executing on some thread.
    executing: Vec<u32>,
    /// Executed items not yet purged (events not yet fired).
    finished: Vec<Finished>,
    /// Recycled descriptors handed back out by `get_free_item`.
    pool: VecDeque<WorkItem>,
    /// Pool size observed by the previous frame's shrink pass.
    last_pool_size: usize,
    paused: bool,
    shutting_down: bool,
    next_id: u64,
}

struct Shared {
    state: Mutex<QueueState>,
    /// Signalled when pending work may be claimable (submit/resume).
    work_available: Condvar,
    /// Signalled when an in-flight item finishes (barrier progress).
    work_finished: Condvar,
}

impl Shared {
    /// Runs a claimed task outside the lock, then records its completion.
    ///
    /// The bookkeeping runs even if the callable panics (via the drop
    /// guard), so a concurrent [`WorkQueue::complete`] waiting on
    /// `work_finished` cannot wedge on the orphaned `executing` entry.
    fn run_task(&self, task: Pending, thread_index: usize) {
        let Pending {
            id,
            priority,
            work,
            send_event,
            completed,
        } = task;

        struct FinishGuard<'a> {
            shared: &'a Shared,
            id: WorkItemId,
            priority: u32,
            send_event: bool,
        }

        impl Drop for FinishGuard<'_> {
            fn drop(&mut self) {
                let mut state = self.shared.state.lock();
                if let Some(pos) = state.executing.iter().position(|&p| p == self.priority) {
                    state.executing.swap_remove(pos);
                }
                state.finished.push(Finished {
                    id: self.id,
                    priority: self.priority,
                    send_event: self.send_event,
                });
                drop(state);
                self.shared.work_finished.notify_all();
            }
        }

        let guard = FinishGuard {
            shared: self,
            id,
            priority,
            send_event,
        };
        work(thread_index);
        completed.store(true, Ordering::Release);
        drop(guard);
    }
}

/// Worker thread body: claim the highest-priority pending item, run it, and
/// park while the queue is paused or empty.
fn worker_loop(shared: Arc<Shared>, thread_index: usize) {
    log::debug!("worker thread {thread_index} started");
    let mut state = shared.state.lock();
    loop {
        if state.shutting_down {
            break;
        }
        if state.paused || state.pending.is_empty() {
            shared.work_available.wait(&mut state);
            continue;
        }
        let task = state.pending.pop().expect("pending checked non-empty");
        state.executing.push(task.priority);
        drop(state);
        shared.run_task(task, thread_index);
        state = shared.state.lock();
    }
    log::debug!("worker thread {thread_index} exiting");
}

/// Priority work queue with frame-synchronized draining and descriptor
/// pooling.
///
/// The queue front-end lives on the main/application thread (it owns the
/// completion [`Signal`], which is single-threaded); worker threads touch
/// only the locked shared state. The host wires
/// [`begin_frame`](Self::begin_frame) to its
/// [`CoreSignals::begin_frame`](vermilion_core::CoreSignals) once per frame.
pub struct WorkQueue {
    shared: Arc<Shared>,
    threads: Vec<thread::JoinHandle<()>>,
    item_completed: Signal<WorkItemCompleted>,
    non_threaded_work_ms: u64,
    pool_tolerance: usize,
}

impl WorkQueue {
    /// Creates a queue with no worker threads. The queue starts paused;
    /// submitting work unpauses it.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    pending: BinaryHeap::new(),
                    executing: Vec::new(),
                    finished: Vec::new(),
                    pool: VecDeque::new(),
                    last_pool_size: 0,
                    paused: true,
                    shutting_down: false,
                    next_id: 0,
                }),
                work_available: Condvar::new(),
                work_finished: Condvar::new(),
            }),
            threads: Vec::new(),
            item_completed: Signal::new(),
            non_threaded_work_ms: DEFAULT_NON_THREADED_WORK_MS,
            pool_tolerance: DEFAULT_POOL_TOLERANCE,
        }
    }

    /// One-time spawn of `count` worker threads (indices `1..=count`).
    ///
    /// A second call, or a call after threads already exist, is a logged
    /// no-op. With zero workers the queue degenerates to synchronous
    /// main-thread execution inside [`complete`](Self::complete) and
    /// [`begin_frame`](Self::begin_frame).
    pub fn start_threads(&mut self, count: usize) {
        if !self.threads.is_empty() {
            log::warn!("WorkQueue worker threads already started, ignoring start_threads");
            return;
        }
        for i in 0..count {
            let shared = Arc::clone(&self.shared);
            let index = i + 1;
            let spawned = thread::Builder::new()
                .name(format!("vermilion-worker-{index}"))
                .spawn(move || worker_loop(shared, index));
            match spawned {
                Ok(handle) => self.threads.push(handle),
                Err(err) => {
                    log::error!("failed to spawn worker thread {index}: {err}");
                    break;
                }
            }
        }
        log::debug!("work queue running with {} worker thread(s)", self.threads.len());
    }

    /// Number of spawned worker threads.
    pub fn num_threads(&self) -> usize {
        self.threads.len()
    }

    /// Returns a blank descriptor, recycled from the pool when available.
    pub fn get_free_item(&self) -> WorkItem {
        self.shared
            .state
            .lock()
            .pool
            .pop_front()
            .unwrap_or_default()
    }

    /// Submits a filled-in descriptor for execution.
    ///
    /// Returns a handle for completion observation and cancellation, or
    /// `None` if the item has no callable (logged, non-fatal). Submission
    /// unpauses the queue and wakes a worker.
    pub fn add_work_item(&self, mut item: WorkItem) -> Option<WorkHandle> {
        let Some(work) = item.work.take() else {
            log::warn!("ignoring work item submitted without a callable");
            return None;
        };

        let handle = {
            let mut state = self.shared.state.lock();
            let id = WorkItemId(state.next_id);
            state.next_id += 1;
            let completed = Arc::new(AtomicBool::new(false));
            state.pending.push(Pending {
                id,
                priority: item.priority,
                work,
                send_event: item.send_event,
                completed: Arc::clone(&completed),
            });
            state.paused = false;
            WorkHandle { id, completed }
        };
        self.shared.work_available.notify_one();
        Some(handle)
    }

    /// Cancels a submitted item if it is still unclaimed.
    ///
    /// Returns `true` on success; claimed or already-executed items cannot
    /// be cancelled. Cancelled items fire no completion event.
    pub fn remove_work_item(&self, handle: &WorkHandle) -> bool {
        self.remove_ids(std::slice::from_ref(&handle.id)) == 1
    }

    /// Bulk form of [`remove_work_item`](Self::remove_work_item); returns
    /// how many items were removed.
    pub fn remove_work_items(&self, handles: &[WorkHandle]) -> usize {
        let ids: Vec<WorkItemId> = handles.iter().map(|h| h.id).collect();
        self.remove_ids(&ids)
    }

    fn remove_ids(&self, ids: &[WorkItemId]) -> usize {
        let mut state = self.shared.state.lock();
        let before = state.pending.len();
        let drained = std::mem::take(&mut state.pending).into_vec();
        let mut kept = Vec::with_capacity(drained.len());
        for task in drained {
            if ids.contains(&task.id) {
                // Cancelled before running: descriptor back to the pool,
                // no completion event.
                state.pool.push_back(WorkItem::default());
            } else {
                kept.push(task);
            }
        }
        state.pending = BinaryHeap::from(kept);
        before - state.pending.len()
    }

    /// Suspends worker execution without discarding queued state. Items
    /// already claimed still run to completion.
    pub fn pause(&self) {
        self.shared.state.lock().paused = true;
    }

    /// Resumes worker execution.
    pub fn resume(&self) {
        self.shared.state.lock().paused = false;
        self.shared.work_available.notify_all();
    }

    /// Returns `true` when no item at or above `priority` is pending or
    /// executing.
    pub fn is_completed(&self, priority: u32) -> bool {
        let state = self.shared.state.lock();
        !state.pending.iter().any(|p| p.priority >= priority)
            && !state.executing.iter().any(|&p| p >= priority)
    }

    /// Number of unclaimed items.
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Number of pooled (recycled) descriptors.
    pub fn pool_size(&self) -> usize {
        self.shared.state.lock().pool.len()
    }

    /// Blocking join-barrier: on return, every item at or above `priority`
    /// has executed and been purged (events fired).
    ///
    /// Resumes workers, claims at-or-above-threshold items on the calling
    /// thread (always the current maximum-priority item) interleaved with
    /// worker progress, and blocks until in-flight items at the threshold
    /// finish. With zero workers this is fully synchronous, strictly
    /// priority-ordered execution. Re-pauses workers if the queue is fully
    /// drained afterwards.
    pub fn complete(&self, priority: u32) {
        {
            let mut state = self.shared.state.lock();
            state.paused = false;
        }
        self.shared.work_available.notify_all();

        loop {
            let mut state = self.shared.state.lock();
            let claimable = state
                .pending
                .peek()
                .is_some_and(|p| p.priority >= priority);
            if claimable {
                let task = state.pending.pop().expect("peek checked non-empty");
                state.executing.push(task.priority);
                drop(state);
                self.shared.run_task(task, MAIN_THREAD_INDEX);
                continue;
            }
            if state.executing.iter().any(|&p| p >= priority) {
                // Workers still own items at this priority; wait for one to
                // finish, then re-check (it may have submitted more work).
                self.shared.work_finished.wait(&mut state);
                continue;
            }
            break;
        }

        self.purge_completed(priority);

        let mut state = self.shared.state.lock();
        if state.pending.is_empty() && state.executing.is_empty() {
            state.paused = true;
        }
    }

    /// Per-frame hook; the host connects this to
    /// [`CoreSignals::begin_frame`](vermilion_core::CoreSignals).
    ///
    /// With no worker threads, executes pending items (highest priority
    /// first) on the calling thread for up to the configured millisecond
    /// budget. Then purges all completed items (firing their events) and
    /// shrinks an over-grown descriptor pool.
    pub fn begin_frame(&self, _frame: &BeginFrame) {
        if self.threads.is_empty() {
            let deadline = Instant::now() + Duration::from_millis(self.non_threaded_work_ms);
            while Instant::now() < deadline {
                let task = {
                    let mut state = self.shared.state.lock();
                    match state.pending.pop() {
                        Some(task) => {
                            state.executing.push(task.priority);
                            task
                        }
                        None => break,
                    }
                };
                self.shared.run_task(task, MAIN_THREAD_INDEX);
            }
        }
        self.purge_completed(0);
        self.purge_pool();
    }

    /// The per-item completion broadcast, fired during purge for items
    /// submitted with `send_event`.
    pub fn item_completed(&self) -> &Signal<WorkItemCompleted> {
        &self.item_completed
    }

    /// Sets the cooperative-drain time budget used by
    /// [`begin_frame`](Self::begin_frame) when no worker threads exist.
    pub fn set_non_threaded_work_time(&mut self, ms: u64) {
        self.non_threaded_work_ms = ms;
    }

    /// Sets how far the descriptor pool may grow between frames before
    /// [`begin_frame`](Self::begin_frame) shrinks it.
    pub fn set_pool_tolerance(&mut self, tolerance: usize) {
        self.pool_tolerance = tolerance;
    }

    /// Removes executed items at or above `floor` from the finished list,
    /// fires their completion events, and returns their descriptors to the
    /// pool. Items below the floor are left untouched so their side effects
    /// (event listeners mutating engine state) do not run mid-render.
    fn purge_completed(&self, floor: u32) {
        let purged: Vec<Finished> = {
            let mut state = self.shared.state.lock();
            let (purged, kept): (Vec<_>, Vec<_>) =
                state.finished.drain(..).partition(|f| f.priority >= floor);
            state.finished = kept;
            for _ in 0..purged.len() {
                state.pool.push_back(WorkItem::default());
            }
            purged
        };
        // Emit outside the lock: listeners may call back into the queue.
        for finished in purged {
            if finished.send_event {
                self.item_completed.emit(&WorkItemCompleted {
                    id: finished.id,
                    priority: finished.priority,
                });
            }
        }
    }

    /// Shrinks the descriptor pool toward its last-observed size when it has
    /// grown past the configured tolerance, bounding idle memory.
    fn purge_pool(&self) {
        let mut state = self.shared.state.lock();
        let max_allowed = state.last_pool_size + self.pool_tolerance;
        if state.pool.len() > max_allowed {
            state.pool.truncate(max_allowed);
        }
        state.last_pool_size = state.pool.len();
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutting_down = true;
        }
        self.shared.work_available.notify_all();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("WorkQueue")
            .field("threads", &self.threads.len())
            .field("pending", &state.pending.len())
            .field("executing", &state.executing.len())
            .field("finished", &state.finished.len())
            .field("pool", &state.pool.len())
            .field("paused", &state.paused)
            .finish()
    }
}
