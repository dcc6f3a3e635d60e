//! # Vermilion Tasks
//!
//! Priority work queue for the Vermilion engine.
//!
//! ## Core Types
//!
//! - [`WorkQueue`] — multi-producer, multi-worker priority task queue with
//!   frame-synchronized draining and descriptor pooling
//! - [`WorkItem`] — pooled task descriptor (callable, priority, event flag)
//! - [`WorkHandle`] — completion observation and cancellation for one
//!   submitted item
//! - [`WorkItemCompleted`] — payload of the per-item completion signal
//!
//! Frame integration goes through
//! [`vermilion_core::CoreSignals`]: the host connects
//! [`WorkQueue::begin_frame`] to the `begin_frame` signal so the queue can
//! run its cooperative no-thread drain and pool maintenance once per frame.
//!
//! See `DESIGN.md` at the workspace root for architecture decisions.

mod work_item;
mod work_queue;

pub use work_item::{WorkFn, WorkHandle, WorkItem, WorkItemCompleted, WorkItemId};
pub use work_queue::{
    WorkQueue, DEFAULT_NON_THREADED_WORK_MS, DEFAULT_POOL_TOLERANCE, MAIN_THREAD_INDEX,
};
