//! Work item descriptors and submission handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The callable of a work item. Receives the index of the executing thread:
/// 0 is the main thread, worker threads count from 1.
pub type WorkFn = Box<dyn FnOnce(usize) + Send>;

/// A unit of schedulable work: a callable plus priority and completion
/// metadata.
///
/// Obtain one from [`WorkQueue::get_free_item`](crate::WorkQueue::get_free_item)
/// (recycled from the descriptor pool when possible), fill it in, and submit
/// it with [`WorkQueue::add_work_item`](crate::WorkQueue::add_work_item).
/// Submission consumes the descriptor, so one item cannot be submitted
/// twice. After the executed item is purged, its descriptor returns to the
/// pool with every field reset to defaults.
///
/// Arguments travel by closure capture; there are no side-channel data
/// pointers.
pub struct WorkItem {
    pub(crate) work: Option<WorkFn>,
    /// Scheduling priority; higher runs first. Defaults to `u32::MAX`.
    pub priority: u32,
    /// Whether a completion event fires on
    /// [`WorkQueue::item_completed`](crate::WorkQueue::item_completed) when
    /// the executed item is purged. Defaults to `false`.
    pub send_event: bool,
}

impl WorkItem {
    /// Sets the callable to run when the item is scheduled.
    pub fn set_work(&mut self, work: impl FnOnce(usize) + Send + 'static) {
        self.work = Some(Box::new(work));
    }

    /// Returns `true` if a callable has been set.
    pub fn has_work(&self) -> bool {
        self.work.is_some()
    }
}

impl Default for WorkItem {
    fn default() -> Self {
        Self {
            work: None,
            priority: u32::MAX,
            send_event: false,
        }
    }
}

impl std::fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkItem")
            .field("has_work", &self.has_work())
            .field("priority", &self.priority)
            .field("send_event", &self.send_event)
            .finish()
    }
}

/// Identity of a submitted work item: a queue-wide monotonic sequence
/// number. Doubles as the FIFO tie-break between equal-priority items.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct WorkItemId(pub(crate) u64);

impl std::fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a submitted work item.
///
/// Lets the submitter observe completion from any thread and request
/// cancellation while the item is still unclaimed.
#[derive(Clone)]
pub struct WorkHandle {
    pub(crate) id: WorkItemId,
    pub(crate) completed: Arc<AtomicBool>,
}

impl WorkHandle {
    /// The submitted item's identity.
    pub fn id(&self) -> WorkItemId {
        self.id
    }

    /// Returns `true` once the item's callable has finished executing.
    ///
    /// This flips before the item is purged; use
    /// [`WorkQueue::complete`](crate::WorkQueue::complete) for a barrier.
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for WorkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkHandle")
            .field("id", &self.id)
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// Payload of [`WorkQueue::item_completed`](crate::WorkQueue::item_completed),
/// fired during the purge pass for items submitted with `send_event`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WorkItemCompleted {
    /// Identity of the finished item.
    pub id: WorkItemId,
    /// Priority the item ran at.
    pub priority: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_pool_hygienic() {
        let item = WorkItem::default();
        assert!(!item.has_work());
        assert_eq!(item.priority, u32::MAX);
        assert!(!item.send_event);
    }

    #[test]
    fn debug_omits_callable() {
        let mut item = WorkItem::default();
        item.set_work(|_| {});
        let text = format!("{item:?}");
        assert!(text.contains("has_work: true"));
    }

    #[test]
    fn id_display() {
        assert_eq!(WorkItemId(7).to_string(), "#7");
    }
}
