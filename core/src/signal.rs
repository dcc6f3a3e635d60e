//! Typed multicast signals with RAII connection tokens.
//!
//! [`Signal<T>`] is the engine's publish/subscribe primitive: any number of
//! listeners connect to a signal, and [`emit`](Signal::emit) invokes each of
//! them in connection order with the same payload. Subsystems use signals to
//! observe each other (frame boundaries, task completion, device loss)
//! without holding direct references.
//!
//! Connecting returns a [`Connection`] token. Dropping the token — or the
//! [`Observer`] that tracks it — disconnects the listener, and dropping the
//! signal first makes the token inert, so teardown is safe in either order
//! and neither side can dangle.
//!
//! # Example
//!
//! ```
//! use vermilion_core::Signal;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let fired = Rc::new(RefCell::new(Vec::new()));
//! let signal: Signal<u32> = Signal::new();
//!
//! let log = Rc::clone(&fired);
//! let conn = signal.connect(move |v| log.borrow_mut().push(*v));
//!
//! signal.emit(&7);
//! drop(conn); // disconnects
//! signal.emit(&8);
//!
//! assert_eq!(*fired.borrow(), vec![7]);
//! ```
//!
//! Signals are single-threaded by contract (`Rc`-based, not `Send`);
//! cross-thread notification goes through the work queue's completion
//! machinery instead.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A listener invoked with a shared reference to the payload.
type Listener<T> = Box<dyn FnMut(&T)>;

/// One connected listener. `listener` is `None` only while the callback is
/// out of the list being invoked by a running emit.
struct SignalSlot<T> {
    id: u64,
    listener: Option<Listener<T>>,
}

struct SignalInner<T> {
    /// Sorted by ascending `id`: ids are issued monotonically, connects
    /// append, and removals preserve order. Lookups binary-search.
    slots: Vec<SignalSlot<T>>,
    next_id: u64,
}

/// Type-erased view of a signal's slot list, so [`Connection`] tokens can
/// disconnect without knowing the payload type.
trait SlotList {
    fn remove(&self, id: u64) -> bool;
    fn contains(&self, id: u64) -> bool;
}

impl<T> SlotList for RefCell<SignalInner<T>> {
    fn remove(&self, id: u64) -> bool {
        let mut inner = self.borrow_mut();
        let before = inner.slots.len();
        inner.slots.retain(|slot| slot.id != id);
        inner.slots.len() != before
    }

    fn contains(&self, id: u64) -> bool {
        self.borrow().slots.iter().any(|slot| slot.id == id)
    }
}

/// A type-safe multicast signal.
///
/// Cloning a `Signal` produces a second handle to the same listener list;
/// emitters and connectors can therefore hold their own handles without an
/// ownership relationship between them.
pub struct Signal<T: 'static> {
    inner: Rc<RefCell<SignalInner<T>>>,
}

impl<T: 'static> Signal<T> {
    /// Creates a signal with no listeners.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SignalInner {
                slots: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Connects a listener and returns its [`Connection`] token.
    ///
    /// Listeners are invoked in connection order. The listener stays
    /// connected until the token is dropped, [`Connection::disconnect`] is
    /// called, or the token is [`forget`](Connection::forget)ten (in which
    /// case it stays connected for the signal's lifetime).
    pub fn connect(&self, listener: impl FnMut(&T) + 'static) -> Connection {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.slots.push(SignalSlot {
            id,
            listener: Some(Box::new(listener)),
        });
        drop(inner);
        let list: Weak<dyn SlotList> = Rc::downgrade(&self.inner) as Weak<dyn SlotList>;
        Connection {
            id,
            list,
            forgotten: false,
        }
    }

    /// Invokes every connected listener once, in connection order, with the
    /// same payload.
    ///
    /// Listeners may connect and disconnect during an emit: listeners
    /// connected during this emit are not invoked until the next one, and
    /// listeners disconnected mid-emit are skipped if they have not run yet.
    pub fn emit(&self, payload: &T) {
        // Snapshot the ids so the list can change while we dispatch.
        let ids: Vec<u64> = self.inner.borrow().slots.iter().map(|s| s.id).collect();
        for id in ids {
            // Take the callback out of the list so invoking it does not
            // hold the borrow (listeners may touch this signal).
            let taken = {
                let mut inner = self.inner.borrow_mut();
                match inner.slots.binary_search_by_key(&id, |s| s.id) {
                    Ok(pos) => inner.slots[pos].listener.take(),
                    Err(_) => None, // disconnected since the snapshot
                }
            };
            let Some(mut listener) = taken else {
                continue;
            };
            listener(payload);
            let mut inner = self.inner.borrow_mut();
            if let Ok(pos) = inner.slots.binary_search_by_key(&id, |s| s.id) {
                inner.slots[pos].listener = Some(listener);
            }
            // else: disconnected during its own invocation; drop it.
        }
    }

    /// Number of connected listeners.
    pub fn connection_count(&self) -> usize {
        self.inner.borrow().slots.len()
    }

    /// Returns `true` if no listeners are connected.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().slots.is_empty()
    }

    /// Removes every listener. Outstanding [`Connection`] tokens become
    /// inert.
    pub fn disconnect_all(&self) {
        self.inner.borrow_mut().slots.clear();
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connection_count())
            .finish()
    }
}

/// RAII token for one signal connection.
///
/// Dropping the token disconnects the listener. The token holds only a weak
/// reference to the signal, so it is safe to drop after the signal itself is
/// gone — the disconnect simply becomes a no-op.
pub struct Connection {
    id: u64,
    list: Weak<dyn SlotList>,
    forgotten: bool,
}

impl Connection {
    /// Disconnects now. Returns `false` if the listener was already gone
    /// (signal dropped, `disconnect_all`, or a previous removal).
    pub fn disconnect(mut self) -> bool {
        self.forgotten = true; // skip the Drop-side removal
        match self.list.upgrade() {
            Some(list) => list.remove(self.id),
            None => false,
        }
    }

    /// Returns `true` while the listener is still in the signal's list.
    pub fn is_connected(&self) -> bool {
        self.list.upgrade().is_some_and(|list| list.contains(self.id))
    }

    /// Consumes the token, leaving the listener connected for the signal's
    /// remaining lifetime. The counterpart of connecting a free function
    /// with no owning observer.
    pub fn forget(mut self) {
        self.forgotten = true;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.forgotten {
            if let Some(list) = self.list.upgrade() {
                list.remove(self.id);
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Owned collection of [`Connection`]s.
///
/// A subsystem that listens to several signals keeps one `Observer` and
/// [`track`](Self::track)s every connection it makes; dropping the observer
/// (typically as a struct field) disconnects all of them, regardless of
/// which signals still exist.
#[derive(Default)]
pub struct Observer {
    connections: Vec<Connection>,
}

impl Observer {
    /// Creates an observer tracking no connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a connection token.
    ///
    /// Dead tokens accumulated from already-destroyed signals are pruned
    /// opportunistically.
    pub fn track(&mut self, connection: Connection) {
        self.connections.retain(|c| c.is_connected());
        self.connections.push(connection);
    }

    /// Number of tracked connections that are still live.
    pub fn connection_count(&self) -> usize {
        self.connections.iter().filter(|c| c.is_connected()).count()
    }

    /// Disconnects everything tracked.
    pub fn clear(&mut self) {
        self.connections.clear();
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("connections", &self.connection_count())
            .finish()
    }
}
