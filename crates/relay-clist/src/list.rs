//! The concurrent list itself: append, unlink, and the wait primitives.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::arena::{Arena, Node, NodeHandle};
use crate::cursor::Cursor;

/// One item yielded to a cursor: the node's handle, its position, and a
/// shared reference to the payload.
#[derive(Debug, Clone)]
pub struct NextItem<T> {
    pub handle: NodeHandle,
    pub seq: u64,
    pub payload: Arc<T>,
}

/// A concurrent append-ordered list.
///
/// Producers push at the tail; any number of consumers walk the list at
/// their own pace through [`Cursor`]s. Removal never disturbs anybody
/// else's position: handles are generation-checked, and cursors resolve
/// forward by list position, so a consumer parked on a removed node resumes
/// at that node's removal-time successor.
///
/// All mutation happens under one internal mutex. Waiters subscribe to
/// `tokio::sync::watch` channels under that same mutex, so a wakeup can
/// never be lost between a state check and going to sleep. Wakeups are
/// hints: consumers loop back to [`next_after`](Self::next_after) after any
/// wait returns.
pub struct ConcurrentList<T> {
    inner: Mutex<ListState<T>>,
    /// Position of the most recent push. Lets consumers that have drained
    /// the list sleep until anything new arrives.
    pushed: watch::Sender<u64>,
}

struct ListState<T> {
    arena: Arena<T>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
    next_seq: u64,
}

/// What a draining consumer should sleep on, decided under the list lock.
enum ParkTarget {
    Ready,
    OnNode(watch::Receiver<bool>),
    OnPushed(u64, watch::Receiver<u64>),
}

impl<T> ConcurrentList<T> {
    pub fn new() -> Self {
        let (pushed, _) = watch::channel(0u64);
        Self {
            inner: Mutex::new(ListState {
                arena: Arena::new(),
                head: None,
                tail: None,
                len: 0,
                next_seq: 1,
            }),
            pushed,
        }
    }

    /// Appends `payload` at the tail and returns a stable handle to it.
    ///
    /// Wakes consumers parked on the previous tail and consumers sleeping
    /// on the push watch.
    pub fn push_back(&self, payload: T) -> NodeHandle {
        let mut st = self.inner.lock();
        let seq = st.next_seq;
        st.next_seq += 1;
        let prev_tail = st.tail;

        let (signal, _) = watch::channel(false);
        let node = Node {
            seq,
            payload: Arc::new(payload),
            prev: prev_tail,
            next: None,
            removed: false,
            successor_at_removal: None,
            signal,
        };
        let handle = st.arena.alloc(node);

        match prev_tail {
            Some(tail_idx) => {
                if let Some(tail) = st.arena.node_mut(tail_idx) {
                    tail.next = Some(handle.index);
                    tail.fire_signal();
                }
            }
            None => st.head = Some(handle.index),
        }
        st.tail = Some(handle.index);
        st.len += 1;

        // Published under the lock, and only ever upward, so the watch
        // value is a monotone lower bound on what the list contains.
        self.pushed.send_if_modified(|latest| {
            if seq > *latest {
                *latest = seq;
                true
            } else {
                false
            }
        });
        handle
    }

    /// Handle of the current head, if any.
    pub fn front(&self) -> Option<NodeHandle> {
        let st = self.inner.lock();
        st.head.and_then(|index| st.arena.handle_of(index))
    }

    /// Shared payload of a live node. Stale or removed handles yield `None`.
    pub fn get(&self, handle: NodeHandle) -> Option<Arc<T>> {
        let st = self.inner.lock();
        let node = st.arena.resolve(handle)?;
        if node.removed {
            None
        } else {
            Some(Arc::clone(&node.payload))
        }
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unlinks the node behind `handle`. Stale handles and repeated removals
    /// are no-ops. Removing the tail re-arms the new tail's wait signal so
    /// the next push fires it again.
    ///
    /// The node's removal record (including its successor at this moment)
    /// survives until every consumer parked on it has moved on; only then is
    /// the slot recycled.
    pub fn remove(&self, handle: NodeHandle) {
        let mut st = self.inner.lock();
        let Some(node) = st.arena.resolve(handle) else {
            return;
        };
        if node.removed {
            return;
        }
        let prev = node.prev;
        let next = node.next;
        let successor = next.and_then(|index| st.arena.handle_of(index));

        match prev {
            Some(prev_idx) => {
                if let Some(prev_node) = st.arena.node_mut(prev_idx) {
                    prev_node.next = next;
                }
            }
            None => st.head = next,
        }
        match next {
            Some(next_idx) => {
                if let Some(next_node) = st.arena.node_mut(next_idx) {
                    next_node.prev = prev;
                }
            }
            None => {
                st.tail = prev;
                // The predecessor is the tail again, but its signal was
                // spent when this node was linked behind it. Re-arm it so
                // the next push wakes consumers parked on the tail.
                if let Some(prev_idx) = prev {
                    if let Some(prev_node) = st.arena.node(prev_idx) {
                        prev_node.rearm_signal();
                    }
                }
            }
        }

        if let Some(node) = st.arena.resolve_mut(handle) {
            node.removed = true;
            node.successor_at_removal = successor;
            node.prev = None;
            node.next = None;
            node.fire_signal();
        }
        st.len -= 1;
        st.arena.bury(handle.index);
    }

    /// Subscribes to the node's wait signal.
    ///
    /// Returns `None` when there is nothing left to wait for: the node
    /// already has a successor, is removed, or the handle is stale. Callers
    /// should then resolve their next item instead of sleeping.
    pub fn subscribe_next(&self, handle: NodeHandle) -> Option<watch::Receiver<bool>> {
        let st = self.inner.lock();
        let node = st.arena.resolve(handle)?;
        if node.removed || node.next.is_some() {
            return None;
        }
        Some(node.signal.subscribe())
    }

    /// Waits until the node gains a successor or is removed.
    ///
    /// Returns immediately when the outcome already happened. Cancel by
    /// dropping the future, for example from `tokio::select!`.
    pub async fn wait_next(&self, handle: NodeHandle) {
        if let Some(mut rx) = self.subscribe_next(handle) {
            let _ = rx.changed().await;
        }
    }

    /// Watch over the position of the most recent push. The value only
    /// grows; `0` means nothing has ever been pushed.
    pub fn pushed_watch(&self) -> watch::Receiver<u64> {
        self.pushed.subscribe()
    }

    /// Resolves the earliest live item positioned after the cursor, or
    /// `None` when the cursor has consumed everything currently linked.
    ///
    /// A `None` is the signal to park via [`wait_beyond`](Self::wait_beyond)
    /// (or [`wait_next`](Self::wait_next) on the cursor's anchor).
    pub fn next_after(&self, cursor: &Cursor) -> Option<NextItem<T>> {
        let st = self.inner.lock();
        let index = resolve_next_index(&st, cursor)?;
        item_at(&st, index)
    }

    /// Waits until an item positioned after `cursor` may be available.
    ///
    /// Returns immediately when one already is. A return is a hint, not a
    /// guarantee: the caller loops around [`next_after`](Self::next_after).
    /// Each spurious wakeup is paid for by an actual list event, so a
    /// drained consumer cannot spin. Cancel by dropping the future.
    pub async fn wait_beyond(&self, cursor: Cursor) {
        let target = {
            let st = self.inner.lock();
            if resolve_next_index(&st, &cursor).is_some() {
                ParkTarget::Ready
            } else {
                match cursor.anchor().and_then(|handle| st.arena.resolve(handle)) {
                    // Live anchor with no successor: sleep on its signal.
                    Some(node) if !node.removed => ParkTarget::OnNode(node.signal.subscribe()),
                    // Anchor removed or recycled (or no anchor at all):
                    // sleep until something is pushed past what the list
                    // held when we looked.
                    _ => ParkTarget::OnPushed(*self.pushed.borrow(), self.pushed.subscribe()),
                }
            }
        };
        match target {
            ParkTarget::Ready => {}
            ParkTarget::OnNode(mut rx) => {
                let _ = rx.changed().await;
            }
            ParkTarget::OnPushed(seen, mut rx) => {
                let _ = rx.wait_for(|latest| *latest > seen).await;
            }
        }
    }
}

impl<T> Default for ConcurrentList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Finds the slot index of the first live node positioned after `cursor`.
fn resolve_next_index<T>(st: &ListState<T>, cursor: &Cursor) -> Option<u32> {
    if let Some(anchor) = cursor.anchor() {
        match st.arena.resolve(anchor) {
            Some(node) if !node.removed => {
                // Live anchor: its forward link is the next unconsumed item,
                // or the cursor is at the tail.
                return node.next;
            }
            Some(node) => {
                // Removed anchor: resume at its removal-time successor,
                // skipping successors removed in the meantime.
                let mut succ = node.successor_at_removal;
                while let Some(handle) = succ {
                    match st.arena.resolve(handle) {
                        Some(s) if !s.removed => {
                            if s.seq > cursor.last_seq() {
                                return Some(handle.index);
                            }
                            break;
                        }
                        Some(s) => succ = s.successor_at_removal,
                        None => break,
                    }
                }
            }
            None => {}
        }
    }
    // Recycled anchor or broken successor chain: rescan from the head.
    // Positions are monotone, so the filter still yields each item once.
    let mut cur = st.head;
    while let Some(index) = cur {
        let node = st.arena.node(index)?;
        if node.seq > cursor.last_seq() {
            return Some(index);
        }
        cur = node.next;
    }
    None
}

fn item_at<T>(st: &ListState<T>, index: u32) -> Option<NextItem<T>> {
    let handle = st.arena.handle_of(index)?;
    let node = st.arena.node(index)?;
    Some(NextItem {
        handle,
        seq: node.seq,
        payload: Arc::clone(&node.payload),
    })
}
