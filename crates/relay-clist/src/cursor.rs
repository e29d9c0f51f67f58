//! Per-consumer read positions.

use crate::arena::NodeHandle;
use crate::list::NextItem;

/// An independent read position over a [`ConcurrentList`](crate::ConcurrentList).
///
/// A cursor names the last item it consumed twice over: the node handle as a
/// fast-path anchor, and the node's list position for exact resolution once
/// the anchor is gone. Resolution always moves strictly forward of the
/// recorded position, so an element is yielded to each cursor at most once
/// no matter how the list is mutated in between.
///
/// Cursors are plain values owned by their consumer. Copying one forks an
/// independent consumer that re-observes everything after the shared
/// position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    last_seq: u64,
    anchor: Option<NodeHandle>,
}

impl Cursor {
    /// A cursor positioned before the first item.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `item` as consumed; the cursor now resolves strictly after it.
    pub fn advance_to<T>(&mut self, item: &NextItem<T>) {
        self.last_seq = item.seq;
        self.anchor = Some(item.handle);
    }

    /// Position of the last consumed item, `0` before the first.
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Handle of the last consumed item, if any. The node it names may have
    /// been removed or recycled since.
    pub fn anchor(&self) -> Option<NodeHandle> {
        self.anchor
    }
}
