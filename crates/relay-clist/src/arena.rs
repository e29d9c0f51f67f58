//! Slot arena backing a [`ConcurrentList`](crate::ConcurrentList).
//!
//! Nodes live in reusable slots addressed by index. Each slot carries a
//! generation counter, so a handle minted for one occupant can never observe
//! a later occupant of the same slot.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::watch;

/// How many graveyard slots a single allocation inspects for reclamation.
const GRAVEYARD_SWEEP_PER_ALLOC: usize = 4;

/// Stable, copyable reference to one list node.
///
/// Handles stay valid across concurrent pushes and removals. Once a node is
/// removed and the last waiter parked on it has gone away, its slot is
/// recycled under a bumped generation and old handles resolve to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// A node occupying an arena slot.
pub(crate) struct Node<T> {
    /// Position assigned at push time. Strictly increasing from head to tail.
    pub(crate) seq: u64,
    pub(crate) payload: Arc<T>,
    pub(crate) prev: Option<u32>,
    pub(crate) next: Option<u32>,
    pub(crate) removed: bool,
    /// Handle of the forward neighbor captured at the moment of removal.
    /// Lets a consumer anchored here resume without rescanning from the head.
    pub(crate) successor_at_removal: Option<NodeHandle>,
    /// Fires when this node gains a successor or is removed; re-armed when
    /// an unlink leaves this node the tail again.
    pub(crate) signal: watch::Sender<bool>,
}

impl<T> Node<T> {
    /// Flips the wait signal to fired. Later calls are no-ops until the
    /// signal is re-armed, so waiters see exactly one wakeup per arming.
    pub(crate) fn fire_signal(&self) {
        self.signal.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        });
    }

    /// Makes a spent signal fireable again so the next
    /// [`fire_signal`](Self::fire_signal) produces a wakeup. No-op when the
    /// signal has not fired.
    pub(crate) fn rearm_signal(&self) {
        self.signal.send_if_modified(|fired| {
            if *fired {
                *fired = false;
                true
            } else {
                false
            }
        });
    }
}

struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

/// Slot storage with generation-checked access and deferred reclamation.
///
/// Removed nodes are parked in a graveyard until their wait signal has no
/// subscribers left; only then is the slot recycled. A bounded number of
/// graveyard entries is swept per allocation, keeping reclamation amortized
/// constant time.
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    graveyard: VecDeque<u32>,
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            graveyard: VecDeque::new(),
        }
    }

    /// Places `node` into a free slot (recycling buried ones when possible)
    /// and returns its handle.
    pub(crate) fn alloc(&mut self, node: Node<T>) -> NodeHandle {
        self.sweep_graveyard();
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeHandle {
                    index,
                    generation: 0,
                }
            }
        }
    }

    /// Resolves a handle to its node, or `None` when the slot was recycled
    /// since the handle was minted.
    pub(crate) fn resolve(&self, handle: NodeHandle) -> Option<&Node<T>> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub(crate) fn resolve_mut(&mut self, handle: NodeHandle) -> Option<&mut Node<T>> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Direct access by slot index, for walking `prev`/`next` links.
    pub(crate) fn node(&self, index: u32) -> Option<&Node<T>> {
        self.slots.get(index as usize).and_then(|s| s.node.as_ref())
    }

    pub(crate) fn node_mut(&mut self, index: u32) -> Option<&mut Node<T>> {
        self.slots
            .get_mut(index as usize)
            .and_then(|s| s.node.as_mut())
    }

    /// Mints a handle for the current occupant of `index`.
    pub(crate) fn handle_of(&self, index: u32) -> Option<NodeHandle> {
        let slot = self.slots.get(index as usize)?;
        slot.node.as_ref()?;
        Some(NodeHandle {
            index,
            generation: slot.generation,
        })
    }

    /// Queues a removed node's slot for reclamation. The node stays readable
    /// until every subscriber to its signal has dropped out, so parked
    /// consumers can still follow its removal record.
    pub(crate) fn bury(&mut self, index: u32) {
        self.graveyard.push_back(index);
    }

    fn sweep_graveyard(&mut self) {
        let rounds = GRAVEYARD_SWEEP_PER_ALLOC.min(self.graveyard.len());
        for _ in 0..rounds {
            let Some(index) = self.graveyard.pop_front() else {
                break;
            };
            let reclaimable = match self.node(index) {
                Some(node) => node.signal.receiver_count() == 0,
                None => true,
            };
            if reclaimable {
                if let Some(slot) = self.slots.get_mut(index as usize) {
                    slot.node = None;
                    slot.generation = slot.generation.wrapping_add(1);
                    self.free.push(index);
                }
            } else {
                self.graveyard.push_back(index);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub(crate) fn graveyard_len(&self) -> usize {
        self.graveyard.len()
    }
}
