//! # Concurrent Append List
//!
//! The ordering backbone under transaction gossip: producers append pooled
//! transactions at the tail, one cursor per peer walks the list at that
//! peer's pace, and eviction may unlink any element at any time without
//! disturbing anyone else's position.
//!
//! ## Design
//!
//! Elements live in a slot arena and are addressed by generation-checked
//! [`NodeHandle`]s rather than pointers, so a handle held across arbitrary
//! concurrent mutation is always safe to present back to the list: at worst
//! it resolves to nothing. Every element also carries a monotonically
//! increasing position, and [`Cursor`]s resolve their next item strictly
//! past the last consumed position. Together these give the two guarantees
//! consumers rely on:
//!
//! - removal of any element, including one a consumer is parked on, never
//!   invalidates that consumer's traversal;
//! - each element is yielded to each cursor at most once, in append order.
//!
//! ## Waiting
//!
//! Consumers that catch up with the tail park on `tokio::sync::watch`
//! channels: a per-node signal that fires when the node gains a successor
//! or is removed, re-armed whenever an unlink leaves the node at the tail
//! ([`ConcurrentList::wait_next`]), and a list-wide push watch for consumers
//! with no live anchor ([`ConcurrentList::wait_beyond`]). Subscriptions are
//! taken under the same lock as the state they observe, so wakeups cannot
//! be lost. All waits are cancel-safe: drop the future and the list owes
//! you nothing.

mod arena;
mod cursor;
mod list;

pub use arena::NodeHandle;
pub use cursor::Cursor;
pub use list::{ConcurrentList, NextItem};
