//! # Transaction Gossip
//!
//! Disseminates pending transactions across the P2P network. Transactions
//! enter through local submission or gossip from peers, are deduplicated
//! and admission-checked per group, and are relayed to every connected
//! peer in arrival order by a dedicated broadcast task.
//!
//! ## Architecture Role
//!
//! ```text
//! [Local submission] ──admit──────→ [Tx Gossip Service] ──→ group queues
//! [Connection layer] ──raw bytes──→        │                (relay-clist)
//!                                          ↓ task per peer       │
//!                                  ┌───────┴───────┐             │
//!                                  ↓               ↓     cursor reads
//!                             [Peer A]        [Peer B] ←─────────┘
//! ```
//!
//! ## Ordering and delivery
//!
//! - Each group queue is append-only; every peer walks it front to back
//!   with its own cursor, so relay order matches admission order per peer
//! - A transaction is offered to a peer at most once; failed sends retry
//!   the same transaction after a backoff instead of skipping it
//! - Peers behind the local chain are not sent transactions until their
//!   reported height catches up

pub mod domain;
pub mod ports;
pub mod service;
pub mod wire;

pub use domain::*;
pub use ports::inbound::TxGossipApi;
pub use relay_clist::{Cursor, NodeHandle};
pub use service::TxGossipService;
pub use wire::{GossipMessage, TxMessage};
