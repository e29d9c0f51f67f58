//! Ports for the transaction gossip subsystem.
//!
//! `inbound` is the API the service exposes; `outbound` is what it requires
//! from the rest of the node. Adapters implementing the outbound traits are
//! wired in by the embedding runtime.

pub mod inbound;
pub mod outbound;
