//! Error taxonomy for the transaction gossip subsystem.
//!
//! Only terminal outcomes are errors. Transient conditions a broadcast task
//! handles by itself (a peer lagging behind, a failed send) never surface
//! here; they are retried internally with backoff.

use thiserror::Error;

use crate::domain::entities::{GroupId, RejectReason, TxKey};

/// Errors returned from the gossip API surface.
#[derive(Debug, Error)]
pub enum GossipError {
    /// The admission collaborator refused the transaction.
    #[error("transaction rejected by admission: {reason}")]
    RejectedByAdmission { reason: RejectReason },

    /// The transaction's content key is already recorded in the group's
    /// duplicate cache.
    #[error("duplicate transaction {key}")]
    DuplicateTransaction { key: TxKey },

    /// No group with this identifier is registered.
    #[error("unknown mempool group {0}")]
    UnknownGroup(GroupId),

    /// The transaction cannot fit in one gossip message.
    #[error("transaction too large: {size} bytes (max {max})")]
    TxTooLarge { size: usize, max: usize },

    /// Rejected at construction time, before anything ran.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Wire-level failure encoding or decoding a gossip message.
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Failures of the gossip message codec.
#[derive(Debug, Error)]
pub enum WireError {
    /// The raw message exceeds the configured size cap. Checked before any
    /// parsing happens.
    #[error("message exceeds maximum size ({size} > {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("malformed gossip envelope: {0}")]
    Decode(String),

    #[error("gossip envelope encoding failed: {0}")]
    Encode(String),
}

/// What a misbehaving peer is reported to the transport for.
///
/// Handed to [`GossipTransport::stop_peer`](crate::ports::outbound::GossipTransport::stop_peer)
/// so the connection layer can disconnect and penalize the sender.
#[derive(Debug, Error)]
pub enum ProtocolViolation {
    /// The peer sent bytes that do not decode into a gossip message.
    #[error("malformed gossip message: {0}")]
    Malformed(WireError),

    /// The peer sent a transaction for a group this node never registered.
    #[error("transaction for unknown group {0}")]
    UnknownGroup(GroupId),
}
