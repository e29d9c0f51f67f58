//! Wire codec for gossip messages.
//!
//! One closed message family travels on the gossip channel. Messages are
//! encoded with bincode's fixed-width integer layout, so sizes are exact
//! and checkable: a `Tx` message costs
//! [`ENVELOPE_OVERHEAD`](crate::domain::ENVELOPE_OVERHEAD) bytes of framing
//! plus the raw transaction.
//!
//! Decoding applies the size cap to the raw bytes before any parsing, so an
//! oversized frame is refused without being inspected.

use serde::{Deserialize, Serialize};

use crate::domain::{GroupId, WireError};

/// Everything that can arrive on the gossip channel.
///
/// A closed enum rather than an open registry: adding a message kind is a
/// protocol revision, and decoding can never produce an unhandled case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GossipMessage {
    /// A transaction relayed for a specific group.
    Tx(TxMessage),
}

/// Payload of [`GossipMessage::Tx`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxMessage {
    /// Group the transaction belongs to on the receiving node.
    pub group: GroupId,
    /// Raw transaction bytes, exactly as admitted on the sender.
    pub tx: Vec<u8>,
}

/// Encodes a message for the wire.
pub fn encode(message: &GossipMessage) -> Result<Vec<u8>, WireError> {
    bincode::serialize(message).map_err(|err| WireError::Encode(err.to_string()))
}

/// Decodes raw channel bytes, enforcing `max_msg_bytes` first.
pub fn decode(bytes: &[u8], max_msg_bytes: usize) -> Result<GossipMessage, WireError> {
    if bytes.len() > max_msg_bytes {
        return Err(WireError::MessageTooLarge {
            size: bytes.len(),
            max: max_msg_bytes,
        });
    }
    bincode::deserialize(bytes).map_err(|err| WireError::Decode(err.to_string()))
}
