//! # Core Domain Entities
//!
//! Defines the fundamental data structures for transaction gossip.
//!
//! ## Entities
//!
//! - [`GroupId`]: Identifier of one pending-transaction group
//! - [`TxKey`]: SHA-256 content key deduplicating transactions
//! - [`PooledTx`]: An admitted transaction waiting to be relayed
//! - [`PeerId`]: 32-byte peer identifier for P2P communication
//! - [`RejectReason`]: Why the admission collaborator refused a transaction

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Block height on the local chain.
pub type Height = u64;

/// Identifier of one pending-transaction group.
///
/// Groups partition the pool: each keeps its own queue and duplicate cache,
/// and every gossiped transaction names the group it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content key of a transaction: the SHA-256 digest of its raw bytes.
///
/// Two submissions with identical bytes collapse onto the same key, which is
/// what the per-group duplicate cache is indexed by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TxKey(pub [u8; 32]);

impl TxKey {
    /// Derives the key for a raw transaction.
    pub fn of(tx: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(tx);
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for TxKey {
    /// Short form for logs: the first eight bytes in hex.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// An admitted transaction as it sits in a group's queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PooledTx {
    /// Content key, identical to what the duplicate cache recorded.
    pub key: TxKey,
    /// Chain height at the moment of admission. Broadcasters compare this
    /// against each peer's height before relaying.
    pub height: Height,
    /// Raw transaction bytes exactly as admitted.
    pub bytes: Vec<u8>,
}

/// Peer identifier for P2P network communication.
///
/// A 32-byte identifier derived from the peer's public key or node ID.
///
/// # Example
///
/// ```rust
/// use relay_gossip::domain::PeerId;
///
/// let peer = PeerId::new([0xAB; 32]);
/// let peer_from_bytes = PeerId::from_bytes(&[0xAB; 32]).unwrap();
/// assert_eq!(peer, peer_from_bytes);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PeerId(pub [u8; 32]);

impl PeerId {
    /// Creates a new peer ID from a 32-byte array.
    pub fn new(id: [u8; 32]) -> Self {
        Self(id)
    }

    /// Creates a peer ID from a byte slice.
    ///
    /// Returns `None` if the slice is shorter than 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() >= 32 {
            let mut id = [0u8; 32];
            id.copy_from_slice(&bytes[..32]);
            Some(Self(id))
        } else {
            None
        }
    }
}

impl fmt::Display for PeerId {
    /// Short form for logs: the first four bytes in hex.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Why the admission collaborator refused a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectReason(String);

impl RejectReason {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
