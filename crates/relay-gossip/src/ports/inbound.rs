//! Inbound ports (API) for the transaction gossip subsystem.

use relay_clist::NodeHandle;

use crate::domain::{AdmittedTx, GossipError, GroupId, Height, PeerId};

/// Primary API for transaction gossip.
///
/// Implemented by the gossip service and driven from two directions: local
/// components submit and evict transactions, and the connection layer feeds
/// in peer lifecycle events and raw channel bytes.
pub trait TxGossipApi: Send + Sync {
    /// Admits one transaction into a group.
    ///
    /// Runs the admission pipeline: group lookup, size gate, duplicate
    /// suppression, the external admission check, and finally the append
    /// that makes the transaction visible to every broadcaster.
    ///
    /// # Arguments
    /// * `group` - Target group id
    /// * `tx` - Raw transaction bytes
    /// * `height` - Chain height to stamp the admission with
    fn admit(&self, group: GroupId, tx: Vec<u8>, height: Height)
        -> Result<AdmittedTx, GossipError>;

    /// Removes a previously admitted transaction from its group's queue.
    ///
    /// Stale handles and repeat evictions are no-ops; only naming an
    /// unregistered group is an error.
    fn evict(&self, group: GroupId, node: NodeHandle) -> Result<(), GossipError>;

    /// Starts a broadcast session for a newly connected peer.
    fn on_peer_connected(&self, peer: PeerId);

    /// Ends the peer's broadcast session. Safe to call for unknown peers.
    fn on_peer_disconnected(&self, peer: &PeerId);

    /// Handles raw bytes received from a peer on the gossip channel.
    ///
    /// Undecodable bytes and transactions for unregistered groups are
    /// reported to the transport as protocol violations; duplicates are
    /// dropped silently; admission rejections are logged and swallowed.
    fn on_message_received(&self, peer: &PeerId, bytes: &[u8]);
}
