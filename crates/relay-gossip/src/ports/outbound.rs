//! Outbound (driven) ports for the transaction gossip subsystem.
//!
//! These traits define what the gossip service needs from the rest of the
//! node: transaction validity checking, a view of chain heights, and the
//! peer transport.

use async_trait::async_trait;

use crate::domain::{ChannelId, Height, PeerId, ProtocolViolation, RejectReason};

/// Transaction validity checking, owned by another subsystem.
///
/// Consulted once per unseen transaction during admission. The check is
/// stateful on the collaborator's side (balances, nonces); the gossip layer
/// only relays its verdict.
pub trait AdmissionCheck: Send + Sync {
    fn check_tx(&self, tx: &[u8]) -> Result<(), RejectReason>;
}

/// Read-only view of chain heights.
///
/// `local_height` stamps transactions admitted off the network;
/// `peer_height` is the broadcaster's readiness signal for each peer.
pub trait PeerStateView: Send + Sync {
    /// This node's committed chain height.
    fn local_height(&self) -> Height;

    /// The peer's last reported height, or `None` before its first status
    /// exchange. An unknown height is treated as too far behind to receive.
    fn peer_height(&self, peer: &PeerId) -> Option<Height>;
}

/// Peer transport for the gossip channel.
#[async_trait]
pub trait GossipTransport: Send + Sync {
    /// Delivers encoded bytes to one peer, waiting while the channel is
    /// congested. Returns `false` when the send was not accepted.
    async fn send_tx(&self, peer: &PeerId, channel: ChannelId, bytes: Vec<u8>) -> bool;

    /// Reports a protocol violation so the connection layer can disconnect
    /// and penalize the peer.
    fn stop_peer(&self, peer: &PeerId, violation: ProtocolViolation);
}

/// Mock admission check for testing. Accepts by default; flip with
/// [`set_accept`](MockAdmission::set_accept).
#[cfg(test)]
pub struct MockAdmission {
    accept: std::sync::atomic::AtomicBool,
    reason: RejectReason,
}

#[cfg(test)]
impl MockAdmission {
    pub fn new() -> Self {
        Self {
            accept: std::sync::atomic::AtomicBool::new(true),
            reason: RejectReason::new("rejected by mock"),
        }
    }

    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl AdmissionCheck for MockAdmission {
    fn check_tx(&self, _tx: &[u8]) -> Result<(), RejectReason> {
        if self.accept.load(std::sync::atomic::Ordering::SeqCst) {
            Ok(())
        } else {
            Err(self.reason.clone())
        }
    }
}

/// Mock height view for testing.
#[cfg(test)]
pub struct MockPeerStateView {
    local: std::sync::atomic::AtomicU64,
    peers: parking_lot::RwLock<std::collections::HashMap<PeerId, Height>>,
}

#[cfg(test)]
impl MockPeerStateView {
    pub fn new() -> Self {
        Self {
            local: std::sync::atomic::AtomicU64::new(0),
            peers: parking_lot::RwLock::new(std::collections::HashMap::new()),
        }
    }

    pub fn set_local_height(&self, height: Height) {
        self.local.store(height, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set_peer_height(&self, peer: PeerId, height: Height) {
        self.peers.write().insert(peer, height);
    }

    pub fn clear_peer_height(&self, peer: &PeerId) {
        self.peers.write().remove(peer);
    }
}

#[cfg(test)]
impl PeerStateView for MockPeerStateView {
    fn local_height(&self) -> Height {
        self.local.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn peer_height(&self, peer: &PeerId) -> Option<Height> {
        self.peers.read().get(peer).copied()
    }
}

/// Mock transport for testing: records deliveries and reported violations,
/// and can be taken offline to simulate send failures.
#[cfg(test)]
pub struct MockTransport {
    online: std::sync::atomic::AtomicBool,
    sent: parking_lot::Mutex<Vec<(PeerId, ChannelId, Vec<u8>)>>,
    delivered: tokio::sync::watch::Sender<u64>,
    stopped: parking_lot::Mutex<Vec<(PeerId, String)>>,
}

#[cfg(test)]
impl MockTransport {
    pub fn new() -> Self {
        let (delivered, _) = tokio::sync::watch::channel(0);
        Self {
            online: std::sync::atomic::AtomicBool::new(true),
            sent: parking_lot::Mutex::new(Vec::new()),
            delivered,
            stopped: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, std::sync::atomic::Ordering::SeqCst);
    }

    /// Raw frames delivered to `peer`, in order.
    pub fn sent_to(&self, peer: &PeerId) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .iter()
            .filter(|(to, _, _)| to == peer)
            .map(|(_, _, bytes)| bytes.clone())
            .collect()
    }

    pub fn total_sent(&self) -> u64 {
        *self.delivered.borrow()
    }

    /// Waits until at least `count` frames have been delivered in total.
    pub async fn wait_delivered(&self, count: u64) {
        let mut rx = self.delivered.subscribe();
        let _ = rx.wait_for(|delivered| *delivered >= count).await;
    }

    pub fn stopped_peers(&self) -> Vec<(PeerId, String)> {
        self.stopped.lock().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl GossipTransport for MockTransport {
    async fn send_tx(&self, peer: &PeerId, channel: ChannelId, bytes: Vec<u8>) -> bool {
        if !self.online.load(std::sync::atomic::Ordering::SeqCst) {
            return false;
        }
        self.sent.lock().push((*peer, channel, bytes));
        self.delivered.send_modify(|count| *count += 1);
        true
    }

    fn stop_peer(&self, peer: &PeerId, violation: ProtocolViolation) {
        self.stopped.lock().push((*peer, violation.to_string()));
    }
}
