//! # Transaction Gossip Service
//!
//! The main service implementation for transaction dissemination.
//!
//! ## Architecture
//!
//! This service implements the inbound port [`TxGossipApi`]: local
//! components admit and evict transactions, the connection layer feeds in
//! peer lifecycle events and raw channel bytes.
//!
//! It depends on three outbound ports (implemented by adapters in the
//! embedding runtime):
//! - [`AdmissionCheck`]: transaction validity checking
//! - [`PeerStateView`]: local and per-peer chain heights
//! - [`GossipTransport`]: the peer transport for the gossip channel
//!
//! ## Concurrency
//!
//! Admission is synchronous and callable from any thread. Dissemination is
//! task-per-peer: `on_peer_connected` spawns a [`BroadcastTask`] that owns
//! its per-group cursors outright, and `on_peer_disconnected` cancels it
//! through a watch channel. Tasks never share mutable state with each
//! other; they meet only at the group queues, which are safe to walk
//! concurrently.

mod broadcast;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use relay_clist::NodeHandle;

use crate::domain::{
    AdmittedTx, BroadcastConfig, GossipError, GroupConfig, GroupId, GroupRegistry, Height, PeerId,
    ProtocolViolation,
};
use crate::ports::inbound::TxGossipApi;
use crate::ports::outbound::{AdmissionCheck, GossipTransport, PeerStateView};
use crate::wire::{self, GossipMessage};

use broadcast::BroadcastTask;

/// One live broadcast session.
struct PeerSession {
    quit: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Transaction gossip service.
///
/// ## Dependencies
///
/// Requires three port implementations:
/// - `A: AdmissionCheck` - transaction validity checking
/// - `P: PeerStateView` - chain height view
/// - `T: GossipTransport` - peer transport
pub struct TxGossipService<A, P, T>
where
    A: AdmissionCheck,
    P: PeerStateView,
    T: GossipTransport,
{
    /// Subsystem-wide broadcast settings.
    config: BroadcastConfig,
    /// The immutable group set, shared with every broadcast task.
    registry: Arc<GroupRegistry>,
    /// Broadcast-enabled group ids, precomputed at construction.
    broadcast_ids: Vec<GroupId>,
    /// Admission check adapter.
    admission: Arc<A>,
    /// Chain height view adapter.
    peers_view: Arc<P>,
    /// Peer transport adapter.
    transport: Arc<T>,
    /// Live broadcast sessions by peer.
    sessions: Mutex<HashMap<PeerId, PeerSession>>,
    /// Subsystem-wide cancellation, fanned out to every task.
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<A, P, T> TxGossipService<A, P, T>
where
    A: AdmissionCheck + 'static,
    P: PeerStateView + 'static,
    T: GossipTransport + 'static,
{
    /// Builds the service and its group registry.
    ///
    /// Fails on invalid broadcast settings or duplicate group ids; nothing
    /// is spawned until peers connect.
    pub fn new(
        groups: Vec<GroupConfig>,
        config: BroadcastConfig,
        admission: Arc<A>,
        peers_view: Arc<P>,
        transport: Arc<T>,
    ) -> Result<Self, GossipError> {
        config.validate()?;
        let registry = Arc::new(GroupRegistry::from_configs(groups)?);
        let broadcast_ids = registry.broadcast_ids();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            config,
            registry,
            broadcast_ids,
            admission,
            peers_view,
            transport,
            sessions: Mutex::new(HashMap::new()),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Announces readiness and which groups will not be relayed.
    pub fn start(&self) {
        for (id, group) in self.registry.iter() {
            if !group.config().broadcast {
                info!(group = %id, "transaction broadcasting disabled for group");
            }
        }
        info!(
            groups = self.registry.len(),
            channel = self.config.channel.id,
            "transaction gossip ready"
        );
    }

    /// Signals every broadcast task to stop and waits for them to finish.
    pub async fn shutdown(&self) {
        info!("shutting down transaction gossip");
        let _ = self.shutdown_tx.send(true);
        let sessions: Vec<(PeerId, PeerSession)> = self.sessions.lock().drain().collect();
        for (peer, session) in sessions {
            let _ = session.quit.send(true);
            if let Err(err) = session.task.await {
                warn!(peer = %peer, error = %err, "broadcast task ended abnormally");
            }
        }
        info!("transaction gossip stopped");
    }

    /// The group set this service serves.
    pub fn registry(&self) -> &GroupRegistry {
        &self.registry
    }

    /// Number of live broadcast sessions.
    pub fn peer_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

impl<A, P, T> TxGossipApi for TxGossipService<A, P, T>
where
    A: AdmissionCheck + 'static,
    P: PeerStateView + 'static,
    T: GossipTransport + 'static,
{
    fn admit(
        &self,
        group: GroupId,
        tx: Vec<u8>,
        height: Height,
    ) -> Result<AdmittedTx, GossipError> {
        let target = self
            .registry
            .get(group)
            .ok_or(GossipError::UnknownGroup(group))?;
        let max = self.config.max_tx_bytes();
        if tx.len() > max {
            return Err(GossipError::TxTooLarge { size: tx.len(), max });
        }
        let admission = self.admission.as_ref();
        let admitted = target.admit(tx, height, |raw| admission.check_tx(raw))?;
        trace!(group = %group, key = %admitted.key, height, "transaction admitted");
        Ok(admitted)
    }

    fn evict(&self, group: GroupId, node: NodeHandle) -> Result<(), GossipError> {
        let target = self
            .registry
            .get(group)
            .ok_or(GossipError::UnknownGroup(group))?;
        target.evict(node);
        Ok(())
    }

    fn on_peer_connected(&self, peer: PeerId) {
        if self.broadcast_ids.is_empty() {
            debug!(peer = %peer, "no broadcast-enabled groups; not starting a session");
            return;
        }
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(&peer) {
            warn!(peer = %peer, "peer already has a broadcast session");
            return;
        }
        let (quit_tx, quit_rx) = watch::channel(false);
        let task = BroadcastTask::new(
            peer,
            Arc::clone(&self.registry),
            self.broadcast_ids.clone(),
            Arc::clone(&self.peers_view),
            Arc::clone(&self.transport),
            self.config.clone(),
            quit_rx,
            self.shutdown_rx.clone(),
        );
        let handle = tokio::spawn(task.run());
        sessions.insert(
            peer,
            PeerSession {
                quit: quit_tx,
                task: handle,
            },
        );
    }

    fn on_peer_disconnected(&self, peer: &PeerId) {
        let session = self.sessions.lock().remove(peer);
        match session {
            Some(session) => {
                let _ = session.quit.send(true);
                debug!(peer = %peer, "broadcast session ended");
            }
            None => {
                trace!(peer = %peer, "disconnect for peer without a session");
            }
        }
    }

    fn on_message_received(&self, peer: &PeerId, bytes: &[u8]) {
        let message = match wire::decode(bytes, self.config.max_msg_bytes) {
            Ok(message) => message,
            Err(err) => {
                error!(peer = %peer, error = %err, "failed to decode gossip message");
                self.transport
                    .stop_peer(peer, ProtocolViolation::Malformed(err));
                return;
            }
        };
        match message {
            GossipMessage::Tx(tx_message) => {
                let group = tx_message.group;
                debug!(
                    peer = %peer,
                    group = %group,
                    size = tx_message.tx.len(),
                    "received gossiped transaction"
                );
                match self.admit(group, tx_message.tx, self.peers_view.local_height()) {
                    Ok(_) => {}
                    Err(GossipError::UnknownGroup(_)) => {
                        error!(peer = %peer, group = %group, "transaction for unknown group");
                        self.transport
                            .stop_peer(peer, ProtocolViolation::UnknownGroup(group));
                    }
                    Err(GossipError::DuplicateTransaction { key }) => {
                        trace!(peer = %peer, key = %key, "duplicate transaction dropped");
                    }
                    Err(err) => {
                        info!(peer = %peer, error = %err, "transaction failed admission");
                    }
                }
            }
        }
    }
}
