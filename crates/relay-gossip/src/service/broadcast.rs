//! The per-peer broadcast task.
//!
//! One task per connected peer walks every broadcast-enabled group with its
//! own cursors and relays transactions in admission order. The task cycles
//! through three states until cancelled:
//!
//! - **selecting**: scan the groups round-robin for an unconsumed item;
//! - **ready to send**: gate on the peer's height, encode, send; advance the
//!   group cursor only when the transport accepted the frame;
//! - **waiting**: no group has anything new; sleep on all group queues at
//!   once and rescan on the first wakeup.
//!
//! A peer that is behind (or of unknown height) and a send the transport
//! refused are both handled the same way: hold position and back off, so
//! the same transaction is offered again later. Cancellation (session quit
//! or subsystem shutdown) is observed at every suspension point.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::select_all;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, trace};

use relay_clist::{Cursor, NextItem};

use crate::domain::{BroadcastConfig, GroupId, GroupRegistry, PeerId, PooledTx};
use crate::ports::outbound::{GossipTransport, PeerStateView};
use crate::wire::{self, GossipMessage, TxMessage};

pub(crate) struct BroadcastTask<P, T> {
    peer: PeerId,
    registry: Arc<GroupRegistry>,
    /// Broadcast-enabled group ids, fixed for the session.
    groups: Vec<GroupId>,
    cursors: HashMap<GroupId, Cursor>,
    peers_view: Arc<P>,
    transport: Arc<T>,
    config: BroadcastConfig,
    rr_offset: usize,
    quit: watch::Receiver<bool>,
    shutdown: watch::Receiver<bool>,
}

impl<P, T> BroadcastTask<P, T>
where
    P: PeerStateView,
    T: GossipTransport,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        peer: PeerId,
        registry: Arc<GroupRegistry>,
        groups: Vec<GroupId>,
        peers_view: Arc<P>,
        transport: Arc<T>,
        config: BroadcastConfig,
        quit: watch::Receiver<bool>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let cursors = groups.iter().map(|id| (*id, Cursor::new())).collect();
        Self {
            peer,
            registry,
            groups,
            cursors,
            peers_view,
            transport,
            config,
            rr_offset: 0,
            quit,
            shutdown,
        }
    }

    pub(crate) async fn run(mut self) {
        info!(
            peer = %self.peer,
            groups = self.groups.len(),
            "transaction broadcast task started"
        );
        loop {
            if self.cancelled() {
                break;
            }
            let keep_going = match self.select_ready() {
                Some((group, item)) => self.relay(group, item).await,
                None => self.wait_for_work().await,
            };
            if !keep_going {
                break;
            }
        }
        debug!(peer = %self.peer, "transaction broadcast task stopped");
    }

    fn cancelled(&self) -> bool {
        *self.quit.borrow() || *self.shutdown.borrow()
    }

    /// Scans the groups for the next unconsumed transaction, starting one
    /// group further each pass so no group can starve the others.
    fn select_ready(&mut self) -> Option<(GroupId, NextItem<PooledTx>)> {
        if self.groups.is_empty() {
            return None;
        }
        let start = self.rr_offset % self.groups.len();
        self.rr_offset = self.rr_offset.wrapping_add(1);
        for step in 0..self.groups.len() {
            let id = self.groups[(start + step) % self.groups.len()];
            let Some(group) = self.registry.get(id) else {
                continue;
            };
            let Some(cursor) = self.cursors.get(&id) else {
                continue;
            };
            if let Some(item) = group.txs().next_after(cursor) {
                return Some((id, item));
            }
        }
        None
    }

    /// Offers one transaction to the peer. Returns `false` on cancellation.
    async fn relay(&mut self, group_id: GroupId, item: NextItem<PooledTx>) -> bool {
        let tx = item.payload.as_ref();

        // Do not send to a peer that has not caught up to the height the
        // transaction was admitted at, minus the allowed lag. The peer would
        // fail to validate it and might disconnect us for spam.
        let peer_height = self.peers_view.peer_height(&self.peer);
        let ready = match peer_height {
            Some(height) => height.saturating_add(self.config.catchup_lag_blocks) >= tx.height,
            None => false,
        };
        if !ready {
            trace!(
                peer = %self.peer,
                group = %group_id,
                tx_height = tx.height,
                peer_height = ?peer_height,
                "peer is catching up; delaying transaction"
            );
            return self.backoff().await;
        }

        let message = GossipMessage::Tx(TxMessage {
            group: group_id,
            tx: tx.bytes.clone(),
        });
        let bytes = match wire::encode(&message) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(
                    peer = %self.peer,
                    group = %group_id,
                    error = %err,
                    "failed to encode transaction message"
                );
                return self.backoff().await;
            }
        };

        let delivered = tokio::select! {
            delivered = self.transport.send_tx(&self.peer, self.config.channel.id, bytes) => delivered,
            _ = self.quit.changed() => return false,
            _ = self.shutdown.changed() => return false,
        };

        if delivered {
            if let Some(cursor) = self.cursors.get_mut(&group_id) {
                cursor.advance_to(&item);
            }
            trace!(peer = %self.peer, group = %group_id, key = %tx.key, "transaction relayed");
            true
        } else {
            debug!(
                peer = %self.peer,
                group = %group_id,
                "transaction send failed; backing off"
            );
            self.backoff().await
        }
    }

    /// Sleeps until any broadcast-enabled group may hold something new.
    /// Returns `false` on cancellation.
    async fn wait_for_work(&mut self) -> bool {
        let registry = &self.registry;
        let cursors = &self.cursors;
        let mut waits = Vec::with_capacity(self.groups.len());
        for id in &self.groups {
            let Some(group) = registry.get(*id) else {
                continue;
            };
            let cursor = cursors.get(id).copied().unwrap_or_default();
            waits.push(Box::pin(group.txs().wait_beyond(cursor)));
        }

        if waits.is_empty() {
            // No broadcast-enabled groups: nothing will ever become ready.
            tokio::select! {
                _ = self.quit.changed() => {}
                _ = self.shutdown.changed() => {}
            }
            return false;
        }

        tokio::select! {
            _ = select_all(waits) => true,
            _ = self.quit.changed() => false,
            _ = self.shutdown.changed() => false,
        }
    }

    /// Pauses before the next attempt. Returns `false` on cancellation.
    async fn backoff(&mut self) -> bool {
        let pause = Duration::from_millis(self.config.catchup_backoff_ms);
        tokio::select! {
            _ = sleep(pause) => true,
            _ = self.quit.changed() => false,
            _ = self.shutdown.changed() => false,
        }
    }
}
