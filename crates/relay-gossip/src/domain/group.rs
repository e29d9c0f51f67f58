//! A pending-transaction group: queue plus duplicate cache.

use relay_clist::{ConcurrentList, NodeHandle};

use crate::domain::cache::SeenTxCache;
use crate::domain::config::GroupConfig;
use crate::domain::entities::{Height, PooledTx, RejectReason, TxKey};
use crate::domain::errors::GossipError;

/// Receipt for a successful admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmittedTx {
    /// Content key recorded in the duplicate cache.
    pub key: TxKey,
    /// Handle of the queued transaction, usable for later eviction.
    pub node: NodeHandle,
}

/// One group of pending transactions.
///
/// Owns an append-ordered queue that per-peer broadcasters walk with their
/// own cursors, and a cache of recently seen content keys. Shared freely
/// across tasks; all operations take `&self`.
pub struct TxGroup {
    config: GroupConfig,
    txs: ConcurrentList<PooledTx>,
    seen: SeenTxCache,
}

impl TxGroup {
    pub fn new(config: GroupConfig) -> Self {
        Self {
            txs: ConcurrentList::new(),
            seen: SeenTxCache::new(config.cache_size),
            config,
        }
    }

    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// The group's queue, for broadcasters to cursor over.
    pub fn txs(&self) -> &ConcurrentList<PooledTx> {
        &self.txs
    }

    /// The group's duplicate cache.
    pub fn seen(&self) -> &SeenTxCache {
        &self.seen
    }

    /// Runs the admission pipeline for one transaction.
    ///
    /// Order matters: the cheap duplicate lookup comes first, the external
    /// `check` runs only for unseen content, and the key is recorded before
    /// the transaction is linked so that of two racing identical admissions
    /// exactly one reaches the queue.
    pub fn admit<F>(&self, tx: Vec<u8>, height: Height, check: F) -> Result<AdmittedTx, GossipError>
    where
        F: FnOnce(&[u8]) -> Result<(), RejectReason>,
    {
        let key = TxKey::of(&tx);
        if self.seen.contains(&key) {
            return Err(GossipError::DuplicateTransaction { key });
        }
        check(&tx).map_err(|reason| GossipError::RejectedByAdmission { reason })?;
        if !self.seen.insert_if_absent(key, height) {
            return Err(GossipError::DuplicateTransaction { key });
        }
        let node = self.txs.push_back(PooledTx { key, height, bytes: tx });
        Ok(AdmittedTx { key, node })
    }

    /// Unlinks a queued transaction. Stale handles and repeat evictions are
    /// no-ops.
    ///
    /// The cache entry is left in place: an evicted transaction echoed back
    /// by a peer must still be recognized and dropped.
    pub fn evict(&self, node: NodeHandle) {
        self.txs.remove(node);
    }

    /// Number of transactions currently queued.
    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }
}
