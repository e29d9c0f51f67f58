//! Configuration for groups, broadcasting, and the wire envelope.

use crate::domain::entities::GroupId;
use crate::domain::errors::GossipError;

/// Identifies a transport channel.
pub type ChannelId = u8;

/// Reserved channel id for transaction gossip.
pub const MEMPOOL_CHANNEL_ID: ChannelId = 0x30;

/// Default scheduling priority of the gossip channel.
pub const MEMPOOL_CHANNEL_PRIORITY: u8 = 5;

/// Default hard cap on one encoded gossip message (1 MiB).
pub const DEFAULT_MAX_MSG_BYTES: usize = 1_048_576;

/// Fixed cost of the message envelope around a transaction: enum variant tag
/// (4 bytes), group id (4 bytes), payload length prefix (8 bytes). The codec
/// tests pin this against the actual encoding.
pub const ENVELOPE_OVERHEAD: usize = 16;

/// Default capacity of a group's duplicate-suppression cache.
pub const DEFAULT_CACHE_SIZE: usize = 10_000;

/// Transport channel the gossip subsystem claims for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDescriptor {
    pub id: ChannelId,
    /// Relative scheduling weight against other channels on the connection.
    pub priority: u8,
}

impl Default for ChannelDescriptor {
    fn default() -> Self {
        Self {
            id: MEMPOOL_CHANNEL_ID,
            priority: MEMPOOL_CHANNEL_PRIORITY,
        }
    }
}

/// Per-group configuration, fixed at registry construction.
#[derive(Debug, Clone)]
pub struct GroupConfig {
    pub group: GroupId,
    /// Relay admitted transactions to peers. When false the group only
    /// collects local admissions.
    pub broadcast: bool,
    /// Capacity of the duplicate-suppression cache. `0` disables it.
    pub cache_size: usize,
}

impl GroupConfig {
    pub fn new(group: GroupId) -> Self {
        Self {
            group,
            broadcast: true,
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

/// Subsystem-wide broadcast settings.
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    pub channel: ChannelDescriptor,
    /// Hard cap on one encoded gossip message. Also bounds admitted
    /// transactions at `max_msg_bytes - ENVELOPE_OVERHEAD`.
    pub max_msg_bytes: usize,
    /// How many blocks a peer may trail behind a transaction's admission
    /// height and still receive it. `0` demands the peer be caught up.
    pub catchup_lag_blocks: u64,
    /// Pause before reconsidering a peer that is behind, unknown, or whose
    /// send failed.
    pub catchup_backoff_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            channel: ChannelDescriptor::default(),
            max_msg_bytes: DEFAULT_MAX_MSG_BYTES,
            catchup_lag_blocks: 1,
            catchup_backoff_ms: 100,
        }
    }
}

impl BroadcastConfig {
    /// Largest transaction that still fits in one message.
    pub fn max_tx_bytes(&self) -> usize {
        self.max_msg_bytes.saturating_sub(ENVELOPE_OVERHEAD)
    }

    /// Rejects settings that could never carry a transaction or would spin
    /// the broadcast tasks.
    pub fn validate(&self) -> Result<(), GossipError> {
        if self.max_msg_bytes <= ENVELOPE_OVERHEAD {
            return Err(GossipError::InvalidConfig(format!(
                "max_msg_bytes must exceed the {ENVELOPE_OVERHEAD}-byte envelope overhead"
            )));
        }
        if self.catchup_backoff_ms == 0 {
            return Err(GossipError::InvalidConfig(
                "catchup_backoff_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}
