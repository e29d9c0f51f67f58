//! The immutable set of groups a node serves.

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::config::GroupConfig;
use crate::domain::entities::GroupId;
use crate::domain::errors::GossipError;
use crate::domain::group::TxGroup;

/// All pending-transaction groups, keyed by id.
///
/// Built once at startup and never mutated afterwards, so lookups and
/// iteration need no locking. Broadcast tasks capture the registry behind an
/// `Arc` and rely on the group set being fixed for their lifetime.
pub struct GroupRegistry {
    groups: BTreeMap<GroupId, TxGroup>,
}

impl GroupRegistry {
    /// Builds the registry from per-group configuration.
    ///
    /// Two configurations naming the same group id are a wiring mistake and
    /// rejected outright.
    pub fn from_configs(
        configs: impl IntoIterator<Item = GroupConfig>,
    ) -> Result<Self, GossipError> {
        let mut groups = BTreeMap::new();
        for config in configs {
            let id = config.group;
            if groups.insert(id, TxGroup::new(config)).is_some() {
                return Err(GossipError::InvalidConfig(format!(
                    "duplicate group id {id}"
                )));
            }
        }
        Ok(Self { groups })
    }

    pub fn get(&self, id: GroupId) -> Option<&TxGroup> {
        self.groups.get(&id)
    }

    /// Groups in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &TxGroup)> {
        self.groups.iter().map(|(id, group)| (*id, group))
    }

    /// All group ids, ascending.
    pub fn ids(&self) -> Vec<GroupId> {
        self.groups.keys().copied().collect()
    }

    /// Ids of groups that relay to peers.
    pub fn broadcast_ids(&self) -> Vec<GroupId> {
        self.iter()
            .filter(|(_, group)| group.config().broadcast)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Groups hold live queue state with no `Debug` form, so only the
/// configured ids are shown.
impl fmt::Debug for GroupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupRegistry")
            .field("groups", &self.ids())
            .finish()
    }
}
