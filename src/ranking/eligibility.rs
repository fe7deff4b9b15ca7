use std::collections::{BTreeMap, BTreeSet};

use crate::ranking::error::RankingError;
use crate::ranking::settings::StudySettings;
use crate::ranking::types::{GroupId, ItemId, ParticipantId, WeightConfiguration};
use crate::store::operations::study::Item;
use crate::store::Store;

/// Items a participant may be asked to compare, ordered by id.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibleItems {
    pub items: Vec<Item>,
    /// Groups of each eligible item, restricted to the participant's groups.
    pub memberships: BTreeMap<ItemId, Vec<GroupId>>,
    pub participant_groups: Vec<GroupId>,
}

impl EligibleItems {
    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.iter().map(|item| item.id)
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.memberships.contains_key(&item_id)
    }

    pub fn get(&self, item_id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Items of the participant's groups, narrowed to the ones marked known when
/// the familiarity step applies to this study.
pub fn resolve_eligible_items(
    store: &Store,
    participant_id: ParticipantId,
    weight_conf: WeightConfiguration,
    settings: &StudySettings,
) -> Result<EligibleItems, RankingError> {
    if store.get_participant(participant_id)?.is_none() {
        return Err(RankingError::NotFound {
            entity: "participant",
            id: participant_id,
        });
    }

    let participant_groups = store.list_participant_group_ids(participant_id)?;
    let mut memberships: BTreeMap<ItemId, Vec<GroupId>> = BTreeMap::new();
    for group_id in &participant_groups {
        for item_id in store.list_group_item_ids(*group_id)? {
            memberships.entry(item_id).or_default().push(*group_id);
        }
    }

    if settings.item_preference_enabled(weight_conf) {
        let known: BTreeSet<ItemId> = store
            .list_participant_items(participant_id)?
            .into_iter()
            .filter(|row| row.known)
            .map(|row| row.item_id)
            .collect();
        memberships.retain(|item_id, _| known.contains(item_id));
    }

    let mut items = Vec::with_capacity(memberships.len());
    for item_id in memberships.keys().copied().collect::<Vec<_>>() {
        match store.get_item(item_id)? {
            Some(item) => items.push(item),
            None => {
                tracing::warn!(item_id, "Group link points at a missing item");
                memberships.remove(&item_id);
            }
        }
    }

    if items.len() < 2 {
        tracing::warn!(
            participant_id,
            available = items.len(),
            "Not enough eligible items"
        );
        return Err(RankingError::InsufficientItems {
            available: items.len(),
        });
    }

    Ok(EligibleItems {
        items,
        memberships,
        participant_groups,
    })
}
