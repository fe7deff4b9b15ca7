use std::collections::BTreeMap;

use crate::ranking::eligibility::EligibleItems;
use crate::ranking::error::RankingError;
use crate::ranking::settings::{is_usable_weight, PairWeightRule, StudySettings};
use crate::ranking::types::{GroupId, ItemId, WeightConfiguration};

/// Per-item selection weights for the eligible set. Every returned weight is
/// positive and finite.
pub fn item_weights(
    mode: WeightConfiguration,
    eligible: &EligibleItems,
    settings: &StudySettings,
) -> Result<BTreeMap<ItemId, f64>, RankingError> {
    match mode {
        WeightConfiguration::Equal => Ok(eligible.ids().map(|id| (id, 1.0)).collect()),
        WeightConfiguration::Custom => custom_weights(eligible, settings),
        WeightConfiguration::Group => group_weights(eligible, settings),
    }
}

fn custom_weights(
    eligible: &EligibleItems,
    settings: &StudySettings,
) -> Result<BTreeMap<ItemId, f64>, RankingError> {
    let mut weights = BTreeMap::new();
    for item_id in eligible.ids() {
        let weight = settings.item_weights.get(&item_id).copied().ok_or_else(|| {
            RankingError::Configuration(format!("no custom weight for item {}", item_id))
        })?;
        if !is_usable_weight(weight) {
            return Err(RankingError::Configuration(format!(
                "custom weight for item {} must be positive, got {}",
                item_id, weight
            )));
        }
        weights.insert(item_id, weight);
    }
    Ok(weights)
}

// Group emphasis is normalised over the participant's groups that still have
// eligible items, then split evenly inside each group.
fn group_weights(
    eligible: &EligibleItems,
    settings: &StudySettings,
) -> Result<BTreeMap<ItemId, f64>, RankingError> {
    let mut group_sizes: BTreeMap<GroupId, usize> = BTreeMap::new();
    for groups in eligible.memberships.values() {
        for group_id in groups {
            *group_sizes.entry(*group_id).or_default() += 1;
        }
    }

    let mut emphasis: BTreeMap<GroupId, f64> = BTreeMap::new();
    for group_id in group_sizes.keys() {
        let weight = settings.group_weights.get(group_id).copied().unwrap_or(1.0);
        if !is_usable_weight(weight) {
            return Err(RankingError::Configuration(format!(
                "group weight for group {} must be positive, got {}",
                group_id, weight
            )));
        }
        emphasis.insert(*group_id, weight);
    }
    let total: f64 = emphasis.values().sum();
    if !is_usable_weight(total) {
        return Err(RankingError::Configuration(
            "eligible items belong to no weighted group".to_string(),
        ));
    }

    let mut weights = BTreeMap::new();
    for (item_id, groups) in &eligible.memberships {
        let weight: f64 = groups
            .iter()
            .filter_map(|group_id| {
                let size = *group_sizes.get(group_id)? as f64;
                Some(emphasis.get(group_id)? / total / size)
            })
            .sum();
        if !is_usable_weight(weight) {
            return Err(RankingError::Configuration(format!(
                "item {} has no group weight",
                item_id
            )));
        }
        weights.insert(*item_id, weight);
    }
    Ok(weights)
}

pub fn pair_weight(weight_a: f64, weight_b: f64, rule: PairWeightRule) -> f64 {
    match rule {
        PairWeightRule::Product => weight_a * weight_b,
        PairWeightRule::Mean => (weight_a + weight_b) / 2.0,
    }
}
