use std::collections::BTreeMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::ranking::eligibility::EligibleItems;
use crate::ranking::error::RankingError;
use crate::ranking::settings::StudySettings;
use crate::ranking::types::{unordered, ItemId, Pair};
use crate::ranking::weighting::pair_weight;
use crate::store::operations::comparisons::Comparison;

/// Judgment counts per unordered pair, any state.
pub fn pair_counts(history: &[Comparison]) -> BTreeMap<(ItemId, ItemId), u32> {
    let mut counts = BTreeMap::new();
    for comparison in history {
        *counts.entry(comparison.pair()).or_insert(0) += 1;
    }
    counts
}

/// Draws the next pair: least-judged first, weighted among ties.
pub struct PairSelector<'r, R: Rng> {
    rng: &'r mut R,
}

impl<'r, R: Rng> PairSelector<'r, R> {
    pub fn new(rng: &'r mut R) -> Self {
        Self { rng }
    }

    pub fn next_pair(
        &mut self,
        eligible: &EligibleItems,
        weights: &BTreeMap<ItemId, f64>,
        history: &[Comparison],
        settings: &StudySettings,
    ) -> Result<Pair, RankingError> {
        let ids: Vec<ItemId> = eligible.ids().collect();
        if ids.len() < 2 {
            return Err(RankingError::InsufficientItems {
                available: ids.len(),
            });
        }

        let counts = pair_counts(history);
        let mut candidates: Vec<((ItemId, ItemId), u32)> = Vec::new();
        for (index, first) in ids.iter().enumerate() {
            for second in &ids[index + 1..] {
                let key = unordered(*first, *second);
                let count = counts.get(&key).copied().unwrap_or(0);
                if settings
                    .max_pair_repeats
                    .is_some_and(|limit| count >= limit)
                {
                    continue;
                }
                candidates.push((key, count));
            }
        }

        let Some(min_count) = candidates.iter().map(|(_, count)| *count).min() else {
            return Err(RankingError::ExhaustedPairs);
        };
        candidates.retain(|(_, count)| *count == min_count);

        let mut pair_weights = Vec::with_capacity(candidates.len());
        for ((a, b), _) in &candidates {
            let weight_a = item_weight(weights, *a)?;
            let weight_b = item_weight(weights, *b)?;
            pair_weights.push(pair_weight(weight_a, weight_b, settings.pair_weight_rule));
        }
        let distribution = WeightedIndex::new(&pair_weights).map_err(|error| {
            RankingError::Configuration(format!("unusable pair weights: {}", error))
        })?;
        let ((a, b), _) = candidates[distribution.sample(&mut *self.rng)];

        let pair = if self.rng.gen_bool(0.5) {
            Pair {
                item_1_id: a,
                item_2_id: b,
            }
        } else {
            Pair {
                item_1_id: b,
                item_2_id: a,
            }
        };

        tracing::debug!(
            item_1_id = pair.item_1_id,
            item_2_id = pair.item_2_id,
            prior_judgments = min_count,
            candidates = candidates.len(),
            "Pair selected"
        );
        Ok(pair)
    }
}

fn item_weight(weights: &BTreeMap<ItemId, f64>, item_id: ItemId) -> Result<f64, RankingError> {
    weights.get(&item_id).copied().ok_or_else(|| {
        RankingError::Configuration(format!("no weight computed for item {}", item_id))
    })
}
