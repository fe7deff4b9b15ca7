use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ranking::error::RankingError;
use crate::ranking::types::{GroupId, ItemId, WeightConfiguration};
use crate::store::Store;

/// How the weight of a pair is derived from its two item weights.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PairWeightRule {
    #[default]
    Product,
    Mean,
}

/// Behaviour configuration of a study.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StudySettings {
    pub cycle_length: u32,
    /// 0 means unlimited.
    pub max_cycles: u32,
    pub allow_skip: bool,
    pub allow_back: bool,
    pub allow_ties: bool,
    pub offer_escape_route: bool,
    pub render_item_preference_page: bool,
    pub weight_configuration: WeightConfiguration,
    pub max_pair_repeats: Option<u32>,
    pub pair_weight_rule: PairWeightRule,
    pub item_weights: BTreeMap<ItemId, f64>,
    pub group_weights: BTreeMap<GroupId, f64>,
}

impl Default for StudySettings {
    fn default() -> Self {
        Self {
            cycle_length: 10,
            max_cycles: 0,
            allow_skip: true,
            allow_back: true,
            allow_ties: false,
            offer_escape_route: false,
            render_item_preference_page: true,
            weight_configuration: WeightConfiguration::Equal,
            max_pair_repeats: None,
            pair_weight_rule: PairWeightRule::Product,
            item_weights: BTreeMap::new(),
            group_weights: BTreeMap::new(),
        }
    }
}

impl StudySettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.cycle_length == 0 {
            return Err("cycleLength must be at least 1".to_string());
        }
        if self.max_pair_repeats == Some(0) {
            return Err("maxPairRepeats must be at least 1 when set".to_string());
        }
        if let Some((item_id, weight)) = self
            .item_weights
            .iter()
            .find(|(_, weight)| !is_usable_weight(**weight))
        {
            return Err(format!(
                "item weight for {} must be positive and finite, got {}",
                item_id, weight
            ));
        }
        if let Some((group_id, weight)) = self
            .group_weights
            .iter()
            .find(|(_, weight)| !is_usable_weight(**weight))
        {
            return Err(format!(
                "group weight for {} must be positive and finite, got {}",
                group_id, weight
            ));
        }
        Ok(())
    }

    /// Loads and validates settings from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RankingError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|error| {
            RankingError::Configuration(format!("cannot read {}: {}", path.display(), error))
        })?;
        let settings: Self = serde_json::from_str(&raw).map_err(|error| {
            RankingError::Configuration(format!("cannot parse {}: {}", path.display(), error))
        })?;
        settings.validate().map_err(RankingError::Configuration)?;
        Ok(settings)
    }

    /// Startup settings: the stored study wins, then the file at `path`,
    /// then defaults. A set-up study refuses to load when the file was
    /// edited after setup, since the stored behaviour would silently
    /// ignore the edit.
    pub fn load(store: &Store, path: Option<&str>) -> Result<Self, RankingError> {
        if let Some(settings) = store.load_study_settings()? {
            if let (Some(path), Some(setup_at)) = (path, store.study_setup_at()?) {
                ensure_unchanged_since(path, setup_at)?;
            }
            tracing::info!("Study settings loaded from store");
            return Ok(settings);
        }
        match path {
            Some(path) => {
                tracing::info!(path, "Study settings loaded from file");
                Self::from_file(path)
            }
            None => {
                tracing::warn!("No study configured yet, using default settings");
                Ok(Self::default())
            }
        }
    }

    /// The familiarity step only narrows the item set in equal-weight studies.
    pub fn item_preference_enabled(&self, weight_conf: WeightConfiguration) -> bool {
        self.render_item_preference_page && weight_conf == WeightConfiguration::Equal
    }
}

/// Fails when the file at `path` was modified after `setup_at`.
pub fn ensure_unchanged_since(
    path: impl AsRef<Path>,
    setup_at: DateTime<Utc>,
) -> Result<(), RankingError> {
    let path = path.as_ref();
    let modified = std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|error| {
            RankingError::Configuration(format!("cannot stat {}: {}", path.display(), error))
        })?;
    let modified_at = DateTime::<Utc>::from(modified);
    if modified_at > setup_at {
        tracing::error!(
            path = %path.display(),
            %modified_at,
            %setup_at,
            "Study configuration file changed after setup; run the study setup again"
        );
        return Err(RankingError::Configuration(format!(
            "{} was modified at {} after the study was set up at {}",
            path.display(),
            modified_at,
            setup_at
        )));
    }
    Ok(())
}

pub(crate) fn is_usable_weight(weight: f64) -> bool {
    weight.is_finite() && weight > 0.0
}
