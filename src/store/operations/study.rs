use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ranking::settings::StudySettings;
use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: u64,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub display_name: String,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDefinition {
    #[serde(flatten)]
    pub item: Item,
    pub group_ids: Vec<u64>,
}

/// Everything an administrator uploads to (re)initialise a study.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyDefinition {
    pub settings: StudySettings,
    pub groups: Vec<Group>,
    pub items: Vec<ItemDefinition>,
}

impl StudyDefinition {
    pub fn validate(&self) -> Result<(), StoreError> {
        self.settings.validate().map_err(StoreError::Validation)?;

        let mut group_ids = BTreeSet::new();
        for group in &self.groups {
            if !group_ids.insert(group.id) {
                return Err(StoreError::Validation(format!(
                    "duplicate group id {}",
                    group.id
                )));
            }
        }
        if group_ids.is_empty() {
            return Err(StoreError::Validation(
                "a study needs at least one group".to_string(),
            ));
        }

        let mut item_ids = BTreeSet::new();
        for definition in &self.items {
            if !item_ids.insert(definition.item.id) {
                return Err(StoreError::Validation(format!(
                    "duplicate item id {}",
                    definition.item.id
                )));
            }
            if definition.group_ids.is_empty() {
                return Err(StoreError::Validation(format!(
                    "item {} belongs to no group",
                    definition.item.id
                )));
            }
            if let Some(unknown) = definition
                .group_ids
                .iter()
                .find(|group_id| !group_ids.contains(group_id))
            {
                return Err(StoreError::Validation(format!(
                    "item {} references unknown group {}",
                    definition.item.id, unknown
                )));
            }
        }
        Ok(())
    }
}

impl Store {
    /// Replaces the study definition and wipes every participant-owned row.
    pub fn setup_study(&self, definition: &StudyDefinition) -> Result<(), StoreError> {
        definition.validate()?;

        for tree in [
            &self.participants,
            &self.participant_groups,
            &self.participant_items,
            &self.comparisons,
            &self.visitor_sessions,
            &self.groups,
            &self.items,
            &self.item_groups,
        ] {
            tree.clear()?;
        }

        for group in &definition.groups {
            self.groups
                .insert(keys::group_key(group.id).as_bytes(), Self::serialize(group)?)?;
        }

        for definition in &definition.items {
            let item = &definition.item;
            self.items
                .insert(keys::item_key(item.id).as_bytes(), Self::serialize(item)?)?;
            for group_id in &definition.group_ids {
                self.item_groups
                    .insert(keys::group_items_key(*group_id, item.id).as_bytes(), &[])?;
                self.item_groups
                    .insert(keys::item_groups_key(item.id, *group_id).as_bytes(), &[])?;
            }
        }

        self.save_study_settings(&definition.settings)?;
        self.study_meta.insert(
            keys::STUDY_SETUP_AT_KEY.as_bytes(),
            Self::serialize(&Utc::now())?,
        )?;
        self.flush()?;

        tracing::info!(
            groups = definition.groups.len(),
            items = definition.items.len(),
            "Study set up"
        );
        Ok(())
    }

    pub fn save_study_settings(&self, settings: &StudySettings) -> Result<(), StoreError> {
        self.study_meta.insert(
            keys::STUDY_SETTINGS_KEY.as_bytes(),
            Self::serialize(settings)?,
        )?;
        Ok(())
    }

    pub fn load_study_settings(&self) -> Result<Option<StudySettings>, StoreError> {
        match self.study_meta.get(keys::STUDY_SETTINGS_KEY.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn study_setup_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        match self.study_meta.get(keys::STUDY_SETUP_AT_KEY.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn get_group(&self, group_id: u64) -> Result<Option<Group>, StoreError> {
        match self.groups.get(keys::group_key(group_id).as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let mut groups = Vec::new();
        for entry in self.groups.iter() {
            let (_, value) = entry?;
            groups.push(Self::deserialize::<Group>(&value)?);
        }
        Ok(groups)
    }

    pub fn get_item(&self, item_id: u64) -> Result<Option<Item>, StoreError> {
        match self.items.get(keys::item_key(item_id).as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        let mut items = Vec::new();
        for entry in self.items.iter() {
            let (_, value) = entry?;
            items.push(Self::deserialize::<Item>(&value)?);
        }
        Ok(items)
    }

    pub fn list_group_item_ids(&self, group_id: u64) -> Result<Vec<u64>, StoreError> {
        let prefix = keys::group_items_prefix(group_id);
        let mut item_ids = Vec::new();
        for entry in self.item_groups.scan_prefix(prefix.as_bytes()) {
            let (key, _) = entry?;
            if let Some(item_id) = keys::trailing_id(&key) {
                item_ids.push(item_id);
            }
        }
        Ok(item_ids)
    }

    pub fn list_item_group_ids(&self, item_id: u64) -> Result<Vec<u64>, StoreError> {
        let prefix = keys::item_groups_prefix(item_id);
        let mut group_ids = Vec::new();
        for entry in self.item_groups.scan_prefix(prefix.as_bytes()) {
            let (key, _) = entry?;
            if let Some(group_id) = keys::trailing_id(&key) {
                group_ids.push(group_id);
            }
        }
        Ok(group_ids)
    }
}
