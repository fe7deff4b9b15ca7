use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// A participant's stated familiarity with one item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantItem {
    pub participant_id: u64,
    pub item_id: u64,
    pub known: bool,
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// Records a preference once. A second statement for the same item conflicts.
    pub fn create_participant_item(&self, preference: &ParticipantItem) -> Result<(), StoreError> {
        let key = keys::participant_item_key(preference.participant_id, preference.item_id);
        let cas_result = self.participant_items.compare_and_swap(
            key.as_bytes(),
            None::<&[u8]>,
            Some(Self::serialize(preference)?),
        )?;

        if cas_result.is_err() {
            return Err(StoreError::Conflict {
                entity: "participant_item".to_string(),
                key,
            });
        }
        Ok(())
    }

    pub fn list_participant_items(
        &self,
        participant_id: u64,
    ) -> Result<Vec<ParticipantItem>, StoreError> {
        let prefix = keys::participant_prefix(participant_id);
        let mut rows = Vec::new();
        for entry in self.participant_items.scan_prefix(prefix.as_bytes()) {
            let (_, value) = entry?;
            rows.push(Self::deserialize::<ParticipantItem>(&value)?);
        }
        Ok(rows)
    }

    pub fn list_all_participant_items(&self) -> Result<Vec<ParticipantItem>, StoreError> {
        let mut rows = Vec::new();
        for entry in self.participant_items.iter() {
            let (_, value) = entry?;
            rows.push(Self::deserialize::<ParticipantItem>(&value)?);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn preference(participant_id: u64, item_id: u64, known: bool) -> ParticipantItem {
        ParticipantItem {
            participant_id,
            item_id,
            known,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn preferences_are_scoped_to_participant() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("pi1").to_str().unwrap()).unwrap();

        store.create_participant_item(&preference(1, 1, true)).unwrap();
        store.create_participant_item(&preference(1, 2, false)).unwrap();
        store.create_participant_item(&preference(10, 1, true)).unwrap();

        let rows = store.list_participant_items(1).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.participant_id == 1));
    }

    #[test]
    fn second_statement_conflicts() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("pi2").to_str().unwrap()).unwrap();

        store.create_participant_item(&preference(1, 1, true)).unwrap();
        let err = store
            .create_participant_item(&preference(1, 1, false))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert!(store.list_participant_items(1).unwrap()[0].known);
    }
}
