use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionalTree};
use sled::Transactional;

use crate::store::keys;
use crate::store::operations::participants::Participant;
use crate::store::{tx_deserialize, tx_serialize, Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub id: u64,
    pub participant_id: u64,
    pub item_1_id: u64,
    pub item_2_id: u64,
    pub selected_item_id: Option<u64>,
    pub state: ComparisonState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonState {
    Selected,
    Skipped,
    Tied,
}

impl Comparison {
    /// Unordered pair key, smaller id first.
    pub fn pair(&self) -> (u64, u64) {
        if self.item_1_id <= self.item_2_id {
            (self.item_1_id, self.item_2_id)
        } else {
            (self.item_2_id, self.item_1_id)
        }
    }
}

/// New decision values applied to an existing comparison on rejudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonUpdate {
    pub selected_item_id: Option<u64>,
    pub state: ComparisonState,
}

fn raise_completed_cycles(
    tx_participants: &TransactionalTree,
    participant_id: u64,
    completed_cycles: u32,
) -> Result<(), ConflictableTransactionError<StoreError>> {
    let key = keys::participant_key(participant_id);
    let Some(raw) = tx_participants.get(key.as_bytes())? else {
        return Err(ConflictableTransactionError::Abort(StoreError::NotFound {
            entity: "participant".to_string(),
            key: participant_id.to_string(),
        }));
    };
    let mut participant: Participant = tx_deserialize(&raw)?;
    if completed_cycles > participant.completed_cycles {
        participant.completed_cycles = completed_cycles;
        tx_participants.insert(key.as_bytes(), tx_serialize(&participant)?)?;
    }
    Ok(())
}

impl Store {
    pub fn get_comparison(&self, comparison_id: u64) -> Result<Option<Comparison>, StoreError> {
        let key = keys::comparison_key(comparison_id);
        match self.comparisons.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Comparisons of one participant in id (creation) order.
    pub fn list_participant_comparisons(
        &self,
        participant_id: u64,
    ) -> Result<Vec<Comparison>, StoreError> {
        let prefix = keys::comparison_participant_prefix(participant_id);
        let mut comparisons = Vec::new();
        for entry in self.comparisons.scan_prefix(prefix.as_bytes()) {
            let (key, _) = entry?;
            let Some(comparison_id) = keys::trailing_id(&key) else {
                tracing::warn!("Malformed comparison index key");
                continue;
            };
            if let Some(comparison) = self.get_comparison(comparison_id)? {
                comparisons.push(comparison);
            }
        }
        Ok(comparisons)
    }

    pub fn count_participant_comparisons(&self, participant_id: u64) -> Result<u64, StoreError> {
        let prefix = keys::comparison_participant_prefix(participant_id);
        let mut count = 0u64;
        for entry in self.comparisons.scan_prefix(prefix.as_bytes()) {
            let _ = entry?;
            count += 1;
        }
        Ok(count)
    }

    pub fn list_all_comparisons(&self) -> Result<Vec<Comparison>, StoreError> {
        let mut comparisons = Vec::new();
        for entry in self.comparisons.iter() {
            let (key, value) = entry?;
            if key.starts_with(b"participant:") {
                continue;
            }
            comparisons.push(Self::deserialize::<Comparison>(&value)?);
        }
        Ok(comparisons)
    }

    /// Inserts a first judgment and, when given, raises the participant's
    /// completed cycle count in the same transaction.
    pub fn record_new_comparison(
        &self,
        comparison: &Comparison,
        completed_cycles: Option<u32>,
    ) -> Result<(), StoreError> {
        let key = keys::comparison_key(comparison.id);
        let index_key = keys::comparison_participant_index(comparison.participant_id, comparison.id);
        let bytes = Self::serialize(comparison)?;

        (&self.comparisons, &self.participants).transaction(|(tx_comparisons, tx_participants)| {
            if tx_comparisons.get(key.as_bytes())?.is_some() {
                return Err(ConflictableTransactionError::Abort(StoreError::Conflict {
                    entity: "comparison".to_string(),
                    key: comparison.id.to_string(),
                }));
            }
            tx_comparisons.insert(key.as_bytes(), bytes.as_slice())?;
            tx_comparisons.insert(index_key.as_bytes(), &[] as &[u8])?;
            if let Some(completed) = completed_cycles {
                raise_completed_cycles(tx_participants, comparison.participant_id, completed)?;
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Overwrites the decision of an existing comparison owned by `participant_id`.
    /// The pair itself is never touched.
    pub fn rejudge_comparison(
        &self,
        participant_id: u64,
        comparison_id: u64,
        update: ComparisonUpdate,
        completed_cycles: Option<u32>,
    ) -> Result<Comparison, StoreError> {
        let key = keys::comparison_key(comparison_id);

        let updated = (&self.comparisons, &self.participants).transaction(
            |(tx_comparisons, tx_participants)| {
                let existing = match tx_comparisons.get(key.as_bytes())? {
                    Some(raw) => tx_deserialize::<Comparison>(&raw)?,
                    None => {
                        return Err(ConflictableTransactionError::Abort(StoreError::NotFound {
                            entity: "comparison".to_string(),
                            key: comparison_id.to_string(),
                        }))
                    }
                };
                if existing.participant_id != participant_id {
                    return Err(ConflictableTransactionError::Abort(StoreError::NotFound {
                        entity: "comparison".to_string(),
                        key: comparison_id.to_string(),
                    }));
                }

                let mut comparison = existing;
                comparison.selected_item_id = update.selected_item_id;
                comparison.state = update.state;
                comparison.updated_at = Utc::now();
                tx_comparisons.insert(key.as_bytes(), tx_serialize(&comparison)?)?;

                if let Some(completed) = completed_cycles {
                    raise_completed_cycles(tx_participants, participant_id, completed)?;
                }
                Ok(comparison)
            },
        )?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tempfile::tempdir;

    use super::*;

    fn open(name: &str) -> (tempfile::TempDir, Store) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join(name).to_str().unwrap()).unwrap();
        (dir, store)
    }

    fn seed_participant(store: &Store, id: u64) {
        let participant = Participant {
            id,
            name: format!("p{id}"),
            email: None,
            age: None,
            country: None,
            answers: BTreeMap::new(),
            accepted_ethics_agreement: true,
            completed_cycles: 0,
            created_at: Utc::now(),
        };
        store.create_participant_with_groups(&participant, &[1]).unwrap();
    }

    fn comparison(id: u64, participant_id: u64) -> Comparison {
        Comparison {
            id,
            participant_id,
            item_1_id: 2,
            item_2_id: 1,
            selected_item_id: None,
            state: ComparisonState::Skipped,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn insert_applies_cycle_count_atomically() {
        let (_dir, store) = open("c1");
        seed_participant(&store, 1);

        store.record_new_comparison(&comparison(5, 1), Some(1)).unwrap();

        assert_eq!(store.count_participant_comparisons(1).unwrap(), 1);
        assert_eq!(store.require_participant(1).unwrap().completed_cycles, 1);
    }

    #[test]
    fn failed_insert_leaves_no_row() {
        let (_dir, store) = open("c2");

        // No participant row: the cycle update aborts the whole transaction.
        let err = store
            .record_new_comparison(&comparison(5, 1), Some(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(store.get_comparison(5).unwrap().is_none());
        assert_eq!(store.count_participant_comparisons(1).unwrap(), 0);
    }

    #[test]
    fn rejudge_updates_in_place() {
        let (_dir, store) = open("c3");
        seed_participant(&store, 1);
        store.record_new_comparison(&comparison(7, 1), None).unwrap();

        let update = ComparisonUpdate {
            selected_item_id: Some(1),
            state: ComparisonState::Selected,
        };
        store.rejudge_comparison(1, 7, update, None).unwrap();
        let again = store.rejudge_comparison(1, 7, update, None).unwrap();

        let all = store.list_participant_comparisons(1).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(again.selected_item_id, Some(1));
        assert_eq!(again.state, ComparisonState::Selected);
        assert_eq!((again.item_1_id, again.item_2_id), (2, 1));
        assert_eq!(again.pair(), (1, 2));
    }

    #[test]
    fn rejudge_of_foreign_comparison_is_not_found() {
        let (_dir, store) = open("c4");
        seed_participant(&store, 1);
        seed_participant(&store, 2);
        store.record_new_comparison(&comparison(9, 2), None).unwrap();

        let update = ComparisonUpdate {
            selected_item_id: Some(1),
            state: ComparisonState::Selected,
        };
        let err = store.rejudge_comparison(1, 9, update, None).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(
            store.get_comparison(9).unwrap().unwrap().state,
            ComparisonState::Skipped
        );
    }

    #[test]
    fn export_skips_index_rows() {
        let (_dir, store) = open("c5");
        seed_participant(&store, 1);
        store.record_new_comparison(&comparison(1, 1), None).unwrap();
        store.record_new_comparison(&comparison(2, 1), None).unwrap();

        assert_eq!(store.list_all_comparisons().unwrap().len(), 2);
    }
}
