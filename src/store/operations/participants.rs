use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Transactional;

use crate::store::keys;
use crate::store::{tx_deserialize, tx_serialize, Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: u64,
    pub name: String,
    pub email: Option<String>,
    pub age: Option<u32>,
    pub country: Option<String>,
    /// Free-form demographic answers keyed by question name.
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
    pub accepted_ethics_agreement: bool,
    pub completed_cycles: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantGroup {
    pub participant_id: u64,
    pub group_id: u64,
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// Inserts the participant together with its group selections.
    pub fn create_participant_with_groups(
        &self,
        participant: &Participant,
        group_ids: &[u64],
    ) -> Result<(), StoreError> {
        let participant_key = keys::participant_key(participant.id);
        let participant_bytes = Self::serialize(participant)?;

        let now = participant.created_at;
        let mut group_rows = Vec::with_capacity(group_ids.len());
        for group_id in group_ids {
            let row = ParticipantGroup {
                participant_id: participant.id,
                group_id: *group_id,
                created_at: now,
            };
            group_rows.push((
                keys::participant_group_key(participant.id, *group_id),
                Self::serialize(&row)?,
            ));
        }

        (&self.participants, &self.participant_groups)
            .transaction(|(tx_participants, tx_groups)| {
                if tx_participants.get(participant_key.as_bytes())?.is_some() {
                    return sled::transaction::abort(StoreError::Conflict {
                        entity: "participant".to_string(),
                        key: participant.id.to_string(),
                    });
                }
                tx_participants.insert(participant_key.as_bytes(), participant_bytes.as_slice())?;
                for (key, bytes) in &group_rows {
                    tx_groups.insert(key.as_bytes(), bytes.as_slice())?;
                }
                Ok(())
            })?;

        tracing::info!(
            participant_id = participant.id,
            groups = group_ids.len(),
            "Participant registered"
        );
        Ok(())
    }

    pub fn get_participant(&self, participant_id: u64) -> Result<Option<Participant>, StoreError> {
        let key = keys::participant_key(participant_id);
        match self.participants.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn require_participant(&self, participant_id: u64) -> Result<Participant, StoreError> {
        self.get_participant(participant_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "participant".to_string(),
                key: participant_id.to_string(),
            })
    }

    pub fn list_participants(&self) -> Result<Vec<Participant>, StoreError> {
        let mut participants = Vec::new();
        for entry in self.participants.iter() {
            let (_, value) = entry?;
            participants.push(Self::deserialize::<Participant>(&value)?);
        }
        Ok(participants)
    }

    pub fn list_participant_group_ids(&self, participant_id: u64) -> Result<Vec<u64>, StoreError> {
        let prefix = keys::participant_prefix(participant_id);
        let mut group_ids = Vec::new();
        for entry in self.participant_groups.scan_prefix(prefix.as_bytes()) {
            let (key, _) = entry?;
            if let Some(group_id) = keys::trailing_id(&key) {
                group_ids.push(group_id);
            }
        }
        Ok(group_ids)
    }

    pub fn list_participant_groups(&self) -> Result<Vec<ParticipantGroup>, StoreError> {
        let mut rows = Vec::new();
        for entry in self.participant_groups.iter() {
            let (_, value) = entry?;
            rows.push(Self::deserialize::<ParticipantGroup>(&value)?);
        }
        Ok(rows)
    }

    /// Raises the stored cycle count to `completed_cycles`; a lower value is ignored.
    /// Returns the value stored after the call.
    pub fn advance_completed_cycles(
        &self,
        participant_id: u64,
        completed_cycles: u32,
    ) -> Result<u32, StoreError> {
        let key = keys::participant_key(participant_id);
        let stored = self
            .participants
            .transaction(|tx| {
                let Some(raw) = tx.get(key.as_bytes())? else {
                    return sled::transaction::abort(StoreError::NotFound {
                        entity: "participant".to_string(),
                        key: participant_id.to_string(),
                    });
                };
                let mut participant: Participant = tx_deserialize(&raw)?;
                if completed_cycles > participant.completed_cycles {
                    participant.completed_cycles = completed_cycles;
                    tx.insert(key.as_bytes(), tx_serialize(&participant)?)?;
                }
                Ok(participant.completed_cycles)
            })?;
        Ok(stored)
    }
}
