pub mod keys;
pub mod migrate;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::TransactionError;
use sled::Db;
use thiserror::Error;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub participants: sled::Tree,
    pub groups: sled::Tree,
    pub items: sled::Tree,
    pub item_groups: sled::Tree,
    pub participant_groups: sled::Tree,
    pub participant_items: sled::Tree,
    pub comparisons: sled::Tree,
    pub visitor_sessions: sled::Tree,
    pub study_meta: sled::Tree,
    pub config_versions: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("conflict: entity={entity}, key={key}")]
    Conflict { entity: String, key: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
}

impl From<TransactionError<StoreError>> for StoreError {
    fn from(error: TransactionError<StoreError>) -> Self {
        match error {
            TransactionError::Abort(store_error) => store_error,
            TransactionError::Storage(storage_error) => StoreError::Sled(storage_error),
        }
    }
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let participants = db.open_tree(trees::PARTICIPANTS)?;
        let groups = db.open_tree(trees::GROUPS)?;
        let items = db.open_tree(trees::ITEMS)?;
        let item_groups = db.open_tree(trees::ITEM_GROUPS)?;
        let participant_groups = db.open_tree(trees::PARTICIPANT_GROUPS)?;
        let participant_items = db.open_tree(trees::PARTICIPANT_ITEMS)?;
        let comparisons = db.open_tree(trees::COMPARISONS)?;
        let visitor_sessions = db.open_tree(trees::VISITOR_SESSIONS)?;
        let study_meta = db.open_tree(trees::STUDY_META)?;
        let config_versions = db.open_tree(trees::CONFIG_VERSIONS)?;

        Ok(Self {
            db,
            participants,
            groups,
            items,
            item_groups,
            participant_groups,
            participant_items,
            comparisons,
            visitor_sessions,
            study_meta,
            config_versions,
        })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    /// Next value of the database-wide id sequence. Ids start at 1.
    pub fn next_id(&self) -> Result<u64, StoreError> {
        Ok(self.db.generate_id()? + 1)
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Abort helper for values decoded inside a sled transaction closure.
pub(crate) fn tx_deserialize<T: DeserializeOwned>(
    bytes: &[u8],
) -> Result<T, sled::transaction::ConflictableTransactionError<StoreError>> {
    serde_json::from_slice(bytes).map_err(|error| {
        sled::transaction::ConflictableTransactionError::Abort(StoreError::Serialization(error))
    })
}

pub(crate) fn tx_serialize<T: Serialize>(
    value: &T,
) -> Result<Vec<u8>, sled::transaction::ConflictableTransactionError<StoreError>> {
    serde_json::to_vec(value).map_err(|error| {
        sled::transaction::ConflictableTransactionError::Abort(StoreError::Serialization(error))
    })
}
