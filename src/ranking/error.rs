use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum RankingError {
    /// Missing or invalid study configuration (weights, behaviour values).
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("not enough eligible items: {available} available, 2 required")]
    InsufficientItems { available: usize },
    #[error("every pair has reached the repeat limit")]
    ExhaustedPairs,
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    /// The submitted decision is not allowed by the study or does not match the pair.
    #[error("invalid decision: {0}")]
    InvalidDecision(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
