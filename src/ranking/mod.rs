//! Pairwise comparison scheduling: which pair to show next, how progress maps
//! onto cycles, and how a participant moves back and forth through judgments.

pub mod cycle;
pub mod eligibility;
pub mod error;
pub mod pair_selector;
pub mod session;
pub mod settings;
pub mod types;
pub mod weighting;

pub use error::RankingError;
pub use session::RankingSession;
