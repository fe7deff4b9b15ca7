pub mod comparisons;
pub mod participants;
pub mod preferences;
pub mod study;
pub mod visitor_sessions;
