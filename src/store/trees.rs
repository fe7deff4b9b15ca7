pub const PARTICIPANTS: &str = "participants";
pub const GROUPS: &str = "groups";
pub const ITEMS: &str = "items";
pub const ITEM_GROUPS: &str = "item_groups";
pub const PARTICIPANT_GROUPS: &str = "participant_groups";
pub const PARTICIPANT_ITEMS: &str = "participant_items";
pub const COMPARISONS: &str = "comparisons";
pub const VISITOR_SESSIONS: &str = "visitor_sessions";
pub const STUDY_META: &str = "study_meta";
pub const CONFIG_VERSIONS: &str = "config_versions";
