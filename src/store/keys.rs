//! Key layout for the sled trees. Numeric ids are zero-padded so that
//! lexicographic order matches numeric order inside prefix scans.

pub const STUDY_SETTINGS_KEY: &str = "settings";
pub const STUDY_SETUP_AT_KEY: &str = "setup_at";

fn pad(id: u64) -> String {
    format!("{:020}", id)
}

/// Parses the id stored after the last `:` (or the whole key when there is none).
pub fn trailing_id(key: &[u8]) -> Option<u64> {
    let text = std::str::from_utf8(key).ok()?;
    text.rsplit(':').next()?.parse::<u64>().ok()
}

pub fn participant_key(participant_id: u64) -> String {
    pad(participant_id)
}

pub fn group_key(group_id: u64) -> String {
    pad(group_id)
}

pub fn item_key(item_id: u64) -> String {
    pad(item_id)
}

pub fn group_items_key(group_id: u64, item_id: u64) -> String {
    format!("group:{}:{}", pad(group_id), pad(item_id))
}

pub fn group_items_prefix(group_id: u64) -> String {
    format!("group:{}:", pad(group_id))
}

pub fn item_groups_key(item_id: u64, group_id: u64) -> String {
    format!("item:{}:{}", pad(item_id), pad(group_id))
}

pub fn item_groups_prefix(item_id: u64) -> String {
    format!("item:{}:", pad(item_id))
}

pub fn participant_group_key(participant_id: u64, group_id: u64) -> String {
    format!("{}:{}", pad(participant_id), pad(group_id))
}

pub fn participant_item_key(participant_id: u64, item_id: u64) -> String {
    format!("{}:{}", pad(participant_id), pad(item_id))
}

/// Shared prefix for every per-participant row keyed `participant:child`.
pub fn participant_prefix(participant_id: u64) -> String {
    format!("{}:", pad(participant_id))
}

pub fn comparison_key(comparison_id: u64) -> String {
    pad(comparison_id)
}

pub fn comparison_participant_index(participant_id: u64, comparison_id: u64) -> String {
    format!("participant:{}:{}", pad(participant_id), pad(comparison_id))
}

pub fn comparison_participant_prefix(participant_id: u64) -> String {
    format!("participant:{}:", pad(participant_id))
}

pub fn visitor_session_key(token_hash: &str) -> String {
    token_hash.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_ids_sort_numerically() {
        assert!(comparison_key(9) < comparison_key(10));
        assert!(participant_item_key(2, 99) < participant_item_key(10, 1));
    }

    #[test]
    fn trailing_id_reads_last_segment() {
        let key = comparison_participant_index(7, 42);
        assert_eq!(trailing_id(key.as_bytes()), Some(42));
        assert_eq!(trailing_id(comparison_key(5).as_bytes()), Some(5));
        assert_eq!(trailing_id(b"participant:abc"), None);
    }

    #[test]
    fn index_keys_do_not_collide_with_primary_keys() {
        let index = comparison_participant_index(1, 1);
        assert!(!index.starts_with(&comparison_key(1)));
        assert!(index.starts_with(&comparison_participant_prefix(1)));
    }
}
