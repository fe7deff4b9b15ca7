use crate::store::keys;
use crate::store::operations::comparisons::Comparison;
use crate::store::{Store, StoreError};

const VERSION_KEY: &str = "_meta:version";

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![
        ("001_initial", m001_initial),
        ("002_comparison_participant_index", m002_comparison_participant_index),
    ]
}

/// Applies every migration newer than the stored version.
///
/// Each migration must be idempotent: the process can stop after a migration
/// ran but before its version was recorded, and it will run again on restart.
/// Versions only move forward.
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    let all = migrations();

    for (index, (name, func)) in all.iter().enumerate() {
        let version = (index + 1) as u32;
        if version > current {
            tracing::info!(version, name, "Running migration");
            func(store)?;
            set_version(store, version)?;
            tracing::info!(version, name, "Migration complete");
        } else {
            tracing::debug!(version, name, "Migration already applied, skipping");
        }
    }

    Ok(())
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    match store.config_versions.get(VERSION_KEY.as_bytes())? {
        Some(raw) => {
            let bytes: [u8; 4] = raw.as_ref().try_into().unwrap_or([0; 4]);
            Ok(u32::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("Refuse to downgrade from {} to {}", current, version),
        });
    }

    store
        .config_versions
        .insert(VERSION_KEY.as_bytes(), &version.to_be_bytes())?;
    Ok(())
}

fn m001_initial(_store: &Store) -> Result<(), StoreError> {
    Ok(())
}

/// Rebuilds the per-participant comparison index from primary rows.
fn m002_comparison_participant_index(store: &Store) -> Result<(), StoreError> {
    for entry in store.comparisons.iter() {
        let (key, value) = entry?;
        if key.starts_with(b"participant:") {
            continue;
        }
        let comparison: Comparison = Store::deserialize(&value)?;
        let index_key =
            keys::comparison_participant_index(comparison.participant_id, comparison.id);
        store.comparisons.insert(index_key.as_bytes(), &[])?;
    }
    Ok(())
}
