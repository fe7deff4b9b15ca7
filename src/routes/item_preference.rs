use std::collections::BTreeSet;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::extractors::JsonBody;
use crate::response::{created, ok, AppError};
use crate::state::AppState;
use crate::store::operations::preferences::ParticipantItem;
use crate::store::operations::study::Item;
use crate::store::Store;
use crate::visitor::Visitor;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(next_item).post(state_preference))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NextItemResponse {
    done: bool,
    item: Option<Item>,
    remaining: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreferenceRequest {
    item_id: u64,
    known: bool,
}

/// Items of the participant's groups, ordered by id.
fn group_item_ids(store: &Store, group_ids: &[u64]) -> Result<BTreeSet<u64>, AppError> {
    let mut item_ids = BTreeSet::new();
    for group_id in group_ids {
        item_ids.extend(store.list_group_item_ids(*group_id)?);
    }
    Ok(item_ids)
}

async fn next_item(
    visitor: Visitor,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let settings = state.settings().await;
    let session = visitor.state();
    if !settings.item_preference_enabled(session.weight_conf) {
        return Ok(ok(NextItemResponse {
            done: true,
            item: None,
            remaining: 0,
        }));
    }

    let store = state.store();
    let group_ids = store.list_participant_group_ids(session.participant_id)?;
    let stated: BTreeSet<u64> = store
        .list_participant_items(session.participant_id)?
        .into_iter()
        .map(|row| row.item_id)
        .collect();
    let pending: Vec<u64> = group_item_ids(store, &group_ids)?
        .difference(&stated)
        .copied()
        .collect();

    let picked = pending.choose(&mut state.fork_rng()).copied();
    let item = match picked {
        Some(item_id) => store.get_item(item_id)?,
        None => None,
    };

    Ok(ok(NextItemResponse {
        done: item.is_none(),
        remaining: pending.len(),
        item,
    }))
}

async fn state_preference(
    visitor: Visitor,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<PreferenceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let settings = state.settings().await;
    let session = visitor.state();
    if !settings.item_preference_enabled(session.weight_conf) {
        return Err(AppError::bad_request(
            "PREFERENCE_STEP_DISABLED",
            "This study does not ask for item familiarity",
        ));
    }

    let store = state.store();
    let group_ids = store.list_participant_group_ids(session.participant_id)?;
    if !group_item_ids(store, &group_ids)?.contains(&req.item_id) {
        return Err(AppError::bad_request(
            "ITEM_NOT_IN_GROUPS",
            "Item does not belong to the selected groups",
        ));
    }

    let preference = ParticipantItem {
        participant_id: session.participant_id,
        item_id: req.item_id,
        known: req.known,
        created_at: Utc::now(),
    };
    store.create_participant_item(&preference)?;
    tracing::info!(
        participant_id = preference.participant_id,
        item_id = preference.item_id,
        known = preference.known,
        "Item preference stated"
    );

    Ok(created(preference))
}
