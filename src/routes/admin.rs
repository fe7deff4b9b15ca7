use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::Router;
use serde::Serialize;

use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::store::operations::comparisons::Comparison;
use crate::store::operations::participants::{Participant, ParticipantGroup};
use crate::store::operations::preferences::ParticipantItem;
use crate::store::operations::study::{Group, Item, StudyDefinition};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/study", put(setup_study))
        .route("/export", get(export))
        .route("/settings", get(get_settings))
        .route_layer(axum::middleware::from_fn_with_state(state, admin_gate))
}

/// Admin routes do not exist unless `ADMIN_ACCESS` is on.
async fn admin_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if !state.config().admin_access {
        return AppError::not_found("Not found").into_response();
    }
    next.run(req).await
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetupSummary {
    groups: usize,
    items: usize,
}

async fn setup_study(
    State(state): State<AppState>,
    JsonBody(definition): JsonBody<StudyDefinition>,
) -> Result<impl IntoResponse, AppError> {
    state.store().setup_study(&definition)?;
    state.replace_settings(definition.settings.clone()).await;
    Ok(ok(SetupSummary {
        groups: definition.groups.len(),
        items: definition.items.len(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StudyExport {
    participants: Vec<Participant>,
    participant_groups: Vec<ParticipantGroup>,
    participant_items: Vec<ParticipantItem>,
    groups: Vec<Group>,
    items: Vec<Item>,
    comparisons: Vec<Comparison>,
}

async fn export(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let store = state.store();
    let export = StudyExport {
        participants: store.list_participants()?,
        participant_groups: store.list_participant_groups()?,
        participant_items: store.list_all_participant_items()?,
        groups: store.list_groups()?,
        items: store.list_items()?,
        comparisons: store.list_all_comparisons()?,
    };
    tracing::info!(
        participants = export.participants.len(),
        comparisons = export.comparisons.len(),
        "Study data exported"
    );
    Ok(ok(export))
}

async fn get_settings(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(ok(state.settings().await))
}
