use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;

use crate::ranking::types::CycleStatus;
use crate::ranking::RankingSession;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::visitor::Visitor;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(status))
        .route("/continue", post(continue_cycle))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContinueResponse {
    status: CycleStatus,
}

async fn status(
    visitor: Visitor,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let settings = state.settings().await;
    let status = {
        let mut rng = state.fork_rng();
        RankingSession::new(state.store(), &settings, &mut rng)
            .thank_you_status(visitor.participant_id())?
    };
    Ok(ok(status))
}

async fn continue_cycle(
    visitor: Visitor,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let settings = state.settings().await;
    let status = {
        let mut rng = state.fork_rng();
        RankingSession::new(state.store(), &settings, &mut rng)
            .continue_cycle(visitor.participant_id())?
    };
    Ok(ok(ContinueResponse { status }))
}
