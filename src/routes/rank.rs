use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::extractors::{JsonBody, QueryParams};
use crate::ranking::types::{
    ComparisonId, CycleStatus, DecisionPayload, PresentRequest, SessionState,
};
use crate::ranking::RankingSession;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::visitor::Visitor;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(present).post(submit))
        .route("/previous", post(previous))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PresentQuery {
    comparison_id: Option<ComparisonId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    status: CycleStatus,
    comparison_id: Option<ComparisonId>,
    redirect_comparison_id: Option<ComparisonId>,
    comparison_ids: Vec<ComparisonId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PreviousResponse {
    previous_comparison_id: Option<ComparisonId>,
}

async fn present(
    visitor: Visitor,
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PresentQuery>,
) -> Result<impl IntoResponse, AppError> {
    let settings = state.settings().await;
    let presentation = {
        let mut rng = state.fork_rng();
        RankingSession::new(state.store(), &settings, &mut rng).present(
            visitor.state(),
            PresentRequest {
                comparison_id: query.comparison_id,
            },
        )?
    };
    Ok(ok(presentation))
}

async fn submit(
    visitor: Visitor,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<DecisionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let settings = state.settings().await;
    let submission = {
        let mut rng = state.fork_rng();
        RankingSession::new(state.store(), &settings, &mut rng)
            .submit(visitor.state().clone(), payload)?
    };
    visitor.save_state(state.store(), &submission.session)?;

    Ok(ok(SubmitResponse {
        status: submission.status,
        comparison_id: submission.comparison_id,
        redirect_comparison_id: submission.redirect_comparison_id,
        comparison_ids: submission.session.comparison_ids,
    }))
}

async fn previous(
    visitor: Visitor,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let settings = state.settings().await;
    let session: SessionState = {
        let mut rng = state.fork_rng();
        RankingSession::new(state.store(), &settings, &mut rng)
            .navigate_back(visitor.state().clone())?
    };
    visitor.save_state(state.store(), &session)?;

    Ok(ok(PreviousResponse {
        previous_comparison_id: session.previous_comparison_id,
    }))
}
