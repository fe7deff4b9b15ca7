use std::collections::{BTreeMap, BTreeSet};

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::constants::SESSION_COOKIE_NAME;
use crate::extractors::JsonBody;
use crate::ranking::types::SessionState;
use crate::response::{created, AppError};
use crate::state::AppState;
use crate::store::operations::participants::Participant;
use crate::validation::{is_valid_email, validate_age, validate_answers, validate_participant_name};
use crate::visitor;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(register))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    name: String,
    email: Option<String>,
    age: Option<u32>,
    country: Option<String>,
    #[serde(default)]
    answers: BTreeMap<String, String>,
    #[serde(default)]
    accepted_ethics_agreement: bool,
    group_ids: Vec<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    participant_id: u64,
    token: String,
    group_ids: Vec<u64>,
    item_preference_required: bool,
}

fn normalized(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !req.accepted_ethics_agreement {
        return Err(AppError::bad_request(
            "ETHICS_AGREEMENT_REQUIRED",
            "The ethics agreement must be accepted",
        ));
    }
    validate_participant_name(&req.name)
        .map_err(|msg| AppError::bad_request("INVALID_NAME", msg))?;
    let email = normalized(req.email);
    if let Some(email) = &email {
        if !is_valid_email(email) {
            return Err(AppError::bad_request(
                "INVALID_EMAIL",
                "Email address is invalid",
            ));
        }
    }
    if let Some(age) = req.age {
        validate_age(age).map_err(|msg| AppError::bad_request("INVALID_AGE", msg))?;
    }
    validate_answers(&req.answers)
        .map_err(|msg| AppError::bad_request("INVALID_ANSWERS", msg))?;

    let group_ids: Vec<u64> = req
        .group_ids
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if group_ids.is_empty() {
        return Err(AppError::bad_request(
            "GROUP_REQUIRED",
            "Select at least one group",
        ));
    }
    for group_id in &group_ids {
        if state.store().get_group(*group_id)?.is_none() {
            return Err(AppError::bad_request(
                "UNKNOWN_GROUP",
                &format!("Group {} does not exist", group_id),
            ));
        }
    }

    let settings = state.settings().await;
    let participant = Participant {
        id: state.store().next_id()?,
        name: req.name.trim().to_string(),
        email,
        age: req.age,
        country: normalized(req.country),
        answers: req.answers,
        accepted_ethics_agreement: true,
        completed_cycles: 0,
        created_at: Utc::now(),
    };
    state
        .store()
        .create_participant_with_groups(&participant, &group_ids)?;

    let session = SessionState::new(
        participant.id,
        group_ids.clone(),
        settings.weight_configuration,
    );
    let ttl_minutes = state.config().session_ttl_minutes;
    let token = visitor::start_session(state.store(), session, ttl_minutes)?;

    let cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl_minutes * 60
    );
    let body = RegisterResponse {
        participant_id: participant.id,
        token,
        group_ids,
        item_preference_required: settings
            .item_preference_enabled(settings.weight_configuration),
    };
    Ok(([(header::SET_COOKIE, cookie)], created(body)))
}
