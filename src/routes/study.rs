use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ranking::settings::StudySettings;
use crate::ranking::types::WeightConfiguration;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::store::operations::study::Group;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_study))
}

/// Behaviour flags a participant-facing client needs; weights stay private.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicBehaviour {
    cycle_length: u32,
    max_cycles: u32,
    allow_skip: bool,
    allow_back: bool,
    allow_ties: bool,
    offer_escape_route: bool,
    render_item_preference_page: bool,
    weight_configuration: WeightConfiguration,
}

impl From<&StudySettings> for PublicBehaviour {
    fn from(settings: &StudySettings) -> Self {
        Self {
            cycle_length: settings.cycle_length,
            max_cycles: settings.max_cycles,
            allow_skip: settings.allow_skip,
            allow_back: settings.allow_back,
            allow_ties: settings.allow_ties,
            offer_escape_route: settings.offer_escape_route,
            render_item_preference_page: settings.render_item_preference_page,
            weight_configuration: settings.weight_configuration,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StudyInfo {
    set_up_at: Option<DateTime<Utc>>,
    groups: Vec<Group>,
    behaviour: PublicBehaviour,
}

async fn get_study(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let settings = state.settings().await;
    Ok(ok(StudyInfo {
        set_up_at: state.store().study_setup_at()?,
        groups: state.store().list_groups()?,
        behaviour: PublicBehaviour::from(&settings),
    }))
}
