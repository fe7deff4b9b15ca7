pub mod admin;
pub mod health;
pub mod item_preference;
pub mod participants;
pub mod rank;
pub mod study;
pub mod thank_you;

use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::middleware::request_id;
use crate::state::AppState;

/// Study uploads carry the full item list.
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .nest("/study", study::router())
        .nest("/participants", participants::router())
        .nest("/item-preference", item_preference::router())
        .nest("/rank", rank::router())
        .nest("/thank-you", thank_you::router())
        .nest("/admin", admin::router(state.clone()))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}
