//! Route definitions for the `/instances` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::instance;
use crate::state::AppState;

/// Routes mounted at `/instances`.
///
/// ```text
/// GET    /{id}               get_by_id
/// GET    /{id}/responses     list_responses
/// PUT    /{id}/responses     save_response
/// POST   /{id}/submit        submit
/// GET    /{id}/results       get_result
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(instance::get_by_id))
        .route(
            "/{id}/responses",
            get(instance::list_responses).put(instance::save_response),
        )
        .route("/{id}/submit", post(instance::submit))
        .route("/{id}/results", get(instance::get_result))
}
