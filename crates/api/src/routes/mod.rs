pub mod health;
pub mod instance;
pub mod template;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /templates                                            list, create
/// /templates/{id}                                       get, update, delete (?confirm=true)
/// /templates/{id}/publish                               publish (POST)
/// /templates/{id}/duplicate                             duplicate (POST)
/// /templates/{id}/archive                               archive, restore with ?action=restore (POST)
/// /templates/{id}/versions                              snapshot history
/// /templates/{id}/instances                             list, assign
/// /templates/{id}/modules                               list, create
/// /templates/{id}/modules/reorder                       reorder (PUT)
/// /templates/{id}/modules/{module_id}                   get, update, delete
/// /templates/{id}/modules/{module_id}/indicators        list, create
/// /templates/{id}/modules/{module_id}/indicators/reorder reorder (PUT)
/// /templates/{id}/modules/{module_id}/indicators/{ind}  get, update, delete
///
/// /instances/{id}                                       get
/// /instances/{id}/responses                             list, save (PUT)
/// /instances/{id}/submit                                submit (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Assessment builder: templates, modules, indicators, assignment.
        .nest("/templates", template::router())
        // Assignee-facing instance and response endpoints.
        .nest("/instances", instance::router())
}
