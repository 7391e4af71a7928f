//! Route definitions for the `/templates` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{indicator, instance, template, template_module};
use crate::state::AppState;

/// Routes mounted at `/templates`.
///
/// ```text
/// GET    /                                   list
/// POST   /                                   create
/// GET    /{id}                               get_by_id
/// PUT    /{id}                               update
/// DELETE /{id}                               delete
/// POST   /{id}/publish                       publish
/// POST   /{id}/duplicate                     duplicate
/// POST   /{id}/archive                       archive (?action=restore)
/// GET    /{id}/versions                      versions
/// GET    /{id}/instances                     instance::list_by_template
/// POST   /{id}/instances                     instance::assign
///
/// GET    /{id}/modules                       list_by_template
/// POST   /{id}/modules                       create
/// PUT    /{id}/modules/reorder               reorder
/// GET    /{id}/modules/{module_id}           get_by_id
/// PUT    /{id}/modules/{module_id}           update
/// DELETE /{id}/modules/{module_id}           delete
///
/// GET    /{id}/modules/{module_id}/indicators           list_by_module
/// POST   /{id}/modules/{module_id}/indicators           create
/// PUT    /{id}/modules/{module_id}/indicators/reorder   reorder
/// GET    /{id}/modules/{module_id}/indicators/{ind_id}  get_by_id
/// PUT    /{id}/modules/{module_id}/indicators/{ind_id}  update
/// DELETE /{id}/modules/{module_id}/indicators/{ind_id}  delete
/// ```
pub fn router() -> Router<AppState> {
    let indicator_routes = Router::new()
        .route("/", get(indicator::list_by_module).post(indicator::create))
        .route("/reorder", put(indicator::reorder))
        .route(
            "/{ind_id}",
            get(indicator::get_by_id)
                .put(indicator::update)
                .delete(indicator::delete),
        );

    let module_routes = Router::new()
        .route(
            "/",
            get(template_module::list_by_template).post(template_module::create),
        )
        .route("/reorder", put(template_module::reorder))
        .route(
            "/{module_id}",
            get(template_module::get_by_id)
                .put(template_module::update)
                .delete(template_module::delete),
        )
        .nest("/{module_id}/indicators", indicator_routes);

    Router::new()
        .route("/", get(template::list).post(template::create))
        .route(
            "/{id}",
            get(template::get_by_id)
                .put(template::update)
                .delete(template::delete),
        )
        .route("/{id}/publish", post(template::publish))
        .route("/{id}/duplicate", post(template::duplicate))
        .route("/{id}/archive", post(template::archive))
        .route("/{id}/versions", get(template::versions))
        .route(
            "/{id}/instances",
            get(instance::list_by_template).post(instance::assign),
        )
        .nest("/{id}/modules", module_routes)
}
