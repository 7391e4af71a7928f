//! Handlers for modules nested under a template:
//! `/templates/{template_id}/modules[/{id}]`.
//!
//! Reads work in any state; writes require the template to be a draft.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rubrica_core::assessment::validate_weight;
use rubrica_core::error::CoreError;
use rubrica_core::types::DbId;
use rubrica_db::models::template_module::{
    CreateTemplateModule, ReorderModules, TemplateModule, UpdateTemplateModule,
};
use rubrica_db::repositories::TemplateModuleRepo;
use validator::Validate;

use super::{find_editable_template, find_module, find_template};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireTemplateAdmin;
use crate::state::AppState;

/// GET /api/v1/templates/{template_id}/modules
pub async fn list_by_template(
    RequireTemplateAdmin(_user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path(template_id): Path<DbId>,
) -> AppResult<Json<Vec<TemplateModule>>> {
    find_template(&state.pool, template_id).await?;
    let modules = TemplateModuleRepo::list_by_template(&state.pool, template_id).await?;
    Ok(Json(modules))
}

/// POST /api/v1/templates/{template_id}/modules
///
/// Appends the module after the existing ones.
pub async fn create(
    RequireTemplateAdmin(_user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path(template_id): Path<DbId>,
    Json(input): Json<CreateTemplateModule>,
) -> AppResult<(StatusCode, Json<TemplateModule>)> {
    input.validate()?;
    if let Some(weight) = input.weight {
        validate_weight(weight)?;
    }
    find_editable_template(&state.pool, template_id).await?;

    let module = TemplateModuleRepo::create(&state.pool, template_id, &input).await?;
    tracing::info!(template_id, module_id = module.id, "Module created");
    Ok((StatusCode::CREATED, Json(module)))
}

/// GET /api/v1/templates/{template_id}/modules/{id}
pub async fn get_by_id(
    RequireTemplateAdmin(_user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path((template_id, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<TemplateModule>> {
    let module = find_module(&state.pool, template_id, id).await?;
    Ok(Json(module))
}

/// PUT /api/v1/templates/{template_id}/modules/{id}
pub async fn update(
    RequireTemplateAdmin(_user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path((template_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateTemplateModule>,
) -> AppResult<Json<TemplateModule>> {
    input.validate()?;
    if let Some(weight) = input.weight {
        validate_weight(weight)?;
    }
    find_editable_template(&state.pool, template_id).await?;

    let module = TemplateModuleRepo::update(&state.pool, template_id, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TemplateModule",
            id,
        }))?;
    Ok(Json(module))
}

/// DELETE /api/v1/templates/{template_id}/modules/{id}
///
/// Removes the module together with its indicators.
pub async fn delete(
    RequireTemplateAdmin(_user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path((template_id, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    find_editable_template(&state.pool, template_id).await?;

    if TemplateModuleRepo::delete(&state.pool, template_id, id).await? {
        tracing::info!(template_id, module_id = id, "Module deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "TemplateModule",
            id,
        }))
    }
}

/// PUT /api/v1/templates/{template_id}/modules/reorder
///
/// `module_ids` must list every module of the template exactly once.
pub async fn reorder(
    RequireTemplateAdmin(_user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path(template_id): Path<DbId>,
    Json(input): Json<ReorderModules>,
) -> AppResult<Json<Vec<TemplateModule>>> {
    find_editable_template(&state.pool, template_id).await?;

    if !TemplateModuleRepo::reorder(&state.pool, template_id, &input.module_ids).await? {
        return Err(AppError::Core(CoreError::Validation(
            "La lista debe contener cada módulo del template exactamente una vez".into(),
        )));
    }

    let modules = TemplateModuleRepo::list_by_template(&state.pool, template_id).await?;
    Ok(Json(modules))
}
