//! Handlers for indicators nested under a module:
//! `/templates/{template_id}/modules/{module_id}/indicators[/{id}]`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rubrica_core::assessment::{validate_frequency_units, validate_weight};
use rubrica_core::error::CoreError;
use rubrica_core::types::DbId;
use rubrica_db::models::indicator::{
    parse_frequency_config, CreateIndicator, Indicator, ReorderIndicators, UpdateIndicator,
};
use rubrica_db::repositories::IndicatorRepo;
use validator::Validate;

use super::{find_editable_template, find_module};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireTemplateAdmin;
use crate::state::AppState;

/// GET /api/v1/templates/{template_id}/modules/{module_id}/indicators
pub async fn list_by_module(
    RequireTemplateAdmin(_user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path((template_id, module_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<Vec<Indicator>>> {
    find_module(&state.pool, template_id, module_id).await?;
    let indicators = IndicatorRepo::list_by_module(&state.pool, module_id).await?;
    Ok(Json(indicators))
}

/// POST /api/v1/templates/{template_id}/modules/{module_id}/indicators
pub async fn create(
    RequireTemplateAdmin(_user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path((template_id, module_id)): Path<(DbId, DbId)>,
    Json(input): Json<CreateIndicator>,
) -> AppResult<(StatusCode, Json<Indicator>)> {
    input.validate()?;
    check_numbers(
        input.weight,
        input.frequency_unit_options.as_deref(),
        input.frequency_config.as_ref(),
    )?;
    find_editable_template(&state.pool, template_id).await?;
    find_module(&state.pool, template_id, module_id).await?;

    let indicator = IndicatorRepo::create(&state.pool, module_id, &input).await?;
    tracing::info!(
        template_id,
        module_id,
        indicator_id = indicator.id,
        category = %indicator.category,
        "Indicator created",
    );
    Ok((StatusCode::CREATED, Json(indicator)))
}

/// GET /api/v1/templates/{template_id}/modules/{module_id}/indicators/{id}
pub async fn get_by_id(
    RequireTemplateAdmin(_user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path((template_id, module_id, id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<Json<Indicator>> {
    find_module(&state.pool, template_id, module_id).await?;
    let indicator = IndicatorRepo::find_by_id(&state.pool, module_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Indicator",
            id,
        }))?;
    Ok(Json(indicator))
}

/// PUT /api/v1/templates/{template_id}/modules/{module_id}/indicators/{id}
pub async fn update(
    RequireTemplateAdmin(_user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path((template_id, module_id, id)): Path<(DbId, DbId, DbId)>,
    Json(input): Json<UpdateIndicator>,
) -> AppResult<Json<Indicator>> {
    input.validate()?;
    check_numbers(
        input.weight,
        input.frequency_unit_options.as_deref(),
        input.frequency_config.as_ref(),
    )?;
    find_editable_template(&state.pool, template_id).await?;
    find_module(&state.pool, template_id, module_id).await?;

    let indicator = IndicatorRepo::update(&state.pool, module_id, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Indicator",
            id,
        }))?;
    Ok(Json(indicator))
}

/// DELETE /api/v1/templates/{template_id}/modules/{module_id}/indicators/{id}
pub async fn delete(
    RequireTemplateAdmin(_user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path((template_id, module_id, id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<StatusCode> {
    find_editable_template(&state.pool, template_id).await?;
    find_module(&state.pool, template_id, module_id).await?;

    if IndicatorRepo::delete(&state.pool, module_id, id).await? {
        tracing::info!(template_id, module_id, indicator_id = id, "Indicator deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Indicator",
            id,
        }))
    }
}

/// PUT /api/v1/templates/{template_id}/modules/{module_id}/indicators/reorder
pub async fn reorder(
    RequireTemplateAdmin(_user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path((template_id, module_id)): Path<(DbId, DbId)>,
    Json(input): Json<ReorderIndicators>,
) -> AppResult<Json<Vec<Indicator>>> {
    find_editable_template(&state.pool, template_id).await?;
    find_module(&state.pool, template_id, module_id).await?;

    if !IndicatorRepo::reorder(&state.pool, module_id, &input.indicator_ids).await? {
        return Err(AppError::Core(CoreError::Validation(
            "La lista debe contener cada indicador del módulo exactamente una vez".into(),
        )));
    }

    let indicators = IndicatorRepo::list_by_module(&state.pool, module_id).await?;
    Ok(Json(indicators))
}

fn check_numbers(
    weight: Option<f64>,
    units: Option<&[String]>,
    frequency_config: Option<&serde_json::Value>,
) -> AppResult<()> {
    if let Some(weight) = weight {
        validate_weight(weight)?;
    }
    if let Some(units) = units {
        validate_frequency_units(units)?;
    }
    if let Some(config) = frequency_config {
        parse_frequency_config(config)?;
    }
    Ok(())
}
