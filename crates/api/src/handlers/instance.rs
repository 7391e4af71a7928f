//! Handlers for assessment instances and their responses.
//!
//! Assignment lives under `/templates/{template_id}/instances` and needs the
//! template-admin role. The `/instances/{id}` routes are open to the
//! assignee as well.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rubrica_core::assessment::{
    check_accepts_responses, check_submit, validate_response_value, IndicatorCategory,
    ResponseValue,
};
use rubrica_core::error::CoreError;
use rubrica_core::lifecycle::check_assignable;
use rubrica_core::scoring::{score_assessment, MIN_TRANSFORMATION_YEAR};
use rubrica_core::types::DbId;
use rubrica_db::models::instance::{AssessmentInstance, AssignTemplate, CreateInstance};
use rubrica_db::models::response::{AssessmentResponse, SaveResponse};
use rubrica_db::models::result::InstanceResult;
use rubrica_db::models::snapshot::SnapshotContent;
use rubrica_db::repositories::{InstanceRepo, ResponseRepo, ResultRepo, SnapshotRepo};
use serde::Serialize;
use sqlx::PgPool;
use validator::Validate;

use super::find_template;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAuth, RequireTemplateAdmin};
use crate::state::AppState;

/// An instance with the content it was assigned and the answers so far.
#[derive(Debug, Serialize)]
pub struct InstanceDetail {
    pub instance: AssessmentInstance,
    pub content: SnapshotContent,
    pub responses: Vec<AssessmentResponse>,
    /// Present once the instance has been submitted.
    pub result: Option<InstanceResult>,
}

/// Body of a successful submit.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub instance: AssessmentInstance,
    pub result: InstanceResult,
}

/// GET /api/v1/templates/{template_id}/instances
pub async fn list_by_template(
    RequireTemplateAdmin(_user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path(template_id): Path<DbId>,
) -> AppResult<Json<Vec<AssessmentInstance>>> {
    find_template(&state.pool, template_id).await?;
    let instances = InstanceRepo::list_by_template(&state.pool, template_id).await?;
    Ok(Json(instances))
}

/// POST /api/v1/templates/{template_id}/instances
///
/// Assign the template's latest snapshot to a user as a `pending` instance.
/// `transformation_year` defaults to 1.
pub async fn assign(
    RequireTemplateAdmin(user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path(template_id): Path<DbId>,
    Json(input): Json<AssignTemplate>,
) -> AppResult<(StatusCode, Json<AssessmentInstance>)> {
    input.validate()?;
    let template = find_template(&state.pool, template_id).await?;
    check_assignable(template.lifecycle()?)?;

    let snapshot = SnapshotRepo::latest_for_template(&state.pool, template_id)
        .await?
        .ok_or_else(|| {
            AppError::InternalError(format!("Published template {template_id} has no snapshot"))
        })?;

    if InstanceRepo::find_open_for_user_on_snapshot(&state.pool, snapshot.id, input.user_id)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(
            "El usuario ya tiene una evaluación abierta de esta versión".into(),
        )));
    }

    let instance = InstanceRepo::create(
        &state.pool,
        &CreateInstance {
            template_id,
            snapshot_id: snapshot.id,
            template_version: snapshot.version,
            user_id: input.user_id,
            transformation_year: input.transformation_year.unwrap_or(MIN_TRANSFORMATION_YEAR),
            assigned_by: Some(user.user_id),
        },
    )
    .await?;

    tracing::info!(
        template_id,
        instance_id = instance.id,
        user_id = input.user_id,
        assigned_by = user.user_id,
        "Template assigned",
    );
    Ok((StatusCode::CREATED, Json(instance)))
}

/// GET /api/v1/instances/{id}
pub async fn get_by_id(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<InstanceDetail>> {
    let instance = find_instance_for(&state.pool, &user, id).await?;
    let content = load_content(&state.pool, instance.snapshot_id).await?;
    let responses = ResponseRepo::list_by_instance(&state.pool, id).await?;
    let result = ResultRepo::find_by_instance(&state.pool, id).await?;
    Ok(Json(InstanceDetail {
        instance,
        content,
        responses,
        result,
    }))
}

/// GET /api/v1/instances/{id}/results
pub async fn get_result(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<InstanceResult>> {
    find_instance_for(&state.pool, &user, id).await?;
    let result = ResultRepo::find_by_instance(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "InstanceResult",
            id,
        }))?;
    Ok(Json(result))
}

/// GET /api/v1/instances/{id}/responses
pub async fn list_responses(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Vec<AssessmentResponse>>> {
    find_instance_for(&state.pool, &user, id).await?;
    let responses = ResponseRepo::list_by_instance(&state.pool, id).await?;
    Ok(Json(responses))
}

/// PUT /api/v1/instances/{id}/responses
///
/// Save the answer to one indicator. The value is checked against the
/// indicator as it exists in the instance's snapshot.
pub async fn save_response(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SaveResponse>,
) -> AppResult<Json<AssessmentResponse>> {
    input.validate()?;
    let instance = find_instance_for(&state.pool, &user, id).await?;
    check_accepts_responses(instance.parsed_status()?)?;

    let content = load_content(&state.pool, instance.snapshot_id).await?;
    let indicator = content.find_indicator(input.indicator_id).ok_or_else(|| {
        AppError::Core(CoreError::Validation(format!(
            "El indicador {} no pertenece a esta evaluación",
            input.indicator_id
        )))
    })?;
    let category: IndicatorCategory = indicator.category.parse()?;
    validate_response_value(category, &input.value(), &indicator.frequency_unit_options)?;

    let response = ResponseRepo::save(&state.pool, id, &input, user.user_id).await?;
    tracing::debug!(
        instance_id = id,
        indicator_id = input.indicator_id,
        user_id = user.user_id,
        "Response saved",
    );
    Ok(Json(response))
}

/// POST /api/v1/instances/{id}/submit
///
/// Complete the instance once every indicator has an answer, scoring it
/// against the snapshot's modules and `scoring_config`.
pub async fn submit(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<SubmitResponse>> {
    let instance = find_instance_for(&state.pool, &user, id).await?;
    let content = load_content(&state.pool, instance.snapshot_id).await?;

    let indicator_ids: Vec<DbId> = content
        .modules
        .iter()
        .flat_map(|m| m.indicators.iter().map(|i| i.id))
        .collect();
    let answered = ResponseRepo::count_answered(&state.pool, id, &indicator_ids).await?;
    check_submit(
        instance.parsed_status()?,
        indicator_ids.len(),
        usize::try_from(answered).unwrap_or(0),
    )?;

    let responses: HashMap<DbId, ResponseValue> = ResponseRepo::list_by_instance(&state.pool, id)
        .await?
        .iter()
        .map(|r| (r.indicator_id, r.value()))
        .collect();
    let score = score_assessment(
        &content.scoring_modules()?,
        &responses,
        &content.template.scoring_config()?,
        instance.transformation_year,
    )?;

    let (completed, result) = InstanceRepo::complete(&state.pool, id, &score, Some(user.user_id))
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "La evaluación ya fue enviada y no admite cambios".into(),
            ))
        })?;

    tracing::info!(
        instance_id = id,
        user_id = user.user_id,
        total_score = result.total_score,
        overall_level = result.overall_level,
        "Instance submitted",
    );
    Ok(Json(SubmitResponse {
        instance: completed,
        result,
    }))
}

// ── Private helpers ──────────────────────────────────────────────────────

/// Load an instance the caller may see: their own, or any for template admins.
async fn find_instance_for(
    pool: &PgPool,
    user: &AuthUser,
    id: DbId,
) -> AppResult<AssessmentInstance> {
    let instance = InstanceRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "AssessmentInstance",
            id,
        }))?;

    if instance.user_id != user.user_id && !user.is_template_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "No tiene acceso a esta evaluación".into(),
        )));
    }
    Ok(instance)
}

async fn load_content(pool: &PgPool, snapshot_id: DbId) -> AppResult<SnapshotContent> {
    let snapshot = SnapshotRepo::find_by_id(pool, snapshot_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TemplateSnapshot",
            id: snapshot_id,
        }))?;
    snapshot
        .content()
        .map_err(|e| AppError::InternalError(format!("Snapshot {snapshot_id} is unreadable: {e}")))
}
