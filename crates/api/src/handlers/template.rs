//! Handlers for the `/templates` resource and its lifecycle actions.
//!
//! Every route here requires the `admin` or `consultor` role. State checks
//! come from `rubrica_core::lifecycle`; the repositories re-check the
//! status in their `WHERE` clauses, so a concurrent transition surfaces
//! as 409 rather than a double publish or archive.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rubrica_core::assessment::TransformationArea;
use rubrica_core::error::CoreError;
use rubrica_core::lifecycle::{
    check_archive, check_metadata_edit, check_publish, check_restore, confirmation_message,
    decide_delete, duplicate_name, successor_version, validate_template_name, DeleteDecision,
    DependentCounts, TemplateStatus, STATUS_ARCHIVED,
};
use rubrica_core::types::{DbId, Timestamp};
use rubrica_db::models::snapshot::{SnapshotStats, TemplateSnapshot};
use rubrica_db::models::template::{
    parse_scoring_config, CreateTemplate, Template, TemplateFilter, UpdateTemplate,
};
use rubrica_db::models::template_module::ModuleWithIndicators;
use rubrica_db::repositories::{SnapshotRepo, TemplateModuleRepo, TemplateRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::find_template;
use crate::assignment::{upgrade_existing_assignments, UpgradeReport};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireTemplateAdmin;
use crate::query::{ArchiveActionParams, ConfirmParams};
use crate::state::AppState;

/// Query parameters for `GET /templates`.
#[derive(Debug, Deserialize)]
pub struct TemplateListParams {
    pub area: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub include_archived: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Template with its content and, once published, how much it is used.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDetail {
    pub template: Template,
    pub modules: Vec<ModuleWithIndicators>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_stats: Option<UsageStats>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub instance_count: i64,
    pub response_count: i64,
    pub has_responses: bool,
}

/// Request body for `POST /templates/{id}/publish`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    #[serde(default)]
    pub upgrade_existing: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub id: DbId,
    pub version: i32,
    pub created_at: Timestamp,
}

impl From<&TemplateSnapshot> for SnapshotSummary {
    fn from(snapshot: &TemplateSnapshot) -> Self {
        Self {
            id: snapshot.id,
            version: snapshot.version,
            created_at: snapshot.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub template: Template,
    pub snapshot: SnapshotSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<UpgradeReport>,
}

/// Request body for `POST /templates/{id}/duplicate`.
#[derive(Debug, Default, Deserialize)]
pub struct DuplicateRequest {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CopyStats {
    pub modules: u64,
    pub indicators: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateResponse {
    pub template: Template,
    pub stats: CopyStats,
    pub source_template_id: DbId,
}

#[derive(Debug, Serialize)]
pub struct TemplateRef {
    pub id: DbId,
    pub name: String,
}

/// Body of `DELETE /templates/{id}`: either the confirmation gate or the result.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DeleteOutcome {
    #[serde(rename_all = "camelCase")]
    RequiresConfirmation {
        requires_confirmation: bool,
        template: TemplateRef,
        counts: DependentCounts,
        message: String,
    },
    Deleted { deleted: DeletedCounts },
}

#[derive(Debug, Serialize)]
pub struct DeletedCounts {
    pub instances: i64,
    pub responses: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionsResponse {
    pub template: VersionsTemplate,
    pub versions: Vec<VersionEntry>,
    pub total_versions: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionsTemplate {
    pub id: DbId,
    pub name: String,
    pub current_status: String,
    pub current_version: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: DbId,
    pub version: i32,
    pub created_at: Timestamp,
    pub created_by: Option<DbId>,
    pub stats: SnapshotStats,
}

/// GET /api/v1/templates
///
/// List templates filtered by area and status. Archived templates are only
/// included with `include_archived=true`.
pub async fn list(
    RequireTemplateAdmin(_user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Query(params): Query<TemplateListParams>,
) -> AppResult<Json<Vec<Template>>> {
    let area = params
        .area
        .as_deref()
        .map(str::parse::<TransformationArea>)
        .transpose()?;
    let status = params
        .status
        .as_deref()
        .map(str::parse::<TemplateStatus>)
        .transpose()?;

    let filter = TemplateFilter {
        area: area.map(|a| a.as_str().to_string()),
        status: status.map(|s| s.as_str().to_string()),
        include_archived: params.include_archived,
        limit: params.limit,
        offset: params.offset,
    };
    let templates = TemplateRepo::list(&state.pool, &filter).await?;
    Ok(Json(templates))
}

/// POST /api/v1/templates
///
/// Create a new draft at the initial version.
pub async fn create(
    RequireTemplateAdmin(user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateTemplate>,
) -> AppResult<(StatusCode, Json<Template>)> {
    input.validate()?;
    let name = validate_template_name(&input.name)?;
    if let Some(config) = &input.scoring_config {
        parse_scoring_config(config)?;
    }

    let template = TemplateRepo::create(&state.pool, &input, name, user.user_id).await?;

    tracing::info!(
        template_id = template.id,
        area = %template.area,
        user_id = user.user_id,
        "Template created",
    );
    Ok((StatusCode::CREATED, Json(template)))
}

/// GET /api/v1/templates/{id}
pub async fn get_by_id(
    RequireTemplateAdmin(_user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<TemplateDetail>> {
    let template = find_template(&state.pool, id).await?;

    let mut conn = state.pool.acquire().await?;
    let modules = TemplateModuleRepo::list_with_indicators(&mut conn, id).await?;
    drop(conn);

    let usage_stats = if template.lifecycle()?.status == TemplateStatus::Published {
        let counts = TemplateRepo::dependent_counts(&state.pool, id).await?;
        Some(UsageStats {
            instance_count: counts.instances,
            response_count: counts.responses,
            has_responses: counts.responses > 0,
        })
    } else {
        None
    };

    Ok(Json(TemplateDetail {
        template,
        modules,
        usage_stats,
    }))
}

/// PUT /api/v1/templates/{id}
///
/// Edit name, description or scoring configuration. Editing a published
/// template captures a new snapshot; instances already assigned keep theirs.
pub async fn update(
    RequireTemplateAdmin(user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateTemplate>,
) -> AppResult<Json<Template>> {
    input.validate()?;
    if input.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "No se enviaron campos para actualizar".into(),
        )));
    }
    if let Some(name) = input.name.as_deref() {
        input.name = Some(validate_template_name(name)?.to_string());
    }
    if let Some(config) = &input.scoring_config {
        parse_scoring_config(config)?;
    }

    let existing = find_template(&state.pool, id).await?;
    let lifecycle = existing.lifecycle()?;
    check_metadata_edit(lifecycle)?;

    let updated = if lifecycle.is_draft() {
        TemplateRepo::update(&state.pool, id, &input).await?
    } else {
        TemplateRepo::update_published(&state.pool, id, &input, user.user_id)
            .await?
            .map(|(template, snapshot)| {
                tracing::info!(
                    template_id = id,
                    snapshot_id = snapshot.id,
                    "Published template edited, new snapshot captured",
                );
                template
            })
    };

    let template = updated.ok_or_else(state_changed)?;
    Ok(Json(template))
}

/// DELETE /api/v1/templates/{id}
///
/// Drafts are removed outright. Published templates must be archived
/// first. Archived templates with instances or responses answer with the
/// affected counts until called again with `?confirm=true`.
pub async fn delete(
    RequireTemplateAdmin(user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<ConfirmParams>,
) -> AppResult<Json<DeleteOutcome>> {
    let template = find_template(&state.pool, id).await?;
    let counts = TemplateRepo::dependent_counts(&state.pool, id).await?;

    match decide_delete(template.lifecycle()?, &counts, params.confirm)? {
        DeleteDecision::RequiresConfirmation => {
            tracing::info!(
                template_id = id,
                instances = counts.instances,
                responses = counts.responses,
                "Template delete awaiting confirmation",
            );
            Ok(Json(DeleteOutcome::RequiresConfirmation {
                requires_confirmation: true,
                template: TemplateRef {
                    id: template.id,
                    name: template.name,
                },
                message: confirmation_message(&counts),
                counts,
            }))
        }
        DeleteDecision::Proceed => {
            if !TemplateRepo::cascade_delete(&state.pool, id).await? {
                return Err(AppError::Core(CoreError::NotFound {
                    entity: "Template",
                    id,
                }));
            }
            tracing::info!(
                template_id = id,
                user_id = user.user_id,
                instances = counts.instances,
                responses = counts.responses,
                snapshots = counts.snapshots,
                "Template deleted",
            );
            Ok(Json(DeleteOutcome::Deleted {
                deleted: DeletedCounts {
                    instances: counts.instances,
                    responses: counts.responses,
                },
            }))
        }
    }
}

/// POST /api/v1/templates/{id}/publish
///
/// Publish a draft and capture its snapshot. With `upgradeExisting`, users
/// holding open instances from earlier versions in the same area get a new
/// instance on this version; that step is best-effort and reported.
pub async fn publish(
    RequireTemplateAdmin(user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<PublishRequest>>,
) -> AppResult<Json<PublishResponse>> {
    let Json(input) = body.unwrap_or_default();
    let existing = find_template(&state.pool, id).await?;
    let (modules, indicators) = TemplateRepo::content_counts(&state.pool, id).await?;
    check_publish(existing.lifecycle()?, modules, indicators)?;

    let (template, snapshot) = TemplateRepo::publish(&state.pool, id, user.user_id)
        .await?
        .ok_or_else(state_changed)?;

    tracing::info!(
        template_id = id,
        snapshot_id = snapshot.id,
        version = template.version,
        user_id = user.user_id,
        "Template published",
    );

    let upgrade = if input.upgrade_existing {
        Some(upgrade_existing_assignments(&state.pool, &template, &snapshot, user.user_id).await?)
    } else {
        None
    };

    Ok(Json(PublishResponse {
        snapshot: SnapshotSummary::from(&snapshot),
        template,
        upgrade,
    }))
}

/// POST /api/v1/templates/{id}/duplicate
///
/// Deep-copy any template into a new draft at the next version of its area.
pub async fn duplicate(
    RequireTemplateAdmin(user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<DuplicateRequest>>,
) -> AppResult<(StatusCode, Json<DuplicateResponse>)> {
    let Json(input) = body.unwrap_or_default();
    let source = find_template(&state.pool, id).await?;
    let name = duplicate_name(&source.name, input.name.as_deref())?;
    let version =
        successor_version(TemplateRepo::max_version_in_area(&state.pool, &source.area).await?);

    let copy = TemplateRepo::duplicate(&state.pool, &source, &name, version, user.user_id).await?;

    tracing::info!(
        source_template_id = id,
        template_id = copy.template.id,
        version,
        modules = copy.modules,
        indicators = copy.indicators,
        "Template duplicated",
    );
    Ok((
        StatusCode::CREATED,
        Json(DuplicateResponse {
            template: copy.template,
            stats: CopyStats {
                modules: copy.modules,
                indicators: copy.indicators,
            },
            source_template_id: id,
        }),
    ))
}

/// POST /api/v1/templates/{id}/archive
///
/// Archive a published template, or restore it with `?action=restore`.
pub async fn archive(
    RequireTemplateAdmin(user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<ArchiveActionParams>,
) -> AppResult<Json<Template>> {
    let existing = find_template(&state.pool, id).await?;
    let lifecycle = existing.lifecycle()?;

    let template = match params.action.as_deref() {
        None | Some("archive") => {
            check_archive(lifecycle)?;
            let template = TemplateRepo::archive(&state.pool, id, user.user_id)
                .await?
                .ok_or_else(state_changed)?;
            tracing::info!(template_id = id, user_id = user.user_id, "Template archived");
            template
        }
        Some("restore") => {
            check_restore(lifecycle)?;
            let template = TemplateRepo::restore(&state.pool, id)
                .await?
                .ok_or_else(state_changed)?;
            tracing::info!(template_id = id, user_id = user.user_id, "Template restored");
            template
        }
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "Acción desconocida '{other}'. Valores permitidos: archive, restore"
            )));
        }
    };
    Ok(Json(template))
}

/// GET /api/v1/templates/{id}/versions
///
/// Snapshot history of a template, newest first.
pub async fn versions(
    RequireTemplateAdmin(_user): RequireTemplateAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<VersionsResponse>> {
    let template = find_template(&state.pool, id).await?;
    let snapshots = SnapshotRepo::list_by_template(&state.pool, id).await?;

    let versions = snapshots
        .iter()
        .map(|snapshot| {
            let content = snapshot.content().map_err(|e| {
                AppError::InternalError(format!("Snapshot {} is unreadable: {e}", snapshot.id))
            })?;
            Ok(VersionEntry {
                id: snapshot.id,
                version: snapshot.version,
                created_at: snapshot.created_at,
                created_by: snapshot.created_by,
                stats: SnapshotStats::from(&content),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let current_status = if template.lifecycle()?.is_archived() {
        STATUS_ARCHIVED.to_string()
    } else {
        template.status.clone()
    };

    Ok(Json(VersionsResponse {
        template: VersionsTemplate {
            id: template.id,
            name: template.name,
            current_status,
            current_version: template.version,
        },
        total_versions: versions.len(),
        versions,
    }))
}

// ── Private helpers ──────────────────────────────────────────────────────

/// The guarded update matched no row: someone else moved the template first.
fn state_changed() -> AppError {
    AppError::Core(CoreError::Conflict(
        "El estado del template cambió durante la operación. Recargue e intente nuevamente"
            .into(),
    ))
}
