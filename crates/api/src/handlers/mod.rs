pub mod indicator;
pub mod instance;
pub mod template;
pub mod template_module;

use rubrica_core::error::CoreError;
use rubrica_core::lifecycle::check_content_edit;
use rubrica_core::types::DbId;
use rubrica_db::models::template::Template;
use rubrica_db::models::template_module::TemplateModule;
use rubrica_db::repositories::{TemplateModuleRepo, TemplateRepo};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};

// ── Shared lookups ───────────────────────────────────────────────────────

/// Load a template or fail with 404.
pub(crate) async fn find_template(pool: &PgPool, id: DbId) -> AppResult<Template> {
    TemplateRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Template",
            id,
        }))
}

/// Load a template whose modules and indicators may be changed.
pub(crate) async fn find_editable_template(pool: &PgPool, id: DbId) -> AppResult<Template> {
    let template = find_template(pool, id).await?;
    check_content_edit(template.lifecycle()?)?;
    Ok(template)
}

/// Load a module scoped to its template or fail with 404.
pub(crate) async fn find_module(
    pool: &PgPool,
    template_id: DbId,
    module_id: DbId,
) -> AppResult<TemplateModule> {
    TemplateModuleRepo::find_by_id(pool, template_id, module_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TemplateModule",
            id: module_id,
        }))
}
