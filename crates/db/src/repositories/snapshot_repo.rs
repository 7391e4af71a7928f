//! Repository for the append-only `template_snapshots` table.

use rubrica_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::snapshot::{SnapshotContent, TemplateSnapshot};
use crate::models::template::Template;
use crate::repositories::template_module_repo::TemplateModuleRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, template_id, version, snapshot_data, created_by, created_at";

/// Captures and reads immutable template snapshots. Rows are never updated.
pub struct SnapshotRepo;

impl SnapshotRepo {
    /// Freeze `template` and its current modules and indicators.
    ///
    /// Runs on the caller's connection so the capture commits together with
    /// the status change that triggered it.
    pub async fn capture(
        conn: &mut PgConnection,
        template: &Template,
        created_by: Option<DbId>,
    ) -> Result<TemplateSnapshot, sqlx::Error> {
        let modules = TemplateModuleRepo::list_with_indicators(&mut *conn, template.id).await?;
        let content = SnapshotContent {
            template: template.clone(),
            modules,
        };
        let data = serde_json::to_value(&content)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        let query = format!(
            "INSERT INTO template_snapshots (template_id, version, snapshot_data, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let snapshot = sqlx::query_as::<_, TemplateSnapshot>(&query)
            .bind(template.id)
            .bind(template.version)
            .bind(data)
            .bind(created_by)
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(
            template_id = template.id,
            snapshot_id = snapshot.id,
            "Template snapshot captured",
        );
        Ok(snapshot)
    }

    /// Find a snapshot by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TemplateSnapshot>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM template_snapshots WHERE id = $1");
        sqlx::query_as::<_, TemplateSnapshot>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The snapshot new instances of this template should be created on.
    pub async fn latest_for_template(
        pool: &PgPool,
        template_id: DbId,
    ) -> Result<Option<TemplateSnapshot>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM template_snapshots
             WHERE template_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, TemplateSnapshot>(&query)
            .bind(template_id)
            .fetch_optional(pool)
            .await
    }

    /// Every snapshot of a template, newest first.
    pub async fn list_by_template(
        pool: &PgPool,
        template_id: DbId,
    ) -> Result<Vec<TemplateSnapshot>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM template_snapshots
             WHERE template_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, TemplateSnapshot>(&query)
            .bind(template_id)
            .fetch_all(pool)
            .await
    }
}
