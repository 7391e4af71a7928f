//! Repository for the `templates` table.
//!
//! Besides plain CRUD this hosts the multi-table lifecycle operations
//! (publish, duplicate, cascading delete) so each runs in one transaction.

use rubrica_core::lifecycle::{DependentCounts, INITIAL_VERSION};
use rubrica_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use rubrica_core::types::DbId;
use sqlx::PgPool;

use crate::models::snapshot::TemplateSnapshot;
use crate::models::template::{CreateTemplate, Template, TemplateFilter, UpdateTemplate};
use crate::repositories::snapshot_repo::SnapshotRepo;

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, area, name, description, status, version, is_archived, \
    scoring_config, published_at, published_by, archived_at, archived_by, \
    created_by, created_at, updated_at";

/// A freshly duplicated draft and how much content was copied into it.
#[derive(Debug, Clone)]
pub struct DuplicatedTemplate {
    pub template: Template,
    pub modules: u64,
    pub indicators: u64,
}

/// Provides CRUD and lifecycle operations for assessment templates.
pub struct TemplateRepo;

impl TemplateRepo {
    // ── Standard CRUD ────────────────────────────────────────────────

    /// Insert a new draft template at the initial version.
    ///
    /// `name` is passed separately so the caller can hand in the trimmed value.
    pub async fn create(
        pool: &PgPool,
        input: &CreateTemplate,
        name: &str,
        created_by: DbId,
    ) -> Result<Template, sqlx::Error> {
        let query = format!(
            "INSERT INTO templates
                (area, name, description, scoring_config, version, status, created_by)
             VALUES ($1, $2, $3, COALESCE($4, '{{}}'::jsonb), $5, 'draft', $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(input.area.as_str())
            .bind(name)
            .bind(&input.description)
            .bind(&input.scoring_config)
            .bind(INITIAL_VERSION)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Find a template by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Template>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM templates WHERE id = $1");
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List templates, most recently updated first.
    ///
    /// Archived templates are hidden unless `include_archived` is set.
    pub async fn list(pool: &PgPool, filter: &TemplateFilter) -> Result<Vec<Template>, sqlx::Error> {
        let limit = clamp_limit(filter.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
        let offset = clamp_offset(filter.offset);
        let query = format!(
            "SELECT {COLUMNS} FROM templates
             WHERE ($1::text IS NULL OR area = $1)
               AND ($2::text IS NULL OR status = $2)
               AND ($3 OR (is_archived = false AND status <> 'archived'))
             ORDER BY updated_at DESC, id DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(&filter.area)
            .bind(&filter.status)
            .bind(filter.include_archived)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Update template metadata. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTemplate,
    ) -> Result<Option<Template>, sqlx::Error> {
        let query = format!(
            "UPDATE templates SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                scoring_config = COALESCE($4, scoring_config)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.scoring_config)
            .fetch_optional(pool)
            .await
    }

    // ── Counts ───────────────────────────────────────────────────────

    /// Highest version among templates of an area, if any exist.
    pub async fn max_version_in_area(pool: &PgPool, area: &str) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<i32>>("SELECT MAX(version) FROM templates WHERE area = $1")
            .bind(area)
            .fetch_one(pool)
            .await
    }

    /// Count `(modules, indicators)` belonging to a template.
    pub async fn content_counts(pool: &PgPool, id: DbId) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as::<_, (i64, i64)>(
            "SELECT
                (SELECT COUNT(*) FROM template_modules WHERE template_id = $1),
                (SELECT COUNT(*) FROM template_indicators i
                   JOIN template_modules m ON m.id = i.module_id
                  WHERE m.template_id = $1)",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Count every row a cascading delete of this template would remove.
    pub async fn dependent_counts(pool: &PgPool, id: DbId) -> Result<DependentCounts, sqlx::Error> {
        let (instances, responses, snapshots, modules) = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            "SELECT
                (SELECT COUNT(*) FROM assessment_instances WHERE template_id = $1),
                (SELECT COUNT(*) FROM assessment_responses r
                   JOIN assessment_instances i ON i.id = r.instance_id
                  WHERE i.template_id = $1),
                (SELECT COUNT(*) FROM template_snapshots WHERE template_id = $1),
                (SELECT COUNT(*) FROM template_modules WHERE template_id = $1)",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(DependentCounts {
            instances,
            responses,
            snapshots,
            modules,
        })
    }

    // ── Lifecycle transitions ────────────────────────────────────────

    /// Move a draft to `published` and capture its first snapshot.
    ///
    /// The status update only matches an unarchived draft, so a concurrent
    /// publish yields `None` instead of a second snapshot.
    pub async fn publish(
        pool: &PgPool,
        id: DbId,
        published_by: DbId,
    ) -> Result<Option<(Template, TemplateSnapshot)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE templates SET
                status = 'published',
                published_at = NOW(),
                published_by = $2
             WHERE id = $1 AND status = 'draft' AND is_archived = false
             RETURNING {COLUMNS}"
        );
        let Some(template) = sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .bind(published_by)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let snapshot = SnapshotRepo::capture(&mut *tx, &template, Some(published_by)).await?;

        tx.commit().await?;
        Ok(Some((template, snapshot)))
    }

    /// Update a published template in place and capture a fresh snapshot.
    ///
    /// Existing instances keep pointing at their own snapshot; only new
    /// assignments pick up the edit.
    pub async fn update_published(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTemplate,
        edited_by: DbId,
    ) -> Result<Option<(Template, TemplateSnapshot)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE templates SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                scoring_config = COALESCE($4, scoring_config)
             WHERE id = $1 AND status = 'published' AND is_archived = false
             RETURNING {COLUMNS}"
        );
        let Some(template) = sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.scoring_config)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let snapshot = SnapshotRepo::capture(&mut *tx, &template, Some(edited_by)).await?;

        tx.commit().await?;
        Ok(Some((template, snapshot)))
    }

    /// Set `is_archived`. Only matches a published, unarchived template.
    pub async fn archive(
        pool: &PgPool,
        id: DbId,
        archived_by: DbId,
    ) -> Result<Option<Template>, sqlx::Error> {
        let query = format!(
            "UPDATE templates SET
                is_archived = true,
                archived_at = NOW(),
                archived_by = $2
             WHERE id = $1 AND status = 'published' AND is_archived = false
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .bind(archived_by)
            .fetch_optional(pool)
            .await
    }

    /// Clear the archive flag and return the template to `published`.
    pub async fn restore(pool: &PgPool, id: DbId) -> Result<Option<Template>, sqlx::Error> {
        let query = format!(
            "UPDATE templates SET
                is_archived = false,
                status = 'published',
                archived_at = NULL,
                archived_by = NULL
             WHERE id = $1 AND (is_archived = true OR status = 'archived')
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Deep-copy `source` into a new draft at `version`.
    ///
    /// Modules and indicators keep their order, weights and descriptors.
    /// The source rows are only read.
    pub async fn duplicate(
        pool: &PgPool,
        source: &Template,
        name: &str,
        version: i32,
        created_by: DbId,
    ) -> Result<DuplicatedTemplate, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO templates
                (area, name, description, scoring_config, version, status, created_by)
             VALUES ($1, $2, $3, $4, $5, 'draft', $6)
             RETURNING {COLUMNS}"
        );
        let template = sqlx::query_as::<_, Template>(&query)
            .bind(&source.area)
            .bind(name)
            .bind(&source.description)
            .bind(&source.scoring_config)
            .bind(version)
            .bind(created_by)
            .fetch_one(&mut *tx)
            .await?;

        let source_modules: Vec<DbId> = sqlx::query_scalar(
            "SELECT id FROM template_modules WHERE template_id = $1 ORDER BY display_order, id",
        )
        .bind(source.id)
        .fetch_all(&mut *tx)
        .await?;

        let mut indicators = 0;
        for source_module_id in &source_modules {
            let new_module_id: DbId = sqlx::query_scalar(
                "INSERT INTO template_modules
                    (template_id, name, description, instructions, display_order, weight)
                 SELECT $1, name, description, instructions, display_order, weight
                   FROM template_modules WHERE id = $2
                 RETURNING id",
            )
            .bind(template.id)
            .bind(source_module_id)
            .fetch_one(&mut *tx)
            .await?;

            let copied = sqlx::query(
                "INSERT INTO template_indicators
                    (module_id, code, name, question, description, category,
                     frequency_config, frequency_unit_options,
                     level_0_descriptor, level_1_descriptor, level_2_descriptor,
                     level_3_descriptor, level_4_descriptor, display_order, weight)
                 SELECT $1, code, name, question, description, category,
                        frequency_config, frequency_unit_options,
                        level_0_descriptor, level_1_descriptor, level_2_descriptor,
                        level_3_descriptor, level_4_descriptor, display_order, weight
                   FROM template_indicators WHERE module_id = $2",
            )
            .bind(new_module_id)
            .bind(source_module_id)
            .execute(&mut *tx)
            .await?;
            indicators += copied.rows_affected();
        }

        tx.commit().await?;
        Ok(DuplicatedTemplate {
            template,
            modules: source_modules.len() as u64,
            indicators,
        })
    }

    /// Permanently delete a template and everything hanging off it.
    ///
    /// Order: responses, results, instances, snapshots, then the template row (modules
    /// and indicators follow through `ON DELETE CASCADE`). Returns `true` if
    /// the template row was removed.
    pub async fn cascade_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "DELETE FROM assessment_responses
              WHERE instance_id IN (SELECT id FROM assessment_instances WHERE template_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM assessment_instance_results
              WHERE instance_id IN (SELECT id FROM assessment_instances WHERE template_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM assessment_instances WHERE template_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM template_snapshots WHERE template_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
