//! Repository for the `template_modules` table.

use rubrica_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::indicator::Indicator;
use crate::models::template_module::{
    CreateTemplateModule, ModuleWithIndicators, TemplateModule, UpdateTemplateModule,
};
use crate::repositories::indicator_repo;

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, template_id, name, description, instructions, \
    display_order, weight, created_at, updated_at";

/// Provides CRUD operations for the modules of a template.
pub struct TemplateModuleRepo;

impl TemplateModuleRepo {
    /// Append a module after the template's current last module.
    pub async fn create(
        pool: &PgPool,
        template_id: DbId,
        input: &CreateTemplateModule,
    ) -> Result<TemplateModule, sqlx::Error> {
        let query = format!(
            "INSERT INTO template_modules
                (template_id, name, description, instructions, weight, display_order)
             VALUES ($1, $2, $3, $4, COALESCE($5, 1.0),
                (SELECT COALESCE(MAX(display_order), 0) + 1
                   FROM template_modules WHERE template_id = $1))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TemplateModule>(&query)
            .bind(template_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.instructions)
            .bind(input.weight)
            .fetch_one(pool)
            .await
    }

    /// Find a module by ID, scoped to its template.
    pub async fn find_by_id(
        pool: &PgPool,
        template_id: DbId,
        id: DbId,
    ) -> Result<Option<TemplateModule>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM template_modules WHERE id = $1 AND template_id = $2");
        sqlx::query_as::<_, TemplateModule>(&query)
            .bind(id)
            .bind(template_id)
            .fetch_optional(pool)
            .await
    }

    /// List a template's modules in display order.
    pub async fn list_by_template(
        pool: &PgPool,
        template_id: DbId,
    ) -> Result<Vec<TemplateModule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM template_modules
             WHERE template_id = $1
             ORDER BY display_order, id"
        );
        sqlx::query_as::<_, TemplateModule>(&query)
            .bind(template_id)
            .fetch_all(pool)
            .await
    }

    /// Load every module of a template with its indicators, both ordered.
    ///
    /// Takes a connection so snapshot capture can call it inside a transaction.
    pub async fn list_with_indicators(
        conn: &mut PgConnection,
        template_id: DbId,
    ) -> Result<Vec<ModuleWithIndicators>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM template_modules
             WHERE template_id = $1
             ORDER BY display_order, id"
        );
        let modules = sqlx::query_as::<_, TemplateModule>(&query)
            .bind(template_id)
            .fetch_all(&mut *conn)
            .await?;

        let query = format!(
            "SELECT {} FROM template_indicators i
             JOIN template_modules m ON m.id = i.module_id
             WHERE m.template_id = $1
             ORDER BY i.display_order, i.id",
            indicator_repo::PREFIXED_COLUMNS
        );
        let indicators = sqlx::query_as::<_, Indicator>(&query)
            .bind(template_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(group_indicators(modules, indicators))
    }

    /// Update a module. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        template_id: DbId,
        id: DbId,
        input: &UpdateTemplateModule,
    ) -> Result<Option<TemplateModule>, sqlx::Error> {
        let query = format!(
            "UPDATE template_modules SET
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                instructions = COALESCE($5, instructions),
                weight = COALESCE($6, weight)
             WHERE id = $1 AND template_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TemplateModule>(&query)
            .bind(id)
            .bind(template_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.instructions)
            .bind(input.weight)
            .fetch_optional(pool)
            .await
    }

    /// Delete a module and, through the foreign key, its indicators.
    pub async fn delete(pool: &PgPool, template_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM template_modules WHERE id = $1 AND template_id = $2")
            .bind(id)
            .bind(template_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Rewrite `display_order` to follow `module_ids`.
    ///
    /// `module_ids` must name exactly the template's modules, each once.
    /// Returns `false` without touching anything when it does not.
    pub async fn reorder(
        pool: &PgPool,
        template_id: DbId,
        module_ids: &[DbId],
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let existing: Vec<DbId> = sqlx::query_scalar(
            "SELECT id FROM template_modules WHERE template_id = $1 ORDER BY id FOR UPDATE",
        )
        .bind(template_id)
        .fetch_all(&mut *tx)
        .await?;

        if !same_members(&existing, module_ids) {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE template_modules m
                SET display_order = ord.position::int
               FROM UNNEST($1::bigint[]) WITH ORDINALITY AS ord(id, position)
              WHERE m.id = ord.id",
        )
        .bind(module_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}

/// Attach each indicator to its module, preserving both orders.
fn group_indicators(
    modules: Vec<TemplateModule>,
    mut indicators: Vec<Indicator>,
) -> Vec<ModuleWithIndicators> {
    modules
        .into_iter()
        .map(|module| {
            let (own, rest): (Vec<_>, Vec<_>) =
                indicators.drain(..).partition(|i| i.module_id == module.id);
            indicators = rest;
            ModuleWithIndicators {
                module,
                indicators: own,
            }
        })
        .collect()
}

/// `true` when `requested` is a permutation of the sorted `existing` ids.
pub(crate) fn same_members(existing: &[DbId], requested: &[DbId]) -> bool {
    let mut sorted = requested.to_vec();
    sorted.sort_unstable();
    sorted == existing
}
