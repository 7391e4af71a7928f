//! Repository for the `template_indicators` table.

use rubrica_core::types::DbId;
use sqlx::PgPool;

use crate::models::indicator::{CreateIndicator, Indicator, UpdateIndicator};
use crate::repositories::template_module_repo::same_members;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, module_id, code, name, question, description, category, \
    frequency_config, frequency_unit_options, level_0_descriptor, level_1_descriptor, \
    level_2_descriptor, level_3_descriptor, level_4_descriptor, display_order, weight, \
    created_at, updated_at";

/// Same columns qualified with the `i` alias, for joins against modules.
pub(crate) const PREFIXED_COLUMNS: &str = "i.id, i.module_id, i.code, i.name, i.question, \
    i.description, i.category, i.frequency_config, i.frequency_unit_options, \
    i.level_0_descriptor, i.level_1_descriptor, i.level_2_descriptor, i.level_3_descriptor, \
    i.level_4_descriptor, i.display_order, i.weight, i.created_at, i.updated_at";

/// Provides CRUD operations for the indicators of a module.
pub struct IndicatorRepo;

impl IndicatorRepo {
    /// Append an indicator after the module's current last indicator.
    ///
    /// `frequency_unit_options` is stored as given; callers validate it.
    pub async fn create(
        pool: &PgPool,
        module_id: DbId,
        input: &CreateIndicator,
    ) -> Result<Indicator, sqlx::Error> {
        let query = format!(
            "INSERT INTO template_indicators
                (module_id, code, name, question, description, category,
                 frequency_config, frequency_unit_options,
                 level_0_descriptor, level_1_descriptor, level_2_descriptor,
                 level_3_descriptor, level_4_descriptor, weight, display_order)
             VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8::text[], '{{}}'),
                     $9, $10, $11, $12, $13, COALESCE($14, 1.0),
                (SELECT COALESCE(MAX(display_order), 0) + 1
                   FROM template_indicators WHERE module_id = $1))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Indicator>(&query)
            .bind(module_id)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.question)
            .bind(&input.description)
            .bind(input.category.as_str())
            .bind(&input.frequency_config)
            .bind(&input.frequency_unit_options)
            .bind(&input.level_0_descriptor)
            .bind(&input.level_1_descriptor)
            .bind(&input.level_2_descriptor)
            .bind(&input.level_3_descriptor)
            .bind(&input.level_4_descriptor)
            .bind(input.weight)
            .fetch_one(pool)
            .await
    }

    /// Find an indicator by ID, scoped to its module.
    pub async fn find_by_id(
        pool: &PgPool,
        module_id: DbId,
        id: DbId,
    ) -> Result<Option<Indicator>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM template_indicators WHERE id = $1 AND module_id = $2");
        sqlx::query_as::<_, Indicator>(&query)
            .bind(id)
            .bind(module_id)
            .fetch_optional(pool)
            .await
    }

    /// List a module's indicators in display order.
    pub async fn list_by_module(
        pool: &PgPool,
        module_id: DbId,
    ) -> Result<Vec<Indicator>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM template_indicators
             WHERE module_id = $1
             ORDER BY display_order, id"
        );
        sqlx::query_as::<_, Indicator>(&query)
            .bind(module_id)
            .fetch_all(pool)
            .await
    }

    /// Update an indicator. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        module_id: DbId,
        id: DbId,
        input: &UpdateIndicator,
    ) -> Result<Option<Indicator>, sqlx::Error> {
        let query = format!(
            "UPDATE template_indicators SET
                code = COALESCE($3, code),
                name = COALESCE($4, name),
                question = COALESCE($5, question),
                description = COALESCE($6, description),
                category = COALESCE($7, category),
                frequency_config = COALESCE($8, frequency_config),
                frequency_unit_options = COALESCE($9::text[], frequency_unit_options),
                level_0_descriptor = COALESCE($10, level_0_descriptor),
                level_1_descriptor = COALESCE($11, level_1_descriptor),
                level_2_descriptor = COALESCE($12, level_2_descriptor),
                level_3_descriptor = COALESCE($13, level_3_descriptor),
                level_4_descriptor = COALESCE($14, level_4_descriptor),
                weight = COALESCE($15, weight)
             WHERE id = $1 AND module_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Indicator>(&query)
            .bind(id)
            .bind(module_id)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.question)
            .bind(&input.description)
            .bind(input.category.map(|c| c.as_str()))
            .bind(&input.frequency_config)
            .bind(&input.frequency_unit_options)
            .bind(&input.level_0_descriptor)
            .bind(&input.level_1_descriptor)
            .bind(&input.level_2_descriptor)
            .bind(&input.level_3_descriptor)
            .bind(&input.level_4_descriptor)
            .bind(input.weight)
            .fetch_optional(pool)
            .await
    }

    /// Delete an indicator.
    pub async fn delete(pool: &PgPool, module_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM template_indicators WHERE id = $1 AND module_id = $2")
                .bind(id)
                .bind(module_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Rewrite `display_order` to follow `indicator_ids`.
    ///
    /// Returns `false` when the ids are not exactly the module's indicators.
    pub async fn reorder(
        pool: &PgPool,
        module_id: DbId,
        indicator_ids: &[DbId],
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let existing: Vec<DbId> = sqlx::query_scalar(
            "SELECT id FROM template_indicators WHERE module_id = $1 ORDER BY id FOR UPDATE",
        )
        .bind(module_id)
        .fetch_all(&mut *tx)
        .await?;

        if !same_members(&existing, indicator_ids) {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE template_indicators i
                SET display_order = ord.position::int
               FROM UNNEST($1::bigint[]) WITH ORDINALITY AS ord(id, position)
              WHERE i.id = ord.id",
        )
        .bind(indicator_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
