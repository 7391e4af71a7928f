//! Repository for the `assessment_responses` table.

use rubrica_core::types::DbId;
use sqlx::PgPool;

use crate::models::response::{AssessmentResponse, SaveResponse};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, instance_id, indicator_id, coverage_value, frequency_value, \
    frequency_unit, profundity_level, rationale, evidence_notes, responded_by, \
    responded_at, updated_at";

/// Provides upsert and read operations for responses.
pub struct ResponseRepo;

impl ResponseRepo {
    /// Insert or overwrite the answer to one indicator of an instance.
    ///
    /// In the same transaction a `pending` instance is moved to
    /// `in_progress` with `started_at` set.
    pub async fn save(
        pool: &PgPool,
        instance_id: DbId,
        input: &SaveResponse,
        responded_by: DbId,
    ) -> Result<AssessmentResponse, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO assessment_responses
                (instance_id, indicator_id, coverage_value, frequency_value, frequency_unit,
                 profundity_level, rationale, evidence_notes, responded_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT ON CONSTRAINT uq_assessment_responses_instance_indicator
             DO UPDATE SET
                coverage_value = EXCLUDED.coverage_value,
                frequency_value = EXCLUDED.frequency_value,
                frequency_unit = EXCLUDED.frequency_unit,
                profundity_level = EXCLUDED.profundity_level,
                rationale = EXCLUDED.rationale,
                evidence_notes = EXCLUDED.evidence_notes,
                responded_by = EXCLUDED.responded_by,
                responded_at = NOW()
             RETURNING {COLUMNS}"
        );
        let response = sqlx::query_as::<_, AssessmentResponse>(&query)
            .bind(instance_id)
            .bind(input.indicator_id)
            .bind(input.coverage_value)
            .bind(input.frequency_value)
            .bind(&input.frequency_unit)
            .bind(input.profundity_level)
            .bind(&input.rationale)
            .bind(&input.evidence_notes)
            .bind(responded_by)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE assessment_instances SET status = 'in_progress', started_at = NOW()
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(instance_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(response)
    }

    /// List an instance's responses, oldest first.
    pub async fn list_by_instance(
        pool: &PgPool,
        instance_id: DbId,
    ) -> Result<Vec<AssessmentResponse>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assessment_responses
             WHERE instance_id = $1
             ORDER BY id"
        );
        sqlx::query_as::<_, AssessmentResponse>(&query)
            .bind(instance_id)
            .fetch_all(pool)
            .await
    }

    /// How many of `indicator_ids` have a response in the instance.
    pub async fn count_answered(
        pool: &PgPool,
        instance_id: DbId,
        indicator_ids: &[DbId],
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM assessment_responses
             WHERE instance_id = $1 AND indicator_id = ANY($2)",
        )
        .bind(instance_id)
        .bind(indicator_ids)
        .fetch_one(pool)
        .await
    }
}
