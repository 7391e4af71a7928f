//! Repository for the `assessment_instance_results` table.

use rubrica_core::scoring::AssessmentScore;
use rubrica_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::result::InstanceResult;

const COLUMNS: &str = "id, instance_id, total_score, overall_level, expected_level, \
    meets_expectations, module_scores, calculated_by, calculated_at";

/// Stores one scoring result per instance.
pub struct ResultRepo;

impl ResultRepo {
    /// Insert or replace the result of `instance_id`.
    ///
    /// Runs on the caller's connection so it commits with the completion.
    pub async fn upsert(
        conn: &mut PgConnection,
        instance_id: DbId,
        score: &AssessmentScore,
        calculated_by: Option<DbId>,
    ) -> Result<InstanceResult, sqlx::Error> {
        let module_scores = serde_json::to_value(&score.module_scores)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        let query = format!(
            "INSERT INTO assessment_instance_results
                (instance_id, total_score, overall_level, expected_level,
                 meets_expectations, module_scores, calculated_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT ON CONSTRAINT uq_assessment_instance_results_instance DO UPDATE SET
                total_score = EXCLUDED.total_score,
                overall_level = EXCLUDED.overall_level,
                expected_level = EXCLUDED.expected_level,
                meets_expectations = EXCLUDED.meets_expectations,
                module_scores = EXCLUDED.module_scores,
                calculated_by = EXCLUDED.calculated_by,
                calculated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, InstanceResult>(&query)
            .bind(instance_id)
            .bind(score.total_score)
            .bind(score.overall_level)
            .bind(score.expected_level)
            .bind(score.meets_expectations)
            .bind(module_scores)
            .bind(calculated_by)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_instance(
        pool: &PgPool,
        instance_id: DbId,
    ) -> Result<Option<InstanceResult>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM assessment_instance_results WHERE instance_id = $1");
        sqlx::query_as::<_, InstanceResult>(&query)
            .bind(instance_id)
            .fetch_optional(pool)
            .await
    }
}
