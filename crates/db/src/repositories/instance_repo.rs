//! Repository for the `assessment_instances` table.

use rubrica_core::scoring::AssessmentScore;
use rubrica_core::types::DbId;
use sqlx::PgPool;

use crate::models::instance::{AssessmentInstance, CreateInstance, UpgradeCandidate};
use crate::models::result::InstanceResult;
use crate::repositories::result_repo::ResultRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, template_id, snapshot_id, template_version, user_id, \
    transformation_year, status, assigned_by, assigned_at, started_at, completed_at, \
    created_at, updated_at";

/// Provides CRUD and status operations for assessment instances.
pub struct InstanceRepo;

impl InstanceRepo {
    /// Insert a `pending` instance on a snapshot.
    pub async fn create(
        pool: &PgPool,
        input: &CreateInstance,
    ) -> Result<AssessmentInstance, sqlx::Error> {
        let query = format!(
            "INSERT INTO assessment_instances
                (template_id, snapshot_id, template_version, user_id,
                 transformation_year, assigned_by, status)
             VALUES ($1, $2, $3, $4, $5, $6, 'pending')
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AssessmentInstance>(&query)
            .bind(input.template_id)
            .bind(input.snapshot_id)
            .bind(input.template_version)
            .bind(input.user_id)
            .bind(input.transformation_year)
            .bind(input.assigned_by)
            .fetch_one(pool)
            .await
    }

    /// Find an instance by its internal ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<AssessmentInstance>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM assessment_instances WHERE id = $1");
        sqlx::query_as::<_, AssessmentInstance>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a template's instances, newest assignment first.
    pub async fn list_by_template(
        pool: &PgPool,
        template_id: DbId,
    ) -> Result<Vec<AssessmentInstance>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assessment_instances
             WHERE template_id = $1
             ORDER BY assigned_at DESC, id DESC"
        );
        sqlx::query_as::<_, AssessmentInstance>(&query)
            .bind(template_id)
            .fetch_all(pool)
            .await
    }

    /// The user's pending or in-progress instance on a snapshot, if any.
    pub async fn find_open_for_user_on_snapshot(
        pool: &PgPool,
        snapshot_id: DbId,
        user_id: DbId,
    ) -> Result<Option<AssessmentInstance>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assessment_instances
             WHERE snapshot_id = $1 AND user_id = $2
               AND status IN ('pending', 'in_progress')
             LIMIT 1"
        );
        sqlx::query_as::<_, AssessmentInstance>(&query)
            .bind(snapshot_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Whether the user holds any instance on a snapshot, whatever its status.
    pub async fn exists_for_user_on_snapshot(
        pool: &PgPool,
        snapshot_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM assessment_instances WHERE snapshot_id = $1 AND user_id = $2
             )",
        )
        .bind(snapshot_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// One row per user who holds a non-completed instance on a different
    /// snapshot of any template in `area`. The most recently assigned
    /// instance wins.
    pub async fn list_upgrade_candidates(
        pool: &PgPool,
        area: &str,
        new_snapshot_id: DbId,
    ) -> Result<Vec<UpgradeCandidate>, sqlx::Error> {
        sqlx::query_as::<_, UpgradeCandidate>(
            "SELECT DISTINCT ON (i.user_id)
                    i.user_id, i.id AS instance_id, i.transformation_year
             FROM assessment_instances i
             JOIN templates t ON t.id = i.template_id
             WHERE t.area = $1
               AND i.snapshot_id <> $2
               AND i.status <> 'completed'
             ORDER BY i.user_id, i.assigned_at DESC, i.id DESC",
        )
        .bind(area)
        .bind(new_snapshot_id)
        .fetch_all(pool)
        .await
    }

    /// Move an open instance to `completed` and store its score.
    ///
    /// Both writes share one transaction. Returns `None` if the instance is
    /// not pending or in progress.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        score: &AssessmentScore,
        completed_by: Option<DbId>,
    ) -> Result<Option<(AssessmentInstance, InstanceResult)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE assessment_instances SET
                status = 'completed',
                started_at = COALESCE(started_at, NOW()),
                completed_at = NOW()
             WHERE id = $1 AND status IN ('pending', 'in_progress')
             RETURNING {COLUMNS}"
        );
        let Some(instance) = sqlx::query_as::<_, AssessmentInstance>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let result = ResultRepo::upsert(&mut *tx, instance.id, score, completed_by).await?;

        tx.commit().await?;
        Ok(Some((instance, result)))
    }
}
