//! Re-assignment of open instances when a new version is published.
//!
//! Runs after the publish transaction has committed. Each user is handled
//! independently: a failure for one user is recorded in the report and the
//! loop moves on.

use rubrica_core::types::DbId;
use rubrica_db::models::instance::CreateInstance;
use rubrica_db::models::snapshot::TemplateSnapshot;
use rubrica_db::models::template::Template;
use rubrica_db::repositories::InstanceRepo;
use serde::Serialize;
use sqlx::PgPool;

/// Outcome of [`upgrade_existing_assignments`].
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeReport {
    pub instances_created: u32,
    pub instances_skipped: u32,
    pub errors: Vec<String>,
}

/// Give every user holding an open instance from an earlier snapshot of the
/// same area a fresh `pending` instance on `snapshot`.
///
/// Users who already hold an instance on `snapshot` are skipped. Only the
/// candidate lookup can fail the whole call; everything after it is
/// per-user and lands in `errors`.
pub async fn upgrade_existing_assignments(
    pool: &PgPool,
    template: &Template,
    snapshot: &TemplateSnapshot,
    assigned_by: DbId,
) -> Result<UpgradeReport, sqlx::Error> {
    let candidates =
        InstanceRepo::list_upgrade_candidates(pool, &template.area, snapshot.id).await?;
    let mut report = UpgradeReport::default();

    for candidate in candidates {
        match InstanceRepo::exists_for_user_on_snapshot(pool, snapshot.id, candidate.user_id).await
        {
            Ok(true) => {
                report.instances_skipped += 1;
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(user_id = candidate.user_id, error = %e, "Upgrade lookup failed");
                report
                    .errors
                    .push(format!("Usuario {}: {e}", candidate.user_id));
                continue;
            }
        }

        let input = CreateInstance {
            template_id: template.id,
            snapshot_id: snapshot.id,
            template_version: snapshot.version,
            user_id: candidate.user_id,
            transformation_year: candidate.transformation_year,
            assigned_by: Some(assigned_by),
        };
        match InstanceRepo::create(pool, &input).await {
            Ok(instance) => {
                tracing::debug!(
                    user_id = candidate.user_id,
                    previous_instance_id = candidate.instance_id,
                    instance_id = instance.id,
                    "Instance upgraded to new version",
                );
                report.instances_created += 1;
            }
            Err(e) => {
                tracing::warn!(user_id = candidate.user_id, error = %e, "Upgrade insert failed");
                report
                    .errors
                    .push(format!("Usuario {}: {e}", candidate.user_id));
            }
        }
    }

    tracing::info!(
        template_id = template.id,
        snapshot_id = snapshot.id,
        created = report.instances_created,
        skipped = report.instances_skipped,
        errors = report.errors.len(),
        "Upgrade of existing assignments finished",
    );
    Ok(report)
}
