//! Assessment instance model and DTOs.

use rubrica_core::assessment::InstanceStatus;
use rubrica_core::error::CoreError;
use rubrica_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `assessment_instances` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AssessmentInstance {
    pub id: DbId,
    pub template_id: DbId,
    pub snapshot_id: DbId,
    pub template_version: i32,
    pub user_id: DbId,
    pub transformation_year: i32,
    pub status: String,
    pub assigned_by: Option<DbId>,
    pub assigned_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AssessmentInstance {
    pub fn parsed_status(&self) -> Result<InstanceStatus, CoreError> {
        self.status.parse()
    }
}

/// DTO for inserting an instance on a specific snapshot.
#[derive(Debug, Clone)]
pub struct CreateInstance {
    pub template_id: DbId,
    pub snapshot_id: DbId,
    pub template_version: i32,
    pub user_id: DbId,
    pub transformation_year: i32,
    pub assigned_by: Option<DbId>,
}

/// Request body for assigning a template to a user.
///
/// `transformation_year` is the school's year in the programme (1-5) and
/// defaults to 1. It sets the level the assessment is expected to reach.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssignTemplate {
    pub user_id: DbId,
    #[validate(range(min = 1, max = 5))]
    pub transformation_year: Option<i32>,
}

/// A user holding an open instance from an earlier snapshot in a family.
#[derive(Debug, Clone, FromRow)]
pub struct UpgradeCandidate {
    pub user_id: DbId,
    pub instance_id: DbId,
    pub transformation_year: i32,
}
