//! Stored scoring result of a completed instance.

use rubrica_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `assessment_instance_results` table.
///
/// `module_scores` holds the serialized `ModuleScore` breakdown.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InstanceResult {
    pub id: DbId,
    pub instance_id: DbId,
    pub total_score: f64,
    pub overall_level: i32,
    pub expected_level: i32,
    pub meets_expectations: bool,
    pub module_scores: serde_json::Value,
    pub calculated_by: Option<DbId>,
    pub calculated_at: Timestamp,
}
