//! Assessment response model and DTOs.

use rubrica_core::assessment::ResponseValue;
use rubrica_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `assessment_responses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AssessmentResponse {
    pub id: DbId,
    pub instance_id: DbId,
    pub indicator_id: DbId,
    pub coverage_value: Option<bool>,
    pub frequency_value: Option<f64>,
    pub frequency_unit: Option<String>,
    pub profundity_level: Option<i32>,
    pub rationale: Option<String>,
    pub evidence_notes: Option<String>,
    pub responded_by: Option<DbId>,
    pub responded_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for saving (insert or overwrite) the answer to one indicator.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaveResponse {
    pub indicator_id: DbId,
    pub coverage_value: Option<bool>,
    pub frequency_value: Option<f64>,
    pub frequency_unit: Option<String>,
    pub profundity_level: Option<i32>,
    #[validate(length(max = 4000))]
    pub rationale: Option<String>,
    #[validate(length(max = 4000))]
    pub evidence_notes: Option<String>,
}

impl AssessmentResponse {
    pub fn value(&self) -> ResponseValue {
        ResponseValue {
            coverage_value: self.coverage_value,
            frequency_value: self.frequency_value,
            frequency_unit: self.frequency_unit.clone(),
            profundity_level: self.profundity_level,
        }
    }
}

impl SaveResponse {
    /// The answer fields, for category validation.
    pub fn value(&self) -> ResponseValue {
        ResponseValue {
            coverage_value: self.coverage_value,
            frequency_value: self.frequency_value,
            frequency_unit: self.frequency_unit.clone(),
            profundity_level: self.profundity_level,
        }
    }
}
