//! Indicator model and DTOs.

use rubrica_core::assessment::IndicatorCategory;
use rubrica_core::error::CoreError;
use rubrica_core::scoring::FrequencyScale;
use rubrica_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `template_indicators` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Indicator {
    pub id: DbId,
    pub module_id: DbId,
    pub code: Option<String>,
    pub name: String,
    pub question: Option<String>,
    pub description: Option<String>,
    pub category: String,
    pub frequency_config: Option<serde_json::Value>,
    pub frequency_unit_options: Vec<String>,
    pub level_0_descriptor: Option<String>,
    pub level_1_descriptor: Option<String>,
    pub level_2_descriptor: Option<String>,
    pub level_3_descriptor: Option<String>,
    pub level_4_descriptor: Option<String>,
    pub display_order: i32,
    pub weight: f64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Parse a `frequency_config` document and check its range.
pub fn parse_frequency_config(value: &serde_json::Value) -> Result<FrequencyScale, CoreError> {
    let scale: FrequencyScale = serde_json::from_value(value.clone())
        .map_err(|e| CoreError::Validation(format!("frequency_config inválido: {e}")))?;
    scale.validate()?;
    Ok(scale)
}

/// DTO for creating an indicator. The indicator is appended to its module.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateIndicator {
    #[validate(length(max = 50))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub name: String,
    pub question: Option<String>,
    pub description: Option<String>,
    pub category: IndicatorCategory,
    pub frequency_config: Option<serde_json::Value>,
    pub frequency_unit_options: Option<Vec<String>>,
    pub level_0_descriptor: Option<String>,
    pub level_1_descriptor: Option<String>,
    pub level_2_descriptor: Option<String>,
    pub level_3_descriptor: Option<String>,
    pub level_4_descriptor: Option<String>,
    pub weight: Option<f64>,
}

/// DTO for updating an indicator. All fields optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateIndicator {
    #[validate(length(max = 50))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub name: Option<String>,
    pub question: Option<String>,
    pub description: Option<String>,
    pub category: Option<IndicatorCategory>,
    pub frequency_config: Option<serde_json::Value>,
    pub frequency_unit_options: Option<Vec<String>>,
    pub level_0_descriptor: Option<String>,
    pub level_1_descriptor: Option<String>,
    pub level_2_descriptor: Option<String>,
    pub level_3_descriptor: Option<String>,
    pub level_4_descriptor: Option<String>,
    pub weight: Option<f64>,
}

/// Full ordered list of a module's indicator ids.
#[derive(Debug, Clone, Deserialize)]
pub struct ReorderIndicators {
    pub indicator_ids: Vec<DbId>,
}
