//! Assessment template model and DTOs.

use rubrica_core::assessment::TransformationArea;
use rubrica_core::error::CoreError;
use rubrica_core::lifecycle::LifecycleState;
use rubrica_core::scoring::ScoringConfig;
use rubrica_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `templates` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Template {
    pub id: DbId,
    pub area: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub version: i32,
    pub is_archived: bool,
    pub scoring_config: serde_json::Value,
    pub published_at: Option<Timestamp>,
    pub published_by: Option<DbId>,
    pub archived_at: Option<Timestamp>,
    pub archived_by: Option<DbId>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Template {
    /// Lifecycle view of this row, used by the transition guards.
    pub fn lifecycle(&self) -> Result<LifecycleState, CoreError> {
        LifecycleState::from_columns(&self.status, self.is_archived)
    }

    pub fn scoring_config(&self) -> Result<ScoringConfig, CoreError> {
        parse_scoring_config(&self.scoring_config)
    }
}

/// Parse and check a `scoring_config` document. Unknown keys are ignored.
pub fn parse_scoring_config(value: &serde_json::Value) -> Result<ScoringConfig, CoreError> {
    let config: ScoringConfig = serde_json::from_value(value.clone())
        .map_err(|e| CoreError::Validation(format!("scoring_config inválido: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// DTO for creating a new draft template.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTemplate {
    pub area: TransformationArea,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub scoring_config: Option<serde_json::Value>,
}

/// DTO for updating template metadata. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTemplate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub scoring_config: Option<serde_json::Value>,
}

impl UpdateTemplate {
    /// True when the request carries nothing to update.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.scoring_config.is_none()
    }
}

/// Filters accepted by the template listing.
#[derive(Debug, Clone, Default)]
pub struct TemplateFilter {
    pub area: Option<String>,
    pub status: Option<String>,
    pub include_archived: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
