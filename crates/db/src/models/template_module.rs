//! Template module model and DTOs.

use rubrica_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::indicator::Indicator;

/// A row from the `template_modules` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TemplateModule {
    pub id: DbId,
    pub template_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub display_order: i32,
    pub weight: f64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A module together with its ordered indicators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleWithIndicators {
    #[serde(flatten)]
    pub module: TemplateModule,
    pub indicators: Vec<Indicator>,
}

/// DTO for creating a module. The module is appended after existing ones.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTemplateModule {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub weight: Option<f64>,
}

/// DTO for updating a module. All fields optional.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateTemplateModule {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub weight: Option<f64>,
}

/// Full ordered list of a template's module ids.
#[derive(Debug, Clone, Deserialize)]
pub struct ReorderModules {
    pub module_ids: Vec<DbId>,
}
