//! Template snapshot model.
//!
//! A snapshot freezes a template's row, modules and indicators as JSON.
//! Instances reference the snapshot they were created from, so responses
//! are always validated against the content the assignee actually saw.

use rubrica_core::assessment::IndicatorCategory;
use rubrica_core::error::CoreError;
use rubrica_core::scoring::{FrequencyScale, ScoringIndicator, ScoringModule};
use rubrica_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::indicator::Indicator;
use crate::models::template::Template;
use crate::models::template_module::ModuleWithIndicators;

/// A row from the `template_snapshots` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TemplateSnapshot {
    pub id: DbId,
    pub template_id: DbId,
    pub version: i32,
    pub snapshot_data: serde_json::Value,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
}

impl TemplateSnapshot {
    /// Decode the stored JSON into typed content.
    pub fn content(&self) -> Result<SnapshotContent, serde_json::Error> {
        serde_json::from_value(self.snapshot_data.clone())
    }
}

/// Typed body of `template_snapshots.snapshot_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotContent {
    pub template: Template,
    pub modules: Vec<ModuleWithIndicators>,
}

impl SnapshotContent {
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn indicator_count(&self) -> usize {
        self.modules.iter().map(|m| m.indicators.len()).sum()
    }

    /// Look up an indicator by the id it had when the snapshot was taken.
    pub fn find_indicator(&self, indicator_id: DbId) -> Option<&Indicator> {
        self.modules
            .iter()
            .flat_map(|m| m.indicators.iter())
            .find(|i| i.id == indicator_id)
    }

    /// Modules and indicators reduced to what the scorer needs.
    pub fn scoring_modules(&self) -> Result<Vec<ScoringModule>, CoreError> {
        self.modules
            .iter()
            .map(|m| {
                let indicators = m
                    .indicators
                    .iter()
                    .map(scoring_indicator)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ScoringModule {
                    id: m.module.id,
                    name: m.module.name.clone(),
                    weight: m.module.weight,
                    indicators,
                })
            })
            .collect()
    }
}

fn scoring_indicator(indicator: &Indicator) -> Result<ScoringIndicator, CoreError> {
    let category: IndicatorCategory = indicator.category.parse()?;
    let scale = match &indicator.frequency_config {
        Some(config) => serde_json::from_value::<FrequencyScale>(config.clone()).map_err(|e| {
            CoreError::Internal(format!(
                "Invalid frequency_config on indicator {}: {e}",
                indicator.id
            ))
        })?,
        None => FrequencyScale::default(),
    };
    Ok(ScoringIndicator {
        id: indicator.id,
        name: indicator.name.clone(),
        category,
        weight: indicator.weight,
        scale,
    })
}

/// Module/indicator totals reported alongside a snapshot.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SnapshotStats {
    pub modules: usize,
    pub indicators: usize,
}

impl From<&SnapshotContent> for SnapshotStats {
    fn from(content: &SnapshotContent) -> Self {
        Self {
            modules: content.module_count(),
            indicators: content.indicator_count(),
        }
    }
}
