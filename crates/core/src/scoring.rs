//! Scoring of completed assessments.
//!
//! Every indicator answer is normalized to 0-100, averaged by indicator
//! weight into a module score, and module scores are averaged by module
//! weight into the total. The total maps to a maturity level (0-4) through
//! the template's `scoring_config` thresholds, and the instance's
//! transformation year sets the level it is expected to reach.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::assessment::{IndicatorCategory, ResponseValue, MAX_DEPTH_LEVEL, MIN_DEPTH_LEVEL};
use crate::error::CoreError;
use crate::types::DbId;

/// First and last transformation year of the programme.
pub const MIN_TRANSFORMATION_YEAR: i32 = 1;
pub const MAX_TRANSFORMATION_YEAR: i32 = 5;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Minimum normalized score for each maturity level above 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelThresholds {
    pub consolidated: f64,
    pub advanced: f64,
    pub developing: f64,
    pub emerging: f64,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            consolidated: 87.5,
            advanced: 62.5,
            developing: 37.5,
            emerging: 12.5,
        }
    }
}

/// Typed view of `templates.scoring_config`. Missing keys take defaults,
/// so the column's `{}` default is a valid configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub level_thresholds: LevelThresholds,
}

impl ScoringConfig {
    /// Thresholds must lie in 0-100 and rise strictly from `emerging` to
    /// `consolidated`.
    pub fn validate(&self) -> Result<(), CoreError> {
        let t = &self.level_thresholds;
        let ordered = [t.emerging, t.developing, t.advanced, t.consolidated];
        let in_range = ordered.iter().all(|v| (0.0..=100.0).contains(v));
        let ascending = ordered.windows(2).all(|w| w[0] < w[1]);
        if in_range && ascending {
            Ok(())
        } else {
            Err(CoreError::Validation(
                "Los umbrales de nivel deben estar entre 0 y 100 y ser crecientes".into(),
            ))
        }
    }
}

/// The `min`/`max` range of a frequency indicator's `frequency_config`.
/// Other keys of that object are display hints and are ignored here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyScale {
    pub min: f64,
    pub max: f64,
}

impl Default for FrequencyScale {
    fn default() -> Self {
        Self { min: 0.0, max: 100.0 }
    }
}

impl FrequencyScale {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.min.is_finite() && self.max.is_finite() && self.max > self.min {
            Ok(())
        } else {
            Err(CoreError::Validation(
                "La escala de frecuencia requiere 'max' mayor que 'min'".into(),
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Per-indicator normalization
// ---------------------------------------------------------------------------

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn score_coverage(value: Option<bool>) -> f64 {
    match value {
        Some(true) => 100.0,
        _ => 0.0,
    }
}

/// Clamp into the scale, then map linearly onto 0-100. An empty or
/// inverted scale scores 0.
pub fn score_frequency(value: Option<f64>, scale: &FrequencyScale) -> f64 {
    let Some(value) = value else {
        return 0.0;
    };
    if scale.max <= scale.min {
        return 0.0;
    }
    let clamped = value.clamp(scale.min, scale.max);
    round2((clamped - scale.min) / (scale.max - scale.min) * 100.0)
}

pub fn score_depth(level: Option<i32>) -> f64 {
    let Some(level) = level else {
        return 0.0;
    };
    let clamped = level.clamp(MIN_DEPTH_LEVEL, MAX_DEPTH_LEVEL);
    f64::from(clamped) / f64::from(MAX_DEPTH_LEVEL) * 100.0
}

pub fn score_indicator(
    category: IndicatorCategory,
    value: &ResponseValue,
    scale: &FrequencyScale,
) -> f64 {
    match category {
        IndicatorCategory::Cobertura => score_coverage(value.coverage_value),
        IndicatorCategory::Frecuencia => score_frequency(value.frequency_value, scale),
        IndicatorCategory::Profundidad => score_depth(value.profundity_level),
    }
}

/// Weighted mean of `(score, weight)` pairs, rounded to two decimals.
/// Returns 0 when there is nothing to average.
pub fn weighted_average(items: &[(f64, f64)]) -> f64 {
    let total_weight: f64 = items.iter().map(|(_, w)| w).sum();
    if items.is_empty() || total_weight == 0.0 {
        return 0.0;
    }
    let weighted: f64 = items.iter().map(|(s, w)| s * w).sum();
    round2(weighted / total_weight)
}

pub fn score_to_level(score: f64, thresholds: &LevelThresholds) -> i32 {
    if score >= thresholds.consolidated {
        4
    } else if score >= thresholds.advanced {
        3
    } else if score >= thresholds.developing {
        2
    } else if score >= thresholds.emerging {
        1
    } else {
        0
    }
}

/// Maturity level a school is expected to reach in a transformation year.
pub fn expected_level_for_year(year: i32) -> Result<i32, CoreError> {
    match year {
        1 | 2 => Ok(1),
        3 => Ok(2),
        4 | 5 => Ok(3),
        other => Err(CoreError::Validation(format!(
            "El año de transformación debe estar entre {MIN_TRANSFORMATION_YEAR} y \
             {MAX_TRANSFORMATION_YEAR}, se recibió {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Whole assessment
// ---------------------------------------------------------------------------

/// An indicator as needed for scoring.
#[derive(Debug, Clone)]
pub struct ScoringIndicator {
    pub id: DbId,
    pub name: String,
    pub category: IndicatorCategory,
    pub weight: f64,
    pub scale: FrequencyScale,
}

/// A module as needed for scoring.
#[derive(Debug, Clone)]
pub struct ScoringModule {
    pub id: DbId,
    pub name: String,
    pub weight: f64,
    pub indicators: Vec<ScoringIndicator>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorScore {
    pub indicator_id: DbId,
    pub indicator_name: String,
    pub category: IndicatorCategory,
    pub normalized_score: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleScore {
    pub module_id: DbId,
    pub module_name: String,
    pub module_score: f64,
    pub module_weight: f64,
    pub indicators: Vec<IndicatorScore>,
}

/// Result of [`score_assessment`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentScore {
    pub total_score: f64,
    pub overall_level: i32,
    pub expected_level: i32,
    pub meets_expectations: bool,
    pub module_scores: Vec<ModuleScore>,
}

/// Score every module of an assessment. Unanswered indicators score 0.
pub fn score_assessment(
    modules: &[ScoringModule],
    responses: &HashMap<DbId, ResponseValue>,
    config: &ScoringConfig,
    transformation_year: i32,
) -> Result<AssessmentScore, CoreError> {
    let expected_level = expected_level_for_year(transformation_year)?;

    let module_scores: Vec<ModuleScore> = modules
        .iter()
        .map(|module| {
            let indicators: Vec<IndicatorScore> = module
                .indicators
                .iter()
                .map(|ind| IndicatorScore {
                    indicator_id: ind.id,
                    indicator_name: ind.name.clone(),
                    category: ind.category,
                    normalized_score: responses
                        .get(&ind.id)
                        .map_or(0.0, |v| score_indicator(ind.category, v, &ind.scale)),
                    weight: ind.weight,
                })
                .collect();
            let pairs: Vec<(f64, f64)> = indicators
                .iter()
                .map(|i| (i.normalized_score, i.weight))
                .collect();
            ModuleScore {
                module_id: module.id,
                module_name: module.name.clone(),
                module_score: weighted_average(&pairs),
                module_weight: module.weight,
                indicators,
            }
        })
        .collect();

    let pairs: Vec<(f64, f64)> = module_scores
        .iter()
        .map(|m| (m.module_score, m.module_weight))
        .collect();
    let total_score = weighted_average(&pairs);
    let overall_level = score_to_level(total_score, &config.level_thresholds);

    Ok(AssessmentScore {
        total_score,
        overall_level,
        expected_level,
        meets_expectations: overall_level >= expected_level,
        module_scores,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn scale(min: f64, max: f64) -> FrequencyScale {
        FrequencyScale { min, max }
    }

    fn coverage(value: bool) -> ResponseValue {
        ResponseValue {
            coverage_value: Some(value),
            ..Default::default()
        }
    }

    fn depth(level: i32) -> ResponseValue {
        ResponseValue {
            profundity_level: Some(level),
            ..Default::default()
        }
    }

    fn indicator(id: DbId, category: IndicatorCategory, weight: f64) -> ScoringIndicator {
        ScoringIndicator {
            id,
            name: format!("Indicador {id}"),
            category,
            weight,
            scale: FrequencyScale::default(),
        }
    }

    #[test]
    fn coverage_is_all_or_nothing() {
        assert_eq!(score_coverage(Some(true)), 100.0);
        assert_eq!(score_coverage(Some(false)), 0.0);
        assert_eq!(score_coverage(None), 0.0);
    }

    #[test]
    fn frequency_normalizes_against_scale() {
        assert_eq!(score_frequency(Some(50.0), &FrequencyScale::default()), 50.0);
        assert_eq!(score_frequency(Some(5.0), &scale(0.0, 10.0)), 50.0);
        assert_eq!(score_frequency(Some(10.0), &scale(5.0, 15.0)), 50.0);
        assert_eq!(score_frequency(None, &scale(0.0, 10.0)), 0.0);
    }

    #[test]
    fn frequency_clamps_and_rejects_inverted_scale() {
        assert_eq!(score_frequency(Some(15.0), &scale(0.0, 10.0)), 100.0);
        assert_eq!(score_frequency(Some(-5.0), &scale(0.0, 10.0)), 0.0);
        assert_eq!(score_frequency(Some(7.0), &scale(10.0, 10.0)), 0.0);
    }

    #[test]
    fn frequency_rounds_to_two_decimals() {
        assert_eq!(score_frequency(Some(1.0), &scale(0.0, 3.0)), 33.33);
    }

    #[test]
    fn depth_maps_levels_to_quarters() {
        let scores: Vec<f64> = (0..=4).map(|l| score_depth(Some(l))).collect();
        assert_eq!(scores, vec![0.0, 25.0, 50.0, 75.0, 100.0]);
        assert_eq!(score_depth(Some(7)), 100.0);
        assert_eq!(score_depth(Some(-1)), 0.0);
        assert_eq!(score_depth(None), 0.0);
    }

    #[test]
    fn weighted_average_respects_weights() {
        assert_eq!(weighted_average(&[(100.0, 1.0), (60.0, 1.0)]), 80.0);
        assert_eq!(weighted_average(&[(100.0, 3.0), (50.0, 1.0)]), 87.5);
        assert_eq!(weighted_average(&[]), 0.0);
        assert_eq!(weighted_average(&[(100.0, 0.0)]), 0.0);
    }

    #[test]
    fn level_follows_default_thresholds() {
        let t = LevelThresholds::default();
        assert_eq!(score_to_level(100.0, &t), 4);
        assert_eq!(score_to_level(87.5, &t), 4);
        assert_eq!(score_to_level(75.0, &t), 3);
        assert_eq!(score_to_level(50.0, &t), 2);
        assert_eq!(score_to_level(12.5, &t), 1);
        assert_eq!(score_to_level(12.4, &t), 0);
    }

    #[test]
    fn expected_level_by_year() {
        let levels: Vec<i32> = (1..=5)
            .map(|y| expected_level_for_year(y).unwrap())
            .collect();
        assert_eq!(levels, vec![1, 1, 2, 3, 3]);
        assert_matches!(expected_level_for_year(0), Err(CoreError::Validation(_)));
        assert_matches!(expected_level_for_year(6), Err(CoreError::Validation(_)));
    }

    #[test]
    fn config_defaults_and_validation() {
        let config = ScoringConfig::default();
        assert_eq!(config.level_thresholds.consolidated, 87.5);
        assert!(config.validate().is_ok());

        let inverted = ScoringConfig {
            level_thresholds: LevelThresholds {
                consolidated: 10.0,
                ..LevelThresholds::default()
            },
        };
        assert_matches!(inverted.validate(), Err(CoreError::Validation(_)));

        let out_of_range = ScoringConfig {
            level_thresholds: LevelThresholds {
                consolidated: 120.0,
                ..LevelThresholds::default()
            },
        };
        assert_matches!(out_of_range.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn config_fills_missing_keys_from_json() {
        let config: ScoringConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(config, ScoringConfig::default());

        let config: ScoringConfig = serde_json::from_value(serde_json::json!({
            "level_thresholds": {"consolidated": 90.0},
            "default_weights": {"module": 1.0}
        }))
        .unwrap();
        assert_eq!(config.level_thresholds.consolidated, 90.0);
        assert_eq!(config.level_thresholds.advanced, 62.5);

        let scale: FrequencyScale =
            serde_json::from_value(serde_json::json!({"type": "count", "max": 10})).unwrap();
        assert_eq!(scale, FrequencyScale { min: 0.0, max: 10.0 });
        assert!(scale.validate().is_ok());
        assert_matches!(
            FrequencyScale { min: 5.0, max: 5.0 }.validate(),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn assessment_combines_modules_by_weight() {
        let modules = vec![
            ScoringModule {
                id: 1,
                name: "Planificación".into(),
                weight: 1.0,
                indicators: vec![
                    indicator(10, IndicatorCategory::Cobertura, 1.0),
                    indicator(11, IndicatorCategory::Profundidad, 1.0),
                ],
            },
            ScoringModule {
                id: 2,
                name: "Ejecución".into(),
                weight: 1.0,
                indicators: vec![indicator(20, IndicatorCategory::Profundidad, 1.0)],
            },
        ];
        let responses = HashMap::from([(10, coverage(true)), (11, depth(2)), (20, depth(3))]);

        let score = score_assessment(&modules, &responses, &ScoringConfig::default(), 3).unwrap();
        assert_eq!(score.module_scores[0].module_score, 75.0);
        assert_eq!(score.module_scores[1].module_score, 75.0);
        assert_eq!(score.total_score, 75.0);
        assert_eq!(score.overall_level, 3);
        assert_eq!(score.expected_level, 2);
        assert!(score.meets_expectations);
    }

    #[test]
    fn unanswered_indicators_score_zero() {
        let modules = vec![ScoringModule {
            id: 1,
            name: "M".into(),
            weight: 2.0,
            indicators: vec![
                indicator(10, IndicatorCategory::Cobertura, 1.0),
                indicator(11, IndicatorCategory::Cobertura, 1.0),
            ],
        }];
        let responses = HashMap::from([(10, coverage(true))]);

        let score = score_assessment(&modules, &responses, &ScoringConfig::default(), 5).unwrap();
        assert_eq!(score.total_score, 50.0);
        assert_eq!(score.overall_level, 2);
        assert_eq!(score.expected_level, 3);
        assert!(!score.meets_expectations);
        assert_eq!(score.module_scores[0].indicators[1].normalized_score, 0.0);
    }

    #[test]
    fn custom_thresholds_change_level() {
        let modules = vec![ScoringModule {
            id: 1,
            name: "M".into(),
            weight: 1.0,
            indicators: vec![indicator(10, IndicatorCategory::Profundidad, 1.0)],
        }];
        let responses = HashMap::from([(10, depth(3))]);
        let config = ScoringConfig {
            level_thresholds: LevelThresholds {
                consolidated: 70.0,
                advanced: 50.0,
                developing: 30.0,
                emerging: 10.0,
            },
        };

        let score = score_assessment(&modules, &responses, &config, 1).unwrap();
        assert_eq!(score.overall_level, 4);
    }
}
