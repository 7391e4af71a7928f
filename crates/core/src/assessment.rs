//! Assessment vocabulary and value validation.
//!
//! Transformation areas classify templates into families, indicator
//! categories decide which response field carries the answer, and instance
//! statuses gate whether responses may still change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Transformation areas
// ---------------------------------------------------------------------------

/// Area a template evaluates. Templates sharing an area form a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformationArea {
    Personalizacion,
    Aprendizaje,
    Evaluacion,
    Proposito,
    Familias,
    TrabajoDocente,
    Liderazgo,
}

impl TransformationArea {
    pub const ALL: [TransformationArea; 7] = [
        TransformationArea::Personalizacion,
        TransformationArea::Aprendizaje,
        TransformationArea::Evaluacion,
        TransformationArea::Proposito,
        TransformationArea::Familias,
        TransformationArea::TrabajoDocente,
        TransformationArea::Liderazgo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransformationArea::Personalizacion => "personalizacion",
            TransformationArea::Aprendizaje => "aprendizaje",
            TransformationArea::Evaluacion => "evaluacion",
            TransformationArea::Proposito => "proposito",
            TransformationArea::Familias => "familias",
            TransformationArea::TrabajoDocente => "trabajo_docente",
            TransformationArea::Liderazgo => "liderazgo",
        }
    }

    /// Display label shown to operators.
    pub fn label(self) -> &'static str {
        match self {
            TransformationArea::Personalizacion => "Personalización",
            TransformationArea::Aprendizaje => "Aprendizaje",
            TransformationArea::Evaluacion => "Evaluación",
            TransformationArea::Proposito => "Propósito",
            TransformationArea::Familias => "Familias",
            TransformationArea::TrabajoDocente => "Trabajo Docente",
            TransformationArea::Liderazgo => "Liderazgo",
        }
    }
}

impl fmt::Display for TransformationArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformationArea {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Área de transformación inválida '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Indicator categories
// ---------------------------------------------------------------------------

/// Lowest depth level (`Por Comenzar`).
pub const MIN_DEPTH_LEVEL: i32 = 0;
/// Highest depth level (`Consolidado`).
pub const MAX_DEPTH_LEVEL: i32 = 4;

/// How an indicator is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorCategory {
    /// Boolean coverage (yes/no).
    Cobertura,
    /// Numeric frequency with a chosen unit.
    Frecuencia,
    /// Ordinal depth level 0-4 with level descriptors.
    Profundidad,
}

impl IndicatorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            IndicatorCategory::Cobertura => "cobertura",
            IndicatorCategory::Frecuencia => "frecuencia",
            IndicatorCategory::Profundidad => "profundidad",
        }
    }
}

impl fmt::Display for IndicatorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cobertura" => Ok(IndicatorCategory::Cobertura),
            "frecuencia" => Ok(IndicatorCategory::Frecuencia),
            "profundidad" => Ok(IndicatorCategory::Profundidad),
            other => Err(CoreError::Validation(format!(
                "Categoría de indicador inválida '{other}'. Valores permitidos: cobertura, frecuencia, profundidad"
            ))),
        }
    }
}

/// Units a frequency answer may be expressed in.
pub const FREQUENCY_UNITS: &[&str] = &["dia", "semana", "mes", "trimestre", "semestre", "año"];

/// Validate a list of allowed frequency units configured on an indicator.
pub fn validate_frequency_units(units: &[String]) -> Result<(), CoreError> {
    match units.iter().find(|u| !FREQUENCY_UNITS.contains(&u.as_str())) {
        Some(bad) => Err(CoreError::Validation(format!(
            "Unidad de frecuencia inválida '{bad}'. Valores permitidos: {}",
            FREQUENCY_UNITS.join(", ")
        ))),
        None => Ok(()),
    }
}

/// Validate a module or indicator weight. Weights must be positive and finite.
pub fn validate_weight(weight: f64) -> Result<(), CoreError> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(CoreError::Validation(
            "El peso debe ser un número mayor que cero".into(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// The answer fields of a response, independent of storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseValue {
    pub coverage_value: Option<bool>,
    pub frequency_value: Option<f64>,
    pub frequency_unit: Option<String>,
    pub profundity_level: Option<i32>,
}

/// Check that `value` answers an indicator of `category`.
///
/// `allowed_units` is the indicator's configured unit list; an empty list
/// accepts any known unit.
pub fn validate_response_value(
    category: IndicatorCategory,
    value: &ResponseValue,
    allowed_units: &[String],
) -> Result<(), CoreError> {
    match category {
        IndicatorCategory::Cobertura => {
            if value.coverage_value.is_none() {
                return Err(CoreError::Validation(
                    "Los indicadores de cobertura requieren una respuesta Sí/No".into(),
                ));
            }
        }
        IndicatorCategory::Frecuencia => {
            let Some(freq) = value.frequency_value else {
                return Err(CoreError::Validation(
                    "Los indicadores de frecuencia requieren un valor numérico".into(),
                ));
            };
            if !freq.is_finite() || freq < 0.0 {
                return Err(CoreError::Validation(
                    "El valor de frecuencia no puede ser negativo".into(),
                ));
            }
            if let Some(unit) = value.frequency_unit.as_deref() {
                let known = FREQUENCY_UNITS.contains(&unit);
                let allowed = allowed_units.is_empty() || allowed_units.iter().any(|u| u == unit);
                if !known || !allowed {
                    return Err(CoreError::Validation(format!(
                        "Unidad de frecuencia no permitida para este indicador: '{unit}'"
                    )));
                }
            } else if !allowed_units.is_empty() {
                return Err(CoreError::Validation(
                    "Debe seleccionar una unidad de frecuencia".into(),
                ));
            }
        }
        IndicatorCategory::Profundidad => {
            let Some(level) = value.profundity_level else {
                return Err(CoreError::Validation(
                    "Los indicadores de profundidad requieren un nivel".into(),
                ));
            };
            if !(MIN_DEPTH_LEVEL..=MAX_DEPTH_LEVEL).contains(&level) {
                return Err(CoreError::Validation(format!(
                    "El nivel de profundidad debe estar entre {MIN_DEPTH_LEVEL} y {MAX_DEPTH_LEVEL}"
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Instances
// ---------------------------------------------------------------------------

pub const INSTANCE_PENDING: &str = "pending";
pub const INSTANCE_IN_PROGRESS: &str = "in_progress";
pub const INSTANCE_COMPLETED: &str = "completed";
pub const INSTANCE_ARCHIVED: &str = "archived";

/// Value of the `assessment_instances.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Pending,
    InProgress,
    Completed,
    Archived,
}

impl InstanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InstanceStatus::Pending => INSTANCE_PENDING,
            InstanceStatus::InProgress => INSTANCE_IN_PROGRESS,
            InstanceStatus::Completed => INSTANCE_COMPLETED,
            InstanceStatus::Archived => INSTANCE_ARCHIVED,
        }
    }

    /// Whether responses may still be written.
    pub fn accepts_responses(self) -> bool {
        matches!(self, InstanceStatus::Pending | InstanceStatus::InProgress)
    }
}

impl FromStr for InstanceStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            INSTANCE_PENDING => Ok(InstanceStatus::Pending),
            INSTANCE_IN_PROGRESS => Ok(InstanceStatus::InProgress),
            INSTANCE_COMPLETED => Ok(InstanceStatus::Completed),
            INSTANCE_ARCHIVED => Ok(InstanceStatus::Archived),
            other => Err(CoreError::Internal(format!(
                "Unknown instance status '{other}'"
            ))),
        }
    }
}

/// Guard for writing a response into an instance.
pub fn check_accepts_responses(status: InstanceStatus) -> Result<(), CoreError> {
    if status.accepts_responses() {
        Ok(())
    } else {
        Err(CoreError::Conflict(
            "La evaluación ya fue enviada y no admite cambios".into(),
        ))
    }
}

/// Guard for submitting an instance.
///
/// Every indicator of the instance's snapshot must have a response.
pub fn check_submit(
    status: InstanceStatus,
    indicator_count: usize,
    answered_count: usize,
) -> Result<(), CoreError> {
    check_accepts_responses(status)?;
    if answered_count < indicator_count {
        return Err(CoreError::Validation(format!(
            "Faltan {} indicadores por responder",
            indicator_count - answered_count
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn area_parses_known_values() {
        assert_eq!(
            "trabajo_docente".parse::<TransformationArea>().unwrap(),
            TransformationArea::TrabajoDocente
        );
        assert_eq!(TransformationArea::Evaluacion.label(), "Evaluación");
    }

    #[test]
    fn unknown_area_is_rejected() {
        assert_matches!(
            "matematicas".parse::<TransformationArea>(),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn area_serde_matches_as_str() {
        for area in TransformationArea::ALL {
            let json = serde_json::to_value(area).unwrap();
            assert_eq!(json, serde_json::Value::String(area.as_str().to_string()));
        }
    }

    #[test]
    fn category_parses_and_rejects() {
        assert_eq!(
            "profundidad".parse::<IndicatorCategory>().unwrap(),
            IndicatorCategory::Profundidad
        );
        assert!("escala".parse::<IndicatorCategory>().is_err());
    }

    #[test]
    fn weight_must_be_positive() {
        assert!(validate_weight(1.0).is_ok());
        assert!(validate_weight(0.25).is_ok());
        assert!(validate_weight(0.0).is_err());
        assert!(validate_weight(-1.0).is_err());
        assert!(validate_weight(f64::NAN).is_err());
    }

    #[test]
    fn frequency_unit_list_is_checked() {
        assert!(validate_frequency_units(&["semana".into(), "año".into()]).is_ok());
        assert!(validate_frequency_units(&["quincena".into()]).is_err());
    }

    #[test]
    fn coverage_requires_boolean() {
        let ok = ResponseValue {
            coverage_value: Some(false),
            ..Default::default()
        };
        assert!(validate_response_value(IndicatorCategory::Cobertura, &ok, &[]).is_ok());
        assert!(
            validate_response_value(IndicatorCategory::Cobertura, &ResponseValue::default(), &[])
                .is_err()
        );
    }

    #[test]
    fn frequency_checks_value_and_unit() {
        let units = vec!["semana".to_string(), "mes".to_string()];
        let ok = ResponseValue {
            frequency_value: Some(3.0),
            frequency_unit: Some("mes".into()),
            ..Default::default()
        };
        assert!(validate_response_value(IndicatorCategory::Frecuencia, &ok, &units).is_ok());

        let wrong_unit = ResponseValue {
            frequency_unit: Some("año".into()),
            ..ok.clone()
        };
        assert!(
            validate_response_value(IndicatorCategory::Frecuencia, &wrong_unit, &units).is_err()
        );

        let missing_unit = ResponseValue {
            frequency_unit: None,
            ..ok.clone()
        };
        assert!(
            validate_response_value(IndicatorCategory::Frecuencia, &missing_unit, &units).is_err()
        );
        assert!(validate_response_value(IndicatorCategory::Frecuencia, &missing_unit, &[]).is_ok());

        let negative = ResponseValue {
            frequency_value: Some(-1.0),
            ..ok
        };
        assert!(validate_response_value(IndicatorCategory::Frecuencia, &negative, &units).is_err());
    }

    #[test]
    fn depth_level_must_be_in_range() {
        for level in MIN_DEPTH_LEVEL..=MAX_DEPTH_LEVEL {
            let value = ResponseValue {
                profundity_level: Some(level),
                ..Default::default()
            };
            assert!(validate_response_value(IndicatorCategory::Profundidad, &value, &[]).is_ok());
        }
        let too_high = ResponseValue {
            profundity_level: Some(5),
            ..Default::default()
        };
        assert!(validate_response_value(IndicatorCategory::Profundidad, &too_high, &[]).is_err());
    }

    #[test]
    fn completed_instances_reject_responses() {
        assert!(check_accepts_responses(InstanceStatus::Pending).is_ok());
        assert!(check_accepts_responses(InstanceStatus::InProgress).is_ok());
        assert_matches!(
            check_accepts_responses(InstanceStatus::Completed),
            Err(CoreError::Conflict(_))
        );
        assert_matches!(
            check_accepts_responses(InstanceStatus::Archived),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn submit_requires_every_indicator_answered() {
        assert!(check_submit(InstanceStatus::InProgress, 3, 3).is_ok());
        let err = check_submit(InstanceStatus::InProgress, 3, 1).unwrap_err();
        assert_matches!(err, CoreError::Validation(ref m) if m.contains("Faltan 2"));
    }
}
