//! Assessment template lifecycle rules.
//!
//! A template moves `draft -> published`, may then be archived (the
//! `is_archived` flag is set while the status stays `published`) and
//! restored. Duplication never transitions the source; it produces a new
//! draft. Every guard here is a pure function over the template's current
//! [`LifecycleState`] so handlers can reject an action before touching the
//! database.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const STATUS_DRAFT: &str = "draft";
pub const STATUS_PUBLISHED: &str = "published";
pub const STATUS_ARCHIVED: &str = "archived";

/// Version assigned to a freshly created template.
pub const INITIAL_VERSION: i32 = 1;

/// Suffix appended to a duplicated template's name when none is given.
pub const DUPLICATE_NAME_SUFFIX: &str = "(copia)";

/// Maximum length of a template name.
pub const MAX_TEMPLATE_NAME_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Value of the `templates.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    Draft,
    Published,
    /// Legacy status value. Current code archives through `is_archived`.
    Archived,
}

impl TemplateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateStatus::Draft => STATUS_DRAFT,
            TemplateStatus::Published => STATUS_PUBLISHED,
            TemplateStatus::Archived => STATUS_ARCHIVED,
        }
    }
}

impl fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            STATUS_DRAFT => Ok(TemplateStatus::Draft),
            STATUS_PUBLISHED => Ok(TemplateStatus::Published),
            STATUS_ARCHIVED => Ok(TemplateStatus::Archived),
            other => Err(CoreError::Validation(format!(
                "Estado de template inválido '{other}'. Valores permitidos: draft, published, archived"
            ))),
        }
    }
}

/// The two columns that drive every lifecycle decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleState {
    pub status: TemplateStatus,
    pub is_archived: bool,
}

impl LifecycleState {
    pub fn new(status: TemplateStatus, is_archived: bool) -> Self {
        Self {
            status,
            is_archived,
        }
    }

    /// Parse the raw column values of a template row.
    pub fn from_columns(status: &str, is_archived: bool) -> Result<Self, CoreError> {
        Ok(Self::new(status.parse()?, is_archived))
    }

    /// Archived either through the flag or through the legacy status value.
    pub fn is_archived(&self) -> bool {
        self.is_archived || self.status == TemplateStatus::Archived
    }

    pub fn is_draft(&self) -> bool {
        self.status == TemplateStatus::Draft && !self.is_archived
    }

    /// Published and selectable for new instances.
    pub fn is_live(&self) -> bool {
        self.status == TemplateStatus::Published && !self.is_archived
    }
}

// ---------------------------------------------------------------------------
// Transition guards
// ---------------------------------------------------------------------------

/// Guard for `draft -> published`.
///
/// The template must be an unarchived draft with at least one module and
/// at least one indicator across all of its modules.
pub fn check_publish(
    state: LifecycleState,
    module_count: i64,
    indicator_count: i64,
) -> Result<(), CoreError> {
    if state.is_archived() {
        return Err(CoreError::Conflict(
            "Los templates archivados deben restaurarse antes de publicarse".into(),
        ));
    }
    if state.status != TemplateStatus::Draft {
        return Err(CoreError::Conflict(
            "Solo los templates en estado borrador pueden ser publicados".into(),
        ));
    }
    if module_count < 1 {
        return Err(CoreError::Validation(
            "El template debe tener al menos un módulo".into(),
        ));
    }
    if indicator_count < 1 {
        return Err(CoreError::Validation(
            "El template debe tener al menos un indicador".into(),
        ));
    }
    Ok(())
}

/// Guard for archiving. Only published, unarchived templates qualify.
pub fn check_archive(state: LifecycleState) -> Result<(), CoreError> {
    if state.is_archived() {
        return Err(CoreError::Conflict("El template ya está archivado".into()));
    }
    if state.status != TemplateStatus::Published {
        return Err(CoreError::Conflict(
            "Solo los templates publicados pueden ser archivados".into(),
        ));
    }
    Ok(())
}

/// Guard for restoring an archived template back to `published`.
pub fn check_restore(state: LifecycleState) -> Result<(), CoreError> {
    if !state.is_archived() {
        return Err(CoreError::Conflict("El template no está archivado".into()));
    }
    Ok(())
}

/// Guard for editing name, description or scoring configuration.
pub fn check_metadata_edit(state: LifecycleState) -> Result<(), CoreError> {
    if state.is_archived() {
        return Err(CoreError::Conflict(
            "Los templates archivados no pueden ser editados".into(),
        ));
    }
    Ok(())
}

/// Guard for creating, updating, reordering or deleting modules and indicators.
///
/// Structure is frozen once published; duplication is the path to a new
/// editable version.
pub fn check_content_edit(state: LifecycleState) -> Result<(), CoreError> {
    if state.is_archived() {
        return Err(CoreError::Conflict(
            "Los templates archivados no pueden ser editados".into(),
        ));
    }
    if state.status != TemplateStatus::Draft {
        return Err(CoreError::Conflict(
            "Solo los templates en borrador permiten modificar módulos e indicadores. \
             Duplique el template para crear una nueva versión"
                .into(),
        ));
    }
    Ok(())
}

/// Guard for assigning a template to a user.
pub fn check_assignable(state: LifecycleState) -> Result<(), CoreError> {
    if state.is_archived() {
        return Err(CoreError::Conflict(
            "Los templates archivados no pueden asignarse".into(),
        ));
    }
    if state.status != TemplateStatus::Published {
        return Err(CoreError::Conflict(
            "Solo los templates publicados pueden asignarse".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// Rows that depend on a template, surfaced to the operator before a delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentCounts {
    pub instances: i64,
    pub responses: i64,
    pub snapshots: i64,
    pub modules: i64,
}

impl DependentCounts {
    /// Whether anyone has been assigned or has answered this template.
    pub fn has_usage(&self) -> bool {
        self.instances > 0 || self.responses > 0
    }
}

/// Outcome of [`decide_delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDecision {
    /// Perform the cascading delete now.
    Proceed,
    /// Return the counts to the operator and wait for a confirmed call.
    RequiresConfirmation,
}

/// Decide what a delete request does.
///
/// - Drafts are deleted unconditionally.
/// - Published templates must be archived first.
/// - Archived templates with instances or responses need `confirm = true`.
pub fn decide_delete(
    state: LifecycleState,
    counts: &DependentCounts,
    confirm: bool,
) -> Result<DeleteDecision, CoreError> {
    if state.is_draft() {
        return Ok(DeleteDecision::Proceed);
    }
    if !state.is_archived() {
        return Err(CoreError::Conflict(
            "Los templates publicados deben ser archivados antes de eliminarse".into(),
        ));
    }
    if counts.has_usage() && !confirm {
        return Ok(DeleteDecision::RequiresConfirmation);
    }
    Ok(DeleteDecision::Proceed)
}

/// Operator-facing warning attached to a confirmation-required response.
pub fn confirmation_message(counts: &DependentCounts) -> String {
    format!(
        "Este template tiene {} evaluaciones y {} respuestas. La eliminación es permanente.",
        counts.instances, counts.responses
    )
}

// ---------------------------------------------------------------------------
// Duplicate
// ---------------------------------------------------------------------------

/// Version given to a duplicate: one past the highest version in its family.
pub fn successor_version(family_max: Option<i32>) -> i32 {
    family_max.unwrap_or(0).max(0) + 1
}

/// Resolve the name of a duplicated template.
///
/// A requested name is trimmed and must not be blank; without one the
/// source name gets the `(copia)` suffix.
pub fn duplicate_name(source_name: &str, requested: Option<&str>) -> Result<String, CoreError> {
    match requested {
        Some(name) => validate_template_name(name).map(str::to_string),
        None => Ok(format!("{source_name} {DUPLICATE_NAME_SUFFIX}")),
    }
}

/// Validate a template name, returning it trimmed.
pub fn validate_template_name(name: &str) -> Result<&str, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "El nombre del template es obligatorio".into(),
        ));
    }
    if trimmed.chars().count() > MAX_TEMPLATE_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "El nombre del template no puede superar {MAX_TEMPLATE_NAME_LEN} caracteres"
        )));
    }
    Ok(trimmed)
}
