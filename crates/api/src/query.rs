//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// `?confirm=true` on destructive endpoints that may need a second call.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmParams {
    #[serde(default)]
    pub confirm: bool,
}

/// `?action=restore` turns the archive endpoint into its inverse.
#[derive(Debug, Default, Deserialize)]
pub struct ArchiveActionParams {
    pub action: Option<String>,
}
