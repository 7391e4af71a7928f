//! Domain layer for the assessment template service.
//!
//! Holds the shared types, error taxonomy, role constants and the pure
//! lifecycle, validation and scoring rules. Nothing in here performs I/O
//! so the rules can be exercised directly from unit tests.

pub mod assessment;
pub mod error;
pub mod lifecycle;
pub mod pagination;
pub mod roles;
pub mod scoring;
pub mod types;
