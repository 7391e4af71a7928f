//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod indicator;
pub mod instance;
pub mod response;
pub mod result;
pub mod snapshot;
pub mod template;
pub mod template_module;
