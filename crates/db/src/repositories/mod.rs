//! Repository layer: one zero-sized struct per table, each exposing async
//! associated functions over a `&PgPool` (or a connection when the call
//! must join a caller's transaction).

pub mod indicator_repo;
pub mod instance_repo;
pub mod response_repo;
pub mod result_repo;
pub mod snapshot_repo;
pub mod template_module_repo;
pub mod template_repo;

pub use indicator_repo::IndicatorRepo;
pub use instance_repo::InstanceRepo;
pub use response_repo::ResponseRepo;
pub use result_repo::ResultRepo;
pub use snapshot_repo::SnapshotRepo;
pub use template_module_repo::TemplateModuleRepo;
pub use template_repo::{DuplicatedTemplate, TemplateRepo};
