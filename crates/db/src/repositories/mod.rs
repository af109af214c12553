//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Reads
//! accept any Postgres executor (`&PgPool` or a connection inside an open
//! transaction); multi-statement writes take the caller's transaction so
//! they commit or roll back together.

pub mod annotation_log_repo;
pub mod annotation_repo;
pub mod image_repo;
pub mod taxonomy_repo;
pub mod validation_event_repo;

pub use annotation_log_repo::AnnotationLogRepo;
pub use annotation_repo::AnnotationRepo;
pub use image_repo::ImageRepo;
pub use taxonomy_repo::TaxonomyRepo;
pub use validation_event_repo::ValidationEventRepo;
