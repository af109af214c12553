//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for inserts and patches where the table takes writes

pub mod annotation;
pub mod annotation_log;
pub mod image;
pub mod taxonomy;
pub mod validation_event;
