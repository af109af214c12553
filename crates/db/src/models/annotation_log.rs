use serde::Serialize;
use sqlx::FromRow;
use tessera_core::types::{DbId, Timestamp};

/// A row from the `annotation_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AnnotationLog {
    pub id: DbId,
    pub annotation_id: DbId,
    pub actor_id: DbId,
    /// Snapshot of the fields that changed, with their new values.
    pub changes: serde_json::Value,
    pub created_at: Timestamp,
}
