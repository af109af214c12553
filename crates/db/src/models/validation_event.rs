//! Validation event model (append-only moderation audit).

use serde::Serialize;
use sqlx::FromRow;
use tessera_core::types::{DbId, Timestamp};

/// A row from the `validation_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ValidationEvent {
    pub id: DbId,
    pub annotation_id: DbId,
    pub validator_id: DbId,
    pub outcome: String,
    pub created_at: Timestamp,
}
