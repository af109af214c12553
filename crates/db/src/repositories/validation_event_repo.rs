//! Repository for the append-only `validation_events` table.

use sqlx::{PgPool, Postgres, Transaction};
use tessera_core::lifecycle::ValidationOutcome;
use tessera_core::types::DbId;

use crate::models::validation_event::ValidationEvent;

/// Column list for validation_events queries.
const COLUMNS: &str = "id, annotation_id, validator_id, outcome, created_at";

/// Records and reads moderation decisions.
pub struct ValidationEventRepo;

impl ValidationEventRepo {
    /// Insert one event per annotation id in a single statement.
    ///
    /// Must run in the transaction that performed the matching status
    /// update. Returns the number of events written.
    pub async fn record(
        tx: &mut Transaction<'_, Postgres>,
        annotation_ids: &[DbId],
        validator_id: DbId,
        outcome: ValidationOutcome,
    ) -> Result<u64, sqlx::Error> {
        if annotation_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "INSERT INTO validation_events (annotation_id, validator_id, outcome)
             SELECT u.annotation_id, $2::bigint, $3::text
             FROM UNNEST($1::bigint[]) AS u(annotation_id)",
        )
        .bind(annotation_ids)
        .bind(validator_id)
        .bind(outcome.as_str())
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Validation history of an annotation, newest first.
    pub async fn list_for_annotation(
        pool: &PgPool,
        annotation_id: DbId,
    ) -> Result<Vec<ValidationEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM validation_events
             WHERE annotation_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ValidationEvent>(&query)
            .bind(annotation_id)
            .fetch_all(pool)
            .await
    }
}
