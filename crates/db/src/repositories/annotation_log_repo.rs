//! Repository for the append-only `annotation_logs` table.

use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use tessera_core::types::DbId;

use crate::models::annotation_log::AnnotationLog;

/// Column list for annotation_logs queries.
const COLUMNS: &str = "id, annotation_id, actor_id, changes, created_at";

pub struct AnnotationLogRepo;

impl AnnotationLogRepo {
    /// Write the same snapshot for every annotation id in one statement.
    pub async fn record_many(
        tx: &mut Transaction<'_, Postgres>,
        annotation_ids: &[DbId],
        actor_id: DbId,
        changes: &Value,
    ) -> Result<u64, sqlx::Error> {
        if annotation_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "INSERT INTO annotation_logs (annotation_id, actor_id, changes)
             SELECT u.annotation_id, $2::bigint, $3::jsonb
             FROM UNNEST($1::bigint[]) AS u(annotation_id)",
        )
        .bind(annotation_ids)
        .bind(actor_id)
        .bind(changes)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Write a single log entry.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        annotation_id: DbId,
        actor_id: DbId,
        changes: &Value,
    ) -> Result<AnnotationLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO annotation_logs (annotation_id, actor_id, changes)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AnnotationLog>(&query)
            .bind(annotation_id)
            .bind(actor_id)
            .bind(changes)
            .fetch_one(&mut **tx)
            .await
    }

    /// Change log of an annotation, oldest first.
    pub async fn list_for_annotation(
        pool: &PgPool,
        annotation_id: DbId,
    ) -> Result<Vec<AnnotationLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotation_logs
             WHERE annotation_id = $1
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, AnnotationLog>(&query)
            .bind(annotation_id)
            .fetch_all(pool)
            .await
    }
}
