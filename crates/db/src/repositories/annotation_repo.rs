//! Repository for the `annotations` table.
//!
//! Status changes are never issued row by row: the transition engine locks
//! the selected rows, plans in memory, then applies one conditional
//! set-based `UPDATE` whose predicate is derived from the transition table.

use sqlx::{PgExecutor, Postgres, Transaction};
use tessera_core::lifecycle::StatusId;
use tessera_core::types::DbId;

use crate::models::annotation::{
    Annotation, AnnotationPatch, AnnotationScope, AnnotationStateRow, ClassCountRow, NewAnnotation,
};
use crate::spatial::geometry_from_geojson;

/// Column list for annotations queries; geometry is rendered as GeoJSON.
const COLUMNS: &str = "id, annotator_id, taxonomy_class_id, image_id, status_id, \
    review_requested, ST_AsGeoJSON(geometry)::jsonb AS geometry, created_at, updated_at";

/// Predicate shared by the conditional status update. A row is written when
/// its status differs from the target and either any user may move it, or
/// the acting user owns it and the edge requires ownership.
const TRANSITION_PREDICATE: &str = "status_id <> $2 \
    AND (status_id = ANY($4) OR (annotator_id = $3 AND status_id = ANY($5)))";

/// Provides reads, batched inserts and set-based updates for annotations.
pub struct AnnotationRepo;

impl AnnotationRepo {
    pub async fn find_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<Annotation>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM annotations WHERE id = $1");
        sqlx::query_as::<_, Annotation>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Insert a batch of annotations in one statement.
    ///
    /// Geometries are reprojected from `srid`. Returned rows are in input
    /// order (ids are assigned in ordinality order).
    pub async fn create_batch(
        tx: &mut Transaction<'_, Postgres>,
        annotator_id: DbId,
        items: &[NewAnnotation],
        srid: i32,
    ) -> Result<Vec<Annotation>, sqlx::Error> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let class_ids: Vec<DbId> = items.iter().map(|i| i.taxonomy_class_id).collect();
        let image_ids: Vec<Option<DbId>> = items.iter().map(|i| i.image_id).collect();
        let geometries: Vec<&str> = items.iter().map(|i| i.geometry.as_str()).collect();

        let geometry = geometry_from_geojson("u.geojson", "$5::integer");
        let query = format!(
            "INSERT INTO annotations (annotator_id, taxonomy_class_id, image_id, geometry)
             SELECT $4::bigint, u.taxonomy_class_id, u.image_id, {geometry}
             FROM UNNEST($1::bigint[], $2::bigint[], $3::text[])
                  WITH ORDINALITY AS u(taxonomy_class_id, image_id, geojson, position)
             ORDER BY u.position
             RETURNING {COLUMNS}"
        );
        let mut rows = sqlx::query_as::<_, Annotation>(&query)
            .bind(&class_ids)
            .bind(&image_ids)
            .bind(&geometries)
            .bind(annotator_id)
            .bind(srid)
            .fetch_all(&mut **tx)
            .await?;
        rows.sort_by_key(|a| a.id);
        Ok(rows)
    }

    /// Lock the lifecycle columns of every row in `scope`, in id order.
    pub async fn lock_states(
        tx: &mut Transaction<'_, Postgres>,
        scope: &AnnotationScope,
    ) -> Result<Vec<AnnotationStateRow>, sqlx::Error> {
        let query = format!(
            "SELECT id, status_id, annotator_id FROM annotations
             WHERE {} = ANY($1)
             ORDER BY id
             FOR UPDATE",
            scope.column()
        );
        sqlx::query_as::<_, AnnotationStateRow>(&query)
            .bind(scope.values())
            .fetch_all(&mut **tx)
            .await
    }

    /// Move every row of `scope` that has a legal edge into `target`.
    ///
    /// `any_user` and `owner_only` are the source statuses from which the
    /// edge is open to anyone or only to the annotator. Returns the ids of
    /// the rows written, sorted.
    pub async fn update_status_conditional(
        tx: &mut Transaction<'_, Postgres>,
        scope: &AnnotationScope,
        target: StatusId,
        acting_user: DbId,
        any_user: &[StatusId],
        owner_only: &[StatusId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let query = format!(
            "UPDATE annotations SET status_id = $2, updated_at = NOW()
             WHERE {} = ANY($1) AND {TRANSITION_PREDICATE}
             RETURNING id",
            scope.column()
        );
        let mut ids: Vec<DbId> = sqlx::query_scalar(&query)
            .bind(scope.values())
            .bind(target)
            .bind(acting_user)
            .bind(any_user)
            .bind(owner_only)
            .fetch_all(&mut **tx)
            .await?;
        ids.sort_unstable();
        Ok(ids)
    }

    /// Fetch one annotation and lock it for a direct edit.
    pub async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<Annotation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM annotations WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Annotation>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Apply a direct edit. Fields absent from the patch keep their value.
    pub async fn update_fields(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        patch: &AnnotationPatch,
    ) -> Result<Annotation, sqlx::Error> {
        let geometry = geometry_from_geojson("$4", "$5::integer");
        let query = format!(
            "UPDATE annotations SET
                taxonomy_class_id = COALESCE($2, taxonomy_class_id),
                review_requested = COALESCE($3, review_requested),
                geometry = CASE WHEN $4::text IS NULL THEN geometry ELSE {geometry} END,
                image_id = CASE WHEN $6 THEN $7 ELSE image_id END,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let (geojson, srid) = match &patch.geometry {
            Some((text, srid)) => (Some(text.as_str()), Some(*srid)),
            None => (None, None),
        };
        sqlx::query_as::<_, Annotation>(&query)
            .bind(id)
            .bind(patch.taxonomy_class_id)
            .bind(patch.review_requested)
            .bind(geojson)
            .bind(srid)
            .bind(patch.image_id.is_some())
            .bind(patch.image_id.flatten())
            .fetch_one(&mut **tx)
            .await
    }

    /// Direct annotation counts per class, restricted to `statuses`.
    ///
    /// Classes without annotations are absent from the result.
    pub async fn count_by_class<'e, E>(
        executor: E,
        class_ids: &[DbId],
        statuses: &[StatusId],
    ) -> Result<Vec<ClassCountRow>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, ClassCountRow>(
            "SELECT taxonomy_class_id, COUNT(*) AS count
             FROM annotations
             WHERE taxonomy_class_id = ANY($1) AND status_id = ANY($2)
             GROUP BY taxonomy_class_id",
        )
        .bind(class_ids)
        .bind(statuses)
        .fetch_all(executor)
        .await
    }
}
