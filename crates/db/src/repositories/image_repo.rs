//! Repository for the `images` table and footprint containment queries.

use sqlx::{PgExecutor, PgPool};
use tessera_core::containment::group_candidates;
use tessera_core::types::DbId;

use crate::models::image::{CreateImage, Image};
use crate::spatial::geometry_from_geojson;

/// Column list for images queries. The footprint is never selected.
const COLUMNS: &str = "id, filename, sensor, bands, bit_depth, created_at, updated_at";

/// Provides CRUD and spatial lookups for images.
pub struct ImageRepo;

impl ImageRepo {
    /// List all images, ordered by id.
    pub async fn list(pool: &PgPool) -> Result<Vec<Image>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM images ORDER BY id");
        sqlx::query_as::<_, Image>(&query).fetch_all(pool).await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Image>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM images WHERE id = $1");
        sqlx::query_as::<_, Image>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Which of `ids` exist, sorted and deduplicated.
    pub async fn existing_ids<'e, E>(executor: E, ids: &[DbId]) -> Result<Vec<DbId>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_scalar("SELECT id FROM images WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(executor)
            .await
    }

    /// Register an image, reprojecting its footprint into the reference system.
    pub async fn create<'e, E>(executor: E, input: &CreateImage) -> Result<Image, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let trace = geometry_from_geojson("$5", "$6::integer");
        let query = format!(
            "INSERT INTO images (filename, sensor, bands, bit_depth, trace)
             VALUES ($1, $2, $3, $4, {trace})
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Image>(&query)
            .bind(&input.filename)
            .bind(&input.sensor)
            .bind(&input.bands)
            .bind(input.bit_depth)
            .bind(input.trace.to_string())
            .bind(input.srid)
            .fetch_one(executor)
            .await
    }

    /// Candidate images for every geometry of a batch, aligned with input order.
    ///
    /// One statement: the geometries become a virtual table numbered with
    /// `WITH ORDINALITY` and are joined against the footprints, so the cost is
    /// a single round trip regardless of batch size. Candidates are sorted by
    /// image id; geometries outside every footprint get an empty list.
    pub async fn resolve_containment<'e, E>(
        executor: E,
        geometries: &[String],
        srid: i32,
    ) -> Result<Vec<Vec<DbId>>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        if geometries.is_empty() {
            return Ok(Vec::new());
        }
        let feature = geometry_from_geojson("f.geojson", "$2::integer");
        let query = format!(
            "SELECT f.position, i.id
             FROM unnest($1::text[]) WITH ORDINALITY AS f(geojson, position)
             JOIN images i ON ST_Within({feature}, i.trace)
             ORDER BY f.position, i.id"
        );
        let rows: Vec<(i64, DbId)> = sqlx::query_as(&query)
            .bind(geometries)
            .bind(srid)
            .fetch_all(executor)
            .await?;

        group_candidates(geometries.len(), rows).map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }
}
