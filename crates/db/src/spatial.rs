//! Reprojection of incoming GeoJSON into the reference system.

use sqlx::PgExecutor;
use tessera_core::geometry::REFERENCE_SRID;

/// SQL expression turning GeoJSON text (`text_expr`) declared in SRID
/// `srid_expr` into a 2D geometry in the reference system.
pub fn geometry_from_geojson(text_expr: &str, srid_expr: &str) -> String {
    format!(
        "ST_Transform(ST_SetSRID(ST_Force2D(ST_GeomFromGeoJSON({text_expr})), {srid_expr}), {REFERENCE_SRID})"
    )
}

/// Whether `srid` is registered in PostGIS's `spatial_ref_sys`.
///
/// Run inside the writing transaction so an unknown system is reported
/// before `ST_Transform` fails on it.
pub async fn srid_is_known<'e, E>(executor: E, srid: i32) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM spatial_ref_sys WHERE srid = $1)")
        .bind(srid)
        .fetch_one(executor)
        .await
}
