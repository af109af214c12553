//! Checks run before geometry is reprojected or matched against images.

use sqlx::PgConnection;
use tessera_core::error::CoreError;
use tessera_core::geometry::validate_srid;
use tessera_core::types::DbId;
use tessera_db::repositories::ImageRepo;
use tessera_db::spatial::srid_is_known;

use crate::error::AppResult;

/// Fail with a validation error unless `srid` is registered in PostGIS.
pub async fn ensure_known_srid(conn: &mut PgConnection, srid: i32) -> AppResult<()> {
    validate_srid(srid)?;
    if !srid_is_known(&mut *conn, srid).await? {
        return Err(CoreError::Validation(format!(
            "Unknown coordinate reference system EPSG:{srid}"
        ))
        .into());
    }
    Ok(())
}

/// Fail with 404 on the first declared image that does not exist.
pub async fn ensure_images_exist(
    conn: &mut PgConnection,
    declared: impl IntoIterator<Item = DbId>,
) -> AppResult<()> {
    let mut ids: Vec<DbId> = declared.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    let found = ImageRepo::existing_ids(&mut *conn, &ids).await?;
    match ids.into_iter().find(|id| found.binary_search(id).is_err()) {
        Some(id) => Err(CoreError::NotFound { entity: "Image", id }.into()),
        None => Ok(()),
    }
}
