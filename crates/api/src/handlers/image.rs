//! Handlers for images and footprint containment lookups.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tessera_core::error::CoreError;
use tessera_core::geometry::{polygon_from_geojson, validate_srid, REFERENCE_SRID};
use tessera_core::types::DbId;
use tessera_db::models::image::CreateImage;
use tessera_db::repositories::ImageRepo;

use crate::engine::footprint::ensure_known_srid;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Upper bound on geometries per containment lookup.
const MAX_CONTAINMENT_GEOMETRIES: usize = 10_000;

/// Request body for `POST /images/containment`.
#[derive(Debug, Deserialize)]
pub struct ContainmentRequest {
    /// GeoJSON polygons to resolve.
    pub geometries: Vec<Value>,
    /// SRID of every geometry; defaults to the reference system.
    pub srid: Option<i32>,
}

/// Candidate images of one geometry.
#[derive(Debug, Serialize)]
pub struct ContainmentResult {
    /// Zero-based index of the geometry in the request.
    pub position: usize,
    pub image_ids: Vec<DbId>,
}

/// GET /api/v1/images
pub async fn list_images(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let images = ImageRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: images }))
}

/// GET /api/v1/images/{id}
pub async fn get_image(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let image = ImageRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Image", id })?;
    Ok(Json(DataResponse { data: image }))
}

/// POST /api/v1/images
///
/// Register an image with its footprint polygon.
pub async fn create_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateImage>,
) -> AppResult<impl IntoResponse> {
    if input.filename.trim().is_empty() {
        return Err(CoreError::Validation("Image filename must not be empty".into()).into());
    }
    polygon_from_geojson(&input.trace)?;
    validate_srid(input.srid)?;

    let mut conn = state.pool.acquire().await?;
    ensure_known_srid(&mut conn, input.srid).await?;
    let image = ImageRepo::create(&mut *conn, &input).await?;

    tracing::info!(
        user_id = auth.user_id,
        image_id = image.id,
        filename = %image.filename,
        "Image registered"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: image })))
}

/// POST /api/v1/images/containment
///
/// Resolve, for each geometry, every image whose footprint contains it.
pub async fn resolve_containment(
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ContainmentRequest>,
) -> AppResult<Json<DataResponse<Vec<ContainmentResult>>>> {
    if input.geometries.len() > MAX_CONTAINMENT_GEOMETRIES {
        return Err(AppError::BadRequest(format!(
            "Too many geometries ({}), maximum is {MAX_CONTAINMENT_GEOMETRIES}",
            input.geometries.len()
        )));
    }
    for (i, geometry) in input.geometries.iter().enumerate() {
        polygon_from_geojson(geometry).map_err(|e| match e {
            CoreError::Validation(msg) => CoreError::Validation(format!("Geometry {i}: {msg}")),
            other => other,
        })?;
    }

    let srid = validate_srid(input.srid.unwrap_or(REFERENCE_SRID))?;
    let texts: Vec<String> = input.geometries.iter().map(Value::to_string).collect();

    let mut conn = state.pool.acquire().await?;
    ensure_known_srid(&mut conn, srid).await?;
    let candidates = ImageRepo::resolve_containment(&mut *conn, &texts, srid).await?;

    let results = candidates
        .into_iter()
        .enumerate()
        .map(|(position, image_ids)| ContainmentResult {
            position,
            image_ids,
        })
        .collect();
    Ok(Json(DataResponse { data: results }))
}
