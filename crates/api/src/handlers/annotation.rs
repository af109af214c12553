//! Handlers for annotations: creation, import, edits and status changes.
//!
//! Annotations are addressed publicly as `annotation.<id>`; malformed
//! references are rejected before any storage access.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tessera_core::error::CoreError;
use tessera_core::lifecycle::AnnotationStatus;
use tessera_core::selector::{format_annotation_ref, parse_annotation_ref, AnnotationSelector};
use tessera_core::types::{DbId, Timestamp};
use tessera_db::models::annotation::{Annotation, CreateAnnotation, UpdateAnnotation};
use tessera_db::repositories::{AnnotationLogRepo, AnnotationRepo, ValidationEventRepo};

use crate::engine::edit::edit_annotation;
use crate::engine::import::{create_annotation as create_one, import_feature_collection};
use crate::engine::transition::{apply_transition, TransitionSummary};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Annotation as returned to clients.
#[derive(Debug, Serialize)]
pub struct AnnotationView {
    /// Public reference, `annotation.<id>`.
    pub id: String,
    pub annotator_id: DbId,
    pub taxonomy_class_id: DbId,
    pub image_id: Option<DbId>,
    pub status: AnnotationStatus,
    pub review_requested: bool,
    pub geometry: Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<Annotation> for AnnotationView {
    type Error = CoreError;

    fn try_from(a: Annotation) -> Result<Self, Self::Error> {
        Ok(Self {
            id: format_annotation_ref(a.id),
            status: a.status()?,
            annotator_id: a.annotator_id,
            taxonomy_class_id: a.taxonomy_class_id,
            image_id: a.image_id,
            review_requested: a.review_requested,
            geometry: a.geometry,
            created_at: a.created_at,
            updated_at: a.updated_at,
        })
    }
}

/// Request body for `POST /annotations/status`.
///
/// Exactly one of `ids` and `taxonomy_class_id` selects the annotations.
#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub ids: Option<Vec<String>>,
    pub taxonomy_class_id: Option<DbId>,
    #[serde(default)]
    pub include_descendants: bool,
    pub status: String,
}

/// Query parameters for `POST /annotations/import`.
#[derive(Debug, Deserialize)]
pub struct ImportParams {
    pub taxonomy_id: DbId,
    /// Root class the feature codes resolve under; required for forests.
    pub root_id: Option<DbId>,
}

fn view(annotation: Annotation) -> AppResult<AnnotationView> {
    Ok(AnnotationView::try_from(annotation)?)
}

/// Make sure an annotation exists before listing its history.
async fn ensure_annotation_exists(state: &AppState, id: DbId) -> AppResult<()> {
    AnnotationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Annotation",
            id,
        }))?;
    Ok(())
}

/// POST /api/v1/annotations
pub async fn create_annotation(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateAnnotation>,
) -> AppResult<impl IntoResponse> {
    let created = create_one(&state.pool, &state.config, auth.user_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: view(created)? })))
}

/// POST /api/v1/annotations/import?taxonomy_id=&root_id=
///
/// Body is a GeoJSON FeatureCollection.
pub async fn import_annotations(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ImportParams>,
    Json(body): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let created = import_feature_collection(
        &state.pool,
        &state.config,
        auth.user_id,
        params.taxonomy_id,
        params.root_id,
        &body,
    )
    .await?;
    let views = created.into_iter().map(view).collect::<AppResult<Vec<_>>>()?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: views })))
}

/// GET /api/v1/annotations/{ref}
pub async fn get_annotation(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> AppResult<Json<DataResponse<AnnotationView>>> {
    let id = parse_annotation_ref(&reference)?;
    let annotation = AnnotationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Annotation",
            id,
        })?;
    Ok(Json(DataResponse {
        data: view(annotation)?,
    }))
}

/// PATCH /api/v1/annotations/{ref}
pub async fn update_annotation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Json(input): Json<UpdateAnnotation>,
) -> AppResult<Json<DataResponse<AnnotationView>>> {
    let id = parse_annotation_ref(&reference)?;
    let updated = edit_annotation(&state.pool, &state.config, auth.user_id, id, &input).await?;
    Ok(Json(DataResponse {
        data: view(updated)?,
    }))
}

/// POST /api/v1/annotations/status
///
/// Explicit ids are all-or-nothing; a taxonomy scope changes whatever
/// subset may legally move.
pub async fn change_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<StatusChangeRequest>,
) -> AppResult<Json<DataResponse<TransitionSummary>>> {
    let target: AnnotationStatus = input.status.parse()?;
    let selector = AnnotationSelector::from_parts(
        input.ids.as_deref(),
        input.taxonomy_class_id,
        input.include_descendants,
    )?;

    let summary = apply_transition(&state.pool, &selector, target, auth.user_id).await?;
    Ok(Json(DataResponse { data: summary }))
}

/// GET /api/v1/annotations/{ref}/validations
pub async fn list_validations(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_annotation_ref(&reference)?;
    ensure_annotation_exists(&state, id).await?;
    let events = ValidationEventRepo::list_for_annotation(&state.pool, id).await?;
    Ok(Json(DataResponse { data: events }))
}

/// GET /api/v1/annotations/{ref}/logs
pub async fn list_logs(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_annotation_ref(&reference)?;
    ensure_annotation_exists(&state, id).await?;
    let logs = AnnotationLogRepo::list_for_annotation(&state.pool, id).await?;
    Ok(Json(DataResponse { data: logs }))
}
