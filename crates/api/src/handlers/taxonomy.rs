//! Handlers for taxonomies, their trees and per-class statistics.

use std::collections::{BTreeMap, HashMap};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use tessera_core::aggregation::{class_counts, ClassCount};
use tessera_core::error::CoreError;
use tessera_core::lifecycle::{AnnotationStatus, StatusId};
use tessera_core::taxonomy::TaxonomyNode;
use tessera_core::types::DbId;
use tessera_db::models::taxonomy::{CreateTaxonomy, CreateTaxonomyClass};
use tessera_db::repositories::{AnnotationRepo, TaxonomyRepo};

use crate::engine::taxonomy::{load_class_tree, load_forest, load_taxonomy_tree};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /taxonomies/{id}/statistics`.
#[derive(Debug, Deserialize)]
pub struct StatisticsParams {
    /// Count only annotations in this status. Defaults to every status
    /// except `deleted`.
    pub status: Option<String>,
    /// Root of the subtree to aggregate; required when the taxonomy is a forest.
    pub root_id: Option<DbId>,
}

/// Aggregated per-class counts of a taxonomy subtree.
#[derive(Debug, Serialize)]
pub struct TaxonomyStatistics {
    pub taxonomy_id: DbId,
    pub root_id: DbId,
    pub status: Option<AnnotationStatus>,
    pub classes: Vec<ClassCount>,
}

/// Request body for `POST /taxonomies/{id}/classes`.
#[derive(Debug, Deserialize)]
pub struct CreateClassRequest {
    pub parent_id: Option<DbId>,
    pub code: String,
    pub names: BTreeMap<String, String>,
}

/// GET /api/v1/taxonomies
pub async fn list_taxonomies(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let taxonomies = TaxonomyRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: taxonomies }))
}

/// POST /api/v1/taxonomies
pub async fn create_taxonomy(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateTaxonomy>,
) -> AppResult<impl IntoResponse> {
    if input.name.trim().is_empty() {
        return Err(CoreError::Validation("Taxonomy name must not be empty".into()).into());
    }
    let taxonomy = TaxonomyRepo::create(&state.pool, &input).await?;

    tracing::info!(user_id = auth.user_id, taxonomy_id = taxonomy.id, "Taxonomy created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: taxonomy })))
}

/// POST /api/v1/taxonomies/{id}/classes
///
/// The parent, when given, must belong to the same taxonomy.
pub async fn create_class(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(taxonomy_id): Path<DbId>,
    Json(input): Json<CreateClassRequest>,
) -> AppResult<impl IntoResponse> {
    if input.code.trim().is_empty() {
        return Err(CoreError::Validation("Class code must not be empty".into()).into());
    }
    if input.names.is_empty() {
        return Err(CoreError::Validation("At least one display name is required".into()).into());
    }
    TaxonomyRepo::find_by_id(&state.pool, taxonomy_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Taxonomy",
            id: taxonomy_id,
        })?;
    if let Some(parent_id) = input.parent_id {
        let parent = TaxonomyRepo::find_class(&state.pool, parent_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "TaxonomyClass",
                id: parent_id,
            })?;
        if parent.taxonomy_id != taxonomy_id {
            return Err(CoreError::Validation(format!(
                "Parent class {parent_id} belongs to another taxonomy"
            ))
            .into());
        }
    }

    let create = CreateTaxonomyClass {
        taxonomy_id,
        parent_id: input.parent_id,
        code: input.code,
        names: input.names,
    };
    let class = TaxonomyRepo::create_class(&state.pool, &create).await?;

    tracing::info!(
        user_id = auth.user_id,
        taxonomy_id,
        class_id = class.id,
        code = %class.code,
        "Taxonomy class created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: class })))
}

/// GET /api/v1/taxonomies/{id}/tree
///
/// One nested tree per root class.
pub async fn get_taxonomy_tree(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(taxonomy_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<TaxonomyNode>>>> {
    let mut conn = state.pool.acquire().await?;
    let forest = load_forest(&mut conn, taxonomy_id).await?;
    Ok(Json(DataResponse { data: forest }))
}

/// GET /api/v1/taxonomy-classes/{id}/tree
pub async fn get_class_tree(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(class_id): Path<DbId>,
) -> AppResult<Json<DataResponse<TaxonomyNode>>> {
    let mut conn = state.pool.acquire().await?;
    let tree = load_class_tree(&mut conn, class_id).await?;
    Ok(Json(DataResponse {
        data: tree.to_nested(),
    }))
}

/// GET /api/v1/taxonomies/{id}/statistics?status=&root_id=
///
/// Direct and aggregated annotation counts for every class of the subtree.
pub async fn get_statistics(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(taxonomy_id): Path<DbId>,
    Query(params): Query<StatisticsParams>,
) -> AppResult<Json<DataResponse<TaxonomyStatistics>>> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<AnnotationStatus>)
        .transpose()?;
    let statuses = counted_statuses(status);

    let mut conn = state.pool.acquire().await?;
    let tree = load_taxonomy_tree(&mut conn, taxonomy_id, params.root_id).await?;

    let class_ids: Vec<DbId> = tree.iter().map(|n| n.id).collect();
    let counts: HashMap<DbId, i64> = AnnotationRepo::count_by_class(&mut *conn, &class_ids, &statuses)
        .await?
        .into_iter()
        .map(|row| (row.taxonomy_class_id, row.count))
        .collect();

    Ok(Json(DataResponse {
        data: TaxonomyStatistics {
            taxonomy_id,
            root_id: tree.root_id(),
            status,
            classes: class_counts(&tree, &counts),
        },
    }))
}

/// Status ids included in statistics.
fn counted_statuses(status: Option<AnnotationStatus>) -> Vec<StatusId> {
    match status {
        Some(status) => vec![status.id()],
        None => AnnotationStatus::ALL
            .iter()
            .filter(|s| **s != AnnotationStatus::Deleted)
            .map(|s| s.id())
            .collect(),
    }
}
