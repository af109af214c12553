//! Annotation creation: single drawings and GeoJSON imports.
//!
//! Both paths check taxonomy classes, resolve the containing image with one
//! batched footprint query, then insert every annotation in one statement.

use serde_json::Value;
use tessera_core::containment::select_image;
use tessera_core::error::CoreError;
use tessera_core::geometry::{polygon_from_geojson, validate_srid, REFERENCE_SRID};
use tessera_core::import::{parse_feature_collection, resolve_class_ids};
use tessera_core::types::DbId;
use tessera_db::models::annotation::{Annotation, CreateAnnotation, NewAnnotation};
use tessera_db::repositories::{AnnotationRepo, ImageRepo};
use tessera_db::DbPool;

use crate::config::ServerConfig;
use crate::engine::footprint::{ensure_images_exist, ensure_known_srid};
use crate::engine::taxonomy::{find_class, load_taxonomy_tree};
use crate::error::AppResult;

/// Import every feature of a FeatureCollection as a new annotation.
///
/// The batch is all-or-nothing: one invalid feature rejects the request.
/// Returned annotations are in feature order.
pub async fn import_feature_collection(
    pool: &DbPool,
    config: &ServerConfig,
    annotator_id: DbId,
    taxonomy_id: DbId,
    root_id: Option<DbId>,
    body: &Value,
) -> AppResult<Vec<Annotation>> {
    let batch = parse_feature_collection(body, config.max_import_features)?;

    let mut tx = pool.begin().await?;

    ensure_known_srid(&mut tx, batch.srid).await?;
    let tree = load_taxonomy_tree(&mut tx, taxonomy_id, root_id).await?;
    let class_ids = resolve_class_ids(&batch.features, &tree)?;
    ensure_images_exist(&mut tx, batch.features.iter().filter_map(|f| f.image_id)).await?;

    let geometries = batch.geometry_texts();
    let candidates = ImageRepo::resolve_containment(&mut *tx, &geometries, batch.srid).await?;

    let items = batch
        .features
        .iter()
        .zip(class_ids)
        .zip(geometries)
        .zip(&candidates)
        .enumerate()
        .map(|(position, (((feature, class_id), geometry), images))| {
            let image_id = select_image(
                position,
                images,
                feature.image_id,
                config.require_image_containment,
            )?;
            Ok(NewAnnotation {
                taxonomy_class_id: class_id,
                image_id,
                geometry,
            })
        })
        .collect::<Result<Vec<_>, CoreError>>()?;

    let created = AnnotationRepo::create_batch(&mut tx, annotator_id, &items, batch.srid).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = annotator_id,
        taxonomy_id,
        srid = batch.srid,
        count = created.len(),
        "Annotations imported"
    );

    Ok(created)
}

/// Create one annotation drawn interactively.
pub async fn create_annotation(
    pool: &DbPool,
    config: &ServerConfig,
    annotator_id: DbId,
    input: &CreateAnnotation,
) -> AppResult<Annotation> {
    polygon_from_geojson(&input.geometry)?;
    let srid = validate_srid(input.srid.unwrap_or(REFERENCE_SRID))?;
    let geometry = input.geometry.to_string();

    let mut tx = pool.begin().await?;

    ensure_known_srid(&mut tx, srid).await?;
    find_class(&mut tx, input.taxonomy_class_id).await?;
    ensure_images_exist(&mut tx, input.image_id).await?;

    let candidates =
        ImageRepo::resolve_containment(&mut *tx, std::slice::from_ref(&geometry), srid).await?;
    let image_id = select_image(
        0,
        candidates.first().map(Vec::as_slice).unwrap_or_default(),
        input.image_id,
        config.require_image_containment,
    )?;

    let item = NewAnnotation {
        taxonomy_class_id: input.taxonomy_class_id,
        image_id,
        geometry,
    };
    let created = AnnotationRepo::create_batch(&mut tx, annotator_id, &[item], srid)
        .await?
        .pop()
        .ok_or_else(|| CoreError::Internal("Insert returned no row".to_string()))?;
    tx.commit().await?;

    tracing::info!(
        user_id = annotator_id,
        annotation_id = created.id,
        image_id = ?created.image_id,
        "Annotation created"
    );

    Ok(created)
}
