//! Direct edits of an annotation's geometry, class, image or review flag.

use serde_json::Value;
use tessera_core::change_log::changed_fields;
use tessera_core::containment::select_image;
use tessera_core::error::CoreError;
use tessera_core::geometry::{polygon_from_geojson, validate_srid, REFERENCE_SRID};
use tessera_core::types::DbId;
use tessera_db::models::annotation::{Annotation, AnnotationPatch, UpdateAnnotation};
use tessera_db::repositories::{AnnotationLogRepo, AnnotationRepo, ImageRepo};
use tessera_db::DbPool;

use crate::config::ServerConfig;
use crate::engine::footprint::{ensure_images_exist, ensure_known_srid};
use crate::engine::taxonomy::find_class;
use crate::error::AppResult;

/// Edit an annotation on behalf of its annotator.
///
/// Only annotations in an editable status can change. A new geometry
/// re-resolves the containing image; an explicit image must contain the
/// (new or current) geometry. One log entry records the fields that
/// actually changed.
pub async fn edit_annotation(
    pool: &DbPool,
    config: &ServerConfig,
    actor_id: DbId,
    id: DbId,
    input: &UpdateAnnotation,
) -> AppResult<Annotation> {
    if input.taxonomy_class_id.is_none()
        && input.review_requested.is_none()
        && input.geometry.is_none()
        && input.image_id.is_none()
    {
        return Err(CoreError::Validation("No fields to update".to_string()).into());
    }
    if let Some(geometry) = &input.geometry {
        polygon_from_geojson(geometry)?;
    }
    let srid = validate_srid(input.srid.unwrap_or(REFERENCE_SRID))?;

    let mut tx = pool.begin().await?;

    let current = AnnotationRepo::find_for_update(&mut tx, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Annotation",
            id,
        })?;

    if current.annotator_id != actor_id {
        return Err(CoreError::Forbidden(
            "Only the annotator may edit an annotation".to_string(),
        )
        .into());
    }
    let status = current.status()?;
    if !status.is_editable() {
        return Err(CoreError::Conflict(format!(
            "Annotation is '{status}' and can no longer be edited"
        ))
        .into());
    }

    if let Some(class_id) = input.taxonomy_class_id {
        let new_class = find_class(&mut tx, class_id).await?;
        let old_class = find_class(&mut tx, current.taxonomy_class_id).await?;
        if new_class.taxonomy_id != old_class.taxonomy_id {
            return Err(CoreError::Validation(format!(
                "Taxonomy class {class_id} belongs to another taxonomy"
            ))
            .into());
        }
    }

    ensure_images_exist(&mut tx, input.image_id).await?;

    let mut patch = AnnotationPatch {
        taxonomy_class_id: input.taxonomy_class_id,
        review_requested: input.review_requested,
        ..Default::default()
    };

    if let Some(geometry) = &input.geometry {
        ensure_known_srid(&mut tx, srid).await?;
        let text = geometry.to_string();
        let candidates =
            ImageRepo::resolve_containment(&mut *tx, std::slice::from_ref(&text), srid).await?;
        let candidates = candidates.first().map(Vec::as_slice).unwrap_or_default();
        // Keep the current image when it still contains the new shape.
        let declared = input
            .image_id
            .or(current.image_id.filter(|img| candidates.contains(img)));
        let image_id = select_image(0, candidates, declared, config.require_image_containment)?;
        patch.geometry = Some((text, srid));
        patch.image_id = Some(image_id);
    } else if let Some(image_id) = input.image_id {
        let text = current.geometry.to_string();
        let candidates =
            ImageRepo::resolve_containment(&mut *tx, std::slice::from_ref(&text), REFERENCE_SRID)
                .await?;
        let candidates = candidates.first().map(Vec::as_slice).unwrap_or_default();
        patch.image_id = Some(select_image(0, candidates, Some(image_id), true)?);
    }

    let updated = AnnotationRepo::update_fields(&mut tx, id, &patch).await?;

    let changes = changed_fields(&current.editable_fields(), &updated.editable_fields());
    if !changes.is_empty() {
        AnnotationLogRepo::create(&mut tx, id, actor_id, &Value::Object(changes)).await?;
    }
    tx.commit().await?;

    tracing::info!(
        user_id = actor_id,
        annotation_id = id,
        fields = ?patch.field_names(),
        "Annotation edited"
    );

    Ok(updated)
}
