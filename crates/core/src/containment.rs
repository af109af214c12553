//! Image containment resolution for annotation geometries.
//!
//! A geometry belongs to an image when it lies entirely within the image
//! footprint ("trace"). Footprints may overlap, so each geometry can have
//! zero, one or several candidate images. Results are always aligned with
//! the input order so callers can zip them back onto their features.

use geo::Contains;
use geo_types::Polygon;

use crate::error::CoreError;
use crate::types::DbId;

/// An image id with its footprint in the reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFootprint {
    pub image_id: DbId,
    pub trace: Polygon<f64>,
}

/// Candidate image ids for every feature, aligned with `features`.
///
/// Candidates are sorted by image id.
pub fn resolve_containment(features: &[Polygon<f64>], images: &[ImageFootprint]) -> Vec<Vec<DbId>> {
    features
        .iter()
        .map(|feature| {
            let mut ids: Vec<DbId> = images
                .iter()
                .filter(|img| img.trace.contains(feature))
                .map(|img| img.image_id)
                .collect();
            ids.sort_unstable();
            ids.dedup();
            ids
        })
        .collect()
}

/// Group `(position, image_id)` rows of a batched query by input position.
///
/// Positions are 1-based, as produced by `WITH ORDINALITY`. Positions
/// without a match get an empty list.
pub fn group_candidates<I>(len: usize, rows: I) -> Result<Vec<Vec<DbId>>, CoreError>
where
    I: IntoIterator<Item = (i64, DbId)>,
{
    let mut grouped = vec![Vec::new(); len];
    for (position, image_id) in rows {
        let slot = usize::try_from(position)
            .ok()
            .and_then(|p| p.checked_sub(1))
            .and_then(|idx| grouped.get_mut(idx))
            .ok_or_else(|| {
                CoreError::Internal(format!(
                    "Containment query returned position {position} for a batch of {len}"
                ))
            })?;
        slot.push(image_id);
    }
    for ids in &mut grouped {
        ids.sort_unstable();
        ids.dedup();
    }
    Ok(grouped)
}

/// Pick the image a feature is attached to.
///
/// - A declared image must be among the candidates. Its existence is
///   checked by the caller beforehand.
/// - With no declaration, a single candidate is selected automatically.
/// - Several candidates without a declaration are ambiguous.
/// - No candidate is an error only when containment is required.
pub fn select_image(
    position: usize,
    candidates: &[DbId],
    declared: Option<DbId>,
    require_containment: bool,
) -> Result<Option<DbId>, CoreError> {
    match (declared, candidates) {
        (Some(image_id), _) if candidates.contains(&image_id) => Ok(Some(image_id)),
        (Some(image_id), _) => Err(CoreError::Validation(format!(
            "Feature {position} is not contained in image {image_id}"
        ))),
        (None, [only]) => Ok(Some(*only)),
        (None, []) if require_containment => Err(CoreError::Validation(format!(
            "Feature {position} is not contained in any image"
        ))),
        (None, []) => Ok(None),
        (None, many) => Err(CoreError::Validation(format!(
            "Feature {position} lies within several images {many:?}; specify image_id"
        ))),
    }
}
