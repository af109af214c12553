//! Parsing of GeoJSON FeatureCollections submitted for annotation import.
//!
//! Each feature carries a polygon plus properties naming its taxonomy class
//! (`code` or `taxonomy_class_id`) and optionally the image it was drawn on
//! (`image_id`).

use serde_json::Value;

use crate::error::CoreError;
use crate::geometry::{declared_srid, polygon_from_geojson};
use crate::taxonomy::TaxonomyTree;
use crate::types::DbId;

/// Default upper bound on features per import request.
pub const DEFAULT_MAX_IMPORT_FEATURES: usize = 10_000;

/// One feature of an import batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportFeature {
    /// Original GeoJSON geometry, forwarded to the store as-is.
    pub geometry: Value,
    pub class_code: Option<String>,
    pub class_id: Option<DbId>,
    pub image_id: Option<DbId>,
}

/// A parsed FeatureCollection with its declared SRID.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportBatch {
    pub srid: i32,
    pub features: Vec<ImportFeature>,
}

impl ImportBatch {
    /// GeoJSON text of every geometry, in input order.
    pub fn geometry_texts(&self) -> Vec<String> {
        self.features.iter().map(|f| f.geometry.to_string()).collect()
    }
}

/// Parse and validate a FeatureCollection.
pub fn parse_feature_collection(value: &Value, max_features: usize) -> Result<ImportBatch, CoreError> {
    if value.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(CoreError::Validation(
            "Import body must be a GeoJSON FeatureCollection".to_string(),
        ));
    }
    let srid = declared_srid(value)?;

    let raw = value
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| CoreError::Validation("'features' must be an array".to_string()))?;
    if raw.is_empty() {
        return Err(CoreError::Validation("FeatureCollection has no features".to_string()));
    }
    if raw.len() > max_features {
        return Err(CoreError::Validation(format!(
            "FeatureCollection has {} features, maximum is {max_features}",
            raw.len()
        )));
    }

    let features = raw
        .iter()
        .enumerate()
        .map(|(i, f)| parse_feature(f, i))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ImportBatch { srid, features })
}

fn parse_feature(feature: &Value, index: usize) -> Result<ImportFeature, CoreError> {
    let at = |e: CoreError| match e {
        CoreError::Validation(msg) => CoreError::Validation(format!("Feature {index}: {msg}")),
        other => other,
    };

    if feature.get("type").and_then(Value::as_str) != Some("Feature") {
        return Err(CoreError::Validation(format!(
            "Feature {index}: type must be 'Feature'"
        )));
    }
    let geometry = feature
        .get("geometry")
        .cloned()
        .ok_or_else(|| CoreError::Validation(format!("Feature {index}: missing geometry")))?;
    polygon_from_geojson(&geometry).map_err(at)?;

    let props = feature.get("properties").unwrap_or(&Value::Null);
    let class_code = props
        .get("code")
        .and_then(Value::as_str)
        .map(str::to_string);
    let class_id = optional_id(props, "taxonomy_class_id").map_err(at)?;
    let image_id = optional_id(props, "image_id").map_err(at)?;

    if class_code.is_none() && class_id.is_none() {
        return Err(CoreError::Validation(format!(
            "Feature {index}: 'code' or 'taxonomy_class_id' is required"
        )));
    }

    Ok(ImportFeature {
        geometry,
        class_code,
        class_id,
        image_id,
    })
}

fn optional_id(props: &Value, key: &str) -> Result<Option<DbId>, CoreError> {
    match props.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| CoreError::Validation(format!("'{key}' must be an integer"))),
    }
}

/// Resolve the taxonomy class of every feature against `tree`.
///
/// A code must exist in the tree; an explicit class id must belong to it;
/// when both are given they must name the same class.
pub fn resolve_class_ids(features: &[ImportFeature], tree: &TaxonomyTree) -> Result<Vec<DbId>, CoreError> {
    let codes = tree.code_index();
    features
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let by_code = match &f.class_code {
                Some(code) => Some(*codes.get(code.as_str()).ok_or_else(|| {
                    CoreError::Validation(format!("Feature {i}: unknown taxonomy code '{code}'"))
                })?),
                None => None,
            };
            match (by_code, f.class_id) {
                (Some(a), Some(b)) if a != b => Err(CoreError::Validation(format!(
                    "Feature {i}: code '{}' does not match taxonomy_class_id {b}",
                    f.class_code.as_deref().unwrap_or_default()
                ))),
                (Some(id), _) => Ok(id),
                (None, Some(id)) if tree.contains(id) => Ok(id),
                (None, Some(id)) => Err(CoreError::Validation(format!(
                    "Feature {i}: taxonomy class {id} is not part of taxonomy"
                ))),
                (None, None) => Err(CoreError::Validation(format!(
                    "Feature {i}: no taxonomy class given"
                ))),
            }
        })
        .collect()
}
