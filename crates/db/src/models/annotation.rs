//! Annotation models and DTOs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use tessera_core::error::CoreError;
use tessera_core::lifecycle::{AnnotationState, AnnotationStatus, StatusId};
use tessera_core::types::{DbId, Timestamp};

/// A row from the `annotations` table with its geometry as GeoJSON.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Annotation {
    pub id: DbId,
    pub annotator_id: DbId,
    pub taxonomy_class_id: DbId,
    pub image_id: Option<DbId>,
    pub status_id: StatusId,
    pub review_requested: bool,
    /// GeoJSON geometry in EPSG:3857.
    pub geometry: Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Annotation {
    pub fn status(&self) -> Result<AnnotationStatus, CoreError> {
        AnnotationStatus::from_id(self.status_id)
    }

    /// The fields a direct edit may change, keyed as in change-log snapshots.
    pub fn editable_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("taxonomy_class_id".into(), Value::from(self.taxonomy_class_id));
        map.insert("image_id".into(), self.image_id.map_or(Value::Null, Value::from));
        map.insert("review_requested".into(), Value::Bool(self.review_requested));
        map.insert("geometry".into(), self.geometry.clone());
        map
    }
}

/// Lifecycle columns of an annotation, read while holding a row lock.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct AnnotationStateRow {
    pub id: DbId,
    pub status_id: StatusId,
    pub annotator_id: DbId,
}

impl TryFrom<AnnotationStateRow> for AnnotationState {
    type Error = CoreError;

    fn try_from(row: AnnotationStateRow) -> Result<Self, Self::Error> {
        Ok(AnnotationState {
            id: row.id,
            status: AnnotationStatus::from_id(row.status_id)?,
            annotator_id: row.annotator_id,
        })
    }
}

/// Which rows a set-based annotation statement touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationScope {
    /// Rows whose id is listed.
    Ids(Vec<DbId>),
    /// Rows labelled with any of the listed taxonomy classes.
    Classes(Vec<DbId>),
}

impl AnnotationScope {
    /// Column the scope filters on.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Ids(_) => "id",
            Self::Classes(_) => "taxonomy_class_id",
        }
    }

    pub fn values(&self) -> &[DbId] {
        match self {
            Self::Ids(ids) | Self::Classes(ids) => ids,
        }
    }
}

/// One annotation to insert. Class and image are already resolved.
#[derive(Debug, Clone)]
pub struct NewAnnotation {
    pub taxonomy_class_id: DbId,
    pub image_id: Option<DbId>,
    /// GeoJSON geometry text in the batch SRID.
    pub geometry: String,
}

/// Request body for creating a single annotation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAnnotation {
    pub taxonomy_class_id: DbId,
    pub image_id: Option<DbId>,
    pub geometry: Value,
    /// SRID of `geometry`; defaults to the reference system.
    pub srid: Option<i32>,
}

/// Request body for a direct edit. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAnnotation {
    pub taxonomy_class_id: Option<DbId>,
    pub review_requested: Option<bool>,
    pub geometry: Option<Value>,
    pub srid: Option<i32>,
    pub image_id: Option<DbId>,
}

/// Resolved values for a direct edit, ready for the store.
#[derive(Debug, Clone, Default)]
pub struct AnnotationPatch {
    pub taxonomy_class_id: Option<DbId>,
    pub review_requested: Option<bool>,
    /// New GeoJSON geometry text and its SRID.
    pub geometry: Option<(String, i32)>,
    /// `Some(v)` replaces the image id with `v` (which may be `None`).
    pub image_id: Option<Option<DbId>>,
}

impl AnnotationPatch {
    /// Names of the fields this patch writes, as used in log snapshots.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.taxonomy_class_id.is_some() {
            names.push("taxonomy_class_id");
        }
        if self.image_id.is_some() {
            names.push("image_id");
        }
        if self.review_requested.is_some() {
            names.push("review_requested");
        }
        if self.geometry.is_some() {
            names.push("geometry");
        }
        names
    }
}

/// Annotation count for one taxonomy class.
#[derive(Debug, Clone, FromRow)]
pub struct ClassCountRow {
    pub taxonomy_class_id: DbId,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn annotation() -> Annotation {
        Annotation {
            id: 1,
            annotator_id: 2,
            taxonomy_class_id: 3,
            image_id: None,
            status_id: AnnotationStatus::New.id(),
            review_requested: false,
            geometry: json!({"type": "Polygon", "coordinates": []}),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn editable_fields_cover_patchable_columns() {
        let fields = annotation().editable_fields();
        assert_eq!(fields["taxonomy_class_id"], json!(3));
        assert_eq!(fields["image_id"], Value::Null);
        assert_eq!(fields.len(), 4);
    }

    #[test]
    fn scope_column_matches_variant() {
        assert_eq!(AnnotationScope::Ids(vec![1]).column(), "id");
        assert_eq!(AnnotationScope::Classes(vec![1, 2]).values(), &[1, 2]);
    }

    #[test]
    fn patch_field_names() {
        let patch = AnnotationPatch {
            review_requested: Some(true),
            image_id: Some(None),
            ..Default::default()
        };
        assert_eq!(patch.field_names(), vec!["image_id", "review_requested"]);
    }

    #[test]
    fn state_row_converts_status() {
        let row = AnnotationStateRow {
            id: 1,
            status_id: 3,
            annotator_id: 9,
        };
        let state = AnnotationState::try_from(row).unwrap();
        assert_eq!(state.status, AnnotationStatus::Released);
    }
}
