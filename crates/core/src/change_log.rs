//! Snapshots for the append-only `annotation_logs` table.
//!
//! A log entry only records the fields that changed, keyed by field name,
//! with their new values.

use serde_json::{Map, Value};

use crate::lifecycle::AnnotationStatus;

/// Fields of `after` whose value differs from `before`.
///
/// Fields absent from `after` are not considered changed.
pub fn changed_fields(before: &Map<String, Value>, after: &Map<String, Value>) -> Map<String, Value> {
    after
        .iter()
        .filter(|(key, value)| before.get(*key) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Snapshot written for a status-only change.
pub fn status_snapshot(status: AnnotationStatus) -> Value {
    let mut map = Map::new();
    map.insert("status".to_string(), Value::String(status.as_str().to_string()));
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn only_changed_fields_are_kept() {
        let before = obj(json!({"taxonomy_class_id": 3, "review_requested": false, "geometry": {"a": 1}}));
        let after = obj(json!({"taxonomy_class_id": 4, "review_requested": false, "geometry": {"a": 1}}));
        assert_eq!(changed_fields(&before, &after), obj(json!({"taxonomy_class_id": 4})));
    }

    #[test]
    fn new_fields_count_as_changed() {
        let before = obj(json!({}));
        let after = obj(json!({"image_id": 9}));
        assert_eq!(changed_fields(&before, &after), obj(json!({"image_id": 9})));
    }

    #[test]
    fn identical_objects_have_no_changes() {
        let same = obj(json!({"review_requested": true}));
        assert!(changed_fields(&same, &same).is_empty());
    }

    #[test]
    fn status_snapshot_holds_only_status() {
        assert_eq!(status_snapshot(AnnotationStatus::Validated), json!({"status": "validated"}));
    }
}
