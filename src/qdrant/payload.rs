//! Helpers for constructing and reading Qdrant payloads.

use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::qdrant::types::{ChildRecord, QueryPoint, ScoredRow};

/// Build the payload object stored alongside each indexed child chunk.
pub(crate) fn build_child_payload(record: &ChildRecord, timestamp_rfc3339: &str) -> Value {
    json!({
        "source": record.source_uri,
        "text": record.text,
        "parent_id": record.parent_id,
        "source_id": record.source_id,
        "source_name": record.source_name,
        "created_at": timestamp_rfc3339,
    })
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Construct a point identifier for a freshly indexed child chunk.
pub(crate) fn generate_point_id() -> String {
    Uuid::new_v4().to_string()
}

/// Map a scored query point into a row consumable by the retrieval engine.
pub(crate) fn row_from_point(point: QueryPoint) -> ScoredRow {
    let QueryPoint { id, score, payload } = point;
    let mut payload = payload.unwrap_or_default();

    ScoredRow {
        id: stringify_point_id(id),
        score,
        source: take_string(&mut payload, "source"),
        source_name: take_string(&mut payload, "source_name"),
        text: take_string(&mut payload, "text"),
        parent_id: take_string(&mut payload, "parent_id"),
    }
}

fn take_string(payload: &mut Map<String, Value>, key: &str) -> String {
    match payload.remove(key) {
        Some(Value::String(value)) => value,
        _ => String::new(),
    }
}

pub(crate) fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Object(map) => map
            .get("uuid")
            .map(|value| match value {
                Value::String(uuid) => uuid.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| Value::Object(map).to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_rfc3339_like() {
        let ts = current_timestamp_rfc3339();
        assert!(ts.contains('T') && ts.ends_with('Z'));
    }

    #[test]
    fn child_payload_carries_all_schema_fields() {
        let record = ChildRecord {
            text: "Guide->Setup\nInstall deps.".into(),
            vector: vec![0.0; 4],
            parent_id: "p1".into(),
            source_id: "s1".into(),
            source_name: "guide.md".into(),
            source_uri: "file:///guide.md".into(),
        };
        let payload = build_child_payload(&record, "2025-01-01T00:00:00Z");
        assert_eq!(payload["source"], "file:///guide.md");
        assert_eq!(payload["text"], "Guide->Setup\nInstall deps.");
        assert_eq!(payload["parent_id"], "p1");
        assert_eq!(payload["source_id"], "s1");
        assert_eq!(payload["source_name"], "guide.md");
        assert_eq!(payload["created_at"], "2025-01-01T00:00:00Z");
    }

    #[test]
    fn row_from_point_tolerates_missing_payload_fields() {
        let point = QueryPoint {
            id: Value::String("child-1".into()),
            score: 0.42,
            payload: None,
        };
        let row = row_from_point(point);
        assert_eq!(row.id, "child-1");
        assert!((row.score - 0.42).abs() < f32::EPSILON);
        assert!(row.text.is_empty());
        assert!(row.parent_id.is_empty());
    }

    #[test]
    fn stringify_point_id_handles_common_shapes() {
        assert_eq!(stringify_point_id(Value::String("abc".into())), "abc");
        assert_eq!(stringify_point_id(serde_json::json!(7)), "7");
        assert_eq!(
            stringify_point_id(serde_json::json!({ "uuid": "u-1" })),
            "u-1"
        );
    }
}
