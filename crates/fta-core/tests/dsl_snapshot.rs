//! Integration tests: DSL import → geometry, and snapshot persistence.
//!
//! Exercises the `fta-core` pieces a host touches directly: parsing an
//! exporter document, resolving absolute boxes, and round-tripping snapshots
//! through the stores.

use fta_core::annotation::AnnotationNode;
use fta_core::dsl::DslTree;
use fta_core::geometry::{Bounds, Position, absolute_bounds, absolute_position};
use fta_core::id::NodeId;
use fta_core::snapshot::{
    AnnotationSnapshot, JsonFileStore, MemoryStore, SNAPSHOT_VERSION, SnapshotError, SnapshotStore,
    load_with_fallback,
};
use pretty_assertions::assert_eq;

const EXPORT: &str = r#"{
    "id": "ds_page",
    "type": "frame",
    "layoutStyle": { "width": 800, "height": 600 },
    "children": [
        {
            "id": "ds_panel",
            "type": "frame",
            "layoutStyle": { "width": 300, "height": 200, "relativeX": 40, "relativeY": 60 },
            "children": [
                { "id": "ds_icon", "type": "path", "layoutStyle": { "relativeX": 12, "relativeY": 8 } },
                { "id": "ds_label", "type": "text", "visible": false,
                  "layoutStyle": { "width": null, "height": 18, "relativeX": 30, "relativeY": 8 } }
            ]
        },
        { "id": "ds_loose", "type": "layer" }
    ]
}"#;

// ─── DSL geometry ────────────────────────────────────────────────────────

#[test]
fn absolute_positions_accumulate_from_root() {
    let dsl = DslTree::from_json(EXPORT).unwrap();
    assert_eq!(dsl.len(), 5);
    assert_eq!(
        absolute_position(&dsl, NodeId::intern("ds_icon")),
        Position { x: 52.0, y: 68.0 }
    );
    assert_eq!(
        absolute_bounds(&dsl, NodeId::intern("ds_panel")),
        Bounds::new(40.0, 60.0, 300.0, 200.0)
    );
}

#[test]
fn missing_or_null_geometry_is_zero() {
    let dsl = DslTree::from_json(EXPORT).unwrap();
    assert_eq!(
        absolute_bounds(&dsl, NodeId::intern("ds_label")),
        Bounds::new(70.0, 68.0, 0.0, 18.0)
    );
    assert_eq!(
        absolute_bounds(&dsl, NodeId::intern("ds_loose")),
        Bounds::new(0.0, 0.0, 0.0, 0.0)
    );
    let label = dsl.get_by_id(NodeId::intern("ds_label")).unwrap();
    assert!(!label.visible);
}

#[test]
fn unknown_node_resolves_to_origin() {
    let dsl = DslTree::from_json(EXPORT).unwrap();
    assert_eq!(
        absolute_position(&dsl, NodeId::intern("ds_nowhere")),
        Position::default()
    );
}

#[test]
fn duplicate_ids_are_rejected() {
    let doc = r#"{ "id": "dup_a", "type": "frame", "children": [ { "id": "dup_a", "type": "text" } ] }"#;
    let err = DslTree::from_json(doc).unwrap_err();
    assert!(err.contains("Duplicate"), "{err}");
}

// ─── Snapshots ───────────────────────────────────────────────────────────

fn sample_root() -> AnnotationNode {
    let mut root = AnnotationNode::new_root(NodeId::intern("ds_page"), Bounds::new(0.0, 0.0, 800.0, 600.0));
    root.children.push(AnnotationNode::new(
        NodeId::intern("ds_panel"),
        Some(NodeId::intern("ds_panel")),
        "Card",
        true,
        Bounds::new(40.0, 60.0, 300.0, 200.0),
    ));
    root
}

struct OfflineStore;

impl SnapshotStore for OfflineStore {
    fn save(&mut self, _: &AnnotationSnapshot) -> Result<(), SnapshotError> {
        Err(SnapshotError::Unavailable("backend offline".into()))
    }

    fn load(&self) -> Result<Option<AnnotationSnapshot>, SnapshotError> {
        Err(SnapshotError::Unavailable("backend offline".into()))
    }
}

#[test]
fn snapshot_defaults_missing_fields() {
    let root_json = serde_json::to_string(&sample_root()).unwrap();
    let snap = AnnotationSnapshot::from_json(&format!(r#"{{ "rootAnnotation": {root_json} }}"#)).unwrap();
    assert_eq!(snap.version, SNAPSHOT_VERSION);
    assert!(snap.saved_at > 0);
    assert_eq!(snap.root_annotation, sample_root());
}

#[test]
fn msgpack_matches_json_decode() {
    let snap = AnnotationSnapshot::capture(&sample_root());
    let from_json = AnnotationSnapshot::from_json(&snap.to_json().unwrap()).unwrap();
    let from_msgpack = AnnotationSnapshot::from_msgpack(&snap.to_msgpack().unwrap()).unwrap();
    assert_eq!(from_json, from_msgpack);
}

#[test]
fn file_store_roundtrip_and_missing_file() {
    let path = std::env::temp_dir().join(format!("fta-core-snapshot-{}.json", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let mut store = JsonFileStore::new(&path);
    assert!(store.load().unwrap().is_none());

    let snap = AnnotationSnapshot::capture(&sample_root());
    store.save(&snap).unwrap();
    assert_eq!(store.load().unwrap(), Some(snap));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn failed_primary_falls_back_to_cache() {
    let snap = AnnotationSnapshot::capture(&sample_root());
    let mut cache = MemoryStore::default();
    cache.save(&snap).unwrap();

    assert_eq!(load_with_fallback(&OfflineStore, Some(&cache)), Some(snap));
    assert_eq!(load_with_fallback(&OfflineStore, None), None);

    let mut failing = OfflineStore;
    assert!(matches!(
        failing.save(&AnnotationSnapshot::capture(&sample_root())),
        Err(SnapshotError::Unavailable(_))
    ));
}
