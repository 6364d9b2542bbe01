use std::fs;
use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use kira_dvh::error::DvhError;
use kira_dvh::io::plan::{load_plan, read_raw_f32};
use kira_dvh::model::{GridGeometry, StructureGeometry, StructureSet};
use serde_json::json;
use tempfile::TempDir;

fn plan_json(dose: serde_json::Value, structure_set: serde_json::Value) -> String {
    json!({
        "transforms": [
            { "id": "world_shift", "matrix": [
                [1.0, 0.0, 0.0, 5.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0]
            ]}
        ],
        "dose": dose,
        "structure_set": structure_set
    })
    .to_string()
}

fn mask_structure(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "color": [1.0, 0.0, 0.0],
        "parent_transform": "world_shift",
        "geometry": {
            "type": "mask",
            "dims": [2, 2, 2],
            "spacing": [1.0, 1.0, 1.0],
            "labels": [1, 1, 1, 1, 1, 1, 1, 1]
        }
    })
}

#[test]
fn inline_values_plan_loads() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plan.json");
    let dose = json!({
        "id": "dose",
        "dims": [2, 2, 2],
        "spacing": [1.0, 1.0, 1.0],
        "dose_unit_value": 0.01,
        "dose_unit_name": "Gy",
        "values": [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]
    });
    let set = json!({ "kind": "group", "name": "RS", "children": [
        mask_structure("PTV"),
        { "name": "Tri", "geometry": { "type": "surface",
            "vertices": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            "triangles": [[0, 1, 2]] } }
    ]});
    fs::write(&path, plan_json(dose, set)).unwrap();

    let plan = load_plan(&path).unwrap();
    assert_eq!(plan.dose.values.len(), 8);
    assert_eq!(plan.dose.dose_unit_name.as_deref(), Some("Gy"));
    assert_eq!(plan.transforms.len(), 1);
    assert!(plan.transforms.transform_to_world("world_shift").is_ok());
    assert_eq!(plan.structures.name(), "RS");
    let members = plan.structures.collect().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].1.color.to_hex(), "#FF0000");
    assert_eq!(members[1].1.color.to_hex(), "#808080");
    assert!(matches!(
        members[1].1.geometry,
        StructureGeometry::Surface { .. }
    ));
}

#[test]
fn gzipped_data_file_resolves_relative_to_plan() {
    let tmp = TempDir::new().unwrap();
    let values: Vec<f32> = (0..8).map(|i| i as f32 * 0.5).collect();
    let raw: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&raw).unwrap();
    fs::write(tmp.path().join("dose.f32.gz"), enc.finish().unwrap()).unwrap();

    let dose = json!({
        "id": "dose",
        "dims": [2, 2, 2],
        "spacing": [1.0, 1.0, 1.0],
        "data_file": "dose.f32.gz"
    });
    let set = json!({ "kind": "single", "structure": mask_structure("PTV") });
    let path = tmp.path().join("plan.json");
    fs::write(&path, plan_json(dose, set)).unwrap();

    let plan = load_plan(&path).unwrap();
    assert_eq!(plan.dose.values, values);
    assert!(matches!(plan.structures, StructureSet::Single(_)));
    assert_eq!(plan.dose.scale_or_default(), (1.0, true));
}

#[test]
fn raw_file_must_hold_whole_floats() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bad.f32");
    fs::write(&path, [0u8; 6]).unwrap();
    assert!(matches!(
        read_raw_f32(&path).unwrap_err(),
        DvhError::InvalidInput(_)
    ));
}

#[test]
fn dose_needs_exactly_one_value_source() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plan.json");
    let set = json!({ "kind": "single", "structure": mask_structure("PTV") });

    let neither = json!({ "id": "d", "dims": [1, 1, 1], "spacing": [1.0, 1.0, 1.0] });
    fs::write(&path, plan_json(neither, set.clone())).unwrap();
    assert!(matches!(load_plan(&path).unwrap_err(), DvhError::InvalidInput(_)));

    let both = json!({ "id": "d", "dims": [1, 1, 1], "spacing": [1.0, 1.0, 1.0],
        "values": [1.0], "data_file": "x.f32" });
    fs::write(&path, plan_json(both, set)).unwrap();
    assert!(matches!(load_plan(&path).unwrap_err(), DvhError::InvalidInput(_)));
}

#[test]
fn value_count_must_match_dims() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plan.json");
    let dose = json!({ "id": "d", "dims": [2, 2, 2], "spacing": [1.0, 1.0, 1.0],
        "values": [1.0, 2.0] });
    let set = json!({ "kind": "single", "structure": mask_structure("PTV") });
    fs::write(&path, plan_json(dose, set)).unwrap();
    assert!(load_plan(&path).is_err());
}

#[test]
fn overflowing_dims_rejected() {
    let geometry = GridGeometry::new([usize::MAX, 2, 2], [1.0; 3], [0.0; 3]);
    assert_eq!(geometry.checked_voxel_count(), None);
    match geometry.validate("dose grid").unwrap_err() {
        DvhError::InvalidInput(msg) => assert!(msg.contains("overflow")),
        other => panic!("unexpected error: {:?}", other),
    }

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plan.json");
    let dose = json!({ "id": "d", "dims": [usize::MAX, 2, 2], "spacing": [1.0, 1.0, 1.0],
        "values": [1.0] });
    let set = json!({ "kind": "single", "structure": mask_structure("PTV") });
    fs::write(&path, plan_json(dose, set)).unwrap();
    assert!(matches!(load_plan(&path).unwrap_err(), DvhError::InvalidInput(_)));
}

#[test]
fn empty_group_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plan.json");
    let dose = json!({ "id": "d", "dims": [1, 1, 1], "spacing": [1.0, 1.0, 1.0],
        "values": [1.0] });
    let set = json!({ "kind": "group", "name": "RS", "children": [] });
    fs::write(&path, plan_json(dose, set)).unwrap();
    assert!(matches!(load_plan(&path).unwrap_err(), DvhError::InvalidInput(_)));
}

#[test]
fn missing_plan_is_io_error() {
    let tmp = TempDir::new().unwrap();
    let err = load_plan(&tmp.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, DvhError::Io { .. }));
}
