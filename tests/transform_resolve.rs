use kira_dvh::error::DvhError;
use kira_dvh::math::affine;
use kira_dvh::model::{Color, DoseGrid, GridGeometry, Structure, StructureGeometry};
use kira_dvh::transform::{TransformTree, resolve_structure_to_dose_ijk};
use nalgebra::{Matrix4, Vector3};

fn dose_grid(parent: Option<&str>) -> DoseGrid {
    let geometry = GridGeometry::new([10, 10, 10], [2.0, 2.0, 2.0], [-10.0, -10.0, -10.0]);
    let mut dose = DoseGrid::new("dose", geometry, vec![1.0; 1000]).unwrap();
    dose.parent_transform = parent.map(str::to_string);
    dose
}

fn structure(parent: Option<&str>) -> Structure {
    Structure {
        name: "PTV".to_string(),
        color: Color::default(),
        parent_transform: parent.map(str::to_string),
        geometry: StructureGeometry::Surface {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            triangles: vec![[0, 1, 2]],
        },
    }
}

fn shift(x: f64, y: f64, z: f64) -> Matrix4<f64> {
    Matrix4::new_translation(&Vector3::new(x, y, z))
}

fn assert_point(actual: [f64; 3], expected: [f64; 3]) {
    for axis in 0..3 {
        assert!(
            (actual[axis] - expected[axis]).abs() < 1e-9,
            "axis {}: {:?} vs {:?}",
            axis,
            actual,
            expected
        );
    }
}

#[test]
fn no_parents_uses_dose_index_mapping_only() {
    let tree = TransformTree::new();
    let m = resolve_structure_to_dose_ijk(&tree, &structure(None), &dose_grid(None)).unwrap();
    // (-10, -10, -10) is voxel 0; spacing 2 mm.
    assert_point(affine::apply(&m, [-10.0, -10.0, -10.0]), [0.0, 0.0, 0.0]);
    assert_point(affine::apply(&m, [0.0, 0.0, 0.0]), [5.0, 5.0, 5.0]);
}

#[test]
fn structure_parent_only_maps_to_world() {
    let mut tree = TransformTree::new();
    tree.insert("struct_tf", None, shift(4.0, 0.0, 0.0)).unwrap();
    let m = resolve_structure_to_dose_ijk(&tree, &structure(Some("struct_tf")), &dose_grid(None))
        .unwrap();
    assert_point(affine::apply(&m, [0.0, 0.0, 0.0]), [7.0, 5.0, 5.0]);
}

#[test]
fn dose_parent_only_inverts_dose_to_world() {
    let mut tree = TransformTree::new();
    tree.insert("dose_tf", None, shift(0.0, 4.0, 0.0)).unwrap();
    let m = resolve_structure_to_dose_ijk(&tree, &structure(None), &dose_grid(Some("dose_tf")))
        .unwrap();
    // World origin sits at dose-local (0, -4, 0).
    assert_point(affine::apply(&m, [0.0, 0.0, 0.0]), [5.0, 3.0, 5.0]);
}

#[test]
fn both_parents_go_through_common_ancestor() {
    let mut tree = TransformTree::new();
    tree.insert("root", None, shift(100.0, 0.0, 0.0)).unwrap();
    tree.insert("struct_tf", Some("root".into()), shift(2.0, 0.0, 0.0))
        .unwrap();
    tree.insert("dose_tf", Some("root".into()), shift(0.0, 0.0, -6.0))
        .unwrap();
    let m = resolve_structure_to_dose_ijk(
        &tree,
        &structure(Some("struct_tf")),
        &dose_grid(Some("dose_tf")),
    )
    .unwrap();
    // The shared root cancels; local (0,0,0) is dose-local (2, 0, 6).
    assert_point(affine::apply(&m, [0.0, 0.0, 0.0]), [6.0, 5.0, 8.0]);
}

#[test]
fn nested_target_chain() {
    let mut tree = TransformTree::new();
    tree.insert("a", None, shift(1.0, 0.0, 0.0)).unwrap();
    tree.insert("b", Some("a".into()), shift(1.0, 0.0, 0.0)).unwrap();
    let to_node = tree.transform_to_node("a", "b").unwrap();
    assert_point(affine::apply(&to_node, [0.0, 0.0, 0.0]), [-1.0, 0.0, 0.0]);
    let to_world = tree.transform_to_world("b").unwrap();
    assert_point(affine::apply(&to_world, [0.0, 0.0, 0.0]), [2.0, 0.0, 0.0]);
}

#[test]
fn missing_parent_is_resolution_error() {
    let mut tree = TransformTree::new();
    tree.insert("struct_tf", Some("gone".into()), shift(1.0, 0.0, 0.0))
        .unwrap();
    let err = resolve_structure_to_dose_ijk(&tree, &structure(Some("struct_tf")), &dose_grid(None))
        .unwrap_err();
    assert!(matches!(err, DvhError::TransformResolution(_)));
}

#[test]
fn cycle_is_resolution_error() {
    let mut tree = TransformTree::new();
    tree.insert("a", Some("b".into()), Matrix4::identity()).unwrap();
    tree.insert("b", Some("a".into()), Matrix4::identity()).unwrap();
    let err = tree.transform_to_world("a").unwrap_err();
    assert!(matches!(err, DvhError::TransformResolution(_)));
}

#[test]
fn non_affine_and_duplicate_nodes_rejected() {
    let mut tree = TransformTree::new();
    let mut projective = Matrix4::identity();
    projective[(3, 0)] = 0.5;
    assert!(tree.insert("p", None, projective).is_err());
    tree.insert("a", None, Matrix4::identity()).unwrap();
    assert!(tree.insert("a", None, Matrix4::identity()).is_err());
    assert_eq!(tree.len(), 1);
}
