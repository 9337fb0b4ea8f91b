//! Removing interfaces, editing the interface map, orientations and serialisation.

use super::{blocks, quadrants, two_material_geometry, unset_interface};
use crate::errors::CipherError;
use crate::geometry::{CipherGeometry, NO_INTERFACE};
use crate::material::MaterialDefinition;
use crate::phase_type::PhaseTypeDefinition;
use approx::assert_relative_eq;
use ndarray::Array2;

#[test]
fn test_remove_interface() {
    let mut geometry = two_material_geometry();
    let (definition, pairs) = geometry.remove_interface("mat1-mat1").unwrap();
    assert_eq!(definition.name(), "mat1-mat1");
    assert_eq!(definition.index(), None);
    assert_eq!(pairs, vec![[0, 1]]);

    assert_eq!(geometry.interface_names(), vec!["mat2-mat2", "mat1-mat2"]);
    assert_eq!(geometry.interfaces()[0].index(), Some(0));
    assert_eq!(geometry.interfaces()[1].index(), Some(1));
    let map = geometry.interface_map();
    assert_eq!(map[[0, 1]], NO_INTERFACE);
    assert_eq!(map[[2, 3]], 0);
    assert_eq!(map[[0, 2]], 1);

    let err = geometry.validate().unwrap_err();
    match err {
        CipherError::MissingInterfaces { pairs } => assert_eq!(pairs, vec![[0, 1]]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_remove_unknown_interface() {
    let mut geometry = two_material_geometry();
    let err = geometry.remove_interface("mat1-mat3").unwrap_err();
    assert!(matches!(err, CipherError::UnknownInterface { .. }));
    assert_eq!(geometry.interfaces().len(), 3);
}

#[test]
fn test_reassign_removed_pairs() {
    let mut geometry = two_material_geometry();
    let (definition, pairs) = geometry.remove_interface("mat1-mat2").unwrap();
    let idx = geometry.push_interface(definition);
    assert_eq!(idx, 2);

    let (phase_a, phase_b): (Vec<usize>, Vec<usize>) =
        pairs.iter().map(|&[a, b]| (b, a)).unzip();
    geometry.modify_interface_map(&phase_a, &phase_b, idx).unwrap();
    assert_eq!(geometry.interface_map()[[0, 2]], 2);
    assert_eq!(geometry.interface_map()[[2, 0]], NO_INTERFACE);
    assert!(geometry.validate().is_ok());
    assert_eq!(geometry, two_material_geometry());
}

#[test]
fn test_modify_interface_map_checks_pairs() {
    let mut geometry = two_material_geometry();
    let err = geometry
        .modify_interface_map(&[0, 1], &[2], 0)
        .unwrap_err();
    assert!(matches!(
        err,
        CipherError::PhaseIndexLength {
            phase_a: 2,
            phase_b: 1
        }
    ));

    let err = geometry.modify_interface_map(&[0], &[9], 0).unwrap_err();
    assert!(matches!(err, CipherError::InvalidPhasePair { .. }));

    // A pair owned by the wrong interface is caught by validation
    geometry.modify_interface_map(&[0], &[1], 2).unwrap();
    let err = geometry.validate_interface_map().unwrap_err();
    assert!(matches!(
        err,
        CipherError::InterfaceMapMismatch { pair: [0, 1], .. }
    ));
}

fn about_z(degrees: f64) -> [f64; 4] {
    let half = degrees.to_radians() / 2.0;
    [half.cos(), 0.0, 0.0, half.sin()]
}

fn oriented_geometry(angles: &[f64]) -> CipherGeometry {
    let rows: Vec<[f64; 4]> = angles.iter().map(|&a| about_z(a)).collect();
    let orientations = Array2::from_shape_fn((rows.len(), 4), |(r, c)| rows[r][c]);
    let material = MaterialDefinition::builder("mat1")
        .phase_type(
            PhaseTypeDefinition::builder()
                .phases((0..rows.len()).collect())
                .orientations(orientations)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    CipherGeometry::builder(quadrants(), vec![1.0, 1.0])
        .with_material(material)
        .with_interface(unset_interface("mat1", "mat1"))
        .build()
        .unwrap()
}

#[test]
fn test_misorientation_matrix() {
    let geometry = oriented_geometry(&[0.0, 10.0, 25.0, 40.0]);
    let matrix = geometry.misorientation_matrix().unwrap();
    assert_eq!(matrix.shape(), &[4, 4]);
    for phase in 0..4 {
        assert_eq!(matrix[[phase, phase]], 0.0);
    }
    assert_relative_eq!(matrix[[0, 1]], 10.0, epsilon = 1e-9);
    assert_relative_eq!(matrix[[1, 3]], 30.0, epsilon = 1e-9);
    assert_relative_eq!(matrix[[3, 1]], matrix[[1, 3]]);
}

#[test]
fn test_orientations_drawn_from_pool() {
    // Five orientations for four phases: a subset of four is kept
    let rows: Vec<[f64; 4]> = (0..5).map(|i| about_z(i as f64 * 10.0)).collect();
    let pool = Array2::from_shape_fn((5, 4), |(r, c)| rows[r][c]);
    let material = MaterialDefinition::builder("mat1")
        .phase_type(
            PhaseTypeDefinition::builder()
                .orientations(pool)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let geometry = CipherGeometry::builder(quadrants(), vec![1.0, 1.0])
        .with_material(material)
        .with_interface(unset_interface("mat1", "mat1"))
        .with_random_seed(5)
        .build()
        .unwrap();

    let orientations = geometry.phase_orientations().unwrap();
    assert_eq!(orientations.shape(), &[4, 4]);
    for row in orientations.rows() {
        assert!(rows
            .iter()
            .any(|candidate| candidate.iter().zip(row.iter()).all(|(a, b)| a == b)));
    }
}

#[test]
fn test_missing_orientations() {
    let err = two_material_geometry().misorientation_matrix().unwrap_err();
    assert!(matches!(err, CipherError::MissingOrientations { phase: 0 }));
}

#[test]
fn test_shared_faces() {
    let geometry = CipherGeometry::builder(blocks(), vec![1.0, 1.0])
        .with_material(super::material("mat1", (0..16).collect()))
        .with_interface(unset_interface("mat1", "mat1"))
        .build()
        .unwrap();
    assert_eq!(geometry.phase_pair_shared_faces(0, 1), 2);
    assert_eq!(geometry.phase_pair_shared_faces(4, 0), 2);
    assert_eq!(geometry.phase_pair_shared_faces(0, 5), 0);

    let periodic = CipherGeometry::builder(blocks(), vec![1.0, 1.0])
        .with_material(super::material("mat1", (0..16).collect()))
        .with_interface(unset_interface("mat1", "mat1"))
        .periodic(true)
        .build()
        .unwrap();
    assert!(periodic.is_periodic());
    assert_eq!(periodic.phase_pair_shared_faces(0, 3), 2);
    assert_eq!(periodic.adjacent_phase_pairs().len(), 32);
}

#[test]
fn test_json_round_trip() {
    let geometry = CipherGeometry::builder(blocks(), vec![2.0, 2.0])
        .with_material(
            MaterialDefinition::builder("mat1")
                .target_volume_fraction(0.4)
                .build()
                .unwrap(),
        )
        .with_material(MaterialDefinition::builder("mat2").build().unwrap())
        .with_interface(unset_interface("mat1", "mat1"))
        .with_interface(unset_interface("mat1", "mat2"))
        .with_interface(unset_interface("mat2", "mat2"))
        .with_random_seed(9)
        .build()
        .unwrap();

    for keep_arrays in [false, true] {
        let value = geometry.to_json(keep_arrays).unwrap();
        let reloaded = CipherGeometry::from_json(&value).unwrap();
        assert_eq!(reloaded, geometry);
        assert_eq!(reloaded.interface_map(), geometry.interface_map());
        assert_eq!(reloaded.random_seed(), Some(9));
    }
}
