//! Scenario tests for the geometry module.
//!
//! These build small voxel maps end to end and check phase assignment, interface
//! assignment, the consistency checks and mutation of interface definitions.

#[cfg(test)]
mod mutation;

use crate::geometry::CipherGeometry;
use crate::interface::InterfaceDefinition;
use crate::material::MaterialDefinition;
use ndarray::{array, Array2, ArrayD};

/// 4x4 grid split into four 2x2 phases:
///
/// ```text
/// 0 0 1 1
/// 0 0 1 1
/// 2 2 3 3
/// 2 2 3 3
/// ```
pub(super) fn quadrants() -> ArrayD<usize> {
    array![[0, 0, 1, 1], [0, 0, 1, 1], [2, 2, 3, 3], [2, 2, 3, 3]].into_dyn()
}

/// 8x8 grid of sixteen 2x2 phases, numbered row by row.
pub(super) fn blocks() -> ArrayD<usize> {
    Array2::from_shape_fn((8, 8), |(r, c)| (r / 2) * 4 + c / 2).into_dyn()
}

pub(super) fn material(name: &str, phases: Vec<usize>) -> MaterialDefinition {
    MaterialDefinition::builder(name)
        .phases(phases)
        .build()
        .unwrap()
}

pub(super) fn interface(a: &str, b: &str, pairs: Vec<[usize; 2]>) -> InterfaceDefinition {
    InterfaceDefinition::builder()
        .materials(a, b)
        .phase_pairs(pairs)
        .build()
        .unwrap()
}

pub(super) fn unset_interface(a: &str, b: &str) -> InterfaceDefinition {
    InterfaceDefinition::builder()
        .materials(a, b)
        .build()
        .unwrap()
}

/// Quadrants with phases 0 and 1 in `mat1`, phases 2 and 3 in `mat2`, and every
/// adjacent pair given explicitly.
pub(super) fn two_material_geometry() -> CipherGeometry {
    CipherGeometry::builder(quadrants(), vec![1.0, 1.0])
        .with_material(material("mat1", vec![0, 1]))
        .with_material(material("mat2", vec![2, 3]))
        .with_interface(interface("mat1", "mat1", vec![[1, 0]]))
        .with_interface(interface("mat2", "mat2", vec![[2, 3]]))
        .with_interface(interface("mat1", "mat2", vec![[0, 2], [3, 1]]))
        .with_random_seed(0)
        .build()
        .unwrap()
}
