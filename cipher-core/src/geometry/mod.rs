//! A geometry is a voxel grid partitioned into phases, with every phase owned by one
//! phase type of one material and every pair of adjacent phases owned by one interface
//! definition.
//!
//! The owning interface of each phase pair is recorded in the interface map, a
//! `num_phases x num_phases` matrix of which only the strict upper triangle is used.
//! All other cells, and any phase pair without an interface, hold [`NO_INTERFACE`].
//!
//! Geometries are built with [`GeometryBuilder`], which assigns phases to materials and
//! phase types, assigns phase pairs to interfaces that were not given any, and then runs
//! the consistency checks in the `validation` module. The same checks are re-run after
//! any mutation that changes the interface definitions.

mod adjacency;
mod builder;
mod validation;

#[cfg(test)]
mod tests;

pub use adjacency::PhaseAdjacency;
pub use builder::GeometryBuilder;

use crate::arrays::{array_from_json, array_to_json};
use crate::boundary::misorientation_angle;
use crate::errors::{CipherError, CipherResult, PhasePair};
use crate::interface::InterfaceDefinition;
use crate::material::MaterialDefinition;
use crate::phase_type::{MaterialId, PhaseTypeDefinition};
use crate::properties::Properties;
use log::info;
use ndarray::{Array2, ArrayD};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Interface map value of a phase pair that has no interface.
pub const NO_INTERFACE: i64 = -1;

#[derive(Debug, Clone)]
pub struct CipherGeometry {
    pub(crate) voxel_phase: ArrayD<usize>,
    pub(crate) size: Vec<f64>,
    pub(crate) materials: Vec<MaterialDefinition>,
    pub(crate) interfaces: Vec<InterfaceDefinition>,
    pub(crate) interface_map: Array2<i64>,
    pub(crate) phase_material: Vec<MaterialId>,
    /// Flat phase type index of each phase, counting phase types across materials in
    /// order.
    pub(crate) phase_phase_type: Vec<usize>,
    pub(crate) phase_num_voxels: Vec<usize>,
    pub(crate) adjacency: PhaseAdjacency,
    pub(crate) random_seed: Option<u64>,
    pub(crate) is_periodic: bool,
}

impl CipherGeometry {
    pub fn builder(voxel_phase: ArrayD<usize>, size: Vec<f64>) -> GeometryBuilder {
        GeometryBuilder::new(voxel_phase, size)
    }

    pub fn voxel_phase(&self) -> &ArrayD<usize> {
        &self.voxel_phase
    }

    /// Physical size of the domain along each axis.
    pub fn size(&self) -> &[f64] {
        &self.size
    }

    pub fn grid_size(&self) -> Vec<usize> {
        self.voxel_phase.shape().to_vec()
    }

    pub fn num_voxels(&self) -> usize {
        self.voxel_phase.len()
    }

    pub fn num_phases(&self) -> usize {
        self.phase_material.len()
    }

    pub fn random_seed(&self) -> Option<u64> {
        self.random_seed
    }

    pub fn is_periodic(&self) -> bool {
        self.is_periodic
    }

    pub fn materials(&self) -> &[MaterialDefinition] {
        &self.materials
    }

    pub fn interfaces(&self) -> &[InterfaceDefinition] {
        &self.interfaces
    }

    pub fn interface_map(&self) -> &Array2<i64> {
        &self.interface_map
    }

    pub fn adjacency(&self) -> &PhaseAdjacency {
        &self.adjacency
    }

    /// Material index of each phase.
    pub fn phase_material(&self) -> &[MaterialId] {
        &self.phase_material
    }

    /// Flat phase type index of each phase.
    pub fn phase_phase_type(&self) -> &[usize] {
        &self.phase_phase_type
    }

    pub fn phase_num_voxels(&self) -> &[usize] {
        &self.phase_num_voxels
    }

    pub fn material_num_voxels(&self) -> Vec<usize> {
        let mut counts = vec![0; self.materials.len()];
        for (phase, &material) in self.phase_material.iter().enumerate() {
            counts[material] += self.phase_num_voxels[phase];
        }
        counts
    }

    /// Realized fraction of all voxels held by each material.
    pub fn material_volume_fractions(&self) -> Vec<f64> {
        let total = self.num_voxels() as f64;
        self.material_num_voxels()
            .into_iter()
            .map(|count| count as f64 / total)
            .collect()
    }

    /// All phase types, flattened across materials, with their material index.
    pub fn phase_types(&self) -> Vec<(MaterialId, &PhaseTypeDefinition)> {
        self.materials
            .iter()
            .enumerate()
            .flat_map(|(mat_idx, mat)| mat.phase_types().iter().map(move |pt| (mat_idx, pt)))
            .collect()
    }

    pub fn phase_type_names(&self) -> Vec<String> {
        self.phase_types()
            .into_iter()
            .map(|(mat_idx, pt)| pt.name(&self.materials[mat_idx].name))
            .collect()
    }

    pub fn material_names(&self) -> Vec<String> {
        self.materials.iter().map(|m| m.name.clone()).collect()
    }

    pub fn interface_names(&self) -> Vec<String> {
        self.interfaces.iter().map(|i| i.name()).collect()
    }

    pub fn material_properties(&self) -> Vec<(&str, &Properties)> {
        self.materials
            .iter()
            .map(|m| (m.name.as_str(), &m.properties))
            .collect()
    }

    pub fn interface_properties(&self) -> Vec<(String, &Properties)> {
        self.interfaces
            .iter()
            .map(|i| (i.name(), &i.properties))
            .collect()
    }

    /// Phase pairs sharing at least one voxel face, in canonical order.
    pub fn adjacent_phase_pairs(&self) -> Vec<PhasePair> {
        let mut pairs: Vec<PhasePair> = self
            .adjacency
            .all_edges()
            .map(|(a, b, _)| if a < b { [a, b] } else { [b, a] })
            .collect();
        pairs.sort_unstable();
        pairs
    }

    /// Number of voxel faces shared by two phases.
    pub fn phase_pair_shared_faces(&self, phase_a: usize, phase_b: usize) -> usize {
        self.adjacency
            .edge_weight(phase_a, phase_b)
            .copied()
            .unwrap_or(0)
    }

    /// Index of the interface owning a phase pair, if any.
    pub fn phase_pair_interface(&self, phase_a: usize, phase_b: usize) -> Option<usize> {
        let (lo, hi) = (phase_a.min(phase_b), phase_a.max(phase_b));
        self.interface_map
            .get([lo, hi])
            .and_then(|&idx| usize::try_from(idx).ok())
    }

    /// Orientation of every phase, one `[w, x, y, z]` quaternion per row.
    pub fn phase_orientations(&self) -> CipherResult<Array2<f64>> {
        let num_phases = self.num_phases();
        let mut orientations = Array2::zeros((num_phases, 4));
        let mut is_set = vec![false; num_phases];

        for (_, pt) in self.phase_types() {
            if let (Some(phases), Some(oris)) = (pt.phases(), pt.orientations()) {
                for (row, &phase) in phases.iter().enumerate() {
                    orientations.row_mut(phase).assign(&oris.row(row));
                    is_set[phase] = true;
                }
            }
        }
        match is_set.iter().position(|set| !set) {
            Some(phase) => Err(CipherError::MissingOrientations { phase }),
            None => Ok(orientations),
        }
    }

    /// Symmetric matrix of misorientation angles (degrees) between all phases.
    pub fn misorientation_matrix(&self) -> CipherResult<Array2<f64>> {
        let orientations = self.phase_orientations()?;
        let num_phases = self.num_phases();
        let mut matrix = Array2::zeros((num_phases, num_phases));
        for a in 0..num_phases {
            for b in (a + 1)..num_phases {
                let angle = misorientation_angle(orientations.row(a), orientations.row(b));
                matrix[[a, b]] = angle;
                matrix[[b, a]] = angle;
            }
        }
        Ok(matrix)
    }

    /// Remove an interface definition, returning it together with its phase pairs.
    ///
    /// The interface map entries of the removed pairs are cleared and later
    /// interfaces are re-indexed. The geometry is left without coverage of the returned
    /// pairs until they are re-assigned.
    pub fn remove_interface(
        &mut self,
        name: &str,
    ) -> CipherResult<(InterfaceDefinition, Vec<PhasePair>)> {
        let idx = self
            .interfaces
            .iter()
            .position(|i| i.name() == name)
            .ok_or_else(|| CipherError::UnknownInterface {
                name: name.to_string(),
            })?;

        let mut definition = self.interfaces.remove(idx);
        definition.index = None;
        let removed = idx as i64;
        self.interface_map.mapv_inplace(|value| {
            if value == removed {
                NO_INTERFACE
            } else if value > removed {
                value - 1
            } else {
                value
            }
        });
        for (new_idx, interface) in self.interfaces.iter_mut().enumerate() {
            interface.index = Some(new_idx);
        }

        let pairs = definition.pairs().to_vec();
        info!(
            "Removed interface {:?} with {} phase pair(s)",
            name,
            pairs.len()
        );
        Ok((definition, pairs))
    }

    /// Record `interface_idx` as the owner of each pair `(phase_a[i], phase_b[i])`.
    pub fn modify_interface_map(
        &mut self,
        phase_a: &[usize],
        phase_b: &[usize],
        interface_idx: usize,
    ) -> CipherResult<()> {
        if phase_a.len() != phase_b.len() {
            return Err(CipherError::PhaseIndexLength {
                phase_a: phase_a.len(),
                phase_b: phase_b.len(),
            });
        }
        let num_phases = self.num_phases();
        for (&a, &b) in phase_a.iter().zip(phase_b) {
            let pair = if a < b { [a, b] } else { [b, a] };
            if pair[1] >= num_phases || pair[0] == pair[1] {
                return Err(CipherError::InvalidPhasePair {
                    interface: format!("#{interface_idx}"),
                    pair,
                    num_phases,
                });
            }
            self.interface_map[pair] = interface_idx as i64;
        }
        Ok(())
    }

    /// Append an interface definition, returning its index.
    pub(crate) fn push_interface(&mut self, mut definition: InterfaceDefinition) -> usize {
        let idx = self.interfaces.len();
        definition.index = Some(idx);
        self.interfaces.push(definition);
        idx
    }

    pub fn to_json(&self, keep_arrays: bool) -> CipherResult<Value> {
        let data = GeometryJson {
            voxel_phase: array_to_json(&self.voxel_phase, keep_arrays)?,
            size: self.size.clone(),
            materials: self
                .materials
                .iter()
                .map(|m| m.to_json(keep_arrays))
                .collect::<CipherResult<_>>()?,
            interfaces: self
                .interfaces
                .iter()
                .map(|i| i.to_json(keep_arrays))
                .collect::<CipherResult<_>>()?,
            random_seed: self.random_seed,
            is_periodic: self.is_periodic,
        };
        Ok(serde_json::to_value(data)?)
    }

    pub fn from_json(value: &Value) -> CipherResult<Self> {
        let data: GeometryJson = serde_json::from_value(value.clone())?;
        let materials = data
            .materials
            .iter()
            .map(MaterialDefinition::from_json)
            .collect::<CipherResult<Vec<_>>>()?;
        let interfaces = data
            .interfaces
            .iter()
            .map(InterfaceDefinition::from_json)
            .collect::<CipherResult<Vec<_>>>()?;

        let mut builder = CipherGeometry::builder(array_from_json(&data.voxel_phase)?, data.size)
            .with_materials(materials)
            .with_interfaces(interfaces)
            .periodic(data.is_periodic);
        if let Some(seed) = data.random_seed {
            builder = builder.with_random_seed(seed);
        }
        builder.build()
    }
}

impl PartialEq for CipherGeometry {
    fn eq(&self, other: &Self) -> bool {
        self.voxel_phase == other.voxel_phase
            && self.size == other.size
            && self.materials == other.materials
            && self.interfaces == other.interfaces
    }
}

#[derive(Serialize, Deserialize)]
struct GeometryJson {
    voxel_phase: Value,
    size: Vec<f64>,
    materials: Vec<Value>,
    interfaces: Vec<Value>,
    #[serde(default)]
    random_seed: Option<u64>,
    #[serde(default)]
    is_periodic: bool,
}
