//! Geometry builder.

use crate::errors::{CipherError, CipherResult, PhasePair};
use crate::interface::InterfaceDefinition;
use crate::material::{backfill_fractions, FractionIssue, MaterialDefinition};
use crate::phase_type::MaterialId;
use log::{debug, info};
use ndarray::{Array2, ArrayD};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

use super::adjacency::phase_adjacency;
use super::{CipherGeometry, NO_INTERFACE};

/// Build a geometry from a voxel phase map, materials and interfaces.
///
/// If any material carries phases (directly or through its phase types), phases are
/// taken as given. Otherwise every phase is drawn into a material according to the
/// materials' target volume fractions, and then into one of that material's phase types.
///
/// Interfaces given without phase pairs receive every adjacent phase pair between their
/// phase types that no other interface claims. Where several such interfaces share
/// phase types, each pair goes to one of them at random, weighted by `type_fraction`.
///
/// The random draws use [`with_random_seed`](Self::with_random_seed) if set, otherwise
/// entropy.
pub struct GeometryBuilder {
    voxel_phase: ArrayD<usize>,
    size: Vec<f64>,
    materials: Vec<MaterialDefinition>,
    interfaces: Vec<InterfaceDefinition>,
    random_seed: Option<u64>,
    is_periodic: bool,
}

impl GeometryBuilder {
    pub fn new(voxel_phase: ArrayD<usize>, size: Vec<f64>) -> Self {
        Self {
            voxel_phase,
            size,
            materials: vec![],
            interfaces: vec![],
            random_seed: None,
            is_periodic: false,
        }
    }

    pub fn with_material(mut self, material: MaterialDefinition) -> Self {
        self.materials.push(material);
        self
    }

    pub fn with_materials(mut self, materials: Vec<MaterialDefinition>) -> Self {
        self.materials.extend(materials);
        self
    }

    pub fn with_interface(mut self, interface: InterfaceDefinition) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn with_interfaces(mut self, interfaces: Vec<InterfaceDefinition>) -> Self {
        self.interfaces.extend(interfaces);
        self
    }

    pub fn with_random_seed(mut self, random_seed: u64) -> Self {
        self.random_seed = Some(random_seed);
        self
    }

    /// Treat opposite faces of the domain as adjacent.
    pub fn periodic(mut self, is_periodic: bool) -> Self {
        self.is_periodic = is_periodic;
        self
    }

    pub fn build(self) -> CipherResult<CipherGeometry> {
        let num_phases = validate_voxel_phase(&self.voxel_phase)?;
        validate_size(&self.size, self.voxel_phase.shape())?;
        check_material_names(&self.materials)?;

        let mut rng = match self.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut materials = self.materials;
        assign_material_phases(&mut materials, num_phases, &mut rng)?;
        for (idx, material) in materials.iter_mut().enumerate() {
            material.set_index(idx);
        }
        let (phase_material, phase_phase_type) = claim_phases(&materials, num_phases)?;

        let mut phase_num_voxels = vec![0; num_phases];
        for &phase in &self.voxel_phase {
            phase_num_voxels[phase] += 1;
        }
        let adjacency = phase_adjacency(&self.voxel_phase, num_phases, self.is_periodic);

        let mut geometry = CipherGeometry {
            voxel_phase: self.voxel_phase,
            size: self.size,
            materials,
            interfaces: Vec::with_capacity(self.interfaces.len()),
            interface_map: Array2::from_elem((num_phases, num_phases), NO_INTERFACE),
            phase_material,
            phase_phase_type,
            phase_num_voxels,
            adjacency,
            random_seed: self.random_seed,
            is_periodic: self.is_periodic,
        };
        for interface in self.interfaces {
            geometry.push_interface(interface);
        }

        geometry.check_interface_phase_pairs()?;
        geometry.stamp_interface_pairs();
        geometry.assign_unset_interfaces(&mut rng)?;
        geometry.validate()?;

        info!(
            "Built geometry with {} phase(s), {} material(s) and {} interface(s)",
            geometry.num_phases(),
            geometry.materials.len(),
            geometry.interfaces.len()
        );
        Ok(geometry)
    }
}

/// Check the voxel phase values form `0..num_phases` and return `num_phases`.
fn validate_voxel_phase(voxel_phase: &ArrayD<usize>) -> CipherResult<usize> {
    let Some(&max_phase) = voxel_phase.iter().max() else {
        return Err(CipherError::GeometryVoxelPhase {
            details: "the voxel phase map is empty".to_string(),
        });
    };
    let mut present = vec![false; max_phase + 1];
    for &phase in voxel_phase {
        present[phase] = true;
    }
    let missing: Vec<usize> = present
        .iter()
        .enumerate()
        .filter(|(_, &p)| !p)
        .map(|(phase, _)| phase)
        .collect();
    if !missing.is_empty() {
        return Err(CipherError::GeometryVoxelPhase {
            details: format!(
                "phase values must form a consecutive range starting at zero, but \
                 phase(s) {missing:?} do not occur"
            ),
        });
    }
    Ok(max_phase + 1)
}

fn validate_size(size: &[f64], grid_size: &[usize]) -> CipherResult<()> {
    if size.len() != grid_size.len() || size.iter().any(|&s| !(s > 0.0)) {
        return Err(CipherError::GeometrySize {
            size: size.to_vec(),
            grid_size: grid_size.to_vec(),
        });
    }
    Ok(())
}

fn check_material_names(materials: &[MaterialDefinition]) -> CipherResult<()> {
    let mut seen = HashSet::new();
    for material in materials {
        if !seen.insert(material.name.as_str()) {
            return Err(CipherError::GeometryDuplicateMaterialName {
                name: material.name.clone(),
            });
        }
    }
    Ok(())
}

fn assign_material_phases<R: Rng + ?Sized>(
    materials: &mut [MaterialDefinition],
    num_phases: usize,
    rng: &mut R,
) -> CipherResult<()> {
    if materials.is_empty() {
        return Ok(());
    }

    if materials.iter().any(|m| m.phases().is_some()) {
        for material in materials.iter_mut() {
            if let Some(pending) = material.take_pending_phases() {
                material.assign_phases(&pending, rng)?;
            } else if material.phases().is_none() {
                material.assign_phases(&[], rng)?;
            }
        }
        return Ok(());
    }

    let mut fractions: Vec<Option<f64>> =
        materials.iter().map(|m| m.target_volume_fraction()).collect();
    backfill_fractions(&mut fractions).map_err(|issue| match issue {
        FractionIssue::Excess {
            assigned,
            unassigned,
        } => CipherError::GeometryExcessTargetVolumeFraction {
            assigned,
            unassigned,
        },
        FractionIssue::NonUnit { sum } => CipherError::GeometryNonUnitTargetVolumeFraction { sum },
    })?;
    let weights: Vec<f64> = fractions.iter().map(|f| f.unwrap_or(0.0)).collect();
    for (material, &weight) in materials.iter_mut().zip(&weights) {
        material.set_target_volume_fraction(weight);
    }

    let distribution =
        WeightedIndex::new(&weights).map_err(|e| CipherError::Error(e.to_string()))?;
    let mut grouped: Vec<Vec<usize>> = vec![Vec::new(); materials.len()];
    for phase in 0..num_phases {
        grouped[distribution.sample(rng)].push(phase);
    }
    for (material, phases) in materials.iter_mut().zip(grouped) {
        debug!(
            "Drew {} phase(s) into material {:?}",
            phases.len(),
            material.name
        );
        material.assign_phases(&phases, rng)?;
    }
    Ok(())
}

/// Check every phase is claimed by exactly one phase type.
///
/// Returns the material and flat phase type index of each phase.
fn claim_phases(
    materials: &[MaterialDefinition],
    num_phases: usize,
) -> CipherResult<(Vec<MaterialId>, Vec<usize>)> {
    let mut claims: Vec<Option<(MaterialId, usize)>> = vec![None; num_phases];
    let mut type_idx = 0;
    for (mat_idx, material) in materials.iter().enumerate() {
        for pt in material.phase_types() {
            for &phase in pt.phases().unwrap_or_default() {
                let claim =
                    claims
                        .get_mut(phase)
                        .ok_or_else(|| CipherError::GeometryPhaseOutOfRange {
                            phase,
                            material: material.name.clone(),
                            num_phases,
                        })?;
                if claim.is_some() {
                    return Err(CipherError::GeometryDuplicatePhaseAssignment { phase });
                }
                *claim = Some((mat_idx, type_idx));
            }
            type_idx += 1;
        }
    }

    let missing: Vec<usize> = claims
        .iter()
        .enumerate()
        .filter(|(_, claim)| claim.is_none())
        .map(|(phase, _)| phase)
        .collect();
    if !missing.is_empty() {
        return Err(CipherError::GeometryMissingPhaseAssignment { phases: missing });
    }
    Ok(claims.into_iter().flatten().unzip())
}

impl CipherGeometry {
    /// Write the phase pairs of every interface into the interface map.
    pub(crate) fn stamp_interface_pairs(&mut self) {
        for (idx, interface) in self.interfaces.iter().enumerate() {
            for &pair in interface.pairs() {
                self.interface_map[pair] = idx as i64;
            }
        }
    }

    /// Give the interfaces without phase pairs the uncovered adjacent pairs between
    /// their phase types.
    fn assign_unset_interfaces<R: Rng + ?Sized>(&mut self, rng: &mut R) -> CipherResult<()> {
        let unset: Vec<usize> = (0..self.interfaces.len())
            .filter(|&idx| !self.interfaces[idx].is_phase_pairs_set())
            .collect();
        if unset.is_empty() {
            return Ok(());
        }
        let endpoints = unset
            .iter()
            .map(|&idx| self.resolve_phase_types(&self.interfaces[idx]))
            .collect::<CipherResult<Vec<_>>>()?;

        let mut assigned: Vec<Vec<PhasePair>> = vec![Vec::new(); unset.len()];
        let mut distributions: BTreeMap<Vec<usize>, WeightedIndex<f64>> = BTreeMap::new();
        for pair in self.adjacent_phase_pairs() {
            if self.interface_map[pair] != NO_INTERFACE {
                continue;
            }
            let type_a = self.phase_phase_type[pair[0]];
            let type_b = self.phase_phase_type[pair[1]];
            let candidates: Vec<usize> = endpoints
                .iter()
                .enumerate()
                .filter(|(_, [ends_a, ends_b])| {
                    (ends_a.contains(&type_a) && ends_b.contains(&type_b))
                        || (ends_a.contains(&type_b) && ends_b.contains(&type_a))
                })
                .map(|(k, _)| k)
                .collect();

            let chosen = match candidates.as_slice() {
                [] => continue,
                [only] => *only,
                _ => {
                    let distribution = match distributions.entry(candidates.clone()) {
                        Entry::Occupied(entry) => entry.into_mut(),
                        Entry::Vacant(entry) => {
                            entry.insert(self.type_fraction_distribution(&unset, &candidates)?)
                        }
                    };
                    candidates[distribution.sample(rng)]
                }
            };
            assigned[chosen].push(pair);
        }

        for (&idx, pairs) in unset.iter().zip(&assigned) {
            for &pair in pairs {
                self.interface_map[pair] = idx as i64;
            }
            let interface = &mut self.interfaces[idx];
            interface.assign_phase_pairs(pairs);
            debug!(
                "Assigned {} phase pair(s) to interface {:?}",
                pairs.len(),
                interface.name()
            );
        }
        Ok(())
    }

    /// Categorical distribution over competing interfaces from their type fractions.
    fn type_fraction_distribution(
        &self,
        unset: &[usize],
        candidates: &[usize],
    ) -> CipherResult<WeightedIndex<f64>> {
        let endpoints = self.interfaces[unset[candidates[0]]].phase_types().clone();
        let mut fractions: Vec<Option<f64>> = candidates
            .iter()
            .map(|&k| self.interfaces[unset[k]].type_fraction)
            .collect();
        backfill_fractions(&mut fractions).map_err(|issue| CipherError::InterfaceTypeFraction {
            endpoints: endpoints.clone(),
            details: issue.to_string(),
        })?;
        WeightedIndex::new(fractions.iter().map(|f| f.unwrap_or(0.0))).map_err(|e| {
            CipherError::InterfaceTypeFraction {
                endpoints,
                details: e.to_string(),
            }
        })
    }
}
