//! Material definitions
//!
//! A material groups one or more phase types. Phases are either given explicitly (at
//! the material level or for every phase type) or are drawn at random, with the material
//! receiving a target volume fraction of the domain and each phase type a target
//! fraction of the material.

use crate::errors::{CipherError, CipherResult};
use crate::geometry::CipherGeometry;
use crate::phase_type::{MaterialId, PhaseTypeDefinition};
use crate::properties::Properties;
use is_close::is_close;
use log::debug;
use ndarray::Axis;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::index::sample;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Reason a set of fractions could not be completed to sum to one.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FractionIssue {
    /// Nothing remains to share among the unassigned entries.
    Excess { assigned: f64, unassigned: usize },
    /// The completed fractions do not sum to one.
    NonUnit { sum: f64 },
}

impl std::fmt::Display for FractionIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FractionIssue::Excess {
                assigned,
                unassigned,
            } => write!(
                f,
                "assigned fractions sum to {assigned} with {unassigned} outstanding \
                 unassigned fraction(s)"
            ),
            FractionIssue::NonUnit { sum } => {
                write!(f, "fractions must sum to one, but sum to {sum}")
            }
        }
    }
}

/// Share the remainder of one evenly among the unspecified fractions.
pub(crate) fn backfill_fractions(fractions: &mut [Option<f64>]) -> Result<(), FractionIssue> {
    let assigned: f64 = fractions.iter().flatten().sum();
    let unassigned = fractions.iter().filter(|f| f.is_none()).count();

    if unassigned > 0 {
        let fraction = (1.0 - assigned) / unassigned as f64;
        if fraction <= 0.0 {
            return Err(FractionIssue::Excess {
                assigned,
                unassigned,
            });
        }
        for value in fractions.iter_mut().filter(|f| f.is_none()) {
            *value = Some(fraction);
        }
    }

    let sum: f64 = fractions.iter().flatten().sum();
    if !is_close!(sum, 1.0) {
        return Err(FractionIssue::NonUnit { sum });
    }
    Ok(())
}

/// A material within a simulation.
#[derive(Debug, Clone)]
pub struct MaterialDefinition {
    pub name: String,
    pub properties: Properties,
    target_volume_fraction: Option<f64>,
    phase_types: Vec<PhaseTypeDefinition>,
    /// Material-level phases still to be split among phase types.
    pending_phases: Option<Vec<usize>>,
    index: Option<MaterialId>,
}

impl MaterialDefinition {
    pub fn builder(name: impl Into<String>) -> MaterialDefinitionBuilder {
        MaterialDefinitionBuilder {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn target_volume_fraction(&self) -> Option<f64> {
        self.target_volume_fraction
    }

    pub(crate) fn set_target_volume_fraction(&mut self, fraction: f64) {
        self.target_volume_fraction = Some(fraction);
    }

    pub fn phase_types(&self) -> &[PhaseTypeDefinition] {
        &self.phase_types
    }

    pub fn num_phase_types(&self) -> usize {
        self.phase_types.len()
    }

    pub fn target_phase_type_fractions(&self) -> Vec<Option<f64>> {
        self.phase_types
            .iter()
            .map(|pt| pt.target_type_fraction)
            .collect()
    }

    /// Index within the owning geometry's materials.
    pub fn index(&self) -> Option<MaterialId> {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: MaterialId) {
        self.index = Some(index);
        for pt in &mut self.phase_types {
            pt.set_material(index);
        }
    }

    pub(crate) fn take_pending_phases(&mut self) -> Option<Vec<usize>> {
        self.pending_phases.take()
    }

    /// All phases of the material, in phase type order.
    ///
    /// `None` until phases have been given or assigned.
    pub fn phases(&self) -> Option<Vec<usize>> {
        let assigned: Option<Vec<usize>> = self
            .phase_types
            .iter()
            .map(|pt| pt.phases())
            .collect::<Option<Vec<_>>>()
            .map(|all| all.concat());
        assigned.or_else(|| self.pending_phases.clone())
    }

    /// Realized fraction of the material's voxels held by each phase type.
    pub fn phase_type_fractions(&self, geometry: &CipherGeometry) -> Vec<f64> {
        let phase_num_voxels = geometry.phase_num_voxels();
        let counts: Vec<usize> = self
            .phase_types
            .iter()
            .map(|pt| {
                pt.phases()
                    .unwrap_or_default()
                    .iter()
                    .map(|&phase| phase_num_voxels.get(phase).copied().unwrap_or(0))
                    .sum()
            })
            .collect();
        let total: usize = counts.iter().sum();
        counts
            .iter()
            .map(|&count| count as f64 / total as f64)
            .collect()
    }

    /// Randomly partition `phases` among the phase types according to their target
    /// type fractions.
    ///
    /// Phase types that carry more orientations than phases keep a random subset of
    /// them. Nothing is modified if any phase type has too few orientations.
    pub fn assign_phases<R: Rng + ?Sized>(
        &mut self,
        phases: &[usize],
        rng: &mut R,
    ) -> CipherResult<()> {
        let weights: Vec<f64> = self
            .phase_types
            .iter()
            .map(|pt| pt.target_type_fraction.unwrap_or(0.0))
            .collect();
        let distribution =
            WeightedIndex::new(&weights).map_err(|e| CipherError::MaterialPhaseTypeFraction {
                material: self.name.clone(),
                details: e.to_string(),
            })?;

        let mut grouped: Vec<Vec<usize>> = vec![Vec::new(); self.phase_types.len()];
        for &phase in phases {
            grouped[distribution.sample(rng)].push(phase);
        }

        let mut orientations = Vec::with_capacity(grouped.len());
        for (type_idx, (pt, assigned)) in self.phase_types.iter().zip(&grouped).enumerate() {
            let selected = match pt.orientations() {
                Some(pool) if pool.nrows() < assigned.len() => {
                    return Err(CipherError::InsufficientOrientations {
                        phase_type: type_idx,
                        orientations: pool.nrows(),
                        phases: assigned.len(),
                    })
                }
                Some(pool) if pool.nrows() > assigned.len() => {
                    let rows = sample(rng, pool.nrows(), assigned.len()).into_vec();
                    Some(pool.select(Axis(0), &rows))
                }
                Some(pool) => Some(pool.clone()),
                None => None,
            };
            orientations.push(selected);
        }

        for ((pt, assigned), selected) in self
            .phase_types
            .iter_mut()
            .zip(grouped)
            .zip(orientations)
        {
            pt.set_assignment(assigned, selected);
        }
        debug!(
            "Assigned {} phase(s) among {} phase type(s) of material {:?}",
            phases.len(),
            self.phase_types.len(),
            self.name
        );
        Ok(())
    }

    pub fn to_json(&self, keep_arrays: bool) -> CipherResult<Value> {
        let phase_types = self
            .phase_types
            .iter()
            .map(|pt| pt.to_json(keep_arrays))
            .collect::<CipherResult<Vec<_>>>()?;
        Ok(serde_json::to_value(MaterialJson {
            name: self.name.clone(),
            properties: self.properties.clone(),
            phase_types,
        })?)
    }

    pub fn from_json(value: &Value) -> CipherResult<Self> {
        let data: MaterialJson = serde_json::from_value(value.clone())?;
        let phase_types = data
            .phase_types
            .iter()
            .map(PhaseTypeDefinition::from_json)
            .collect::<CipherResult<Vec<_>>>()?;
        MaterialDefinition::builder(data.name)
            .properties(data.properties)
            .phase_types(phase_types)
            .build()
    }
}

impl PartialEq for MaterialDefinition {
    fn eq(&self, other: &Self) -> bool {
        let sorted = |m: &MaterialDefinition| {
            let mut phases = m.phases().unwrap_or_default();
            phases.sort_unstable();
            phases
        };
        self.name == other.name
            && self.properties == other.properties
            && sorted(self) == sorted(other)
    }
}

#[derive(Serialize, Deserialize)]
struct MaterialJson {
    name: String,
    properties: Properties,
    phase_types: Vec<Value>,
}

/// Builder for [`MaterialDefinition`].
#[derive(Debug, Clone, Default)]
pub struct MaterialDefinitionBuilder {
    name: String,
    properties: Properties,
    target_volume_fraction: Option<f64>,
    phases: Option<Vec<usize>>,
    phase_types: Vec<PhaseTypeDefinition>,
}

impl MaterialDefinitionBuilder {
    pub fn properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn target_volume_fraction(mut self, fraction: f64) -> Self {
        self.target_volume_fraction = Some(fraction);
        self
    }

    pub fn phases(mut self, phases: Vec<usize>) -> Self {
        self.phases = Some(phases);
        self
    }

    pub fn phase_type(mut self, phase_type: PhaseTypeDefinition) -> Self {
        self.phase_types.push(phase_type);
        self
    }

    pub fn phase_types(mut self, phase_types: Vec<PhaseTypeDefinition>) -> Self {
        self.phase_types.extend(phase_types);
        self
    }

    pub fn build(self) -> CipherResult<MaterialDefinition> {
        let name = self.name;

        if self.target_volume_fraction.is_some() && self.phases.is_some() {
            return Err(CipherError::MaterialFractionPhasesConflict { material: name });
        }
        if let Some(value) = self.target_volume_fraction {
            if !(value > 0.0 && value <= 1.0) {
                return Err(CipherError::InvalidTargetVolumeFraction {
                    material: name,
                    value,
                });
            }
        }

        let given = self
            .phase_types
            .iter()
            .filter(|pt| pt.phases().is_some())
            .count();
        if self.phases.is_some() && given > 0 {
            return Err(CipherError::MaterialPhaseTypePhasesConflict { material: name });
        }
        if given > 0 && given != self.phase_types.len() {
            return Err(CipherError::MaterialPhaseTypePhasesMissing { material: name });
        }

        let (mut phase_types, pending_phases) = if self.phase_types.is_empty() {
            (vec![PhaseTypeDefinition::with_phases(self.phases)], None)
        } else {
            (self.phase_types, self.phases)
        };

        if phase_types.len() > 1 {
            let labels: HashSet<Option<&str>> =
                phase_types.iter().map(|pt| pt.type_label.as_deref()).collect();
            if labels.len() < phase_types.len() {
                return Err(CipherError::MaterialPhaseTypeLabel { material: name });
            }
        }

        if phase_types.iter().all(|pt| pt.phases().is_none()) {
            let mut fractions: Vec<Option<f64>> =
                phase_types.iter().map(|pt| pt.target_type_fraction).collect();
            if let Err(issue) = backfill_fractions(&mut fractions) {
                return Err(CipherError::MaterialPhaseTypeFraction {
                    material: name,
                    details: issue.to_string(),
                });
            }
            for (pt, fraction) in phase_types.iter_mut().zip(fractions) {
                pt.target_type_fraction = fraction;
            }
        }

        Ok(MaterialDefinition {
            name,
            properties: self.properties,
            target_volume_fraction: self.target_volume_fraction,
            phase_types,
            pending_phases,
            index: None,
        })
    }
}
