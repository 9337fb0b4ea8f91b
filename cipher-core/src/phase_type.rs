//! Phase types: labelled sub-groups of the phases of one material.

use crate::arrays::{array2_from_json, array_to_json};
use crate::errors::{CipherError, CipherResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Index of a material within its geometry.
pub type MaterialId = usize;

/// A type of phase (i.e. grain) within a material.
///
/// Orientations are unit quaternions stored `[w, x, y, z]`, one row per phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTypeDefinition {
    pub type_label: Option<String>,
    pub target_type_fraction: Option<f64>,
    phases: Option<Vec<usize>>,
    orientations: Option<Array2<f64>>,
    material: Option<MaterialId>,
}

impl PhaseTypeDefinition {
    pub fn builder() -> PhaseTypeDefinitionBuilder {
        PhaseTypeDefinitionBuilder::default()
    }

    pub(crate) fn with_phases(phases: Option<Vec<usize>>) -> Self {
        Self {
            type_label: None,
            target_type_fraction: None,
            phases,
            orientations: None,
            material: None,
        }
    }

    /// Name of the phase type given the name of its material.
    pub fn name(&self, material_name: &str) -> String {
        match &self.type_label {
            Some(label) if !label.is_empty() => format!("{material_name}-{label}"),
            _ => material_name.to_string(),
        }
    }

    pub fn phases(&self) -> Option<&[usize]> {
        self.phases.as_deref()
    }

    pub fn orientations(&self) -> Option<&Array2<f64>> {
        self.orientations.as_ref()
    }

    /// The owning material, once the material has been adopted by a geometry.
    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }

    pub(crate) fn set_assignment(&mut self, phases: Vec<usize>, orientations: Option<Array2<f64>>) {
        self.phases = Some(phases);
        self.orientations = orientations;
    }

    pub(crate) fn set_material(&mut self, material: MaterialId) {
        self.material = Some(material);
    }

    pub fn to_json(&self, keep_arrays: bool) -> CipherResult<Value> {
        let orientations = self
            .orientations
            .as_ref()
            .map(|o| array_to_json(o, keep_arrays))
            .transpose()?;
        let data = PhaseTypeJson {
            type_label: self.type_label.clone(),
            phases: self.phases.clone(),
            orientations,
        };
        Ok(serde_json::to_value(data)?)
    }

    pub fn from_json(value: &Value) -> CipherResult<Self> {
        let data: PhaseTypeJson = serde_json::from_value(value.clone())?;
        let mut builder = PhaseTypeDefinition::builder();
        if let Some(label) = data.type_label {
            builder = builder.type_label(label);
        }
        if let Some(phases) = data.phases {
            builder = builder.phases(phases);
        }
        if let Some(orientations) = data.orientations {
            builder = builder.orientations(array2_from_json(&orientations, 4)?);
        }
        builder.build()
    }
}

#[derive(Serialize, Deserialize)]
struct PhaseTypeJson {
    type_label: Option<String>,
    phases: Option<Vec<usize>>,
    orientations: Option<Value>,
}

/// Builder for [`PhaseTypeDefinition`].
///
/// Orientations given without phases form a pool that is sub-sampled when phases are
/// assigned to the phase type.
#[derive(Debug, Clone, Default)]
pub struct PhaseTypeDefinitionBuilder {
    type_label: Option<String>,
    target_type_fraction: Option<f64>,
    phases: Option<Vec<usize>>,
    orientations: Option<Array2<f64>>,
}

impl PhaseTypeDefinitionBuilder {
    pub fn type_label(mut self, type_label: impl Into<String>) -> Self {
        self.type_label = Some(type_label.into());
        self
    }

    pub fn target_type_fraction(mut self, fraction: f64) -> Self {
        self.target_type_fraction = Some(fraction);
        self
    }

    pub fn phases(mut self, phases: Vec<usize>) -> Self {
        self.phases = Some(phases);
        self
    }

    pub fn orientations(mut self, orientations: Array2<f64>) -> Self {
        self.orientations = Some(orientations);
        self
    }

    pub fn build(self) -> CipherResult<PhaseTypeDefinition> {
        if self.phases.is_some() && self.target_type_fraction.is_some() {
            return Err(CipherError::PhaseTypeFractionPhasesConflict);
        }
        if let Some(orientations) = &self.orientations {
            if orientations.ncols() != 4 {
                return Err(CipherError::OrientationShape {
                    details: format!("array has shape {:?}", orientations.shape()),
                });
            }
            if let Some(phases) = &self.phases {
                if orientations.nrows() != phases.len() {
                    return Err(CipherError::OrientationShape {
                        details: format!(
                            "{} orientation(s) given for {} phase(s)",
                            orientations.nrows(),
                            phases.len()
                        ),
                    });
                }
            }
        }

        Ok(PhaseTypeDefinition {
            type_label: self.type_label,
            target_type_fraction: self.target_type_fraction,
            phases: self.phases,
            orientations: self.orientations,
            material: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fraction_and_phases_conflict() {
        let err = PhaseTypeDefinition::builder()
            .phases(vec![0, 1])
            .target_type_fraction(0.5)
            .build()
            .unwrap_err();
        assert!(matches!(err, CipherError::PhaseTypeFractionPhasesConflict));
    }

    #[test]
    fn test_orientation_shape() {
        let err = PhaseTypeDefinition::builder()
            .orientations(array![[1.0, 0.0, 0.0]])
            .build()
            .unwrap_err();
        assert!(matches!(err, CipherError::OrientationShape { .. }));

        let err = PhaseTypeDefinition::builder()
            .phases(vec![0, 1])
            .orientations(array![[1.0, 0.0, 0.0, 0.0]])
            .build()
            .unwrap_err();
        assert!(matches!(err, CipherError::OrientationShape { .. }));
    }

    #[test]
    fn test_orientation_pool_without_phases() {
        let pt = PhaseTypeDefinition::builder()
            .orientations(array![[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]])
            .build()
            .unwrap();
        assert!(pt.phases().is_none());
        assert_eq!(pt.orientations().unwrap().nrows(), 2);
    }

    #[test]
    fn test_name() {
        let pt = PhaseTypeDefinition::builder().type_label("A").build().unwrap();
        assert_eq!(pt.name("Ti"), "Ti-A");

        let pt = PhaseTypeDefinition::builder().build().unwrap();
        assert_eq!(pt.name("Ti"), "Ti");
    }

    #[test]
    fn test_json_round_trip() {
        let pt = PhaseTypeDefinition::builder()
            .type_label("A")
            .phases(vec![2, 0])
            .orientations(array![[1.0, 0.0, 0.0, 0.0], [0.5, 0.5, 0.5, 0.5]])
            .build()
            .unwrap();
        for keep_arrays in [false, true] {
            let value = pt.to_json(keep_arrays).unwrap();
            assert_eq!(PhaseTypeDefinition::from_json(&value).unwrap(), pt);
        }
    }
}
