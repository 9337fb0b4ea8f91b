//! Quantities derived from the incremental outputs.

use crate::output::CipherOutput;
use cipher_core::errors::{CipherError, CipherResult};
use ndarray::{Array2, ArrayD};

/// Name of the output holding the phase index of each voxel.
pub const PHASE_ID_OUTPUT: &str = "phaseid";

/// Count the voxels of each phase in a phase index field.
///
/// Values are rounded to the nearest integer, as the resampled fields are stored as floats.
pub fn num_voxels_per_phase(phase_id: &ArrayD<f64>, num_phases: usize) -> CipherResult<Vec<usize>> {
    let mut counts = vec![0; num_phases];
    for &value in phase_id.iter() {
        let phase = value.round();
        if phase < 0.0 || phase as usize >= num_phases {
            return Err(CipherError::ConfigFormat(format!(
                "Phase index {value} is outside 0..{num_phases}"
            )));
        }
        counts[phase as usize] += 1;
    }
    Ok(counts)
}

impl CipherOutput {
    /// Volume fraction of every initial phase at each increment.
    ///
    /// Rows follow the increments and columns the phases of the input geometry.
    pub fn phase_size_evolution(&self) -> CipherResult<Array2<f64>> {
        let num_phases = self.input().geometry().num_phases();
        let increments = self.incremental_data();
        let mut fractions = Array2::zeros((increments.len(), num_phases));

        for (row, increment) in increments.iter().enumerate() {
            let phase_id = increment.output(PHASE_ID_OUTPUT).ok_or_else(|| {
                CipherError::ConfigFormat(format!(
                    "Increment {} has no {PHASE_ID_OUTPUT:?} output",
                    increment.increment
                ))
            })?;
            let counts = num_voxels_per_phase(phase_id, num_phases)?;
            let total = phase_id.len().max(1) as f64;
            for (col, count) in counts.into_iter().enumerate() {
                fractions[[row, col]] = count as f64 / total;
            }
        }
        Ok(fractions)
    }
}
