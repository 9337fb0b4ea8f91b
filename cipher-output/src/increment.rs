//! Data of one output increment.

use cipher_core::arrays::{array_from_json, array_to_json};
use cipher_core::errors::CipherResult;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The requested outputs of one increment, resampled onto the simulation grid.
#[derive(Debug, Clone, PartialEq)]
pub struct IncrementData {
    pub increment: usize,
    pub time: f64,
    pub dimensions: Vec<usize>,
    pub spacing: Vec<f64>,
    pub num_vti_cells: usize,
    pub num_vti_points: usize,
    /// Output fields by name, each with shape `dimensions`.
    pub outputs: BTreeMap<String, ArrayD<f64>>,
}

impl IncrementData {
    pub fn output(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.outputs.get(name)
    }

    /// Export as a flat JSON object with one key per output field.
    pub fn to_json(&self, keep_arrays: bool) -> CipherResult<Value> {
        let outputs = self
            .outputs
            .iter()
            .map(|(name, values)| Ok((name.clone(), array_to_json(values, keep_arrays)?)))
            .collect::<CipherResult<BTreeMap<_, _>>>()?;
        Ok(serde_json::to_value(IncrementJson {
            increment: self.increment,
            time: self.time,
            dimensions: self.dimensions.clone(),
            spacing: self.spacing.clone(),
            num_vti_cells: self.num_vti_cells,
            num_vti_points: self.num_vti_points,
            outputs,
        })?)
    }

    pub fn from_json(value: &Value) -> CipherResult<Self> {
        let data: IncrementJson = serde_json::from_value(value.clone())?;
        let outputs = data
            .outputs
            .iter()
            .map(|(name, values)| Ok((name.clone(), array_from_json::<f64>(values)?)))
            .collect::<CipherResult<_>>()?;
        Ok(Self {
            increment: data.increment,
            time: data.time,
            dimensions: data.dimensions,
            spacing: data.spacing,
            num_vti_cells: data.num_vti_cells,
            num_vti_points: data.num_vti_points,
            outputs,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct IncrementJson {
    increment: usize,
    time: f64,
    dimensions: Vec<usize>,
    spacing: Vec<f64>,
    #[serde(rename = "number_VTI_cells")]
    num_vti_cells: usize,
    #[serde(rename = "number_VTI_points")]
    num_vti_points: usize,
    #[serde(flatten)]
    outputs: BTreeMap<String, Value>,
}
