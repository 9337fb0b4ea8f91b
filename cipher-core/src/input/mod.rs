//! The top-level simulation input: a geometry plus the solver's components, requested
//! outputs and solution parameters.
//!
//! Inputs are written to and read from the solver's YAML input file format (see the
//! `yaml` module) and can also be exported losslessly to JSON.

mod interface_binning;
mod yaml;

pub use interface_binning::{InterfacePropertyAssignment, MisorientationBinning};
pub use yaml::ParsedCipherInput;

use crate::errors::{CipherError, CipherResult};
use crate::geometry::CipherGeometry;
use crate::interface::InterfaceDefinition;
use crate::material::MaterialDefinition;
use crate::properties::{Properties, PropertyValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, PartialEq)]
pub struct CipherInput {
    geometry: CipherGeometry,
    components: Vec<String>,
    outputs: Vec<String>,
    solution_parameters: Properties,
}

impl CipherInput {
    /// Create an input, checking that the grid size equals
    /// `initblocksize * 2^initrefine` along every axis.
    pub fn new(
        geometry: CipherGeometry,
        components: Vec<String>,
        outputs: Vec<String>,
        solution_parameters: Properties,
    ) -> CipherResult<Self> {
        validate_grid_size(&geometry, &solution_parameters)?;
        Ok(Self {
            geometry,
            components,
            outputs,
            solution_parameters,
        })
    }

    pub fn geometry(&self) -> &CipherGeometry {
        &self.geometry
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn solution_parameters(&self) -> &Properties {
        &self.solution_parameters
    }

    pub fn materials(&self) -> &[MaterialDefinition] {
        self.geometry.materials()
    }

    pub fn interfaces(&self) -> &[InterfaceDefinition] {
        self.geometry.interfaces()
    }

    pub fn interface_names(&self) -> Vec<String> {
        self.geometry.interface_names()
    }

    pub fn to_json(&self, keep_arrays: bool) -> CipherResult<Value> {
        Ok(serde_json::to_value(CipherInputJson {
            geometry: self.geometry.to_json(keep_arrays)?,
            components: self.components.clone(),
            outputs: self.outputs.clone(),
            solution_parameters: self.solution_parameters.clone(),
        })?)
    }

    pub fn from_json(value: &Value) -> CipherResult<Self> {
        let data: CipherInputJson = serde_json::from_value(value.clone())?;
        Self::new(
            CipherGeometry::from_json(&data.geometry)?,
            data.components,
            data.outputs,
            data.solution_parameters,
        )
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> CipherResult<PathBuf> {
        let path = path.as_ref();
        let text = serde_json::to_string(&self.to_json(false)?)?;
        write_atomic(path, &text)?;
        Ok(path.to_path_buf())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> CipherResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&serde_json::from_str(&text)?)
    }
}

#[derive(Serialize, Deserialize)]
struct CipherInputJson {
    geometry: Value,
    components: Vec<String>,
    outputs: Vec<String>,
    solution_parameters: Properties,
}

fn validate_grid_size(geometry: &CipherGeometry, parameters: &Properties) -> CipherResult<()> {
    let initblocksize = integer_list_parameter(parameters, "initblocksize")?;
    let initrefine = integer_parameter(parameters, "initrefine")?;

    let invalid_refine = || CipherError::InvalidSolutionParameter {
        name: "initrefine".to_string(),
        details: format!("{initrefine} is not a valid refinement level"),
    };
    let factor = u32::try_from(initrefine)
        .ok()
        .and_then(|refine| 2_i64.checked_pow(refine))
        .ok_or_else(invalid_refine)?;
    let expected = initblocksize
        .iter()
        .map(|&block| block.checked_mul(factor))
        .collect::<Option<Vec<i64>>>()
        .ok_or_else(invalid_refine)?;

    let grid_size = geometry.grid_size();
    let matches = expected.len() == grid_size.len()
        && expected
            .iter()
            .zip(&grid_size)
            .all(|(&e, &g)| usize::try_from(e).is_ok_and(|e| e == g));
    if !matches {
        return Err(CipherError::GridSizeMismatch {
            grid_size,
            initblocksize,
            initrefine,
            expected,
        });
    }
    Ok(())
}

fn parameter<'a>(parameters: &'a Properties, name: &str) -> CipherResult<&'a PropertyValue> {
    parameters
        .get(name)
        .ok_or_else(|| CipherError::MissingSolutionParameter {
            name: name.to_string(),
        })
}

fn integer_parameter(parameters: &Properties, name: &str) -> CipherResult<i64> {
    parameter(parameters, name)?
        .as_i64()
        .ok_or_else(|| CipherError::InvalidSolutionParameter {
            name: name.to_string(),
            details: "expected an integer".to_string(),
        })
}

fn integer_list_parameter(parameters: &Properties, name: &str) -> CipherResult<Vec<i64>> {
    parameter(parameters, name)?
        .as_list()
        .and_then(|values| values.iter().map(PropertyValue::as_i64).collect())
        .ok_or_else(|| CipherError::InvalidSolutionParameter {
            name: name.to_string(),
            details: "expected a list of integers".to_string(),
        })
}

/// Write a file via a temporary file in the same directory, so that an interrupted
/// write never leaves a partial file at `path`.
pub fn write_atomic(path: &Path, contents: &str) -> CipherResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
