//! A parsed simulation output directory.

use crate::increment::IncrementData;
use crate::options::OutputOptions;
use crate::reader::ImageDataReader;
use crate::resample::MeshResampler;
use crate::stdout::{parse_cipher_stdout, CipherStdout};
use cipher_core::errors::{CipherError, CipherResult};
use cipher_core::input::write_atomic;
use cipher_core::CipherInput;
use log::{debug, info, warn};
use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the image array holding the `idx`th requested output.
pub fn output_array_name(idx: usize) -> String {
    format!("out output.{idx}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct CipherOutput {
    directory: PathBuf,
    options: OutputOptions,
    input_yaml: String,
    stdout_log: String,
    input: CipherInput,
    stdout: CipherStdout,
    incremental_data: Vec<IncrementData>,
}

impl CipherOutput {
    /// Parse the output directory of a completed simulation.
    ///
    /// The input file and log named in `options` are read from `directory`. Unless
    /// existing image files are reused, the unstructured outputs are first resampled
    /// onto the simulation grid. Every `*.vti` file is then read, in order of the first
    /// integer in its name (its increment), and the requested outputs are extracted.
    pub fn parse_with(
        directory: impl AsRef<Path>,
        options: OutputOptions,
        resampler: &dyn MeshResampler,
        reader: &dyn ImageDataReader,
    ) -> CipherResult<Self> {
        let directory = directory.as_ref().to_path_buf();
        let input_yaml = fs::read_to_string(directory.join(&options.input_yaml_file_name))?;
        let stdout_log = fs::read_to_string(directory.join(&options.stdout_file_name))?;
        let input = CipherInput::from_yaml_str(&input_yaml)?;
        let stdout = parse_cipher_stdout(&stdout_log)?;

        if !options.use_existing_vtis {
            resampler.resample(&directory, &input.geometry().grid_size())?;
        }

        let files = image_files(&directory)?;
        let mut incremental_data = Vec::with_capacity(files.len());
        for (increment, path) in &files {
            incremental_data.push(read_increment(*increment, path, &input, &stdout, reader)?);
        }

        if options.delete_vtis && !options.use_existing_vtis {
            for (_, path) in &files {
                info!("Deleting temporary VTI file {}", path.display());
                fs::remove_file(path)?;
            }
        }

        info!(
            "Parsed {} increment(s) from {}",
            incremental_data.len(),
            directory.display()
        );
        Ok(Self {
            directory,
            options,
            input_yaml,
            stdout_log,
            input,
            stdout,
            incremental_data,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn options(&self) -> &OutputOptions {
        &self.options
    }

    pub fn input(&self) -> &CipherInput {
        &self.input
    }

    pub fn stdout(&self) -> &CipherStdout {
        &self.stdout
    }

    pub fn input_yaml(&self) -> &str {
        &self.input_yaml
    }

    pub fn stdout_log(&self) -> &str {
        &self.stdout_log
    }

    pub fn incremental_data(&self) -> &[IncrementData] {
        &self.incremental_data
    }

    pub fn to_json(&self, keep_arrays: bool) -> CipherResult<Value> {
        let incremental_data = self
            .incremental_data
            .iter()
            .map(|inc| inc.to_json(keep_arrays))
            .collect::<CipherResult<Vec<_>>>()?;
        Ok(serde_json::to_value(CipherOutputJson {
            directory: self.directory.clone(),
            options: self.options.clone(),
            input_yaml_file_str: self.input_yaml.clone(),
            stdout_file_str: self.stdout_log.clone(),
            incremental_data,
        })?)
    }

    pub fn from_json(value: &Value) -> CipherResult<Self> {
        let data: CipherOutputJson = serde_json::from_value(value.clone())?;
        let incremental_data = data
            .incremental_data
            .iter()
            .map(IncrementData::from_json)
            .collect::<CipherResult<Vec<_>>>()?;
        Ok(Self {
            input: CipherInput::from_yaml_str(&data.input_yaml_file_str)?,
            stdout: parse_cipher_stdout(&data.stdout_file_str)?,
            directory: data.directory,
            options: data.options,
            input_yaml: data.input_yaml_file_str,
            stdout_log: data.stdout_file_str,
            incremental_data,
        })
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> CipherResult<PathBuf> {
        let path = path.as_ref();
        write_atomic(path, &serde_json::to_string(&self.to_json(false)?)?)?;
        Ok(path.to_path_buf())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> CipherResult<Self> {
        Self::from_json(&serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

#[derive(Serialize, Deserialize)]
struct CipherOutputJson {
    directory: PathBuf,
    options: OutputOptions,
    input_yaml_file_str: String,
    stdout_file_str: String,
    incremental_data: Vec<Value>,
}

/// All `*.vti` files in `directory` with their increment, in increment order.
fn image_files(directory: &Path) -> CipherResult<Vec<(usize, PathBuf)>> {
    let first_integer = Regex::new(r"\d+").map_err(|e| CipherError::Error(e.to_string()))?;
    let mut files = Vec::new();
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("vti") {
            continue;
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        match first_integer
            .find(name)
            .and_then(|m| m.as_str().parse::<usize>().ok())
        {
            Some(increment) => files.push((increment, path)),
            None => warn!("Ignoring VTI file without an increment number: {name}"),
        }
    }
    files.sort();
    Ok(files)
}

fn read_increment(
    increment: usize,
    path: &Path,
    input: &CipherInput,
    stdout: &CipherStdout,
    reader: &dyn ImageDataReader,
) -> CipherResult<IncrementData> {
    debug!("Reading {}", path.display());
    let image = reader.read(path)?;

    let mesh_name = path
        .with_extension("vtu")
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let time = stdout.output_time(&mesh_name).ok_or_else(|| {
        CipherError::ConfigFormat(format!("The log has no output time for {mesh_name:?}"))
    })?;

    let mut outputs = std::collections::BTreeMap::new();
    for (idx, name) in input.outputs().iter().enumerate() {
        let array_name = output_array_name(idx);
        let values = image.arrays.get(&array_name).ok_or_else(|| {
            CipherError::ConfigFormat(format!(
                "{} has no array {array_name:?} for output {name:?}",
                path.display()
            ))
        })?;
        let values = ArrayD::from_shape_vec(IxDyn(&image.dimensions).f(), values.clone())
            .map_err(|e| {
                CipherError::ConfigFormat(format!(
                    "Array {array_name:?} in {} does not match dimensions {:?}: {e}",
                    path.display(),
                    image.dimensions
                ))
            })?;
        outputs.insert(name.clone(), values);
    }

    Ok(IncrementData {
        increment,
        time,
        dimensions: image.dimensions,
        spacing: image.spacing,
        num_vti_cells: image.num_cells,
        num_vti_points: image.num_points,
        outputs,
    })
}
