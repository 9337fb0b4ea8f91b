//! The solver's YAML input file.
//!
//! The file holds a `header`, the `solution_parameters`, one `material` and one
//! `interface` property map per definition (in definition order), and three run-length
//! encoded `mappings`, all of which are one-based on disk:
//!
//! * `voxel_phase_mapping`: the phase of each voxel, in column-major voxel order;
//! * `phase_material_mapping`: the material of each phase;
//! * `interface_mapping`: the interface of each phase pair, as the row-major
//!   `num_phases x num_phases` interface map. Only the upper triangle is meaningful;
//!   everything else is written as zero.

use crate::errors::{CipherError, CipherResult, PhasePair};
use crate::geometry::{CipherGeometry, NO_INTERFACE};
use crate::interface::InterfaceDefinition;
use crate::material::MaterialDefinition;
use crate::properties::Properties;
use crate::rle::{compress, decompress};
use log::{info, warn};
use ndarray::{Array2, ArrayD, IxDyn, ShapeBuilder};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::{write_atomic, CipherInput};

/// Contents of an input file, with mappings decoded to zero-based arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCipherInput {
    pub grid_size: Vec<usize>,
    pub size: Vec<f64>,
    pub num_phases: usize,
    pub components: Vec<String>,
    pub outputs: Vec<String>,
    pub solution_parameters: Properties,
    /// Material names and properties, in file order.
    pub materials: Vec<(String, Properties)>,
    /// Interface names and properties, in file order.
    pub interfaces: Vec<(String, Properties)>,
    pub voxel_phase: ArrayD<usize>,
    pub phase_material: Vec<usize>,
    /// Interface map with [`NO_INTERFACE`] everywhere but the upper triangle.
    pub interface_map: Array2<i64>,
}

#[derive(Deserialize)]
struct InputFile {
    header: Header,
    #[serde(default)]
    solution_parameters: Properties,
    #[serde(default)]
    material: Mapping,
    #[serde(default)]
    interface: Mapping,
    mappings: Mappings,
}

#[derive(Serialize, Deserialize)]
struct Header {
    grid: Vec<usize>,
    size: Vec<f64>,
    n_phases: usize,
    #[serde(default)]
    materials: Vec<String>,
    #[serde(default)]
    interfaces: Vec<String>,
    #[serde(default)]
    components: Vec<String>,
    #[serde(default)]
    outputs: Vec<String>,
}

#[derive(Deserialize)]
struct Mappings {
    phase_material_mapping: String,
    voxel_phase_mapping: String,
    interface_mapping: String,
}

impl CipherInput {
    /// Render the YAML input file.
    ///
    /// Fails if the interface map does not cover every adjacent phase pair.
    pub fn to_yaml_string(&self) -> CipherResult<String> {
        let geometry = &self.geometry;
        geometry.validate_interface_map()?;

        let header = Header {
            grid: geometry.grid_size(),
            size: geometry.size().to_vec(),
            n_phases: geometry.num_phases(),
            materials: geometry.material_names(),
            interfaces: geometry.interface_names(),
            components: self.components.clone(),
            outputs: self.outputs.clone(),
        };

        let mut materials = Mapping::new();
        for (name, properties) in geometry.material_properties() {
            materials.insert(Value::from(name), serde_yaml::to_value(properties)?);
        }
        let mut interfaces = Mapping::new();
        for (name, properties) in geometry.interface_properties() {
            interfaces.insert(Value::from(name), serde_yaml::to_value(properties)?);
        }

        let phase_material: Vec<i64> = geometry
            .phase_material()
            .iter()
            .map(|&m| m as i64 + 1)
            .collect();
        let voxel_phase: Vec<i64> = geometry
            .voxel_phase()
            .t()
            .iter()
            .map(|&p| p as i64 + 1)
            .collect();
        let interface_map: Vec<i64> = geometry.interface_map().iter().map(|&i| i + 1).collect();

        let mut mappings = Mapping::new();
        for (key, values) in [
            ("phase_material_mapping", phase_material),
            ("voxel_phase_mapping", voxel_phase),
            ("interface_mapping", interface_map),
        ] {
            mappings.insert(Value::from(key), Value::from(compress(&values)? + "\n"));
        }

        let mut document = Mapping::new();
        document.insert(Value::from("header"), serde_yaml::to_value(header)?);
        document.insert(
            Value::from("solution_parameters"),
            serde_yaml::to_value(&self.solution_parameters)?,
        );
        document.insert(Value::from("material"), Value::Mapping(materials));
        document.insert(Value::from("interface"), Value::Mapping(interfaces));
        document.insert(Value::from("mappings"), Value::Mapping(mappings));

        Ok(serde_yaml::to_string(&document)?)
    }

    /// Write the YAML input file, returning its path.
    pub fn write_yaml(&self, path: impl AsRef<Path>) -> CipherResult<PathBuf> {
        let path = path.as_ref();
        write_atomic(path, &self.to_yaml_string()?)?;
        info!("Wrote input file {}", path.display());
        Ok(path.to_path_buf())
    }

    /// Decode an input file without reconstructing definitions.
    pub fn read_yaml_str(text: &str) -> CipherResult<ParsedCipherInput> {
        let file: InputFile = serde_yaml::from_str(text)?;
        let header = file.header;
        let num_phases = header.n_phases;
        let num_voxels: usize = header.grid.iter().product();

        let voxel_phase = zero_based(
            "voxel_phase_mapping",
            decompress(&file.mappings.voxel_phase_mapping)?,
            num_voxels,
        )?;
        let voxel_phase = ArrayD::from_shape_vec(IxDyn(&header.grid).f(), voxel_phase)
            .map_err(|e| CipherError::ConfigFormat(format!("voxel_phase_mapping: {e}")))?;
        let unique: BTreeSet<usize> = voxel_phase.iter().copied().collect();
        if unique.len() != num_phases {
            return Err(CipherError::ConfigFormat(format!(
                "header declares {num_phases} phases but the voxel phase mapping contains {}",
                unique.len()
            )));
        }

        let phase_material = zero_based(
            "phase_material_mapping",
            decompress(&file.mappings.phase_material_mapping)?,
            num_phases,
        )?;

        let interface_map = decompress(&file.mappings.interface_mapping)?;
        if interface_map.len() != num_phases * num_phases {
            return Err(CipherError::ConfigFormat(format!(
                "interface_mapping has {} entries but {num_phases} phases require {}",
                interface_map.len(),
                num_phases * num_phases
            )));
        }
        let mut interface_map =
            Array2::from_shape_vec((num_phases, num_phases), interface_map)
                .map_err(|e| CipherError::ConfigFormat(format!("interface_mapping: {e}")))?;
        interface_map.indexed_iter_mut().for_each(|((a, b), value)| {
            *value = if a < b { *value - 1 } else { NO_INTERFACE };
        });

        Ok(ParsedCipherInput {
            grid_size: header.grid,
            size: header.size,
            num_phases,
            components: header.components,
            outputs: header.outputs,
            solution_parameters: file.solution_parameters,
            materials: named_properties("material", file.material)?,
            interfaces: named_properties("interface", file.interface)?,
            voxel_phase,
            phase_material,
            interface_map,
        })
    }

    pub fn read_yaml_file(path: impl AsRef<Path>) -> CipherResult<ParsedCipherInput> {
        Self::read_yaml_str(&fs::read_to_string(path)?)
    }

    /// Reconstruct an input from the YAML input file.
    ///
    /// Materials are rebuilt with explicit phases. Interfaces are rebuilt between
    /// materials, with their phase pairs read from the interface map and their type
    /// label recovered from their name.
    pub fn from_yaml_str(text: &str) -> CipherResult<Self> {
        let parsed = Self::read_yaml_str(text)?;

        let mut materials = Vec::with_capacity(parsed.materials.len());
        for (idx, (name, properties)) in parsed.materials.iter().enumerate() {
            let phases: Vec<usize> = parsed
                .phase_material
                .iter()
                .enumerate()
                .filter(|&(_, &m)| m == idx)
                .map(|(phase, _)| phase)
                .collect();
            materials.push(
                MaterialDefinition::builder(name.clone())
                    .properties(properties.clone())
                    .phases(phases)
                    .build()?,
            );
        }
        let material_names: Vec<&str> = parsed.materials.iter().map(|(n, _)| n.as_str()).collect();

        let mut pairs_by_interface: Vec<Vec<PhasePair>> = vec![Vec::new(); parsed.interfaces.len()];
        for ((a, b), &value) in parsed.interface_map.indexed_iter() {
            if value == NO_INTERFACE {
                continue;
            }
            let pairs = usize::try_from(value)
                .ok()
                .and_then(|idx| pairs_by_interface.get_mut(idx))
                .ok_or_else(|| {
                    CipherError::ConfigFormat(format!(
                        "interface_mapping refers to interface {} but only {} are defined",
                        value + 1,
                        parsed.interfaces.len()
                    ))
                })?;
            pairs.push([a, b]);
        }

        let mut interfaces = Vec::with_capacity(parsed.interfaces.len());
        for ((name, properties), pairs) in parsed.interfaces.iter().zip(pairs_by_interface) {
            let resolved = match pairs.first() {
                Some(&[a, b]) => {
                    let material_of = |phase: usize| {
                        parsed
                            .phase_material
                            .get(phase)
                            .and_then(|&m| material_names.get(m))
                            .copied()
                            .ok_or_else(|| {
                                CipherError::ConfigFormat(format!(
                                    "phase {phase} has no material"
                                ))
                            })
                    };
                    let (mat_a, mat_b) = (material_of(a)?, material_of(b)?);
                    Some(split_interface_name(name, mat_a, mat_b).unwrap_or_else(|| {
                        warn!(
                            "Interface {name:?} is not named after materials {mat_a:?} and \
                             {mat_b:?}; keeping the full name as its type label"
                        );
                        ([mat_a.to_string(), mat_b.to_string()], Some(name.clone()))
                    }))
                }
                None => material_names
                    .iter()
                    .flat_map(|a| material_names.iter().map(move |b| (*a, *b)))
                    .find_map(|(a, b)| split_interface_name(name, a, b)),
            };

            let Some(([mat_a, mat_b], type_label)) = resolved else {
                warn!("Skipping interface {name:?} with no phase pairs and unknown materials");
                continue;
            };
            let mut builder = InterfaceDefinition::builder()
                .materials(mat_a, mat_b)
                .properties(properties.clone())
                .phase_pairs(pairs);
            if let Some(label) = type_label {
                builder = builder.type_label(label);
            }
            interfaces.push(builder.build()?);
        }

        let geometry = CipherGeometry::builder(parsed.voxel_phase, parsed.size)
            .with_materials(materials)
            .with_interfaces(interfaces)
            .build()?;

        CipherInput::new(
            geometry,
            parsed.components,
            parsed.outputs,
            parsed.solution_parameters,
        )
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> CipherResult<Self> {
        Self::from_yaml_str(&fs::read_to_string(path)?)
    }
}

/// Split an interface name into the two material names it starts with and the type
/// label that follows, trying both orders.
fn split_interface_name(
    name: &str,
    mat_a: &str,
    mat_b: &str,
) -> Option<([String; 2], Option<String>)> {
    for (first, second) in [(mat_a, mat_b), (mat_b, mat_a)] {
        let endpoints = [first.to_string(), second.to_string()];
        let base = InterfaceDefinition::get_name(&endpoints, None);
        if name == base {
            return Some((endpoints, None));
        }
        if let Some(label) = name
            .strip_prefix(base.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
        {
            return Some((endpoints, Some(label.to_string())));
        }
    }
    None
}

fn zero_based(key: &str, values: Vec<i64>, expected_len: usize) -> CipherResult<Vec<usize>> {
    if values.len() != expected_len {
        return Err(CipherError::ConfigFormat(format!(
            "{key} has {} entries but {expected_len} were expected",
            values.len()
        )));
    }
    values
        .into_iter()
        .map(|v| {
            usize::try_from(v - 1).map_err(|_| {
                CipherError::ConfigFormat(format!("{key} contains invalid index {v}"))
            })
        })
        .collect()
}

fn named_properties(section: &str, mapping: Mapping) -> CipherResult<Vec<(String, Properties)>> {
    mapping
        .into_iter()
        .map(|(key, value)| {
            let name = key
                .as_str()
                .ok_or_else(|| {
                    CipherError::ConfigFormat(format!("{section} names must be strings"))
                })?
                .to_string();
            let properties = match value {
                Value::Null => Properties::new(),
                value => serde_yaml::from_value(value)?,
            };
            Ok((name, properties))
        })
        .collect()
}
