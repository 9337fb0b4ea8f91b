//! Interface definitions
//!
//! An interface definition names one *type* of boundary between two materials or two
//! phase types and owns the set of phase pairs that share its properties. Phase pairs are
//! always held in canonical order: the smaller phase index first, and pairs sorted by
//! `(first, second)`.

use crate::arrays::{array2_from_json, array_from_json, array_to_json};
use crate::errors::{CipherError, CipherResult, PhasePair};
use crate::properties::Properties;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Per-pair auxiliary arrays, each with one entry per phase pair.
pub type InterfaceMetadata = BTreeMap<String, Array1<f64>>;

/// The phase pairs of an interface definition.
///
/// `Empty` (explicitly given as no pairs) is distinct from `Unset` (never given, so the
/// pairs will be assigned from phase adjacency when the geometry is built).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PhasePairs {
    #[default]
    Unset,
    Empty,
    Populated(Vec<PhasePair>),
}

impl PhasePairs {
    /// Build from canonical pairs.
    fn from_canonical(pairs: Vec<PhasePair>) -> Self {
        if pairs.is_empty() {
            PhasePairs::Empty
        } else {
            PhasePairs::Populated(pairs)
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, PhasePairs::Unset)
    }

    pub fn as_slice(&self) -> &[PhasePair] {
        match self {
            PhasePairs::Populated(pairs) => pairs,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// Convert rows of phase indices to pairs, rejecting any row that is not two long.
pub fn phase_pairs_from_rows(rows: &[Vec<usize>]) -> CipherResult<Vec<PhasePair>> {
    rows.iter()
        .enumerate()
        .map(|(row, values)| match values.as_slice() {
            [a, b] => Ok([*a, *b]),
            _ => Err(CipherError::PhasePairShape {
                row,
                len: values.len(),
            }),
        })
        .collect()
}

/// Put phase pairs in canonical order.
///
/// Returns the ordered pairs and, for each output position, the index of the input pair
/// it came from, so parallel arrays can be permuted alongside.
pub fn canonical_phase_pairs(pairs: &[PhasePair]) -> (Vec<PhasePair>, Vec<usize>) {
    let rows: Vec<PhasePair> = pairs
        .iter()
        .map(|&[a, b]| if a <= b { [a, b] } else { [b, a] })
        .collect();
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by_key(|&idx| rows[idx]);
    (order.iter().map(|&idx| rows[idx]).collect(), order)
}

/// A named type of interface between two materials or phase types.
#[derive(Debug, Clone)]
pub struct InterfaceDefinition {
    pub properties: Properties,
    phase_types: [String; 2],
    pub type_label: Option<String>,
    /// Share of the competing adjacent phase pairs this definition should receive when
    /// its pairs are assigned automatically.
    pub type_fraction: Option<f64>,
    phase_pairs: PhasePairs,
    metadata: Option<InterfaceMetadata>,
    pub(crate) index: Option<usize>,
}

impl InterfaceDefinition {
    pub fn builder() -> InterfaceDefinitionBuilder {
        InterfaceDefinitionBuilder::default()
    }

    /// Name of an interface between the given phase types.
    pub fn get_name(phase_types: &[String; 2], type_label: Option<&str>) -> String {
        match type_label {
            Some(label) if !label.is_empty() => {
                format!("{}-{}-{}", phase_types[0], phase_types[1], label)
            }
            _ => format!("{}-{}", phase_types[0], phase_types[1]),
        }
    }

    pub fn name(&self) -> String {
        Self::get_name(&self.phase_types, self.type_label.as_deref())
    }

    /// The material or phase type names at either side of the interface.
    pub fn phase_types(&self) -> &[String; 2] {
        &self.phase_types
    }

    pub fn phase_pairs(&self) -> &PhasePairs {
        &self.phase_pairs
    }

    /// Canonical phase pairs (empty if unset).
    pub fn pairs(&self) -> &[PhasePair] {
        self.phase_pairs.as_slice()
    }

    pub fn num_phase_pairs(&self) -> usize {
        self.phase_pairs.len()
    }

    pub fn is_phase_pairs_set(&self) -> bool {
        self.phase_pairs.is_set()
    }

    pub fn metadata(&self) -> Option<&InterfaceMetadata> {
        self.metadata.as_ref()
    }

    /// Position of this definition within its geometry, once adopted by one.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Replace the phase pairs.
    ///
    /// Existing metadata is permuted with the pairs and must still have one entry per
    /// pair.
    pub fn set_phase_pairs(&mut self, pairs: Option<Vec<PhasePair>>) -> CipherResult<()> {
        let Some(pairs) = pairs else {
            self.phase_pairs = PhasePairs::Unset;
            return self.check_metadata(self.metadata.as_ref());
        };
        let (canonical, order) = canonical_phase_pairs(&pairs);
        let metadata = match &self.metadata {
            Some(metadata) => {
                check_metadata_len(metadata, pairs.len())?;
                Some(permute_metadata(metadata, &order))
            }
            None => None,
        };
        if self.type_fraction.is_some() && !canonical.is_empty() {
            return Err(CipherError::InterfaceTypeFractionConflict { name: self.name() });
        }
        self.phase_pairs = PhasePairs::from_canonical(canonical);
        self.metadata = metadata;
        Ok(())
    }

    /// Replace the metadata, checking every array has one entry per phase pair.
    pub fn set_metadata(&mut self, metadata: Option<InterfaceMetadata>) -> CipherResult<()> {
        self.check_metadata(metadata.as_ref())?;
        self.metadata = metadata;
        Ok(())
    }

    fn check_metadata(&self, metadata: Option<&InterfaceMetadata>) -> CipherResult<()> {
        match metadata {
            Some(metadata) => check_metadata_len(metadata, self.num_phase_pairs()),
            None => Ok(()),
        }
    }

    /// Record automatically assigned pairs, consuming the type fraction quota.
    pub(crate) fn assign_phase_pairs(&mut self, pairs: &[PhasePair]) {
        let (canonical, _) = canonical_phase_pairs(pairs);
        self.type_fraction = None;
        self.metadata = None;
        self.phase_pairs = PhasePairs::from_canonical(canonical);
    }

    pub fn to_json(&self, keep_arrays: bool) -> CipherResult<Value> {
        let phase_pairs = match &self.phase_pairs {
            PhasePairs::Unset => None,
            pairs => Some(array_to_json(&pairs_to_array(pairs.as_slice()), keep_arrays)?),
        };
        let metadata = match &self.metadata {
            Some(metadata) if !metadata.is_empty() => Some(
                metadata
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), array_to_json(v, keep_arrays)?)))
                    .collect::<CipherResult<BTreeMap<_, _>>>()?,
            ),
            _ => None,
        };
        let data = InterfaceDefinitionJson {
            properties: self.properties.clone(),
            phase_types: self.phase_types.clone(),
            type_label: self.type_label.clone(),
            type_fraction: self.type_fraction,
            phase_pairs,
            metadata,
        };
        Ok(serde_json::to_value(data)?)
    }

    pub fn from_json(value: &Value) -> CipherResult<Self> {
        let data: InterfaceDefinitionJson = serde_json::from_value(value.clone())?;

        let mut builder = InterfaceDefinition::builder()
            .properties(data.properties)
            .phase_types(data.phase_types[0].clone(), data.phase_types[1].clone());
        if let Some(label) = data.type_label {
            builder = builder.type_label(label);
        }
        if let Some(fraction) = data.type_fraction {
            builder = builder.type_fraction(fraction);
        }
        if let Some(pairs) = data.phase_pairs {
            let pairs = array2_from_json::<usize>(&pairs, 2)?;
            let rows: Vec<Vec<usize>> = pairs.outer_iter().map(|row| row.to_vec()).collect();
            builder = builder.phase_pair_rows(rows);
        }
        if let Some(metadata) = data.metadata {
            let metadata = metadata
                .iter()
                .map(|(k, v)| {
                    let values = array_from_json::<f64>(v)?;
                    Ok((k.clone(), Array1::from_iter(values.iter().copied())))
                })
                .collect::<CipherResult<InterfaceMetadata>>()?;
            builder = builder.metadata(metadata);
        }
        builder.build()
    }
}

impl PartialEq for InterfaceDefinition {
    fn eq(&self, other: &Self) -> bool {
        let mut own = self.phase_types.clone();
        let mut theirs = other.phase_types.clone();
        own.sort();
        theirs.sort();

        self.type_label == other.type_label
            && own == theirs
            && self.properties == other.properties
            && self.pairs() == other.pairs()
    }
}

#[derive(Serialize, Deserialize)]
struct InterfaceDefinitionJson {
    properties: Properties,
    phase_types: [String; 2],
    type_label: Option<String>,
    type_fraction: Option<f64>,
    phase_pairs: Option<Value>,
    metadata: Option<BTreeMap<String, Value>>,
}

pub(crate) fn pairs_to_array(pairs: &[PhasePair]) -> Array2<usize> {
    Array2::from_shape_fn((pairs.len(), 2), |(row, col)| pairs[row][col])
}

fn check_metadata_len(metadata: &InterfaceMetadata, expected: usize) -> CipherResult<()> {
    for (key, values) in metadata {
        if values.len() != expected {
            return Err(CipherError::MetadataLength {
                key: key.clone(),
                expected,
                actual: values.len(),
            });
        }
    }
    Ok(())
}

fn permute_metadata(metadata: &InterfaceMetadata, order: &[usize]) -> InterfaceMetadata {
    metadata
        .iter()
        .map(|(k, v)| (k.clone(), order.iter().map(|&idx| v[idx]).collect()))
        .collect()
}

/// Builder for [`InterfaceDefinition`].
///
/// Exactly one of [`materials`](Self::materials) and [`phase_types`](Self::phase_types)
/// must be given.
#[derive(Debug, Clone, Default)]
pub struct InterfaceDefinitionBuilder {
    properties: Properties,
    materials: Option<[String; 2]>,
    phase_types: Option<[String; 2]>,
    type_label: Option<String>,
    type_fraction: Option<f64>,
    phase_pairs: Option<Vec<Vec<usize>>>,
    metadata: Option<InterfaceMetadata>,
}

impl InterfaceDefinitionBuilder {
    pub fn properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Apply the interface between all phase types of two materials.
    pub fn materials(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.materials = Some([a.into(), b.into()]);
        self
    }

    /// Apply the interface between two named phase types.
    pub fn phase_types(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.phase_types = Some([a.into(), b.into()]);
        self
    }

    pub fn type_label(mut self, type_label: impl Into<String>) -> Self {
        self.type_label = Some(type_label.into());
        self
    }

    pub fn type_fraction(mut self, type_fraction: f64) -> Self {
        self.type_fraction = Some(type_fraction);
        self
    }

    pub fn phase_pairs(mut self, pairs: Vec<PhasePair>) -> Self {
        self.phase_pairs = Some(pairs.into_iter().map(|p| p.to_vec()).collect());
        self
    }

    /// Phase pairs given as rows, each of which must hold exactly two phases.
    pub fn phase_pair_rows(mut self, rows: Vec<Vec<usize>>) -> Self {
        self.phase_pairs = Some(rows);
        self
    }

    /// Per-pair metadata, in the same order as the pairs passed to this builder.
    pub fn metadata(mut self, metadata: InterfaceMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn build(self) -> CipherResult<InterfaceDefinition> {
        let phase_types = match (self.materials, self.phase_types) {
            (Some(materials), None) => materials,
            (None, Some(phase_types)) => phase_types,
            _ => return Err(CipherError::InterfaceIdentification),
        };

        let mut definition = InterfaceDefinition {
            properties: self.properties,
            phase_types,
            type_label: self.type_label,
            type_fraction: self.type_fraction,
            phase_pairs: PhasePairs::Unset,
            metadata: self.metadata,
            index: None,
        };

        match self.phase_pairs {
            Some(rows) => {
                let pairs = phase_pairs_from_rows(&rows)?;
                definition.set_phase_pairs(Some(pairs))?;
            }
            None => definition.check_metadata(definition.metadata.as_ref())?,
        }

        Ok(definition)
    }
}
