//! Splitting one interface definition into several, each carrying its own value of one
//! or more properties.
//!
//! The base interface is removed and its phase pairs are partitioned among new
//! definitions between the same phase types. The new definitions are labelled `"{i}"`,
//! or `"{label}-{i}"` if the base definition had a type label, in the order they are
//! created. Splitting is all-or-nothing: the input is untouched if any step fails.

use crate::binning::{bin_phase_pairs, check_property_matrix, BinEdges};
use crate::boundary::{grain_boundary_mobility, read_shockley};
use crate::errors::{CipherError, CipherResult, PhasePair};
use crate::interface::{InterfaceDefinition, InterfaceMetadata};
use crate::properties::set_by_path;
use log::{debug, info};
use ndarray::Array2;
use std::collections::BTreeMap;

use super::CipherInput;

/// A property to assign from a symmetric `num_phases x num_phases` matrix of values.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfacePropertyAssignment {
    /// Path of the property within the interface properties.
    pub path: Vec<String>,
    pub values: Array2<f64>,
    /// Bins grouping phase pairs with similar values into one interface.
    pub bin_edges: Option<BinEdges>,
}

impl InterfacePropertyAssignment {
    pub fn new(path: &[&str], values: Array2<f64>) -> Self {
        Self {
            path: path.iter().map(|p| p.to_string()).collect(),
            values,
            bin_edges: None,
        }
    }

    pub fn with_bin_edges(mut self, bin_edges: BinEdges) -> Self {
        self.bin_edges = Some(bin_edges);
        self
    }
}

/// Parameters for deriving grain boundary energy and mobility from misorientation.
#[derive(Debug, Clone, PartialEq)]
pub struct MisorientationBinning {
    /// Energy at zero misorientation and at `theta_max` and beyond.
    pub energy_range: [f64; 2],
    /// Mobility at zero misorientation and at high misorientation.
    pub mobility_range: [f64; 2],
    /// Misorientation angle (degrees) at which a boundary becomes high-angle.
    pub theta_max: f64,
    pub n: f64,
    pub b: f64,
    /// Width of the misorientation bins (degrees).
    pub bin_width: f64,
}

impl MisorientationBinning {
    pub fn new(energy_range: [f64; 2], mobility_range: [f64; 2], theta_max: f64) -> Self {
        Self {
            energy_range,
            mobility_range,
            theta_max,
            n: 4.0,
            b: 5.0,
            bin_width: 5.0,
        }
    }

    pub fn with_bin_width(mut self, bin_width: f64) -> Self {
        self.bin_width = bin_width;
        self
    }

    pub fn with_mobility_shape(mut self, n: f64, b: f64) -> Self {
        self.n = n;
        self.b = b;
        self
    }

    /// Energy of a boundary with misorientation `theta`.
    pub fn energy(&self, theta: f64) -> f64 {
        let [e0, e1] = self.energy_range;
        read_shockley(theta, e1 - e0, self.theta_max) + e0
    }

    /// Mobility of a boundary with misorientation `theta`.
    pub fn mobility(&self, theta: f64) -> f64 {
        let [m0, m1] = self.mobility_range;
        grain_boundary_mobility(theta, m1 - m0, self.theta_max, self.n, self.b) + m0
    }
}

/// One interface to create: its phase pairs and the property values it carries.
struct NewInterface {
    pairs: Vec<PhasePair>,
    values: Vec<(Vec<String>, f64)>,
}

impl CipherInput {
    /// Replace interface `base_name` with interfaces carrying values of the given
    /// properties.
    ///
    /// Without bin edges on the first assignment, each phase pair gets its own interface
    /// with its own values. With them, the pairs are grouped by the bin of their value in
    /// the first matrix, and every property takes the midpoint of the same bin of its
    /// own edges, which must then be given for every assignment.
    ///
    /// `metadata` matrices are sampled at each phase pair and attached to the new
    /// interfaces. Returns the names of the new interfaces.
    pub fn apply_interface_property(
        &mut self,
        base_name: &str,
        assignments: &[InterfacePropertyAssignment],
        metadata: Option<&BTreeMap<String, Array2<f64>>>,
    ) -> CipherResult<Vec<String>> {
        let Some(first) = assignments.first() else {
            return Err(CipherError::NoInterfaceProperties);
        };
        let num_phases = self.geometry.num_phases();
        for assignment in assignments {
            check_property_matrix(&assignment.values, num_phases)?;
        }

        let partition = |pairs: &[PhasePair]| -> CipherResult<Vec<NewInterface>> {
            let Some(edges) = &first.bin_edges else {
                return Ok(pairs
                    .iter()
                    .map(|&pair| NewInterface {
                        pairs: vec![pair],
                        values: assignments
                            .iter()
                            .map(|a| (a.path.clone(), a.values[pair]))
                            .collect(),
                    })
                    .collect());
            };
            let bin_edges = assignments
                .iter()
                .map(|a| match &a.bin_edges {
                    Some(e) if e.num_bins() == edges.num_bins() => Ok(e),
                    _ => Err(CipherError::InvalidBinEdges {
                        details: format!(
                            "bin edges for {:?} must be given with {} bins to match {:?}",
                            a.path,
                            edges.num_bins(),
                            first.path
                        ),
                    }),
                })
                .collect::<CipherResult<Vec<_>>>()?;

            let bins = bin_phase_pairs(pairs, &first.values, edges)?;
            Ok(bins
                .into_iter()
                .map(|(bin, pairs)| {
                    debug!(
                        "Adding {} phase pair(s) to {:?} bin {bin} with centre {}",
                        pairs.len(),
                        first.path,
                        edges.midpoint(bin)
                    );
                    NewInterface {
                        pairs,
                        values: assignments
                            .iter()
                            .zip(&bin_edges)
                            .map(|(a, e)| (a.path.clone(), e.midpoint(bin)))
                            .collect(),
                    }
                })
                .collect())
        };

        self.split_interface(base_name, metadata, partition)
    }

    /// Replace interface `base_name` with one interface per populated misorientation
    /// bin, with energy `energy.e0` from the Read-Shockley relation and mobility
    /// `mobility.m0` from the sigmoidal relation, both evaluated at the bin midpoint.
    ///
    /// Bins of width `bin_width` span the misorientation angles of all phase pairs.
    /// Every phase must have an orientation. Returns the names of the new interfaces.
    pub fn bin_interfaces_by_misorientation_angle(
        &mut self,
        base_name: &str,
        binning: &MisorientationBinning,
    ) -> CipherResult<Vec<String>> {
        let misorientation = self.geometry.misorientation_matrix()?;
        let (min, max) = misorientation
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let edges = BinEdges::fixed_width(min, max, binning.bin_width)?;
        let energy_path = vec!["energy".to_string(), "e0".to_string()];
        let mobility_path = vec!["mobility".to_string(), "m0".to_string()];

        let partition = |pairs: &[PhasePair]| -> CipherResult<Vec<NewInterface>> {
            let bins = bin_phase_pairs(pairs, &misorientation, &edges)?;
            Ok(bins
                .into_iter()
                .map(|(bin, pairs)| {
                    let theta = edges.midpoint(bin);
                    info!(
                        "Adding {} phase pair(s) to misorientation bin {bin} with mid value {theta}",
                        pairs.len()
                    );
                    NewInterface {
                        pairs,
                        values: vec![
                            (energy_path.clone(), binning.energy(theta)),
                            (mobility_path.clone(), binning.mobility(theta)),
                        ],
                    }
                })
                .collect())
        };

        self.split_interface(base_name, None, partition)
    }

    fn split_interface<F>(
        &mut self,
        base_name: &str,
        metadata: Option<&BTreeMap<String, Array2<f64>>>,
        partition: F,
    ) -> CipherResult<Vec<String>>
    where
        F: FnOnce(&[PhasePair]) -> CipherResult<Vec<NewInterface>>,
    {
        let mut geometry = self.geometry.clone();
        if let Some(metadata) = metadata {
            for values in metadata.values() {
                check_property_matrix(values, geometry.num_phases())?;
            }
        }

        let (base, pairs) = geometry.remove_interface(base_name)?;
        let groups = partition(&pairs)?;
        let [type_a, type_b] = base.phase_types().clone();

        let mut names = Vec::with_capacity(groups.len());
        for (i, group) in groups.into_iter().enumerate() {
            let label = match base.type_label.as_deref() {
                Some(label) if !label.is_empty() => format!("{label}-{i}"),
                _ => i.to_string(),
            };

            let mut properties = base.properties.clone();
            for (path, value) in &group.values {
                let path: Vec<&str> = path.iter().map(String::as_str).collect();
                set_by_path(&mut properties, &path, *value)?;
            }

            let mut builder = InterfaceDefinition::builder()
                .phase_types(type_a.clone(), type_b.clone())
                .type_label(label)
                .properties(properties)
                .phase_pairs(group.pairs.clone());
            if let Some(metadata) = metadata {
                let sampled: InterfaceMetadata = metadata
                    .iter()
                    .map(|(key, values)| {
                        (key.clone(), group.pairs.iter().map(|&p| values[p]).collect())
                    })
                    .collect();
                builder = builder.metadata(sampled);
            }
            let definition = builder.build()?;
            names.push(definition.name());

            let idx = geometry.push_interface(definition);
            let (phase_a, phase_b): (Vec<usize>, Vec<usize>) =
                group.pairs.iter().map(|p| (p[0], p[1])).unzip();
            geometry.modify_interface_map(&phase_a, &phase_b, idx)?;
        }

        geometry.validate()?;
        self.geometry = geometry;
        info!(
            "Split interface {base_name:?} into {} interface(s)",
            names.len()
        );
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CipherGeometry;
    use crate::material::MaterialDefinition;
    use crate::phase_type::PhaseTypeDefinition;
    use crate::properties::{get_by_path, Properties, PropertyValue};
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    fn quadrants() -> ndarray::ArrayD<usize> {
        array![[0, 0, 1, 1], [0, 0, 1, 1], [2, 2, 3, 3], [2, 2, 3, 3]].into_dyn()
    }

    fn parameters() -> Properties {
        Properties::from([
            (
                "initblocksize".to_string(),
                PropertyValue::from(vec![1_i64, 1]),
            ),
            ("initrefine".to_string(), PropertyValue::from(2_i64)),
        ])
    }

    fn input(orientations: Option<Array2<f64>>) -> CipherInput {
        let mut phase_type = PhaseTypeDefinition::builder().phases(vec![0, 1, 2, 3]);
        if let Some(orientations) = orientations {
            phase_type = phase_type.orientations(orientations);
        }
        let material = MaterialDefinition::builder("mat1")
            .phase_type(phase_type.build().unwrap())
            .build()
            .unwrap();
        let mut properties = Properties::new();
        set_by_path(&mut properties, &["width"], 4.0).unwrap();
        set_by_path(&mut properties, &["energy", "e0"], 1.0).unwrap();
        let interface = InterfaceDefinition::builder()
            .materials("mat1", "mat1")
            .properties(properties)
            .build()
            .unwrap();
        let geometry = CipherGeometry::builder(quadrants(), vec![1.0, 1.0])
            .with_material(material)
            .with_interface(interface)
            .with_random_seed(1)
            .build()
            .unwrap();
        CipherInput::new(geometry, vec![], vec![], parameters()).unwrap()
    }

    fn energies() -> Array2<f64> {
        array![
            [0.0, 1.2, 2.6, 0.0],
            [1.2, 0.0, 0.0, 1.4],
            [2.6, 0.0, 0.0, 2.9],
            [0.0, 1.4, 2.9, 0.0]
        ]
    }

    fn energy(input: &CipherInput, name: &str) -> f64 {
        let interface = input
            .interfaces()
            .iter()
            .find(|i| i.name() == name)
            .unwrap();
        get_by_path(&interface.properties, &["energy", "e0"])
            .and_then(PropertyValue::as_f64)
            .unwrap()
    }

    #[test]
    fn test_one_interface_per_pair() {
        let mut input = input(None);
        let names = input
            .apply_interface_property(
                "mat1-mat1",
                &[InterfacePropertyAssignment::new(&["energy", "e0"], energies())],
                None,
            )
            .unwrap();
        assert_eq!(
            names,
            vec!["mat1-mat1-0", "mat1-mat1-1", "mat1-mat1-2", "mat1-mat1-3"]
        );
        // Pairs are created in canonical order: (0, 1), (0, 2), (1, 3), (2, 3)
        assert_eq!(input.interfaces()[2].pairs(), &[[1, 3]]);
        assert_eq!(energy(&input, "mat1-mat1-2"), 1.4);
        assert_eq!(input.geometry().interface_map()[[2, 3]], 3);
        assert!(input.geometry().validate().is_ok());
    }

    #[test]
    fn test_binned_assignment() {
        let mut input = input(None);
        let edges = BinEdges::new(vec![1.0, 2.0, 3.0]).unwrap();
        let widths = BinEdges::new(vec![4.0, 6.0, 10.0]).unwrap();
        let metadata = BTreeMap::from([("raw".to_string(), energies())]);
        let names = input
            .apply_interface_property(
                "mat1-mat1",
                &[
                    InterfacePropertyAssignment::new(&["energy", "e0"], energies())
                        .with_bin_edges(edges),
                    InterfacePropertyAssignment::new(&["width"], energies())
                        .with_bin_edges(widths),
                ],
                Some(&metadata),
            )
            .unwrap();
        assert_eq!(names, vec!["mat1-mat1-0", "mat1-mat1-1"]);
        assert_relative_eq!(energy(&input, "mat1-mat1-0"), 1.5);
        assert_relative_eq!(energy(&input, "mat1-mat1-1"), 2.5);

        let low = &input.interfaces()[0];
        assert_eq!(low.pairs(), &[[0, 1], [1, 3]]);
        assert_eq!(
            get_by_path(&low.properties, &["width"]).and_then(PropertyValue::as_f64),
            Some(5.0)
        );
        assert_eq!(low.metadata().unwrap()["raw"], array![1.2, 1.4]);
    }

    #[test]
    fn test_unbinned_pair_leaves_input_unchanged() {
        let mut input = input(None);
        let before = input.clone();
        let edges = BinEdges::new(vec![1.0, 2.0]).unwrap();
        let err = input
            .apply_interface_property(
                "mat1-mat1",
                &[InterfacePropertyAssignment::new(&["energy", "e0"], energies())
                    .with_bin_edges(edges)],
                None,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CipherError::UnbinnedPhasePairs { total: 4, .. }
        ));
        assert_eq!(input, before);
        assert_eq!(input.interface_names(), vec!["mat1-mat1"]);
    }

    #[test]
    fn test_mismatched_bin_edges() {
        let mut input = input(None);
        let err = input
            .apply_interface_property(
                "mat1-mat1",
                &[
                    InterfacePropertyAssignment::new(&["energy", "e0"], energies())
                        .with_bin_edges(BinEdges::new(vec![1.0, 2.0, 3.0]).unwrap()),
                    InterfacePropertyAssignment::new(&["width"], energies()),
                ],
                None,
            )
            .unwrap_err();
        assert!(matches!(err, CipherError::InvalidBinEdges { .. }));
    }

    #[test]
    fn test_property_matrix_shape_checked() {
        let mut input = input(None);
        let err = input
            .apply_interface_property(
                "mat1-mat1",
                &[InterfacePropertyAssignment::new(
                    &["energy", "e0"],
                    Array2::zeros((3, 3)),
                )],
                None,
            )
            .unwrap_err();
        assert!(matches!(err, CipherError::PropertyMatrixShape { .. }));
    }

    #[test]
    fn test_unknown_base_interface() {
        let mut input = input(None);
        let err = input
            .apply_interface_property(
                "mat1-mat2",
                &[InterfacePropertyAssignment::new(&["energy", "e0"], energies())],
                None,
            )
            .unwrap_err();
        assert!(matches!(err, CipherError::UnknownInterface { .. }));
    }

    #[test]
    fn test_no_assignments() {
        let mut binned = input(None);
        let err = binned
            .apply_interface_property("mat1-mat1", &[], None)
            .unwrap_err();
        assert!(matches!(err, CipherError::NoInterfaceProperties));
        assert_eq!(binned, input(None));
    }

    fn about_z(degrees: f64) -> [f64; 4] {
        let half = degrees.to_radians() / 2.0;
        [half.cos(), 0.0, 0.0, half.sin()]
    }

    #[test]
    fn test_bin_by_misorientation() {
        let rows = [about_z(0.0), about_z(2.0), about_z(31.0), about_z(35.0)];
        let orientations = Array2::from_shape_fn((4, 4), |(r, c)| rows[r][c]);
        let mut input = input(Some(orientations));
        let binning = MisorientationBinning::new([0.1, 1.0], [0.01, 1.0], 15.0);
        let names = input
            .bin_interfaces_by_misorientation_angle("mat1-mat1", &binning)
            .unwrap();

        // (0, 1) is 2 deg apart, (2, 3) 4 deg, (0, 2) 31 deg and (1, 3) 33 deg
        assert_eq!(names, vec!["mat1-mat1-0", "mat1-mat1-1"]);
        let low = &input.interfaces()[0];
        assert_eq!(low.pairs(), &[[0, 1], [2, 3]]);
        assert_relative_eq!(energy(&input, "mat1-mat1-0"), binning.energy(2.5));
        assert_relative_eq!(energy(&input, "mat1-mat1-1"), 1.0);
        let mobility = get_by_path(&input.interfaces()[1].properties, &["mobility", "m0"])
            .and_then(PropertyValue::as_f64)
            .unwrap();
        assert_relative_eq!(mobility, binning.mobility(32.5));

        // Existing properties are kept
        assert_eq!(
            get_by_path(&low.properties, &["width"]).and_then(PropertyValue::as_f64),
            Some(4.0)
        );
    }

    #[test]
    fn test_misorientation_requires_orientations() {
        let mut input = input(None);
        let binning = MisorientationBinning::new([0.1, 1.0], [0.01, 1.0], 15.0);
        let err = input
            .bin_interfaces_by_misorientation_angle("mat1-mat1", &binning)
            .unwrap_err();
        assert!(matches!(err, CipherError::MissingOrientations { .. }));
    }

    #[test]
    fn test_binning_relations() {
        let binning = MisorientationBinning::new([0.5, 1.5], [0.0, 2.0], 15.0);
        assert_relative_eq!(binning.energy(0.0), 0.5);
        assert_relative_eq!(binning.energy(20.0), 1.5);
        assert_relative_eq!(binning.mobility(0.0), 0.0);
    }
}
