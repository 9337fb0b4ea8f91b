use thiserror::Error;

/// A phase pair, stored with the smaller phase index first.
pub type PhasePair = [usize; 2];

/// Error type for invalid definitions and operations.
///
/// Each validation failure has its own variant so that callers can match on the
/// specific failure mode rather than on a message.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("{0}")]
    Error(String),

    // Run-length codec
    #[error("Could not decode run-length item {token:?}: {details}")]
    RunLengthDecode { token: String, details: String },
    #[error("Run lengths sum to {sum} but the sequence has {expected} value(s)")]
    RunLengthSum { sum: usize, expected: usize },

    // Free-form properties
    #[error("Cannot set property at path {path:?}: key {key:?} does not hold a map")]
    PropertyPath { path: Vec<String>, key: String },
    #[error("Property path must contain at least one key")]
    EmptyPropertyPath,

    // JSON arrays
    #[error("Cannot read array: {details}")]
    ArrayShape { details: String },

    // Interface definitions
    #[error("Specify exactly one of `materials` and `phase_types` for an interface definition")]
    InterfaceIdentification,
    #[error("Specify either `type_fraction` or `phase_pairs` for interface {name:?}, not both")]
    InterfaceTypeFractionConflict { name: String },
    #[error(
        "`phase_pairs` should be specified as an (N, 2) array or a list of two-element lists, \
         but row {row} has {len} element(s)"
    )]
    PhasePairShape { row: usize, len: usize },
    #[error(
        "Item {key:?} in the `metadata` map must have length equal to the number of phase pairs \
         ({expected}) but has length: {actual}"
    )]
    MetadataLength {
        key: String,
        expected: usize,
        actual: usize,
    },
    #[error("Interface type fractions between {endpoints:?} are invalid: {details}")]
    InterfaceTypeFraction {
        endpoints: [String; 2],
        details: String,
    },

    // Phase types and materials
    #[error("Cannot specify both `phases` and `target_type_fraction` for a phase type")]
    PhaseTypeFractionPhasesConflict,
    #[error("Orientations must be an (N, 4) array with one quaternion per phase: {details}")]
    OrientationShape { details: String },
    #[error("Cannot specify both `target_volume_fraction` and `phases` for material {material:?}")]
    MaterialFractionPhasesConflict { material: String },
    #[error(
        "Target volume fraction must be greater than zero and less than or equal to one, but \
         specified value for material {material:?} was {value}"
    )]
    InvalidTargetVolumeFraction { material: String, value: f64 },
    #[error(
        "Cannot specify `phases` in any of the phase type definitions of material {material:?} \
         if `phases` is also specified in the material definition"
    )]
    MaterialPhaseTypePhasesConflict { material: String },
    #[error(
        "If specifying `phases` for a phase type of material {material:?}, `phases` must be \
         specified for all phase types"
    )]
    MaterialPhaseTypePhasesMissing { material: String },
    #[error("Phase types belonging to material {material:?} must have distinct `type_label`s")]
    MaterialPhaseTypeLabel { material: String },
    #[error("Phase type fractions of material {material:?} are invalid: {details}")]
    MaterialPhaseTypeFraction { material: String, details: String },
    #[error(
        "Insufficient number of orientations ({orientations}) for phase type {phase_type} with \
         {phases} phases"
    )]
    InsufficientOrientations {
        phase_type: usize,
        orientations: usize,
        phases: usize,
    },

    // Geometry construction
    #[error("Invalid voxel phase map: {details}")]
    GeometryVoxelPhase { details: String },
    #[error("Geometry `size` {size:?} must have one positive entry per grid dimension {grid_size:?}")]
    GeometrySize {
        size: Vec<f64>,
        grid_size: Vec<usize>,
    },
    #[error("Material names must be unique, but {name:?} is repeated")]
    GeometryDuplicateMaterialName { name: String },
    #[error(
        "Assigned material target volume fractions sum to {assigned} with {unassigned} \
         outstanding material(s) but no remaining volume fraction"
    )]
    GeometryExcessTargetVolumeFraction { assigned: f64, unassigned: usize },
    #[error("All material target volume fractions must sum to one, but they sum to {sum}")]
    GeometryNonUnitTargetVolumeFraction { sum: f64 },
    #[error("The following phases are not assigned to any material: {phases:?}")]
    GeometryMissingPhaseAssignment { phases: Vec<usize> },
    #[error("Phase {phase} is assigned to more than one material/phase type")]
    GeometryDuplicatePhaseAssignment { phase: usize },
    #[error("Phase {phase} assigned to material {material:?} does not exist ({num_phases} phases)")]
    GeometryPhaseOutOfRange {
        phase: usize,
        material: String,
        num_phases: usize,
    },
    #[error("Interface {interface:?} refers to an unknown material or phase type {name:?}")]
    UnknownPhaseType { interface: String, name: String },

    // Geometry consistency
    #[error("The following adjacent phase pairs have no interface type assigned: {pairs:?}")]
    MissingInterfaces { pairs: Vec<PhasePair> },
    #[error("Phase pair {pair:?} is claimed by interface {first:?} and by interface {second:?}")]
    DuplicateInterfacePhasePair {
        pair: PhasePair,
        first: String,
        second: String,
    },
    #[error("Interface {interface:?} contains invalid phase pair {pair:?} ({num_phases} phases)")]
    InvalidPhasePair {
        interface: String,
        pair: PhasePair,
        num_phases: usize,
    },
    #[error("Phase pair {pair:?} of interface {interface:?} does not lie between its phase types")]
    InterfacePhaseTypeMismatch { interface: String, pair: PhasePair },
    #[error("Interface map entry for phase pair {pair:?} ({index}) is inconsistent with the interface definitions")]
    InterfaceMapMismatch { pair: PhasePair, index: i64 },
    #[error("Interface names must be unique, but {name:?} is repeated")]
    DuplicateInterfaceName { name: String },
    #[error("No interface named {name:?}")]
    UnknownInterface { name: String },
    #[error(
        "Phase index arrays must have equal lengths but have lengths {phase_a} and {phase_b}"
    )]
    PhaseIndexLength { phase_a: usize, phase_b: usize },
    #[error("Phase {phase} has no orientation")]
    MissingOrientations { phase: usize },

    // Binning
    #[error("Property matrix must have shape {expected:?} but has shape {actual:?}")]
    PropertyMatrixShape {
        expected: [usize; 2],
        actual: Vec<usize>,
    },
    #[error("At least one interface property must be given")]
    NoInterfaceProperties,
    #[error("Invalid bin edges: {details}")]
    InvalidBinEdges { details: String },
    #[error(
        "Not all phase pairs have been added to a property value bin. The following \
         {}/{total} phase pairs (and property values) are missing: {missing:?}",
        .missing.len()
    )]
    UnbinnedPhasePairs {
        missing: Vec<(PhasePair, f64)>,
        total: usize,
    },

    // Top-level input
    #[error(
        "`grid_size` (specified: {grid_size:?}) must be equal to `initblocksize` (specified: \
         {initblocksize:?}) multiplied by 2 raised to the power of `initrefine` (specified: \
         {initrefine}), calculated to be: {expected:?}"
    )]
    GridSizeMismatch {
        grid_size: Vec<usize>,
        initblocksize: Vec<i64>,
        initrefine: i64,
        expected: Vec<i64>,
    },
    #[error("Missing solution parameter {name:?}")]
    MissingSolutionParameter { name: String },
    #[error("Invalid solution parameter {name:?}: {details}")]
    InvalidSolutionParameter { name: String, details: String },
    #[error("Invalid configuration: {0}")]
    ConfigFormat(String),

    // Output parsing
    #[error("Could not parse log line {line:?}: {details}")]
    LogFormat { line: String, details: String },
    #[error("Command {command:?} failed: {details}")]
    Subprocess { command: String, details: String },

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience type for `Result<T, CipherError>`.
pub type CipherResult<T> = Result<T, CipherError>;
