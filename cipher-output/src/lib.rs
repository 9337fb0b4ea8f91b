//! Parsing of CIPHER simulation outputs.
//!
//! A completed simulation directory holds the input YAML, the solver log and one
//! unstructured mesh file per output increment. [`CipherOutput::parse_with`] resamples
//! those meshes onto the simulation grid, reads the requested output fields of each
//! increment and pairs them with the output times recorded in the log.

pub mod derived;
pub mod increment;
pub mod options;
pub mod output;
pub mod reader;
pub mod resample;
pub mod stdout;

pub use derived::num_voxels_per_phase;
pub use increment::IncrementData;
pub use options::OutputOptions;
pub use output::CipherOutput;
pub use reader::{ImageData, ImageDataReader};
pub use resample::{MeshResampler, PvBatchResampler};
pub use stdout::{parse_cipher_stdout, parse_cipher_stdout_file, CipherStdout, StepRecord};
