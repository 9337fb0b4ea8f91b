//! Image data read from the resampled output files.

use cipher_core::errors::CipherResult;
use std::collections::BTreeMap;
use std::path::Path;

/// Contents of one image (VTI) file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageData {
    pub dimensions: Vec<usize>,
    pub spacing: Vec<f64>,
    pub num_cells: usize,
    pub num_points: usize,
    /// Point arrays by name, flattened in column-major order.
    pub arrays: BTreeMap<String, Vec<f64>>,
}

/// Decodes image files written by the mesh resampler.
pub trait ImageDataReader {
    fn read(&self, path: &Path) -> CipherResult<ImageData>;
}
