//! Options for parsing a simulation output directory.

use cipher_core::errors::{CipherError, CipherResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_INPUT_YAML_FILE_NAME: &str = "cipher_input.yaml";
pub const DEFAULT_STDOUT_FILE_NAME: &str = "stdout.log";
pub const DEFAULT_PARAVIEW_EXE: &str = "pvbatch";

/// Options controlling how a simulation output directory is parsed.
///
/// Every field has a default, so a TOML file need only name the ones it changes:
///
/// ```toml
/// stdout_file_name = "cipher.log"
/// delete_vtis = false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    pub input_yaml_file_name: String,
    pub stdout_file_name: String,
    /// Executable used to resample the unstructured outputs onto the grid.
    pub paraview_exe: String,
    /// Remove the temporary image files once they have been read.
    pub delete_vtis: bool,
    /// Read image files already in the directory instead of resampling.
    pub use_existing_vtis: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            input_yaml_file_name: DEFAULT_INPUT_YAML_FILE_NAME.to_string(),
            stdout_file_name: DEFAULT_STDOUT_FILE_NAME.to_string(),
            paraview_exe: DEFAULT_PARAVIEW_EXE.to_string(),
            delete_vtis: true,
            use_existing_vtis: false,
        }
    }
}

impl OutputOptions {
    pub fn from_toml_str(text: &str) -> CipherResult<Self> {
        toml::from_str(text).map_err(|e| CipherError::ConfigFormat(e.to_string()))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> CipherResult<Self> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn to_toml_string(&self) -> CipherResult<String> {
        toml::to_string(self).map_err(|e| CipherError::ConfigFormat(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = OutputOptions::from_toml_str("").unwrap();
        assert_eq!(options, OutputOptions::default());
        assert_eq!(options.input_yaml_file_name, "cipher_input.yaml");
        assert_eq!(options.stdout_file_name, "stdout.log");
        assert_eq!(options.paraview_exe, "pvbatch");
        assert!(options.delete_vtis);
        assert!(!options.use_existing_vtis);
    }

    #[test]
    fn test_partial_toml() {
        let options = OutputOptions::from_toml_str(
            r#"
            stdout_file_name = "cipher.log"
            use_existing_vtis = true
            "#,
        )
        .unwrap();
        assert_eq!(options.stdout_file_name, "cipher.log");
        assert!(options.use_existing_vtis);
        assert_eq!(options.paraview_exe, DEFAULT_PARAVIEW_EXE);
    }

    #[test]
    fn test_round_trip() {
        let options = OutputOptions {
            paraview_exe: "/opt/paraview/bin/pvbatch".to_string(),
            delete_vtis: false,
            ..Default::default()
        };
        let text = options.to_toml_string().unwrap();
        assert_eq!(OutputOptions::from_toml_str(&text).unwrap(), options);
    }

    #[test]
    fn test_invalid_toml() {
        let err = OutputOptions::from_toml_str("delete_vtis = \"sometimes\"").unwrap_err();
        assert!(matches!(err, CipherError::ConfigFormat(_)));
    }
}
