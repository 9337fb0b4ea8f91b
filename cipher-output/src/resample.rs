//! Resampling of the solver's unstructured (VTU) outputs onto the simulation grid as
//! image (VTI) files.

use cipher_core::errors::{CipherError, CipherResult};
use cipher_core::input::write_atomic;
use log::{info, warn};
use std::path::Path;
use std::process::Command;

pub const RESAMPLE_SCRIPT_NAME: &str = "vtu2vti.py";

/// Converts every `*.vtu` file in a directory to a `*.vti` file of the same stem,
/// sampled on a grid of the given dimensions.
pub trait MeshResampler {
    fn resample(&self, directory: &Path, sampling_dimensions: &[usize]) -> CipherResult<()>;
}

/// Resamples by running a ParaView Python script with `pvbatch` (or another
/// ParaView Python interpreter).
#[derive(Debug, Clone, PartialEq)]
pub struct PvBatchResampler {
    executable: String,
}

impl PvBatchResampler {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn script(sampling_dimensions: &[usize]) -> String {
        format!(
            r#"import os

from paraview.simple import *

vtu_files = sorted(f for f in os.listdir(".") if f.endswith(".vtu"))

for file_name in vtu_files:
    base_name = file_name.split(".")[0]
    vtu_data = XMLUnstructuredGridReader(FileName=[os.path.join(os.getcwd(), file_name)])
    resampled = ResampleToImage(Input=vtu_data)
    resampled.SamplingDimensions = {sampling_dimensions:?}
    SetActiveSource(resampled)
    SaveData(base_name + ".vti", resampled)
"#
        )
    }
}

impl MeshResampler for PvBatchResampler {
    fn resample(&self, directory: &Path, sampling_dimensions: &[usize]) -> CipherResult<()> {
        write_atomic(
            &directory.join(RESAMPLE_SCRIPT_NAME),
            &Self::script(sampling_dimensions),
        )?;

        let command = format!("{} {}", self.executable, RESAMPLE_SCRIPT_NAME);
        info!("Running {command:?} in {}", directory.display());
        let output = Command::new(&self.executable)
            .arg(RESAMPLE_SCRIPT_NAME)
            .current_dir(directory)
            .output()
            .map_err(|e| CipherError::Subprocess {
                command: command.clone(),
                details: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            info!("{}", stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            warn!("{}", stderr.trim_end());
        }
        if !output.status.success() {
            return Err(CipherError::Subprocess {
                command,
                details: format!("exited with {}: {}", output.status, stderr.trim()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_sampling_dimensions() {
        let script = PvBatchResampler::script(&[64, 32, 1]);
        assert!(script.contains("resampled.SamplingDimensions = [64, 32, 1]"));
        assert!(script.contains("SaveData(base_name + \".vti\", resampled)"));
    }

    #[test]
    fn test_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let resampler = PvBatchResampler::new("cipher-output-no-such-executable");
        let err = resampler.resample(dir.path(), &[4, 4]).unwrap_err();
        assert!(matches!(err, CipherError::Subprocess { .. }));
        // The script is written before the executable is run
        assert!(dir.path().join(RESAMPLE_SCRIPT_NAME).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let err = PvBatchResampler::new("false")
            .resample(dir.path(), &[4, 4])
            .unwrap_err();
        match err {
            CipherError::Subprocess { command, .. } => assert_eq!(command, "false vtu2vti.py"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
