//! Parsing of the solver's standard output log.
//!
//! Three kinds of line are recognised, and everything else is ignored:
//!
//! * warnings, `Warning: <message>`;
//! * time step rows, `... step <n> <accepted> t=<time> dt=<dt> ... wlte=<e> wltea= <ea> wlter= <er>`,
//!   where a trailing `+` on a value is dropped. A line mentioning a step without all
//!   of these values is not a step row;
//! * output notices, `writing output at time <t> to <file>`.

use cipher_core::errors::{CipherError, CipherResult};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const WARNING_PREFIX: &str = "Warning: ";
const STEP_KEYS: [&str; 5] = ["t", "dt", "wlte", "wltea", "wlter"];

/// One time step row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: usize,
    pub is_accepted: bool,
    pub time: f64,
    pub dt: f64,
    pub wlte: f64,
    pub wltea: f64,
    pub wlter: f64,
}

/// Everything recognised in a solver log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CipherStdout {
    pub warnings: Vec<String>,
    pub steps: Vec<StepRecord>,
    /// Simulation time at which each output file was written.
    pub outputs: BTreeMap<String, f64>,
}

impl CipherStdout {
    pub fn accepted_steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| s.is_accepted)
    }

    pub fn times(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.time).collect()
    }

    pub fn output_time(&self, file_name: &str) -> Option<f64> {
        self.outputs.get(file_name).copied()
    }
}

pub fn parse_cipher_stdout_file(path: impl AsRef<Path>) -> CipherResult<CipherStdout> {
    parse_cipher_stdout(&fs::read_to_string(path)?)
}

pub fn parse_cipher_stdout(text: &str) -> CipherResult<CipherStdout> {
    let step_row = regex(r"(?:^|\s)step\s+(\d\S*)\s+(.*)$")?;
    let assignment = regex(r"(\w+)=\s*(\S+)")?;
    let write_output = regex(r"^writing output at time\s+(\S+)\s+\S+\s+(\S+)")?;

    let mut parsed = CipherStdout::default();
    for line in text.lines() {
        let line = line.trim();
        if let Some(message) = line.strip_prefix(WARNING_PREFIX) {
            parsed.warnings.push(message.to_string());
        } else if let Some(captures) = step_row.captures(line) {
            let rest = &captures[2];
            let values: BTreeMap<&str, &str> = assignment
                .captures_iter(rest)
                .filter_map(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str())))
                .collect();
            if !STEP_KEYS.iter().all(|key| values.contains_key(key)) {
                debug!("Ignoring log line {line:?}");
                continue;
            }

            let step = captures[1].parse::<usize>().map_err(|e| log_error(line, e))?;
            let flag = rest.split_whitespace().next().unwrap_or_default();
            let value = |key: &str| -> CipherResult<f64> {
                let raw = values.get(key).copied().unwrap_or_default();
                raw.trim_end_matches('+')
                    .parse::<f64>()
                    .map_err(|e| log_error(line, format!("`{key}`: {e}")))
            };

            parsed.steps.push(StepRecord {
                step,
                is_accepted: is_accepted(flag),
                time: value("t")?,
                dt: value("dt")?,
                wlte: value("wlte")?,
                wltea: value("wltea")?,
                wlter: value("wlter")?,
            });
        } else if let Some(captures) = write_output.captures(line) {
            let time = captures[1]
                .trim_end_matches('+')
                .parse::<f64>()
                .map_err(|e| log_error(line, e))?;
            parsed.outputs.insert(captures[2].to_string(), time);
        }
    }
    Ok(parsed)
}

/// Whether a step's acceptance flag marks it as accepted.
fn is_accepted(flag: &str) -> bool {
    !matches!(flag, "" | "0" | "R" | "r" | "N" | "n")
}

fn regex(pattern: &str) -> CipherResult<Regex> {
    Regex::new(pattern).map_err(|e| CipherError::Error(e.to_string()))
}

fn log_error(line: &str, details: impl ToString) -> CipherError {
    CipherError::LogFormat {
        line: line.to_string(),
        details: details.to_string(),
    }
}
