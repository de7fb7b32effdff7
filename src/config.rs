//! Test Configuration
//!
//! Configuration shared by the calibration tests and the serializable report
//! of a test run.
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::constants::BOOTSTRAP_ITERS;
use crate::errors::CalibrationError;
use crate::utils::{validate_float_parameter, validate_min_usize_parameter};

fn default_bootstrap_iters() -> usize {
    BOOTSTRAP_ITERS
}
fn default_parallel() -> bool {
    true
}
fn default_significance() -> f64 {
    0.05
}

/// Configuration of a calibration test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    /// Number of bootstrap iterations of the resampling tests.
    #[serde(default = "default_bootstrap_iters")]
    pub bootstrap_iters: usize,
    /// Whether kernel matrices and bootstrap iterations are computed in parallel.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Significance level at which reports reject the null hypothesis of calibration.
    #[serde(default = "default_significance")]
    pub significance: f64,
}

impl Default for TestConfig {
    fn default() -> Self {
        TestConfig {
            bootstrap_iters: default_bootstrap_iters(),
            parallel: default_parallel(),
            significance: default_significance(),
        }
    }
}

impl TestConfig {
    pub fn validate(&self) -> Result<(), CalibrationError> {
        validate_min_usize_parameter(self.bootstrap_iters, 1, "bootstrap_iters")?;
        validate_float_parameter(self.significance, 0.0, 1.0, "significance")?;
        Ok(())
    }
}

/// IO
pub trait ConfigIO: Serialize + DeserializeOwned + Sized {
    /// Save as a json object to a file.
    ///
    /// * `path` - Path of the file.
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CalibrationError> {
        fs::write(path, self.json_dump()?).map_err(|e| CalibrationError::UnableToWrite(e.to_string()))
    }

    /// Dump as a json object.
    fn json_dump(&self) -> Result<String, CalibrationError> {
        serde_json::to_string(self).map_err(|e| CalibrationError::UnableToWrite(e.to_string()))
    }

    /// Load from a json string.
    ///
    /// * `json_str` - String object, which can be serialized to json.
    fn from_json(json_str: &str) -> Result<Self, CalibrationError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| CalibrationError::UnableToRead(e.to_string()))
    }

    /// Load from a path to a json object.
    ///
    /// * `path` - Path to load from.
    fn load<P: AsRef<Path>>(path: P) -> Result<Self, CalibrationError> {
        let json_str = fs::read_to_string(path).map_err(|e| CalibrationError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl ConfigIO for TestConfig {}

/// Outcome of a calibration test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    /// Name of the test.
    pub test: String,
    /// Number of samples.
    pub nsamples: usize,
    /// Estimate of the calibration error the test is based on.
    pub estimate: f64,
    /// Value of the test statistic.
    pub statistic: f64,
    pub pvalue: f64,
    pub significance: f64,
    /// Whether calibration is rejected at the significance level.
    pub reject: bool,
}

impl TestReport {
    pub fn new(test: &str, nsamples: usize, estimate: f64, statistic: f64, pvalue: f64, significance: f64) -> Self {
        TestReport {
            test: test.to_string(),
            nsamples,
            estimate,
            statistic,
            pvalue,
            significance,
            reject: pvalue < significance,
        }
    }
}

impl ConfigIO for TestReport {}

impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let outcome = if self.reject { "reject" } else { "fail to reject" };
        write!(
            f,
            "{} ({} samples): estimate {:.6}, statistic {:.6}, p-value {:.4}, {} calibration at level {}",
            self.test, self.nsamples, self.estimate, self.statistic, self.pvalue, outcome, self.significance
        )
    }
}
