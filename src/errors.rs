//! Errors
//!
//! Custom error types used throughout the `calibra` crate.
use thiserror::Error;

/// Errors that can occur while estimating calibration errors or running calibration tests.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// A predicted distribution is not a point of the probability simplex.
    #[error("Prediction {0} is not a probability distribution: {1}.")]
    InvalidPrediction(usize, String),
    /// Sizes of two inputs do not agree, first value is expected, second is found.
    #[error("Dimension mismatch, expected {0} but found {1}.")]
    DimensionMismatch(usize, usize),
    /// A label outside of the range of classes.
    #[error("Invalid target {0}, expected a class between 1 and {1}.")]
    InvalidTarget(usize, usize),
    /// No samples were provided.
    #[error("Cannot estimate a calibration error from an empty set of samples.")]
    EmptyInput,
    /// First value is the number of samples required, second is what was provided.
    #[error("At least {0} samples are required, but {1} provided.")]
    InsufficientSamples(usize, usize),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// The covariance matrix of the CME witness values vanishes or could not be decomposed.
    /// Nearly coincident test locations only reduce its rank.
    #[error("Covariance matrix of the test statistic is zero or could not be decomposed.")]
    SingularCovariance,
    /// Unable to read a configuration.
    #[error("Unable to read configuration: {0}")]
    UnableToRead(String),
    /// Unable to write a configuration or report.
    #[error("Unable to write: {0}")]
    UnableToWrite(String),
}
