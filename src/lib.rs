// Modules
pub mod binning;
pub mod config;
pub mod constants;
pub mod data;
pub mod distance;
pub mod ece;
pub mod errors;
pub mod estimator;
pub mod hypothesis;
pub mod kernels;
pub mod sampler;
pub mod skce;
pub mod stats;
pub mod ucme;
pub mod utils;

// Individual classes, and functions
pub use binning::{Binning, MedianVarianceBinning, UniformBinning};
pub use config::{ConfigIO, TestConfig, TestReport};
pub use data::{ColVecs, Matrix, Predictions, RowVecs, Targets};
pub use distance::Distance;
pub use ece::ECE;
pub use errors::CalibrationError;
pub use estimator::{CalibrationErrorEstimator, ResamplingEstimator};
pub use hypothesis::{
    AsymptoticBlockSKCETest, AsymptoticCMETest, AsymptoticSKCETest, CalibrationTest, ConsistencyTest,
    DistributionFreeSKCETest, TestStatistic,
};
pub use kernels::{
    compose, scale, scaled, tensor, ExponentialKernel, Kernel, LabelKernel, ScaleTransform, SqExponentialKernel,
    TensorProductKernel, Transform, WhiteKernel,
};
pub use skce::{BiasedSKCE, BlockUnbiasedSKCE, UnbiasedSKCE, SKCE};
pub use ucme::UCME;
