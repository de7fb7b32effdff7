//! Squared Kernel Calibration Error
//!
//! Biased, unbiased and block unbiased estimators of the squared kernel
//! calibration error with respect to a tensor product kernel `k_p ⊗ k_y` on
//! predictions and labels.
//!
//! All estimators average the calibration witness kernel
//! `h(z_i, z_j) = k_p(p_i, p_j) <k_y(y_i, .) - E_{Z ~ p_i} k_y(Z, .), k_y(y_j, .) - E_{Z ~ p_j} k_y(Z, .)>`
//! over different sets of pairs of samples.
use crate::constants::BLOCK_SIZE;
use crate::data::{check_samples, Predictions, Targets};
use crate::errors::CalibrationError;
use crate::estimator::{CalibrationErrorEstimator, KernelMatrix, ResamplingEstimator, SampleView};
use crate::kernels::{Kernel, LabelKernel, TensorProductKernel};
use crate::utils::validate_min_usize_parameter;

fn estimate_identity<E: ResamplingEstimator>(
    estimator: &E,
    predictions: &Predictions,
    targets: &Targets,
) -> Result<f64, CalibrationError> {
    check_samples(predictions, targets)?;
    let index: Vec<usize> = (0..predictions.len()).collect();
    let labels = targets.indices();
    let samples = SampleView::new(predictions, &index, &labels)?;
    estimator.estimate_view(&samples)
}

/// Biased estimator of the SKCE, `(1/n²) Σ_{i,j} h(z_i, z_j)`.
///
/// The estimator is non-negative, and quadratic in the number of samples.
#[derive(Debug, Clone)]
pub struct BiasedSKCE<K1, K2> {
    kernel: TensorProductKernel<K1, K2>,
    parallel: bool,
}

impl<K1: Kernel, K2: LabelKernel> BiasedSKCE<K1, K2> {
    pub fn new(kernel: TensorProductKernel<K1, K2>) -> Self {
        BiasedSKCE { kernel, parallel: true }
    }

    /// Set whether pairs are summed in parallel.
    pub fn set_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn kernel(&self) -> &TensorProductKernel<K1, K2> {
        &self.kernel
    }
}

impl<K1: Kernel, K2: LabelKernel> ResamplingEstimator for BiasedSKCE<K1, K2> {
    fn kernel_matrix(&self, predictions: &Predictions, parallel: bool) -> Option<KernelMatrix> {
        Some(KernelMatrix::new(self.kernel.first(), predictions, parallel))
    }

    fn estimate_view(&self, samples: &SampleView) -> Result<f64, CalibrationError> {
        let n = samples.len();
        if n == 0 {
            return Err(CalibrationError::EmptyInput);
        }
        let (off, diag) = samples.pair_sums(&self.kernel, self.parallel);
        Ok((2.0 * off + diag) / (n * n) as f64)
    }
}

impl<K1: Kernel, K2: LabelKernel> CalibrationErrorEstimator for BiasedSKCE<K1, K2> {
    fn estimate(&self, predictions: &Predictions, targets: &Targets) -> Result<f64, CalibrationError> {
        estimate_identity(self, predictions, targets)
    }
}

/// Unbiased estimator of the SKCE, the U-statistic `(1/(n(n-1))) Σ_{i≠j} h(z_i, z_j)`.
#[derive(Debug, Clone)]
pub struct UnbiasedSKCE<K1, K2> {
    kernel: TensorProductKernel<K1, K2>,
    parallel: bool,
}

impl<K1: Kernel, K2: LabelKernel> UnbiasedSKCE<K1, K2> {
    pub fn new(kernel: TensorProductKernel<K1, K2>) -> Self {
        UnbiasedSKCE { kernel, parallel: true }
    }

    /// Set whether pairs are summed in parallel.
    pub fn set_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn kernel(&self) -> &TensorProductKernel<K1, K2> {
        &self.kernel
    }
}

impl<K1: Kernel, K2: LabelKernel> ResamplingEstimator for UnbiasedSKCE<K1, K2> {
    fn kernel_matrix(&self, predictions: &Predictions, parallel: bool) -> Option<KernelMatrix> {
        Some(KernelMatrix::new(self.kernel.first(), predictions, parallel))
    }

    fn estimate_view(&self, samples: &SampleView) -> Result<f64, CalibrationError> {
        let n = samples.len();
        if n < 2 {
            return Err(CalibrationError::InsufficientSamples(2, n));
        }
        let (off, _) = samples.pair_sums(&self.kernel, self.parallel);
        Ok(2.0 * off / (n * (n - 1)) as f64)
    }
}

impl<K1: Kernel, K2: LabelKernel> CalibrationErrorEstimator for UnbiasedSKCE<K1, K2> {
    fn estimate(&self, predictions: &Predictions, targets: &Targets) -> Result<f64, CalibrationError> {
        estimate_identity(self, predictions, targets)
    }
}

/// Unbiased estimator of the SKCE that averages unbiased estimates on
/// contiguous blocks of `blocksize` samples.
///
/// Samples after the last complete block are ignored.
#[derive(Debug, Clone)]
pub struct BlockUnbiasedSKCE<K1, K2> {
    kernel: TensorProductKernel<K1, K2>,
    blocksize: usize,
}

impl<K1: Kernel, K2: LabelKernel> BlockUnbiasedSKCE<K1, K2> {
    /// * `blocksize` - Number of samples per block, at least 2.
    pub fn new(kernel: TensorProductKernel<K1, K2>, blocksize: usize) -> Result<Self, CalibrationError> {
        validate_min_usize_parameter(blocksize, 2, "blocksize")?;
        Ok(BlockUnbiasedSKCE { kernel, blocksize })
    }

    /// Block estimator with the default blocks of two samples.
    pub fn from_kernel(kernel: TensorProductKernel<K1, K2>) -> Self {
        BlockUnbiasedSKCE {
            kernel,
            blocksize: BLOCK_SIZE,
        }
    }

    pub fn blocksize(&self) -> usize {
        self.blocksize
    }

    pub fn kernel(&self) -> &TensorProductKernel<K1, K2> {
        &self.kernel
    }

    /// Unbiased estimates of all complete blocks.
    pub(crate) fn block_estimates(&self, samples: &SampleView) -> Result<Vec<f64>, CalibrationError> {
        let n = samples.len();
        let b = self.blocksize;
        if n < b {
            return Err(CalibrationError::InsufficientSamples(b, n));
        }
        let normalizer = (b * (b - 1) / 2) as f64;
        Ok((0..n / b)
            .map(|block| {
                let start = block * b;
                let mut sum = 0.0;
                for a in start..start + b {
                    for c in a + 1..start + b {
                        sum += samples.witness(&self.kernel, a, c);
                    }
                }
                sum / normalizer
            })
            .collect())
    }
}

impl<K1: Kernel, K2: LabelKernel> ResamplingEstimator for BlockUnbiasedSKCE<K1, K2> {
    fn estimate_view(&self, samples: &SampleView) -> Result<f64, CalibrationError> {
        let estimates = self.block_estimates(samples)?;
        Ok(estimates.iter().sum::<f64>() / estimates.len() as f64)
    }
}

impl<K1: Kernel, K2: LabelKernel> CalibrationErrorEstimator for BlockUnbiasedSKCE<K1, K2> {
    fn estimate(&self, predictions: &Predictions, targets: &Targets) -> Result<f64, CalibrationError> {
        estimate_identity(self, predictions, targets)
    }
}

/// Estimator of the SKCE, one of the biased, unbiased and block unbiased estimators.
#[derive(Debug, Clone)]
pub enum SKCE<K1, K2> {
    Biased(BiasedSKCE<K1, K2>),
    Unbiased(UnbiasedSKCE<K1, K2>),
    BlockUnbiased(BlockUnbiasedSKCE<K1, K2>),
}

impl<K1: Kernel, K2: LabelKernel> SKCE<K1, K2> {
    /// Select an estimator of the SKCE.
    ///
    /// * `unbiased` - Whether to use an unbiased estimator.
    /// * `blocksize` - Use the block unbiased estimator with blocks of this size.
    pub fn new(
        kernel: TensorProductKernel<K1, K2>,
        unbiased: bool,
        blocksize: Option<usize>,
    ) -> Result<Self, CalibrationError> {
        match (unbiased, blocksize) {
            (false, None) => Ok(SKCE::Biased(BiasedSKCE::new(kernel))),
            (true, None) => Ok(SKCE::Unbiased(UnbiasedSKCE::new(kernel))),
            (true, Some(b)) => Ok(SKCE::BlockUnbiased(BlockUnbiasedSKCE::new(kernel, b)?)),
            (false, Some(b)) => Err(CalibrationError::InvalidParameter(
                "blocksize".to_string(),
                "no blocks for the biased estimator".to_string(),
                b.to_string(),
            )),
        }
    }

    pub fn biased(kernel: TensorProductKernel<K1, K2>) -> Self {
        SKCE::Biased(BiasedSKCE::new(kernel))
    }

    pub fn unbiased(kernel: TensorProductKernel<K1, K2>) -> Self {
        SKCE::Unbiased(UnbiasedSKCE::new(kernel))
    }

    pub fn block(kernel: TensorProductKernel<K1, K2>, blocksize: usize) -> Result<Self, CalibrationError> {
        Ok(SKCE::BlockUnbiased(BlockUnbiasedSKCE::new(kernel, blocksize)?))
    }

    pub fn kernel(&self) -> &TensorProductKernel<K1, K2> {
        match self {
            SKCE::Biased(e) => e.kernel(),
            SKCE::Unbiased(e) => e.kernel(),
            SKCE::BlockUnbiased(e) => e.kernel(),
        }
    }

    /// Set whether pairs are summed in parallel, block estimates are always sequential.
    pub fn set_parallel(self, parallel: bool) -> Self {
        match self {
            SKCE::Biased(e) => SKCE::Biased(e.set_parallel(parallel)),
            SKCE::Unbiased(e) => SKCE::Unbiased(e.set_parallel(parallel)),
            SKCE::BlockUnbiased(e) => SKCE::BlockUnbiased(e),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SKCE::Biased(_) => "biased SKCE",
            SKCE::Unbiased(_) => "unbiased SKCE",
            SKCE::BlockUnbiased(_) => "block unbiased SKCE",
        }
    }
}

impl<K1: Kernel, K2: LabelKernel> ResamplingEstimator for SKCE<K1, K2> {
    fn kernel_matrix(&self, predictions: &Predictions, parallel: bool) -> Option<KernelMatrix> {
        match self {
            SKCE::Biased(e) => e.kernel_matrix(predictions, parallel),
            SKCE::Unbiased(e) => e.kernel_matrix(predictions, parallel),
            SKCE::BlockUnbiased(e) => e.kernel_matrix(predictions, parallel),
        }
    }

    fn estimate_view(&self, samples: &SampleView) -> Result<f64, CalibrationError> {
        match self {
            SKCE::Biased(e) => e.estimate_view(samples),
            SKCE::Unbiased(e) => e.estimate_view(samples),
            SKCE::BlockUnbiased(e) => e.estimate_view(samples),
        }
    }
}

impl<K1: Kernel, K2: LabelKernel> CalibrationErrorEstimator for SKCE<K1, K2> {
    fn estimate(&self, predictions: &Predictions, targets: &Targets) -> Result<f64, CalibrationError> {
        match self {
            SKCE::Biased(e) => e.estimate(predictions, targets),
            SKCE::Unbiased(e) => e.estimate(predictions, targets),
            SKCE::BlockUnbiased(e) => e.estimate(predictions, targets),
        }
    }
}
