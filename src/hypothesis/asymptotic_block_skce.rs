//! Asymptotic Block SKCE Test
//!
//! Calibration test based on the block unbiased SKCE estimator. The estimates of
//! disjoint blocks are i.i.d., so their standardized mean is asymptotically
//! normal and the p-value is the upper tail of the standard normal distribution.
use log::debug;
use rand::rngs::StdRng;

use crate::config::TestConfig;
use crate::data::{Predictions, Targets};
use crate::errors::CalibrationError;
use crate::hypothesis::{CalibrationTest, TestData, TestStatistic};
use crate::kernels::{Kernel, LabelKernel, TensorProductKernel};
use crate::skce::BlockUnbiasedSKCE;
use crate::stats::{mean, normal_ccdf, sample_std};

pub struct AsymptoticBlockSKCETest<'a, K1, K2> {
    estimator: BlockUnbiasedSKCE<K1, K2>,
    data: TestData<'a>,
    config: TestConfig,
}

impl<'a, K1: Kernel, K2: LabelKernel> AsymptoticBlockSKCETest<'a, K1, K2> {
    /// * `kernel` - Tensor product kernel on predictions and labels.
    /// * `blocksize` - Number of samples per block, at least 2.
    /// * `predictions` - Predicted distributions.
    /// * `targets` - Observed labels.
    pub fn new(
        kernel: TensorProductKernel<K1, K2>,
        blocksize: usize,
        predictions: &'a Predictions,
        targets: &Targets,
    ) -> Result<Self, CalibrationError> {
        let estimator = BlockUnbiasedSKCE::new(kernel, blocksize)?;
        let data = TestData::new(predictions, targets)?;
        // the variance of the block estimates requires two blocks
        if data.len() < 2 * blocksize {
            return Err(CalibrationError::InsufficientSamples(2 * blocksize, data.len()));
        }
        Ok(AsymptoticBlockSKCETest {
            estimator,
            data,
            config: TestConfig::default(),
        })
    }

    pub fn set_config(mut self, config: TestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn blocksize(&self) -> usize {
        self.estimator.blocksize()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsymptoticBlockSKCEStatistic {
    /// Block unbiased SKCE estimate, the mean of the block estimates.
    pub estimate: f64,
    /// Standardized estimate `mean / (std / sqrt(nblocks))`.
    pub z: f64,
    pub nblocks: usize,
}

impl TestStatistic for AsymptoticBlockSKCEStatistic {
    fn estimate(&self) -> f64 {
        self.estimate
    }
    fn value(&self) -> f64 {
        self.z
    }
}

impl<'a, K1: Kernel, K2: LabelKernel> CalibrationTest for AsymptoticBlockSKCETest<'a, K1, K2> {
    type Statistic = AsymptoticBlockSKCEStatistic;

    fn name(&self) -> &'static str {
        "asymptotic block SKCE test"
    }

    fn nsamples(&self) -> usize {
        self.data.len()
    }

    fn config(&self) -> &TestConfig {
        &self.config
    }

    fn compute(&self) -> Result<AsymptoticBlockSKCEStatistic, CalibrationError> {
        let estimates = self.estimator.block_estimates(&self.data.view()?)?;
        let nblocks = estimates.len();
        let estimate = mean(&estimates);
        let std = sample_std(&estimates);
        let z = if std > 0.0 {
            estimate / (std / (nblocks as f64).sqrt())
        } else if estimate > 0.0 {
            f64::INFINITY
        } else if estimate < 0.0 {
            f64::NEG_INFINITY
        } else {
            0.0
        };
        debug!("Block estimates of {} blocks, mean {}, std {}.", nblocks, estimate, std);
        Ok(AsymptoticBlockSKCEStatistic { estimate, z, nblocks })
    }

    fn pvalue(&self, statistic: &AsymptoticBlockSKCEStatistic, _rng: &mut StdRng) -> Result<f64, CalibrationError> {
        normal_ccdf(statistic.z)
    }
}
