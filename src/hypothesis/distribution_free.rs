//! Distribution-Free SKCE Test
//!
//! Calibration test based on concentration inequalities of the SKCE estimators.
//! With `B = 2 sup k` bounding the absolute value of the calibration witness
//! kernel, the p-value is bounded by McDiarmid's inequality for the biased
//! estimator and by Hoeffding's inequality for the unbiased estimators.
//! The bounds hold for any distribution but are conservative.
use rand::rngs::StdRng;

use crate::config::TestConfig;
use crate::data::{Predictions, Targets};
use crate::errors::CalibrationError;
use crate::estimator::ResamplingEstimator;
use crate::hypothesis::{CalibrationTest, TestData, TestStatistic};
use crate::kernels::{Kernel, LabelKernel};
use crate::skce::SKCE;

pub struct DistributionFreeSKCETest<'a, K1, K2> {
    estimator: SKCE<K1, K2>,
    data: TestData<'a>,
    config: TestConfig,
}

impl<'a, K1: Kernel, K2: LabelKernel> DistributionFreeSKCETest<'a, K1, K2> {
    /// * `estimator` - Biased, unbiased or block unbiased SKCE estimator.
    /// * `predictions` - Predicted distributions.
    /// * `targets` - Observed labels.
    pub fn new(
        estimator: SKCE<K1, K2>,
        predictions: &'a Predictions,
        targets: &Targets,
    ) -> Result<Self, CalibrationError> {
        Ok(DistributionFreeSKCETest {
            estimator,
            data: TestData::new(predictions, targets)?,
            config: TestConfig::default(),
        })
    }

    pub fn set_config(mut self, config: TestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn estimator(&self) -> &SKCE<K1, K2> {
        &self.estimator
    }

    /// Upper bound `B` of the absolute value of the calibration witness kernel.
    pub fn bound(&self) -> f64 {
        2.0 * self.estimator.kernel().bound()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistributionFreeSKCEStatistic {
    /// SKCE estimate of the observed data.
    pub estimate: f64,
    pub nsamples: usize,
    /// Bound of the calibration witness kernel.
    pub bound: f64,
}

impl TestStatistic for DistributionFreeSKCEStatistic {
    fn estimate(&self) -> f64 {
        self.estimate
    }
    fn value(&self) -> f64 {
        self.estimate
    }
}

/// `exp(-(sqrt(n x / B) - 1)² / 2)` if `sqrt(n x / B) > 1`, otherwise 1.
fn mcdiarmid_bound(estimate: f64, n: usize, bound: f64) -> f64 {
    let s = (n as f64 * estimate.max(0.0) / bound).sqrt();
    if s > 1.0 {
        (-(s - 1.0).powi(2) / 2.0).exp()
    } else {
        1.0
    }
}

/// `exp(-m x² / (2 B²))` for positive estimates, otherwise 1.
fn hoeffding_bound(estimate: f64, m: usize, bound: f64) -> f64 {
    if estimate > 0.0 {
        (-(m as f64) * estimate.powi(2) / (2.0 * bound.powi(2))).exp()
    } else {
        1.0
    }
}

impl<'a, K1: Kernel, K2: LabelKernel> CalibrationTest for DistributionFreeSKCETest<'a, K1, K2> {
    type Statistic = DistributionFreeSKCEStatistic;

    fn name(&self) -> &'static str {
        match self.estimator {
            SKCE::Biased(_) => "distribution-free test (biased SKCE)",
            SKCE::Unbiased(_) => "distribution-free test (unbiased SKCE)",
            SKCE::BlockUnbiased(_) => "distribution-free test (block unbiased SKCE)",
        }
    }

    fn nsamples(&self) -> usize {
        self.data.len()
    }

    fn config(&self) -> &TestConfig {
        &self.config
    }

    fn compute(&self) -> Result<DistributionFreeSKCEStatistic, CalibrationError> {
        let estimate = self.estimator.estimate_view(&self.data.view()?)?;
        Ok(DistributionFreeSKCEStatistic {
            estimate,
            nsamples: self.data.len(),
            bound: self.bound(),
        })
    }

    fn pvalue(&self, statistic: &DistributionFreeSKCEStatistic, _rng: &mut StdRng) -> Result<f64, CalibrationError> {
        let n = statistic.nsamples;
        let pvalue = match &self.estimator {
            SKCE::Biased(_) => mcdiarmid_bound(statistic.estimate, n, statistic.bound),
            SKCE::Unbiased(_) => hoeffding_bound(statistic.estimate, n / 2, statistic.bound),
            SKCE::BlockUnbiased(e) => hoeffding_bound(statistic.estimate, n / e.blocksize(), statistic.bound),
        };
        Ok(pvalue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mcdiarmid_bound() {
        assert_eq!(mcdiarmid_bound(0.0, 100, 2.0), 1.0);
        assert_eq!(mcdiarmid_bound(0.02, 100, 2.0), 1.0);
        // sqrt(100 * 0.18 / 2) = 3
        assert!((mcdiarmid_bound(0.18, 100, 2.0) - (-2.0f64).exp()).abs() < 1e-12);
        assert_eq!(mcdiarmid_bound(-1e-17, 100, 2.0), 1.0);
    }

    #[test]
    fn test_hoeffding_bound() {
        assert_eq!(hoeffding_bound(0.0, 50, 2.0), 1.0);
        assert_eq!(hoeffding_bound(-0.1, 50, 2.0), 1.0);
        // 50 * 0.16 / 8 = 1
        assert!((hoeffding_bound(0.4, 50, 2.0) - (-1.0f64).exp()).abs() < 1e-12);
    }
}
