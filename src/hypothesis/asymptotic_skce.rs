//! Asymptotic SKCE Test
//!
//! Calibration test based on the asymptotic distribution of the unbiased SKCE
//! estimator. Under the null hypothesis the scaled estimator `n U` is a
//! degenerate U-statistic, whose distribution is approximated by the bootstrap
//! of the U-statistic with the doubly centered calibration witness kernel.
use log::debug;
use rand::rngs::StdRng;

use crate::config::TestConfig;
use crate::data::{Predictions, Targets};
use crate::errors::CalibrationError;
use crate::hypothesis::{bootstrap, exceedance, CalibrationTest, TestData, TestStatistic};
use crate::kernels::{Kernel, LabelKernel, TensorProductKernel};
use crate::sampler::bootstrap_index;

pub struct AsymptoticSKCETest<'a, K1, K2> {
    kernel: TensorProductKernel<K1, K2>,
    data: TestData<'a>,
    config: TestConfig,
}

impl<'a, K1: Kernel, K2: LabelKernel> AsymptoticSKCETest<'a, K1, K2> {
    /// * `kernel` - Tensor product kernel on predictions and labels.
    /// * `predictions` - Predicted distributions.
    /// * `targets` - Observed labels.
    pub fn new(
        kernel: TensorProductKernel<K1, K2>,
        predictions: &'a Predictions,
        targets: &Targets,
    ) -> Result<Self, CalibrationError> {
        let data = TestData::new(predictions, targets)?;
        if data.len() < 2 {
            return Err(CalibrationError::InsufficientSamples(2, data.len()));
        }
        Ok(AsymptoticSKCETest {
            kernel,
            data,
            config: TestConfig::default(),
        })
    }

    pub fn set_config(mut self, config: TestConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of bootstrap iterations.
    pub fn set_bootstrap_iters(mut self, bootstrap_iters: usize) -> Self {
        self.config.bootstrap_iters = bootstrap_iters;
        self
    }

    /// Set whether the witness matrix and the bootstrap iterations are computed in parallel.
    pub fn set_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn kernel(&self) -> &TensorProductKernel<K1, K2> {
        &self.kernel
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AsymptoticSKCEStatistic {
    /// Unbiased SKCE estimate of the observed data.
    pub estimate: f64,
    /// The scaled estimate `n U`.
    pub statistic: f64,
    nsamples: usize,
    // doubly centered witness matrix, row-major
    centered: Vec<f64>,
}

impl TestStatistic for AsymptoticSKCEStatistic {
    fn estimate(&self) -> f64 {
        self.estimate
    }
    fn value(&self) -> f64 {
        self.statistic
    }
}

/// Center the rows and columns of a symmetric `n x n` matrix in place.
fn double_center(values: &mut [f64], n: usize) {
    let row_means: Vec<f64> = values.chunks_exact(n).map(|row| row.iter().sum::<f64>() / n as f64).collect();
    let mean = row_means.iter().sum::<f64>() / n as f64;
    for (i, row) in values.chunks_exact_mut(n).enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v += mean - row_means[i] - row_means[j];
        }
    }
}

/// `n` times the U-statistic of the resampled samples `index`.
fn resampled_statistic(centered: &[f64], n: usize, index: &[usize]) -> f64 {
    let mut sum = 0.0;
    for i in index {
        let row = &centered[i * n..(i + 1) * n];
        sum += index.iter().map(|j| row[*j]).sum::<f64>() - row[*i];
    }
    sum / (n - 1) as f64
}

impl<'a, K1: Kernel, K2: LabelKernel> CalibrationTest for AsymptoticSKCETest<'a, K1, K2> {
    type Statistic = AsymptoticSKCEStatistic;

    fn name(&self) -> &'static str {
        "asymptotic SKCE test"
    }

    fn nsamples(&self) -> usize {
        self.data.len()
    }

    fn config(&self) -> &TestConfig {
        &self.config
    }

    fn compute(&self) -> Result<AsymptoticSKCEStatistic, CalibrationError> {
        let n = self.data.len();
        let mut witness = self.data.view()?.witness_matrix(&self.kernel, self.config.parallel);
        let trace: f64 = (0..n).map(|i| witness[i * n + i]).sum();
        let total: f64 = witness.iter().sum();
        let estimate = (total - trace) / (n * (n - 1)) as f64;
        double_center(&mut witness, n);
        Ok(AsymptoticSKCEStatistic {
            estimate,
            statistic: n as f64 * estimate,
            nsamples: n,
            centered: witness,
        })
    }

    fn pvalue(&self, statistic: &AsymptoticSKCEStatistic, rng: &mut StdRng) -> Result<f64, CalibrationError> {
        let n = statistic.nsamples;
        let centered = &statistic.centered;
        let statistics = bootstrap(rng, &self.config, |rng| {
            let index = bootstrap_index(rng, n);
            Ok(resampled_statistic(centered, n, &index))
        })?;
        let pvalue = exceedance(&statistics, statistic.statistic);
        debug!("Bootstrap of {} U-statistics, p-value {}.", statistics.len(), pvalue);
        Ok(pvalue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_center() {
        let mut values = vec![1.0, 2.0, 2.0, 5.0];
        double_center(&mut values, 2);
        // row means 1.5 and 3.5, grand mean 2.5
        assert_eq!(values, vec![0.5, -0.5, -0.5, 0.5]);
        for row in values.chunks_exact(2) {
            assert!(row.iter().sum::<f64>().abs() < 1e-12);
        }
    }

    #[test]
    fn test_resampled_statistic() {
        let centered = vec![0.5, -0.5, -0.5, 0.5];
        // identity resample sums the off-diagonal entries
        assert_eq!(resampled_statistic(&centered, 2, &[0, 1]), -1.0);
        // repeated sample pairs with itself
        assert_eq!(resampled_statistic(&centered, 2, &[1, 1]), 1.0);
    }
}
