//! Unnormalized Calibration Mean Embedding
//!
//! Unbiased estimator of the squared unnormalized calibration mean embedding,
//! the average over a set of test locations `(p̃_t, ỹ_t)` of the squared
//! calibration witness function
//! `w(t) = E[k_p(P, p̃_t) (k_y(Y, ỹ_t) - E_{Z ~ P} k_y(Z, ỹ_t))]`.
use rayon::prelude::*;

use crate::data::{check_samples, Predictions, Targets};
use crate::errors::CalibrationError;
use crate::estimator::{CalibrationErrorEstimator, ResamplingEstimator, SampleView};
use crate::kernels::{Kernel, LabelKernel, TensorProductKernel};

#[derive(Debug, Clone)]
pub struct UCME<K1, K2> {
    kernel: TensorProductKernel<K1, K2>,
    test_predictions: Predictions,
    test_labels: Vec<usize>,
    parallel: bool,
}

impl<K1: Kernel, K2: LabelKernel> UCME<K1, K2> {
    /// * `kernel` - Tensor product kernel on predictions and labels.
    /// * `test_predictions` - Predictions of the test locations.
    /// * `test_targets` - Labels of the test locations.
    pub fn new(
        kernel: TensorProductKernel<K1, K2>,
        test_predictions: Predictions,
        test_targets: &Targets,
    ) -> Result<Self, CalibrationError> {
        check_samples(&test_predictions, test_targets)?;
        Ok(UCME {
            kernel,
            test_labels: test_targets.indices(),
            test_predictions,
            parallel: true,
        })
    }

    /// Set whether witness values are computed in parallel.
    pub fn set_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn kernel(&self) -> &TensorProductKernel<K1, K2> {
        &self.kernel
    }

    /// Number of test locations.
    pub fn ntest(&self) -> usize {
        self.test_labels.len()
    }

    fn check_compatible(&self, predictions: &Predictions) -> Result<(), CalibrationError> {
        if predictions.nclasses() != self.test_predictions.nclasses() {
            return Err(CalibrationError::DimensionMismatch(
                self.test_predictions.nclasses(),
                predictions.nclasses(),
            ));
        }
        if predictions.point_dim() != self.test_predictions.point_dim() {
            return Err(CalibrationError::DimensionMismatch(
                self.test_predictions.point_dim(),
                predictions.point_dim(),
            ));
        }
        Ok(())
    }

    /// Witness values `w_i(t)` of all samples at all test locations, as a
    /// row-major matrix with one row per sample.
    pub fn witness_values(&self, samples: &SampleView) -> Result<Vec<f64>, CalibrationError> {
        self.check_compatible(samples.predictions)?;
        let m = self.ntest();
        let mut values = vec![0.0; samples.len() * m];
        let fill_row = |(a, row): (usize, &mut [f64])| {
            let i = samples.index[a];
            let p = samples.predictions.point(i);
            let distribution = samples.predictions.distribution(i);
            for (t, v) in row.iter_mut().enumerate() {
                let k_p = self.kernel.first().eval(p, self.test_predictions.point(t));
                *v = if k_p == 0.0 {
                    0.0
                } else {
                    k_p * self
                        .kernel
                        .second()
                        .residual_at(samples.labels[a], distribution, self.test_labels[t])
                };
            }
        };
        if self.parallel {
            values.par_chunks_mut(m).enumerate().for_each(fill_row);
        } else {
            values.chunks_mut(m).enumerate().for_each(fill_row);
        }
        Ok(values)
    }
}

impl<K1: Kernel, K2: LabelKernel> ResamplingEstimator for UCME<K1, K2> {
    fn estimate_view(&self, samples: &SampleView) -> Result<f64, CalibrationError> {
        let n = samples.len();
        if n < 2 {
            return Err(CalibrationError::InsufficientSamples(2, n));
        }
        let values = self.witness_values(samples)?;
        Ok(ucme_from_witness_values(&values, n, self.ntest()))
    }
}

/// The UCME estimate from the row-major `n x m` matrix of witness values.
pub(crate) fn ucme_from_witness_values(values: &[f64], n: usize, m: usize) -> f64 {
    let mut sums = vec![0.0; m];
    let mut sq_sums = vec![0.0; m];
    for row in values.chunks_exact(m) {
        for (t, w) in row.iter().enumerate() {
            sums[t] += w;
            sq_sums[t] += w * w;
        }
    }
    let normalizer = (n * (n - 1)) as f64;
    let total: f64 = sums.iter().zip(&sq_sums).map(|(s, s2)| (s * s - s2) / normalizer).sum();
    total / m as f64
}

impl<K1: Kernel, K2: LabelKernel> CalibrationErrorEstimator for UCME<K1, K2> {
    fn estimate(&self, predictions: &Predictions, targets: &Targets) -> Result<f64, CalibrationError> {
        check_samples(predictions, targets)?;
        let index: Vec<usize> = (0..predictions.len()).collect();
        let labels = targets.indices();
        self.estimate_view(&SampleView::new(predictions, &index, &labels)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::{scale, tensor, ExponentialKernel, SqExponentialKernel, WhiteKernel};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::{Dirichlet, Distribution};
    use std::f64::consts::E;

    #[test]
    fn test_ucme_two_points() {
        // a single test location at the first prediction with label 1
        let kernel = tensor(SqExponentialKernel, WhiteKernel);
        let test = Predictions::from_rows(&[vec![1., 0.]]).unwrap();
        let ucme = UCME::new(kernel, test, &Targets::from_classes(&[1])).unwrap();
        let predictions = Predictions::from_rows(&[vec![1., 0.], vec![0., 1.]]).unwrap();

        // residuals 1[y = 1] - p[1] are 0 and 0
        let x = ucme.estimate(&predictions, &Targets::from_classes(&[1, 2])).unwrap();
        assert!(x.abs() < 1e-12);
        // residuals are -1 and 1, weighted by 1 and exp(-1)
        let x = ucme.estimate(&predictions, &Targets::from_classes(&[2, 1])).unwrap();
        assert!((x + 1.0 / E).abs() < 1e-12);
    }

    #[test]
    fn test_ucme_mean_zero() {
        let mut rng = StdRng::seed_from_u64(1234);
        let dirichlet = Dirichlet::new(&[1.0, 1.0, 1.0]).unwrap();
        let test_rows: Vec<Vec<f64>> = (0..5).map(|_| dirichlet.sample(&mut rng)).collect();
        let test_targets = Targets::from((0..5).map(|_| rng.gen_range(1..=3)).collect::<Vec<usize>>());
        let kernel = tensor(scale(ExponentialKernel, 3.0).unwrap(), WhiteKernel);
        let ucme = UCME::new(kernel, Predictions::from_rows(&test_rows).unwrap(), &test_targets)
            .unwrap()
            .set_parallel(false);

        let estimates: Vec<f64> = (0..500)
            .map(|_| {
                let rows: Vec<Vec<f64>> = (0..20).map(|_| dirichlet.sample(&mut rng)).collect();
                // labels drawn from the predictions
                let labels: Vec<usize> = rows
                    .iter()
                    .map(|p| {
                        let u: f64 = rng.gen();
                        if u < p[0] {
                            1
                        } else if u < p[0] + p[1] {
                            2
                        } else {
                            3
                        }
                    })
                    .collect();
                let predictions = Predictions::from_rows(&rows).unwrap();
                ucme.estimate(&predictions, &Targets::from(labels)).unwrap()
            })
            .collect();
        let mean = estimates.iter().sum::<f64>() / estimates.len() as f64;
        assert!(mean.abs() < 1e-2, "mean {}", mean);
    }

    #[test]
    fn test_ucme_parallel_matches_sequential() {
        let kernel = tensor(SqExponentialKernel, WhiteKernel);
        let test = Predictions::from_probabilities(&[0.1, 0.8]).unwrap();
        let ucme = UCME::new(kernel, test, &Targets::from_bools(&[false, true])).unwrap();
        let predictions = Predictions::from_probabilities(&[0.2, 0.4, 0.9, 0.7]).unwrap();
        let targets = Targets::from_bools(&[true, true, false, true]);
        let x = ucme.clone().set_parallel(true).estimate(&predictions, &targets).unwrap();
        let y = ucme.set_parallel(false).estimate(&predictions, &targets).unwrap();
        assert!((x - y).abs() < 1e-12);
    }

    #[test]
    fn test_ucme_errors() {
        let kernel = tensor(SqExponentialKernel, WhiteKernel);
        let test = Predictions::from_rows(&[vec![1., 0.]]).unwrap();
        assert!(UCME::new(kernel.clone(), test.clone(), &Targets::from_classes(&[3])).is_err());
        let ucme = UCME::new(kernel, test, &Targets::from_classes(&[1])).unwrap();

        let binary = Predictions::from_probabilities(&[0.5, 0.5]).unwrap();
        assert!(matches!(
            ucme.estimate(&binary, &Targets::from_classes(&[1, 2])),
            Err(CalibrationError::DimensionMismatch(2, 1))
        ));
        let three = Predictions::from_rows(&[vec![1., 0., 0.], vec![0., 1., 0.]]).unwrap();
        assert!(matches!(
            ucme.estimate(&three, &Targets::from_classes(&[1, 2])),
            Err(CalibrationError::DimensionMismatch(2, 3))
        ));
        let one = Predictions::from_rows(&[vec![1., 0.]]).unwrap();
        assert!(matches!(
            ucme.estimate(&one, &Targets::from_classes(&[1])),
            Err(CalibrationError::InsufficientSamples(2, 1))
        ));
    }
}
