//! Estimator
//!
//! The interfaces shared by all calibration error estimators, and views of
//! resampled data sets used by the calibration tests.
use rayon::prelude::*;

use crate::data::{Predictions, Targets};
use crate::errors::CalibrationError;
use crate::kernels::{Kernel, LabelKernel, TensorProductKernel};

/// An estimator of a calibration error, a pure function of its
/// configuration and a set of samples.
pub trait CalibrationErrorEstimator {
    /// Estimate the calibration error of `predictions` given the observed `targets`.
    fn estimate(&self, predictions: &Predictions, targets: &Targets) -> Result<f64, CalibrationError>;
}

/// Estimators that can be evaluated repeatedly on resampled data sets
/// without copying the predictions.
pub trait ResamplingEstimator: CalibrationErrorEstimator + Sync {
    /// Kernel matrix of the predictions, for estimators that evaluate a
    /// prediction kernel on all pairs of samples.
    fn kernel_matrix(&self, _predictions: &Predictions, _parallel: bool) -> Option<KernelMatrix> {
        None
    }

    /// Estimate the calibration error of the samples of a view.
    fn estimate_view(&self, samples: &SampleView) -> Result<f64, CalibrationError> {
        let predictions = samples.predictions.select(samples.index);
        let targets = Targets::from(samples.labels.iter().map(|y| y + 1).collect::<Vec<usize>>());
        self.estimate(&predictions, &targets)
    }
}

/// Dense kernel matrix of a kernel on the prediction space.
pub struct KernelMatrix {
    values: Vec<f64>,
    n: usize,
}

impl KernelMatrix {
    pub fn new<K: Kernel>(kernel: &K, predictions: &Predictions, parallel: bool) -> Self {
        let n = predictions.len();
        let mut values = vec![0.0; n * n];
        let fill_row = |(i, row): (usize, &mut [f64])| {
            for (j, v) in row.iter_mut().enumerate() {
                *v = kernel.eval(predictions.point(i), predictions.point(j));
            }
        };
        if parallel {
            values.par_chunks_mut(n.max(1)).enumerate().for_each(fill_row);
        } else {
            values.chunks_mut(n.max(1)).enumerate().for_each(fill_row);
        }
        KernelMatrix { values, n }
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n + j]
    }
}

/// A set of samples, possibly resampled from an original data set.
///
/// Sample `a` is the prediction `index[a]` of the original predictions
/// together with the zero based label `labels[a]`.
pub struct SampleView<'a> {
    pub(crate) predictions: &'a Predictions,
    pub(crate) index: &'a [usize],
    pub(crate) labels: &'a [usize],
    pub(crate) gram: Option<&'a KernelMatrix>,
}

impl<'a> SampleView<'a> {
    /// * `predictions` - The original predictions.
    /// * `index` - Index of the prediction of every sample.
    /// * `labels` - Zero based label of every sample.
    pub fn new(predictions: &'a Predictions, index: &'a [usize], labels: &'a [usize]) -> Result<Self, CalibrationError> {
        if index.len() != labels.len() {
            return Err(CalibrationError::DimensionMismatch(index.len(), labels.len()));
        }
        if let Some(i) = index.iter().find(|i| **i >= predictions.len()) {
            return Err(CalibrationError::DimensionMismatch(predictions.len(), *i + 1));
        }
        if let Some(y) = labels.iter().find(|y| **y >= predictions.nclasses()) {
            return Err(CalibrationError::InvalidTarget(y + 1, predictions.nclasses()));
        }
        Ok(SampleView {
            predictions,
            index,
            labels,
            gram: None,
        })
    }

    /// Use precomputed kernel values of the original predictions.
    pub fn with_kernel_matrix(mut self, gram: Option<&'a KernelMatrix>) -> Self {
        self.gram = gram;
        self
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The calibration witness kernel of samples `a` and `b`.
    #[inline]
    pub fn witness<K1: Kernel, K2: LabelKernel>(&self, kernel: &TensorProductKernel<K1, K2>, a: usize, b: usize) -> f64 {
        let (i, j) = (self.index[a], self.index[b]);
        let k_p = match self.gram {
            Some(gram) => gram.get(i, j),
            None => kernel.first().eval(self.predictions.point(i), self.predictions.point(j)),
        };
        if k_p == 0.0 {
            return 0.0;
        }
        k_p * kernel.second().residual_inner(
            self.labels[a],
            self.predictions.distribution(i),
            self.labels[b],
            self.predictions.distribution(j),
        )
    }

    /// Sum of the witness kernel over the pairs `a < b` and over the diagonal.
    pub(crate) fn pair_sums<K1: Kernel, K2: LabelKernel>(
        &self,
        kernel: &TensorProductKernel<K1, K2>,
        parallel: bool,
    ) -> (f64, f64) {
        let n = self.len();
        let row = |a: usize| -> (f64, f64) {
            let off: f64 = (a + 1..n).map(|b| self.witness(kernel, a, b)).sum();
            (off, self.witness(kernel, a, a))
        };
        let add = |x: (f64, f64), y: (f64, f64)| (x.0 + y.0, x.1 + y.1);
        if parallel {
            (0..n).into_par_iter().map(row).reduce(|| (0.0, 0.0), add)
        } else {
            (0..n).map(row).fold((0.0, 0.0), add)
        }
    }

    /// Dense matrix of the witness kernel, row-major.
    pub(crate) fn witness_matrix<K1: Kernel, K2: LabelKernel>(
        &self,
        kernel: &TensorProductKernel<K1, K2>,
        parallel: bool,
    ) -> Vec<f64> {
        let n = self.len();
        let mut values = vec![0.0; n * n];
        let fill_row = |(a, row): (usize, &mut [f64])| {
            for (b, v) in row.iter_mut().enumerate() {
                *v = self.witness(kernel, a, b);
            }
        };
        if parallel {
            values.par_chunks_mut(n.max(1)).enumerate().for_each(fill_row);
        } else {
            values.chunks_mut(n.max(1)).enumerate().for_each(fill_row);
        }
        values
    }
}
