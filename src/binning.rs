//! Binning
//!
//! Strategies for partitioning predictions into bins for the estimation of the
//! expected calibration error.
use hashbrown::HashMap;
use log::debug;

use crate::constants::MIN_BIN_SIZE;
use crate::data::Predictions;
use crate::errors::CalibrationError;
use crate::utils::{median, validate_min_usize_parameter};

/// A binning scheme partitions the indices of the predictions into
/// non-empty bins.
pub trait Binning {
    /// Return the bins, each bin is a list of sample indices.
    fn bins(&self, predictions: &Predictions) -> Result<Vec<Vec<usize>>, CalibrationError>;
}

/// Bins of equal width along every coordinate of the predictions.
#[derive(Debug, Clone, Copy)]
pub struct UniformBinning {
    nbins: usize,
}

impl UniformBinning {
    /// * `nbins` - Number of bins along each coordinate.
    pub fn new(nbins: usize) -> Result<Self, CalibrationError> {
        validate_min_usize_parameter(nbins, 1, "nbins")?;
        Ok(UniformBinning { nbins })
    }

    /// Index of the bin of value `v` along a single coordinate.
    #[inline]
    fn coordinate_bin(&self, v: f64) -> usize {
        ((v * self.nbins as f64).floor() as usize).min(self.nbins - 1)
    }
}

impl Binning for UniformBinning {
    fn bins(&self, predictions: &Predictions) -> Result<Vec<Vec<usize>>, CalibrationError> {
        let mut bins: HashMap<Vec<usize>, Vec<usize>> = HashMap::new();
        for i in 0..predictions.len() {
            let key: Vec<usize> = predictions.point(i).iter().map(|v| self.coordinate_bin(*v)).collect();
            bins.entry(key).or_default().push(i);
        }
        let mut bins: Vec<(Vec<usize>, Vec<usize>)> = bins.into_iter().collect();
        bins.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        debug!("Uniform binning created {} non-empty bins.", bins.len());
        Ok(bins.into_iter().map(|(_, index)| index).collect())
    }
}

/// Adaptive binning that recursively splits the bin with the largest variance
/// at the median of its coordinate with the largest variance.
#[derive(Debug, Clone, Copy)]
pub struct MedianVarianceBinning {
    minsize: usize,
    maxbins: usize,
}

impl MedianVarianceBinning {
    /// * `minsize` - Minimum number of samples in each bin.
    pub fn new(minsize: usize) -> Result<Self, CalibrationError> {
        Self::with_maxbins(minsize, usize::MAX)
    }

    /// * `minsize` - Minimum number of samples in each bin.
    /// * `maxbins` - Maximum number of bins.
    pub fn with_maxbins(minsize: usize, maxbins: usize) -> Result<Self, CalibrationError> {
        validate_min_usize_parameter(minsize, 1, "minsize")?;
        validate_min_usize_parameter(maxbins, 1, "maxbins")?;
        Ok(MedianVarianceBinning { minsize, maxbins })
    }
}

impl Default for MedianVarianceBinning {
    fn default() -> Self {
        MedianVarianceBinning {
            minsize: MIN_BIN_SIZE,
            maxbins: usize::MAX,
        }
    }
}

struct Candidate {
    index: Vec<usize>,
    dim: usize,
    variance: f64,
}

impl Candidate {
    fn new(predictions: &Predictions, index: Vec<usize>) -> Self {
        let n = index.len() as f64;
        let mut dim = 0;
        let mut variance = 0.0;
        for d in 0..predictions.point_dim() {
            let mean = index.iter().map(|i| predictions.point(*i)[d]).sum::<f64>() / n;
            let var = index
                .iter()
                .map(|i| (predictions.point(*i)[d] - mean).powi(2))
                .sum::<f64>()
                / n;
            if var > variance {
                variance = var;
                dim = d;
            }
        }
        Candidate { index, dim, variance }
    }
}

impl Binning for MedianVarianceBinning {
    fn bins(&self, predictions: &Predictions) -> Result<Vec<Vec<usize>>, CalibrationError> {
        if predictions.is_empty() {
            return Err(CalibrationError::EmptyInput);
        }
        let mut done: Vec<Vec<usize>> = Vec::new();
        let mut candidates = vec![Candidate::new(predictions, (0..predictions.len()).collect())];

        while done.len() + candidates.len() < self.maxbins {
            let best = candidates
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.variance.total_cmp(&b.1.variance))
                .map(|(i, _)| i);
            let Some(best) = best else {
                break;
            };
            let candidate = candidates.swap_remove(best);
            if candidate.variance <= 0.0 || candidate.index.len() < 2 * self.minsize {
                done.push(candidate.index);
                continue;
            }

            let values: Vec<f64> = candidate
                .index
                .iter()
                .map(|i| predictions.point(*i)[candidate.dim])
                .collect();
            let m = median(&values);
            let (left, right): (Vec<usize>, Vec<usize>) = candidate
                .index
                .iter()
                .partition(|i| predictions.point(**i)[candidate.dim] < m);

            if left.len() < self.minsize || right.len() < self.minsize {
                done.push(candidate.index);
            } else {
                candidates.push(Candidate::new(predictions, left));
                candidates.push(Candidate::new(predictions, right));
            }
        }

        done.extend(candidates.into_iter().map(|c| c.index));
        debug!("Median variance binning created {} bins.", done.len());
        Ok(done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> Predictions {
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let q = i as f64 / (n - 1) as f64;
                vec![q, 1.0 - q]
            })
            .collect();
        Predictions::from_rows(&rows).unwrap()
    }

    fn assert_partition(bins: &[Vec<usize>], n: usize) {
        let mut all: Vec<usize> = bins.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..n).collect::<Vec<usize>>());
        assert!(bins.iter().all(|b| !b.is_empty()));
    }

    #[test]
    fn test_uniform_binning() {
        let binning = UniformBinning::new(10).unwrap();
        let predictions = grid(101);
        let bins = binning.bins(&predictions).unwrap();
        assert_partition(&bins, 101);
        assert!(bins.len() >= 10);
        // q = 1.0 falls into the last bin
        assert!(bins.iter().any(|b| b.contains(&100) && b.contains(&95)));
    }

    #[test]
    fn test_uniform_binning_binary() {
        let binning = UniformBinning::new(2).unwrap();
        let predictions = Predictions::from_probabilities(&[0.1, 0.2, 0.7, 1.0]).unwrap();
        let bins = binning.bins(&predictions).unwrap();
        assert_eq!(bins, vec![vec![0, 1], vec![2, 3]]);
        assert!(UniformBinning::new(0).is_err());
    }

    #[test]
    fn test_median_variance_binning() {
        let binning = MedianVarianceBinning::new(10).unwrap();
        let predictions = grid(100);
        let bins = binning.bins(&predictions).unwrap();
        assert_partition(&bins, 100);
        assert!(bins.len() > 1);
        assert!(bins.iter().all(|b| b.len() >= 10));
    }

    #[test]
    fn test_median_variance_binning_maxbins() {
        let binning = MedianVarianceBinning::with_maxbins(1, 3).unwrap();
        let predictions = grid(64);
        let bins = binning.bins(&predictions).unwrap();
        assert_partition(&bins, 64);
        assert_eq!(bins.len(), 3);
    }

    #[test]
    fn test_median_variance_binning_constant() {
        let binning = MedianVarianceBinning::default();
        let predictions = Predictions::from_rows(&vec![vec![0.3, 0.7]; 50]).unwrap();
        let bins = binning.bins(&predictions).unwrap();
        assert_eq!(bins.len(), 1);
    }
}
