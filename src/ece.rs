//! Expected Calibration Error
//!
//! Binned estimator of the expected calibration error, the weighted average of the
//! distances between the mean prediction and the label frequencies of each bin.
use crate::binning::Binning;
use crate::data::{check_samples, Predictions, Targets};
use crate::distance::Distance;
use crate::errors::CalibrationError;
use crate::estimator::{CalibrationErrorEstimator, ResamplingEstimator};

#[derive(Debug, Clone)]
pub struct ECE<B> {
    binning: B,
    distance: Distance,
}

impl<B: Binning> ECE<B> {
    /// ECE with the total variation distance.
    pub fn new(binning: B) -> Self {
        Self::with_distance(binning, Distance::default())
    }

    pub fn with_distance(binning: B, distance: Distance) -> Self {
        ECE { binning, distance }
    }
}

impl<B: Binning> CalibrationErrorEstimator for ECE<B> {
    fn estimate(&self, predictions: &Predictions, targets: &Targets) -> Result<f64, CalibrationError> {
        check_samples(predictions, targets)?;
        let labels = targets.indices();
        let nclasses = predictions.nclasses();
        let n = predictions.len() as f64;

        let mut mean = vec![0.0; nclasses];
        let mut frequency = vec![0.0; nclasses];
        let mut ece = 0.0;
        for bin in self.binning.bins(predictions)? {
            mean.iter_mut().for_each(|v| *v = 0.0);
            frequency.iter_mut().for_each(|v| *v = 0.0);
            let size = bin.len() as f64;
            for i in &bin {
                for (m, p) in mean.iter_mut().zip(predictions.distribution(*i)) {
                    *m += p;
                }
                frequency[labels[*i]] += 1.0;
            }
            mean.iter_mut().for_each(|v| *v /= size);
            frequency.iter_mut().for_each(|v| *v /= size);
            ece += size / n * self.distance.evaluate(&mean, &frequency);
        }
        Ok(ece)
    }
}

impl<B: Binning + Sync> ResamplingEstimator for ECE<B> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::{MedianVarianceBinning, UniformBinning};
    use crate::data::{ColVecs, Matrix, RowVecs};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::{Dirichlet, Distribution};

    #[test]
    fn test_ece_perfectly_calibrated() {
        let ece = ECE::new(UniformBinning::new(10).unwrap());

        let eye = vec![1., 0., 0., 1.];
        let predictions = Predictions::try_from(RowVecs(Matrix::new_row_major(&eye, 2, 2))).unwrap();
        assert_eq!(ece.estimate(&predictions, &Targets::from_classes(&[1, 2])).unwrap(), 0.0);

        let v = vec![0., 0.5, 0.5, 1., 1., 0.5, 0.5, 0.];
        let predictions = Predictions::try_from(ColVecs(Matrix::new_row_major(&v, 2, 4))).unwrap();
        let targets = Targets::from_classes(&[2, 2, 1, 1]);
        assert_eq!(ece.estimate(&predictions, &targets).unwrap(), 0.0);
    }

    #[test]
    fn test_ece_miscalibrated() {
        let ece = ECE::new(UniformBinning::new(10).unwrap());
        let predictions = Predictions::from_rows(&[vec![1., 0.], vec![0., 1.]]).unwrap();
        let x = ece.estimate(&predictions, &Targets::from_classes(&[2, 1])).unwrap();
        assert!((x - 1.0).abs() < 1e-12);

        let ece = ECE::with_distance(UniformBinning::new(10).unwrap(), Distance::SqEuclidean);
        let x = ece.estimate(&predictions, &Targets::from_classes(&[2, 1])).unwrap();
        assert!((x - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_ece_random() {
        let mut rng = StdRng::seed_from_u64(1234);
        let dirichlet = Dirichlet::new(&[5.0, 0.5]).unwrap();
        let rows: Vec<Vec<f64>> = (0..1000).map(|_| dirichlet.sample(&mut rng)).collect();
        let predictions = Predictions::from_rows(&rows).unwrap();
        let targets: Vec<usize> = (0..1000).map(|_| rng.gen_range(1..3)).collect();
        let targets = Targets::from(targets);

        let x = ECE::new(UniformBinning::new(10).unwrap())
            .estimate(&predictions, &targets)
            .unwrap();
        assert!(0.0 < x && x < 1.0);

        let x = ECE::new(MedianVarianceBinning::new(10).unwrap())
            .estimate(&predictions, &targets)
            .unwrap();
        assert!(0.0 < x && x < 1.0);
    }

    #[test]
    fn test_ece_binary() {
        let ece = ECE::new(UniformBinning::new(2).unwrap());
        let predictions = Predictions::from_probabilities(&[0.0, 0.0, 1.0, 1.0]).unwrap();
        let targets = Targets::from_bools(&[false, false, true, true]);
        assert_eq!(ece.estimate(&predictions, &targets).unwrap(), 0.0);
        let targets = Targets::from_bools(&[false, true, true, true]);
        assert!((ece.estimate(&predictions, &targets).unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_ece_errors() {
        let ece = ECE::new(UniformBinning::new(10).unwrap());
        let predictions = Predictions::from_rows(&[vec![1., 0.], vec![0., 1.]]).unwrap();
        assert!(matches!(
            ece.estimate(&predictions, &Targets::from_classes(&[1])),
            Err(CalibrationError::DimensionMismatch(2, 1))
        ));
        let empty = predictions.select(&[]);
        assert!(matches!(
            ece.estimate(&empty, &Targets::from_classes(&[])),
            Err(CalibrationError::EmptyInput)
        ));
    }
}
