//! Calibration Tests
//!
//! Statistical hypothesis tests of the null hypothesis that a model is calibrated.
//! Every test is constructed from an estimator or kernel and a data set, computes
//! a test statistic and derives a p-value from it.
//!
//! # Submodules
//!
//! * `consistency`: Consistency resampling of any calibration error estimator.
//! * `distribution_free`: Concentration bounds of the SKCE estimators.
//! * `asymptotic_skce`: Bootstrap of the degenerate U-statistic of the unbiased SKCE.
//! * `asymptotic_block_skce`: Normal approximation of the block unbiased SKCE.
//! * `asymptotic_cme`: Chi-square approximation of the calibration mean embedding.
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::config::{TestConfig, TestReport};
use crate::data::{check_samples, Predictions, Targets};
use crate::errors::CalibrationError;
use crate::estimator::SampleView;
use crate::sampler::draw_seeds;

pub mod asymptotic_block_skce;
pub mod asymptotic_cme;
pub mod asymptotic_skce;
pub mod consistency;
pub mod distribution_free;

pub use asymptotic_block_skce::{AsymptoticBlockSKCEStatistic, AsymptoticBlockSKCETest};
pub use asymptotic_cme::{AsymptoticCMEStatistic, AsymptoticCMETest};
pub use asymptotic_skce::{AsymptoticSKCEStatistic, AsymptoticSKCETest};
pub use consistency::{ConsistencyStatistic, ConsistencyTest};
pub use distribution_free::{DistributionFreeSKCEStatistic, DistributionFreeSKCETest};

/// Result of the first phase of a calibration test.
pub trait TestStatistic {
    /// Calibration error estimate the statistic is derived from.
    fn estimate(&self) -> f64;
    /// Value of the test statistic.
    fn value(&self) -> f64;
}

/// A test of the null hypothesis that predictions are calibrated.
pub trait CalibrationTest {
    type Statistic: TestStatistic;

    fn name(&self) -> &'static str;

    /// Number of samples of the data set.
    fn nsamples(&self) -> usize;

    fn config(&self) -> &TestConfig;

    /// Compute the test statistic.
    fn compute(&self) -> Result<Self::Statistic, CalibrationError>;

    /// P-value of a test statistic. Resampling tests draw their random numbers
    /// from `rng`, the other tests ignore it.
    fn pvalue(&self, statistic: &Self::Statistic, rng: &mut StdRng) -> Result<f64, CalibrationError>;

    /// Compute the statistic and its p-value and summarize them.
    fn run(&self, rng: &mut StdRng) -> Result<TestReport, CalibrationError> {
        let config = self.config();
        config.validate()?;
        let statistic = self.compute()?;
        let pvalue = self.pvalue(&statistic, rng)?;
        let report = TestReport::new(
            self.name(),
            self.nsamples(),
            statistic.estimate(),
            statistic.value(),
            pvalue,
            config.significance,
        );
        info!("{}", report);
        Ok(report)
    }
}

/// Validated samples of a test, with labels stored zero based.
#[derive(Debug, Clone)]
pub(crate) struct TestData<'a> {
    pub(crate) predictions: &'a Predictions,
    index: Vec<usize>,
    labels: Vec<usize>,
}

impl<'a> TestData<'a> {
    pub(crate) fn new(predictions: &'a Predictions, targets: &Targets) -> Result<Self, CalibrationError> {
        check_samples(predictions, targets)?;
        Ok(TestData {
            predictions,
            index: (0..predictions.len()).collect(),
            labels: targets.indices(),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    /// View of all samples in their original order.
    pub(crate) fn view(&self) -> Result<SampleView<'_>, CalibrationError> {
        SampleView::new(self.predictions, &self.index, &self.labels)
    }
}

/// Evaluate `f` for every bootstrap iteration, each with its own generator
/// seeded from `rng`.
pub(crate) fn bootstrap<F>(rng: &mut StdRng, config: &TestConfig, f: F) -> Result<Vec<f64>, CalibrationError>
where
    F: Fn(&mut StdRng) -> Result<f64, CalibrationError> + Sync,
{
    config.validate()?;
    let seeds = draw_seeds(rng, config.bootstrap_iters);
    let iteration = |seed: &u64| {
        let mut rng = StdRng::seed_from_u64(*seed);
        f(&mut rng)
    };
    debug!("Running {} bootstrap iterations.", seeds.len());
    if config.parallel {
        seeds.par_iter().map(iteration).collect()
    } else {
        seeds.iter().map(iteration).collect()
    }
}

/// Fraction of `values` that are at least as large as `observed`.
pub(crate) fn exceedance(values: &[f64], observed: f64) -> f64 {
    values.iter().filter(|v| **v >= observed).count() as f64 / values.len() as f64
}
