//! Consistency Test
//!
//! Calibration test based on consistency resampling: the observed calibration
//! error estimate is compared with estimates on data sets whose labels are
//! drawn from the predictions themselves.
use log::debug;
use rand::rngs::StdRng;

use crate::config::TestConfig;
use crate::data::{Predictions, Targets};
use crate::errors::CalibrationError;
use crate::estimator::{ResamplingEstimator, SampleView};
use crate::hypothesis::{bootstrap, exceedance, CalibrationTest, TestData, TestStatistic};
use crate::sampler::ConsistencySampler;

pub struct ConsistencyTest<'a, E> {
    estimator: E,
    data: TestData<'a>,
    config: TestConfig,
}

impl<'a, E: ResamplingEstimator> ConsistencyTest<'a, E> {
    /// * `estimator` - Estimator of the calibration error.
    /// * `predictions` - Predicted distributions.
    /// * `targets` - Observed labels.
    pub fn new(estimator: E, predictions: &'a Predictions, targets: &Targets) -> Result<Self, CalibrationError> {
        Ok(ConsistencyTest {
            estimator,
            data: TestData::new(predictions, targets)?,
            config: TestConfig::default(),
        })
    }

    pub fn set_config(mut self, config: TestConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of consistency resampling iterations.
    pub fn set_bootstrap_iters(mut self, bootstrap_iters: usize) -> Self {
        self.config.bootstrap_iters = bootstrap_iters;
        self
    }

    /// Set whether the resampling iterations run in parallel.
    pub fn set_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsistencyStatistic {
    /// Calibration error estimate of the observed data.
    pub estimate: f64,
}

impl TestStatistic for ConsistencyStatistic {
    fn estimate(&self) -> f64 {
        self.estimate
    }
    fn value(&self) -> f64 {
        self.estimate
    }
}

impl<'a, E: ResamplingEstimator> CalibrationTest for ConsistencyTest<'a, E> {
    type Statistic = ConsistencyStatistic;

    fn name(&self) -> &'static str {
        "consistency test"
    }

    fn nsamples(&self) -> usize {
        self.data.len()
    }

    fn config(&self) -> &TestConfig {
        &self.config
    }

    fn compute(&self) -> Result<ConsistencyStatistic, CalibrationError> {
        let estimate = self.estimator.estimate_view(&self.data.view()?)?;
        Ok(ConsistencyStatistic { estimate })
    }

    fn pvalue(&self, statistic: &ConsistencyStatistic, rng: &mut StdRng) -> Result<f64, CalibrationError> {
        let predictions = self.data.predictions;
        let gram = self.estimator.kernel_matrix(predictions, self.config.parallel);
        let sampler = ConsistencySampler::new(predictions);
        let estimates = bootstrap(rng, &self.config, |rng| {
            let (index, labels) = sampler.sample(rng);
            let samples = SampleView::new(predictions, &index, &labels)?.with_kernel_matrix(gram.as_ref());
            self.estimator.estimate_view(&samples)
        })?;
        let pvalue = exceedance(&estimates, statistic.estimate);
        debug!(
            "Consistency resampling of {} data sets, p-value {}.",
            estimates.len(),
            pvalue
        );
        Ok(pvalue)
    }
}
