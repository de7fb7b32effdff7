//! Asymptotic CME Test
//!
//! Calibration test based on the calibration mean embedding at a finite set of
//! test locations. The witness values of the samples at the test locations are
//! i.i.d. vectors with mean zero under the null hypothesis, hence the Hotelling
//! type statistic `n w̄ᵀ S⁺ w̄` is asymptotically chi-square distributed with one
//! degree of freedom per linearly independent test location, the rank of the
//! sample covariance `S`.
use log::debug;
use rand::rngs::StdRng;

use crate::config::TestConfig;
use crate::data::{Predictions, Targets};
use crate::errors::CalibrationError;
use crate::hypothesis::{CalibrationTest, TestData, TestStatistic};
use crate::kernels::{Kernel, LabelKernel};
use crate::stats::{chisq_ccdf, mean_and_covariance, pseudo_inverse_quadratic_form};
use crate::ucme::{ucme_from_witness_values, UCME};

pub struct AsymptoticCMETest<'a, K1, K2> {
    estimator: UCME<K1, K2>,
    data: TestData<'a>,
    config: TestConfig,
}

impl<'a, K1: Kernel, K2: LabelKernel> AsymptoticCMETest<'a, K1, K2> {
    /// * `estimator` - UCME estimator with its test locations.
    /// * `predictions` - Predicted distributions.
    /// * `targets` - Observed labels.
    pub fn new(estimator: UCME<K1, K2>, predictions: &'a Predictions, targets: &Targets) -> Result<Self, CalibrationError> {
        let data = TestData::new(predictions, targets)?;
        // the sample covariance of the witness values must be of full rank
        if data.len() <= estimator.ntest() {
            return Err(CalibrationError::InsufficientSamples(estimator.ntest() + 1, data.len()));
        }
        Ok(AsymptoticCMETest {
            estimator,
            data,
            config: TestConfig::default(),
        })
    }

    pub fn set_config(mut self, config: TestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn estimator(&self) -> &UCME<K1, K2> {
        &self.estimator
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsymptoticCMEStatistic {
    /// UCME estimate of the observed data.
    pub estimate: f64,
    /// The statistic `n w̄ᵀ S⁺ w̄`.
    pub statistic: f64,
    /// Number of test locations.
    pub ntest: usize,
    /// Rank of the covariance of the witness values, the degrees of freedom
    /// of the chi-square distribution.
    pub dof: usize,
}

impl TestStatistic for AsymptoticCMEStatistic {
    fn estimate(&self) -> f64 {
        self.estimate
    }
    fn value(&self) -> f64 {
        self.statistic
    }
}

impl<'a, K1: Kernel, K2: LabelKernel> CalibrationTest for AsymptoticCMETest<'a, K1, K2> {
    type Statistic = AsymptoticCMEStatistic;

    fn name(&self) -> &'static str {
        "asymptotic CME test"
    }

    fn nsamples(&self) -> usize {
        self.data.len()
    }

    fn config(&self) -> &TestConfig {
        &self.config
    }

    fn compute(&self) -> Result<AsymptoticCMEStatistic, CalibrationError> {
        let n = self.data.len();
        let m = self.estimator.ntest();
        let values = self.estimator.witness_values(&self.data.view()?)?;
        let estimate = ucme_from_witness_values(&values, n, m);
        let (means, covariance) = mean_and_covariance(&values, n, m);
        let (form, dof) = pseudo_inverse_quadratic_form(&means, covariance)?;
        let statistic = n as f64 * form;
        debug!(
            "CME statistic {} at {} test locations, covariance of rank {}.",
            statistic, m, dof
        );
        Ok(AsymptoticCMEStatistic {
            estimate,
            statistic,
            ntest: m,
            dof,
        })
    }

    fn pvalue(&self, statistic: &AsymptoticCMEStatistic, _rng: &mut StdRng) -> Result<f64, CalibrationError> {
        chisq_ccdf(statistic.statistic, statistic.dof)
    }
}
