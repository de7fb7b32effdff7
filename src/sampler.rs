//! Sampler
//!
//! Resampling of data sets for the bootstrap based calibration tests. All
//! samplers draw from a caller provided `StdRng`, so results are reproducible
//! for a given seed.
use rand::rngs::StdRng;
use rand::Rng;

use crate::data::Predictions;

/// Draw one seed per iteration, so that parallel iterations consume the
/// random numbers of the caller in a fixed order.
pub fn draw_seeds(rng: &mut StdRng, iterations: usize) -> Vec<u64> {
    (0..iterations).map(|_| rng.gen()).collect()
}

/// Draw `n` indices from `0..n` uniformly with replacement.
pub fn bootstrap_index(rng: &mut StdRng, n: usize) -> Vec<usize> {
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

/// Draw a zero based class from a categorical distribution.
pub fn sample_label(rng: &mut StdRng, distribution: &[f64]) -> usize {
    let u: f64 = rng.gen();
    let mut cumulative = 0.0;
    let mut last = 0;
    for (c, p) in distribution.iter().enumerate() {
        if *p <= 0.0 {
            continue;
        }
        cumulative += p;
        if u < cumulative {
            return c;
        }
        last = c;
    }
    // rounding left the cumulative sum slightly below one
    last
}

/// Consistency resampling: predictions are drawn with replacement and labels
/// are drawn from the resampled predictions, which yields data sets that are
/// calibrated by construction.
pub struct ConsistencySampler<'a> {
    predictions: &'a Predictions,
}

impl<'a> ConsistencySampler<'a> {
    pub fn new(predictions: &'a Predictions) -> Self {
        ConsistencySampler { predictions }
    }

    /// Sample a data set, returning the indices of the chosen predictions and
    /// the zero based labels drawn for them.
    pub fn sample(&self, rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
        let index = bootstrap_index(rng, self.predictions.len());
        let labels = index
            .iter()
            .map(|i| sample_label(rng, self.predictions.distribution(*i)))
            .collect();
        (index, labels)
    }
}
