//! Statistics
//!
//! Summary statistics and tail probabilities of the reference distributions
//! used by the asymptotic calibration tests.
use nalgebra::{DMatrix, DVector, SVD};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

use crate::constants::RANK_TOLERANCE;
use crate::errors::CalibrationError;
use crate::utils::fast_sum;

pub fn mean(values: &[f64]) -> f64 {
    fast_sum(values) / values.len() as f64
}

/// Sample variance with Bessel's correction.
pub fn sample_variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64
}

pub fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// `P(Z > z)` of a standard normal random variable.
pub fn normal_ccdf(z: f64) -> Result<f64, CalibrationError> {
    if z.is_infinite() {
        return Ok(if z > 0.0 { 0.0 } else { 1.0 });
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| {
        CalibrationError::InvalidParameter("normal".to_string(), "a standard normal".to_string(), e.to_string())
    })?;
    Ok((1.0 - normal.cdf(z)).clamp(0.0, 1.0))
}

/// `P(X > x)` of a chi-square random variable with `df` degrees of freedom.
pub fn chisq_ccdf(x: f64, df: usize) -> Result<f64, CalibrationError> {
    let dist = ChiSquared::new(df as f64).map_err(|e| {
        CalibrationError::InvalidParameter(
            "degrees of freedom".to_string(),
            "a positive integer".to_string(),
            e.to_string(),
        )
    })?;
    Ok((1.0 - dist.cdf(x)).clamp(0.0, 1.0))
}

/// Column means and sample covariance of the rows of a row-major `n x m` matrix.
pub fn mean_and_covariance(values: &[f64], n: usize, m: usize) -> (DVector<f64>, DMatrix<f64>) {
    let data = DMatrix::from_row_slice(n, m, values);
    let means = DVector::from_iterator(m, data.column_iter().map(|c| c.sum() / n as f64));
    let mut centered = data;
    for (mut column, mu) in centered.column_iter_mut().zip(means.iter()) {
        column.add_scalar_mut(-mu);
    }
    let covariance = centered.transpose() * &centered / (n - 1) as f64;
    (means, covariance)
}

/// The quadratic form `xᵀ S⁺ x` with the pseudo-inverse of a symmetric positive
/// semi-definite matrix `S`, together with the numerical rank of `S`.
///
/// Singular values below `RANK_TOLERANCE` relative to the largest one are
/// treated as zero, so nearly collinear rows and columns reduce the rank
/// instead of inflating the quadratic form.
pub fn pseudo_inverse_quadratic_form(x: &DVector<f64>, s: DMatrix<f64>) -> Result<(f64, usize), CalibrationError> {
    let dim = s.nrows();
    let svd = SVD::try_new(s, true, true, f64::EPSILON, 1000).ok_or(CalibrationError::SingularCovariance)?;
    let tolerance = svd.singular_values.max() * dim as f64 * RANK_TOLERANCE;
    let rank = svd.rank(tolerance);
    if rank == 0 {
        return Err(CalibrationError::SingularCovariance);
    }
    let pinv = svd
        .pseudo_inverse(tolerance)
        .map_err(|_| CalibrationError::SingularCovariance)?;
    let value = x.dot(&(pinv * x));
    if value.is_finite() {
        Ok((value.max(0.0), rank))
    } else {
        Err(CalibrationError::SingularCovariance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_statistics() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(mean(&v), 2.5);
        assert!((sample_variance(&v) - 5.0 / 3.0).abs() < 1e-12);
        assert!((sample_std(&v) - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_tail_probabilities() {
        assert!((normal_ccdf(0.0).unwrap() - 0.5).abs() < 1e-12);
        assert!((normal_ccdf(1.959963984540054).unwrap() - 0.025).abs() < 1e-9);
        // chi-square with 2 degrees of freedom is exponential with mean 2
        assert!((chisq_ccdf(3.0, 2).unwrap() - (-1.5f64).exp()).abs() < 1e-9);
        assert_eq!(chisq_ccdf(0.0, 3).unwrap(), 1.0);
        assert!(chisq_ccdf(1.0, 0).is_err());
    }

    #[test]
    fn test_mean_and_covariance() {
        // rows (1, 2), (3, 2), (5, 8)
        let values = [1.0, 2.0, 3.0, 2.0, 5.0, 8.0];
        let (means, covariance) = mean_and_covariance(&values, 3, 2);
        assert!((means[0] - 3.0).abs() < 1e-12);
        assert!((means[1] - 4.0).abs() < 1e-12);
        assert!((covariance[(0, 0)] - 4.0).abs() < 1e-12);
        assert!((covariance[(0, 1)] - 6.0).abs() < 1e-12);
        assert!((covariance[(1, 1)] - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_pseudo_inverse_quadratic_form() {
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let s = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        let (value, rank) = pseudo_inverse_quadratic_form(&x, s).unwrap();
        assert!((value - 1.5).abs() < 1e-12);
        assert_eq!(rank, 2);

        // rank one, the pseudo-inverse is S / 4
        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let (value, rank) = pseudo_inverse_quadratic_form(&x, singular).unwrap();
        assert!((value - 2.25).abs() < 1e-12);
        assert_eq!(rank, 1);

        // proportional columns up to rounding
        let c = 1.003;
        let nearly = DMatrix::from_row_slice(2, 2, &[0.2, 0.2 * c, 0.2 * c, 0.2 * c * c]);
        let (_, rank) = pseudo_inverse_quadratic_form(&x, nearly).unwrap();
        assert_eq!(rank, 1);

        assert!(matches!(
            pseudo_inverse_quadratic_form(&x, DMatrix::zeros(2, 2)),
            Err(CalibrationError::SingularCovariance)
        ));
    }
}
