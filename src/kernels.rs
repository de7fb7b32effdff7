//! Kernels
//!
//! Positive definite kernels on the prediction and label spaces and the
//! combinators used to build the tensor product kernels of the SKCE and UCME
//! estimators.
use crate::errors::CalibrationError;
use crate::utils::{sq_euclidean, validate_positive_float_parameter};

/// A symmetric positive definite kernel on real vectors.
pub trait Kernel: Send + Sync {
    /// Evaluate the kernel at the pair of inputs.
    fn eval(&self, x: &[f64], y: &[f64]) -> f64;
    /// An upper bound of the kernel, `sup k(x, y)`.
    fn bound(&self) -> f64;
}

/// A kernel on the class labels `0..nclasses`.
///
/// Besides plain evaluation, label kernels compute the inner products of the
/// calibration residuals `k(y, .) - E_{Z ~ p} k(Z, .)` in their RKHS. The
/// default implementations expand these sums over all classes.
pub trait LabelKernel: Kernel {
    /// Evaluate the kernel at two class indices.
    #[inline]
    fn eval_labels(&self, y1: usize, y2: usize) -> f64 {
        self.eval(&[y1 as f64], &[y2 as f64])
    }

    /// `<k(y1, .) - E_{Z ~ p1} k(Z, .), k(y2, .) - E_{Z ~ p2} k(Z, .)>`
    fn residual_inner(&self, y1: usize, p1: &[f64], y2: usize, p2: &[f64]) -> f64 {
        let nclasses = p1.len();
        let mut value = self.eval_labels(y1, y2);
        for c in 0..nclasses {
            value -= p1[c] * self.eval_labels(c, y2) + p2[c] * self.eval_labels(y1, c);
            for c_ in 0..nclasses {
                value += p1[c] * p2[c_] * self.eval_labels(c, c_);
            }
        }
        value
    }

    /// `k(y, y_test) - E_{Z ~ p} k(Z, y_test)`
    fn residual_at(&self, y: usize, p: &[f64], y_test: usize) -> f64 {
        let expectation: f64 = p
            .iter()
            .enumerate()
            .map(|(c, p_c)| p_c * self.eval_labels(c, y_test))
            .sum();
        self.eval_labels(y, y_test) - expectation
    }
}

/// A transformation of the inputs of a kernel.
pub trait Transform: Send + Sync {
    fn apply(&self, x: &[f64]) -> Vec<f64>;
}

/// Multiplies inputs by a positive scalar.
#[derive(Debug, Clone, Copy)]
pub struct ScaleTransform {
    scale: f64,
}

impl ScaleTransform {
    pub fn new(scale: f64) -> Result<Self, CalibrationError> {
        validate_positive_float_parameter(scale, "scale")?;
        Ok(ScaleTransform { scale })
    }
}

impl Transform for ScaleTransform {
    fn apply(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|v| v * self.scale).collect()
    }
}

/// `k(x, y) = exp(-||x - y||² / 2)`
#[derive(Debug, Clone, Copy, Default)]
pub struct SqExponentialKernel;

impl Kernel for SqExponentialKernel {
    #[inline]
    fn eval(&self, x: &[f64], y: &[f64]) -> f64 {
        (-sq_euclidean(x, y) / 2.0).exp()
    }
    fn bound(&self) -> f64 {
        1.0
    }
}

impl LabelKernel for SqExponentialKernel {}

/// `k(x, y) = exp(-||x - y||)`
#[derive(Debug, Clone, Copy, Default)]
pub struct ExponentialKernel;

impl Kernel for ExponentialKernel {
    #[inline]
    fn eval(&self, x: &[f64], y: &[f64]) -> f64 {
        (-sq_euclidean(x, y).sqrt()).exp()
    }
    fn bound(&self) -> f64 {
        1.0
    }
}

impl LabelKernel for ExponentialKernel {}

/// `k(x, y) = 1` if `x == y` and `0` otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhiteKernel;

impl Kernel for WhiteKernel {
    #[inline]
    fn eval(&self, x: &[f64], y: &[f64]) -> f64 {
        if x == y {
            1.0
        } else {
            0.0
        }
    }
    fn bound(&self) -> f64 {
        1.0
    }
}

impl LabelKernel for WhiteKernel {
    #[inline]
    fn eval_labels(&self, y1: usize, y2: usize) -> f64 {
        if y1 == y2 {
            1.0
        } else {
            0.0
        }
    }

    // Sum over classes of (1[y1 = c] - p1[c]) * (1[y2 = c] - p2[c]).
    #[inline]
    fn residual_inner(&self, y1: usize, p1: &[f64], y2: usize, p2: &[f64]) -> f64 {
        let dot: f64 = p1.iter().zip(p2).map(|(a, b)| a * b).sum();
        let same = if y1 == y2 { 1.0 } else { 0.0 };
        same - p1[y2] - p2[y1] + dot
    }

    #[inline]
    fn residual_at(&self, y: usize, p: &[f64], y_test: usize) -> f64 {
        let same = if y == y_test { 1.0 } else { 0.0 };
        same - p[y_test]
    }
}

/// Kernel evaluated on transformed inputs, `k(t(x), t(y))`.
#[derive(Debug, Clone)]
pub struct TransformedKernel<K, T> {
    kernel: K,
    transform: T,
}

impl<K: Kernel, T: Transform> Kernel for TransformedKernel<K, T> {
    fn eval(&self, x: &[f64], y: &[f64]) -> f64 {
        self.kernel.eval(&self.transform.apply(x), &self.transform.apply(y))
    }
    fn bound(&self) -> f64 {
        self.kernel.bound()
    }
}

/// Kernel with scaled output, `s * k(x, y)`.
#[derive(Debug, Clone)]
pub struct ScaledKernel<K> {
    kernel: K,
    scale: f64,
}

impl<K: Kernel> Kernel for ScaledKernel<K> {
    #[inline]
    fn eval(&self, x: &[f64], y: &[f64]) -> f64 {
        self.scale * self.kernel.eval(x, y)
    }
    fn bound(&self) -> f64 {
        self.scale * self.kernel.bound()
    }
}

impl<K: LabelKernel> LabelKernel for ScaledKernel<K> {
    fn eval_labels(&self, y1: usize, y2: usize) -> f64 {
        self.scale * self.kernel.eval_labels(y1, y2)
    }
    fn residual_inner(&self, y1: usize, p1: &[f64], y2: usize, p2: &[f64]) -> f64 {
        self.scale * self.kernel.residual_inner(y1, p1, y2, p2)
    }
    fn residual_at(&self, y: usize, p: &[f64], y_test: usize) -> f64 {
        self.scale * self.kernel.residual_at(y, p, y_test)
    }
}

/// Tensor product kernel on pairs,
/// `k((x1, x2), (y1, y2)) = k1(x1, y1) * k2(x2, y2)`.
///
/// The calibration error estimators use the first factor on predictions and
/// the second factor on labels.
#[derive(Debug, Clone)]
pub struct TensorProductKernel<K1, K2> {
    first: K1,
    second: K2,
}

impl<K1: Kernel, K2: Kernel> TensorProductKernel<K1, K2> {
    pub fn first(&self) -> &K1 {
        &self.first
    }

    pub fn second(&self) -> &K2 {
        &self.second
    }

    /// Evaluate the kernel at two pairs of inputs.
    pub fn eval_pair(&self, x: (&[f64], &[f64]), y: (&[f64], &[f64])) -> f64 {
        self.first.eval(x.0, y.0) * self.second.eval(x.1, y.1)
    }

    pub fn bound(&self) -> f64 {
        self.first.bound() * self.second.bound()
    }
}

/// `k(t(x), t(y))`
pub fn compose<K: Kernel, T: Transform>(kernel: K, transform: T) -> TransformedKernel<K, T> {
    TransformedKernel { kernel, transform }
}

/// `k(s * x, s * y)`
pub fn scale<K: Kernel>(kernel: K, s: f64) -> Result<TransformedKernel<K, ScaleTransform>, CalibrationError> {
    Ok(compose(kernel, ScaleTransform::new(s)?))
}

/// `s * k(x, y)`
pub fn scaled<K: Kernel>(kernel: K, s: f64) -> Result<ScaledKernel<K>, CalibrationError> {
    validate_positive_float_parameter(s, "scale")?;
    Ok(ScaledKernel { kernel, scale: s })
}

/// `k1(x1, y1) * k2(x2, y2)`
pub fn tensor<K1: Kernel, K2: Kernel>(first: K1, second: K2) -> TensorProductKernel<K1, K2> {
    TensorProductKernel { first, second }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_kernels() {
        let x = [1.0, 0.0];
        let y = [0.0, 1.0];
        assert!((SqExponentialKernel.eval(&x, &y) - (-1.0f64).exp()).abs() < 1e-12);
        assert!((ExponentialKernel.eval(&x, &y) - (-(2.0f64.sqrt())).exp()).abs() < 1e-12);
        assert_eq!(SqExponentialKernel.eval(&x, &x), 1.0);
        assert_eq!(WhiteKernel.eval(&x, &y), 0.0);
        assert_eq!(WhiteKernel.eval(&x, &x), 1.0);
        assert_eq!(WhiteKernel.eval_labels(1, 1), 1.0);
    }

    #[test]
    fn test_compose_scale() {
        let k = compose(SqExponentialKernel, ScaleTransform::new(2.0f64.sqrt()).unwrap());
        assert!((k.eval(&[1.0], &[0.0]) - (-1.0f64).exp()).abs() < 1e-12);
        let k = scale(ExponentialKernel, 0.1).unwrap();
        assert!((k.eval(&[1.0, 0.0], &[0.0, 0.0]) - (-0.1f64).exp()).abs() < 1e-12);
        assert_eq!(k.bound(), 1.0);
        assert!(scale(ExponentialKernel, 0.0).is_err());
        assert!(ScaleTransform::new(-1.0).is_err());
    }

    #[test]
    fn test_scaled_kernel() {
        let k = scaled(SqExponentialKernel, 3.0).unwrap();
        assert_eq!(k.eval(&[0.5], &[0.5]), 3.0);
        assert_eq!(k.bound(), 3.0);
        let w = scaled(WhiteKernel, 2.0).unwrap();
        let p = [0.25, 0.75];
        assert!((w.residual_inner(0, &p, 0, &p) - 2.0 * WhiteKernel.residual_inner(0, &p, 0, &p)).abs() < 1e-12);
    }

    #[test]
    fn test_tensor_commutative_associative() {
        let k1 = scale(ExponentialKernel, 3.0).unwrap();
        let k2 = WhiteKernel;
        let k3 = SqExponentialKernel;
        let (a, b, c) = ([0.2, 0.8], [1.0], [0.3]);
        let (d, e, f) = ([0.6, 0.4], [1.0], [0.9]);

        let k12 = tensor(k1.clone(), k2);
        let k21 = tensor(k2, k1.clone());
        assert!((k12.eval_pair((&a, &b), (&d, &e)) - k21.eval_pair((&b, &a), (&e, &d))).abs() < 1e-12);

        let left = k12.eval_pair((&a, &b), (&d, &e)) * k3.eval(&c, &f);
        let k23 = tensor(k2, k3);
        let right = k1.eval(&a, &d) * k23.eval_pair((&b, &c), (&e, &f));
        assert!((left - right).abs() < 1e-12);
        assert_eq!(k12.bound(), 1.0);
    }

    #[test]
    fn test_white_residuals_match_expansion() {
        struct GenericWhite;
        impl Kernel for GenericWhite {
            fn eval(&self, x: &[f64], y: &[f64]) -> f64 {
                WhiteKernel.eval(x, y)
            }
            fn bound(&self) -> f64 {
                1.0
            }
        }
        impl LabelKernel for GenericWhite {}

        let p1 = [0.2, 0.3, 0.5];
        let p2 = [0.6, 0.1, 0.3];
        for y1 in 0..3 {
            for y2 in 0..3 {
                let fast = WhiteKernel.residual_inner(y1, &p1, y2, &p2);
                let slow = GenericWhite.residual_inner(y1, &p1, y2, &p2);
                assert!((fast - slow).abs() < 1e-12);
            }
            let fast = WhiteKernel.residual_at(y1, &p1, 2);
            let slow = GenericWhite.residual_at(y1, &p1, 2);
            assert!((fast - slow).abs() < 1e-12);
        }
    }
}
