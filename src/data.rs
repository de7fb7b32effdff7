//! Data
//!
//! Containers for predicted categorical distributions and observed class labels.
use crate::constants::SIMPLEX_TOLERANCE;
use crate::errors::CalibrationError;
use std::fmt;

/// Contiguous dense matrix view.
///
/// By default, it follows column-major order (Fortran-style), row-major data
/// can be wrapped with [`Matrix::new_row_major`].
#[derive(Debug, Clone, Copy)]
pub struct Matrix<'a> {
    /// The raw data stored in a single slice.
    pub data: &'a [f64],
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
    stride1: usize,
    stride2: usize,
}

impl<'a> Matrix<'a> {
    // Defaults to column major
    /// Create a new Matrix from column-major data.
    pub fn new(data: &'a [f64], rows: usize, cols: usize) -> Self {
        Matrix {
            data,
            rows,
            cols,
            stride1: rows,
            stride2: 1,
        }
    }

    /// Create a new Matrix from row-major data.
    pub fn new_row_major(data: &'a [f64], rows: usize, cols: usize) -> Self {
        Matrix {
            data,
            rows,
            cols,
            stride1: 1,
            stride2: cols,
        }
    }

    /// Get a single item of the matrix.
    ///
    /// * `i` - The ith row of the data to get.
    /// * `j` - the jth column of the data to get.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[self.item_index(i, j)]
    }

    fn item_index(&self, i: usize, j: usize) -> usize {
        let mut idx = self.stride2 * i;
        idx += j * self.stride1;
        idx
    }

    /// Get a row of the data as a vector.
    pub fn get_row(&self, row: usize) -> Vec<f64> {
        (0..self.cols).map(|j| self.get(row, j)).collect()
    }

    /// Get a column of the data as a vector.
    pub fn get_col(&self, col: usize) -> Vec<f64> {
        (0..self.rows).map(|i| self.get(i, col)).collect()
    }

    fn check_shape(&self) -> Result<(), CalibrationError> {
        if self.rows * self.cols != self.data.len() {
            return Err(CalibrationError::DimensionMismatch(self.rows * self.cols, self.data.len()));
        }
        Ok(())
    }
}

/// Samples stored as the rows of a matrix.
#[derive(Debug, Clone, Copy)]
pub struct RowVecs<'a>(pub Matrix<'a>);

/// Samples stored as the columns of a matrix.
#[derive(Debug, Clone, Copy)]
pub struct ColVecs<'a>(pub Matrix<'a>);

/// Validated predictions of a probabilistic classifier.
///
/// Every prediction is a categorical distribution over `nclasses` classes, stored
/// row-major. Predictions created from scalar probabilities of the second class
/// are stored as `(1 - q, q)`, but kernels see the scalar `q` only.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    data: Vec<f64>,
    n: usize,
    nclasses: usize,
    binary: bool,
}

impl Predictions {
    fn from_flat(data: Vec<f64>, n: usize, nclasses: usize, binary: bool) -> Result<Self, CalibrationError> {
        if nclasses < 2 {
            return Err(CalibrationError::InvalidParameter(
                "nclasses".to_string(),
                "at least 2 classes".to_string(),
                nclasses.to_string(),
            ));
        }
        for (i, row) in data.chunks_exact(nclasses).enumerate() {
            validate_distribution(i, row)?;
        }
        Ok(Predictions {
            data,
            n,
            nclasses,
            binary,
        })
    }

    /// Create predictions from a list of distributions.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, CalibrationError> {
        let nclasses = rows.first().map_or(0, |r| r.len());
        let mut data = Vec::with_capacity(rows.len() * nclasses);
        for row in rows {
            if row.len() != nclasses {
                return Err(CalibrationError::DimensionMismatch(nclasses, row.len()));
            }
            data.extend_from_slice(row);
        }
        Self::from_flat(data, rows.len(), nclasses, false)
    }

    /// Create binary predictions from the probabilities of the second class
    /// (the class of `true` labels).
    pub fn from_probabilities(probabilities: &[f64]) -> Result<Self, CalibrationError> {
        for (i, q) in probabilities.iter().enumerate() {
            if !q.is_finite() || *q < 0.0 || *q > 1.0 {
                return Err(CalibrationError::InvalidPrediction(
                    i,
                    format!("probability {} outside of [0, 1]", q),
                ));
            }
        }
        let data = probabilities.iter().flat_map(|q| [1.0 - q, *q]).collect();
        Self::from_flat(data, probabilities.len(), 2, true)
    }

    /// Number of predictions.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Number of classes of the predicted distributions.
    pub fn nclasses(&self) -> usize {
        self.nclasses
    }

    /// Whether the predictions were given as scalar probabilities.
    pub fn is_binary(&self) -> bool {
        self.binary
    }

    /// The ith predicted distribution.
    #[inline]
    pub fn distribution(&self, i: usize) -> &[f64] {
        &self.data[i * self.nclasses..(i + 1) * self.nclasses]
    }

    /// The input of kernels on the prediction space for the ith prediction.
    #[inline]
    pub fn point(&self, i: usize) -> &[f64] {
        if self.binary {
            &self.data[2 * i + 1..2 * i + 2]
        } else {
            self.distribution(i)
        }
    }

    /// Dimension of the points returned by [`Predictions::point`].
    pub fn point_dim(&self) -> usize {
        if self.binary {
            1
        } else {
            self.nclasses
        }
    }

    /// Predictions at the given indices, in order.
    pub fn select(&self, index: &[usize]) -> Predictions {
        let mut data = Vec::with_capacity(index.len() * self.nclasses);
        for i in index {
            data.extend_from_slice(self.distribution(*i));
        }
        Predictions {
            data,
            n: index.len(),
            nclasses: self.nclasses,
            binary: self.binary,
        }
    }
}

fn validate_distribution(i: usize, row: &[f64]) -> Result<(), CalibrationError> {
    let mut sum = 0.0;
    for v in row {
        if !v.is_finite() {
            return Err(CalibrationError::InvalidPrediction(i, format!("non-finite entry {}", v)));
        }
        if *v < 0.0 {
            return Err(CalibrationError::InvalidPrediction(i, format!("negative entry {}", v)));
        }
        sum += v;
    }
    if (sum - 1.0).abs() > SIMPLEX_TOLERANCE {
        return Err(CalibrationError::InvalidPrediction(i, format!("entries sum to {}", sum)));
    }
    Ok(())
}

impl<'a> TryFrom<RowVecs<'a>> for Predictions {
    type Error = CalibrationError;

    fn try_from(value: RowVecs<'a>) -> Result<Self, Self::Error> {
        let m = value.0;
        m.check_shape()?;
        let data = (0..m.rows).flat_map(|i| m.get_row(i)).collect();
        Self::from_flat(data, m.rows, m.cols, false)
    }
}

impl<'a> TryFrom<ColVecs<'a>> for Predictions {
    type Error = CalibrationError;

    fn try_from(value: ColVecs<'a>) -> Result<Self, Self::Error> {
        let m = value.0;
        m.check_shape()?;
        let data = (0..m.cols).flat_map(|j| m.get_col(j)).collect();
        Self::from_flat(data, m.cols, m.rows, false)
    }
}

impl fmt::Display for Predictions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} predictions over {} classes", self.n, self.nclasses)
    }
}

/// Observed class labels, `1..=nclasses`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets {
    labels: Vec<usize>,
}

impl Targets {
    /// Create targets from 1-based class labels.
    pub fn from_classes(classes: &[usize]) -> Self {
        Targets {
            labels: classes.to_vec(),
        }
    }

    /// Create binary targets, `false` is class 1 and `true` is class 2.
    pub fn from_bools(values: &[bool]) -> Self {
        Targets {
            labels: values.iter().map(|v| if *v { 2 } else { 1 }).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The 1-based class labels.
    pub fn classes(&self) -> &[usize] {
        &self.labels
    }

    /// Zero based class indices.
    pub fn indices(&self) -> Vec<usize> {
        self.labels.iter().map(|c| c - 1).collect()
    }

    fn validate(&self, nclasses: usize) -> Result<(), CalibrationError> {
        match self.labels.iter().find(|c| **c == 0 || **c > nclasses) {
            Some(c) => Err(CalibrationError::InvalidTarget(*c, nclasses)),
            None => Ok(()),
        }
    }
}

impl From<Vec<usize>> for Targets {
    fn from(labels: Vec<usize>) -> Self {
        Targets { labels }
    }
}

impl From<&[bool]> for Targets {
    fn from(values: &[bool]) -> Self {
        Targets::from_bools(values)
    }
}

/// Check that predictions and targets describe the same non-empty set of samples.
pub fn check_samples(predictions: &Predictions, targets: &Targets) -> Result<(), CalibrationError> {
    if predictions.len() != targets.len() {
        return Err(CalibrationError::DimensionMismatch(predictions.len(), targets.len()));
    }
    if predictions.is_empty() {
        return Err(CalibrationError::EmptyInput);
    }
    targets.validate(predictions.nclasses())
}
