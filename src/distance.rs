//! Pairwise distance matrices.
//!
//! Every energy statistic in this crate starts from the n×n matrix of
//! pairwise distances between the rows of a point set. The matrix is
//! symmetric with an exact zero diagonal, so only the upper triangle is
//! evaluated and mirrored.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Distance between two points.
///
/// Euclidean is the metric the energy statistics are defined for. L1 is also
/// of negative type, so distance covariance stays a valid dependence measure
/// under it. Chebyshev is provided for exploratory use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Metric {
    /// ‖x − y‖₂
    #[default]
    Euclidean,
    /// ‖x − y‖₁
    Cityblock,
    /// ‖x − y‖∞
    Chebyshev,
}

impl Metric {
    /// Distance between two equal-length points.
    pub fn distance(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        let diffs = x.iter().zip(y.iter()).map(|(xi, yi)| xi - yi);
        match self {
            Metric::Euclidean => diffs.map(|d| d * d).sum::<f64>().sqrt(),
            Metric::Cityblock => diffs.map(f64::abs).sum(),
            Metric::Chebyshev => diffs.map(f64::abs).fold(0.0, f64::max),
        }
    }
}

/// Build an n×p point set from row vectors, rejecting ragged input.
///
/// # Example
///
/// ```rust
/// use estats::points_from_rows;
///
/// let x = points_from_rows(&[vec![0.0, 1.0], vec![2.0, 3.0]]).unwrap();
/// assert_eq!(x.dim(), (2, 2));
///
/// assert!(points_from_rows(&[vec![0.0, 1.0], vec![2.0]]).is_err());
/// ```
pub fn points_from_rows(rows: &[Vec<f64>]) -> Result<Array2<f64>> {
    let first = rows.first().ok_or(Error::EmptyInput)?;
    let p = first.len();
    if p == 0 {
        return Err(Error::EmptyInput);
    }

    let mut flat = Vec::with_capacity(rows.len() * p);
    for (row, values) in rows.iter().enumerate() {
        if values.len() != p {
            return Err(Error::RaggedRows {
                row,
                expected: p,
                found: values.len(),
            });
        }
        flat.extend_from_slice(values);
    }

    Array2::from_shape_vec((rows.len(), p), flat)
        .map_err(|e| Error::InvalidParameter(e.to_string()))
}

/// Check that a point set has at least two samples and one feature.
pub(crate) fn validate_points(points: &ArrayView2<'_, f64>) -> Result<()> {
    let (n, p) = points.dim();
    if n == 0 || p == 0 {
        return Err(Error::EmptyInput);
    }
    if n < 2 {
        return Err(Error::TooFewSamples {
            found: n,
            required: 2,
        });
    }
    Ok(())
}

/// Compute the pairwise distance matrix D[i,j] = d(X[i], X[j]).
///
/// # Arguments
///
/// * `points` - n×p point set, one sample per row
/// * `metric` - Distance between rows
///
/// # Returns
///
/// Symmetric n×n matrix with zero diagonal
///
/// # Example
///
/// ```rust
/// use estats::{pairwise_distances, Metric};
/// use ndarray::array;
///
/// let x = array![[0.0, 0.0], [3.0, 4.0], [0.0, 1.0]];
/// let d = pairwise_distances(x.view(), Metric::Euclidean).unwrap();
///
/// assert_eq!(d.shape(), &[3, 3]);
/// assert!((d[[0, 1]] - 5.0).abs() < 1e-12);
/// assert_eq!(d[[1, 0]], d[[0, 1]]);
/// ```
pub fn pairwise_distances(points: ArrayView2<'_, f64>, metric: Metric) -> Result<Array2<f64>> {
    validate_points(&points)?;
    let n = points.nrows();
    let mut d = Array2::zeros((n, n));

    for i in 0..n {
        for j in (i + 1)..n {
            let dij = metric.distance(points.row(i), points.row(j));
            d[[i, j]] = dij;
            d[[j, i]] = dij;
        }
    }

    Ok(d)
}

/// Compute the condensed upper triangle of the distance matrix.
///
/// Entries are ordered (0,1), (0,2), …, (0,n−1), (1,2), …, giving
/// n(n−1)/2 values. Expand with [`square_form`].
pub fn condensed_distances(points: ArrayView2<'_, f64>, metric: Metric) -> Result<Array1<f64>> {
    validate_points(&points)?;
    let n = points.nrows();
    let mut condensed = Vec::with_capacity(n * (n - 1) / 2);

    for i in 0..n {
        for j in (i + 1)..n {
            condensed.push(metric.distance(points.row(i), points.row(j)));
        }
    }

    Ok(Array1::from(condensed))
}

/// Expand a condensed distance vector into the full symmetric matrix.
pub fn square_form(condensed: ArrayView1<'_, f64>, n: usize) -> Result<Array2<f64>> {
    if n < 2 {
        return Err(Error::TooFewSamples {
            found: n,
            required: 2,
        });
    }
    let expected = n * (n - 1) / 2;
    if condensed.len() != expected {
        return Err(Error::DimensionMismatch(condensed.len(), expected));
    }

    let mut d = Array2::zeros((n, n));
    let mut k = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            d[[i, j]] = condensed[k];
            d[[j, i]] = condensed[k];
            k += 1;
        }
    }

    Ok(d)
}
