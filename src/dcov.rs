//! Distance covariance and distance correlation.
//!
//! Both statistics combine two double-centered distance kernels R_X and R_Y
//! built on the same n samples:
//!
//! dCov(X, Y) = Σᵢⱼ R_X[i,j]·R_Y[i,j] / n²
//!
//! The normalization is n², the squared V-statistic. The optimizer objective,
//! the permutation null and the correlation all use this same scale.

use ndarray::{Array2, ArrayView2};

use crate::center::centered_distances;
use crate::distance::Metric;
use crate::{Error, Result};

/// Distance covariance between two centered kernels of the same size.
///
/// # Example
///
/// ```rust
/// use estats::{centered_distances, distance_covariance, Metric};
/// use ndarray::array;
///
/// let x = array![[0.0], [1.0], [2.0], [3.0]];
/// let r = centered_distances(x.view(), Metric::Euclidean).unwrap();
///
/// assert!(distance_covariance(r.view(), r.view()).unwrap() > 0.0);
/// ```
pub fn distance_covariance(r_x: ArrayView2<'_, f64>, r_y: ArrayView2<'_, f64>) -> Result<f64> {
    let (n, m) = r_x.dim();
    if n != m {
        return Err(Error::NotSquare(n, m));
    }
    if r_y.dim() != (n, n) {
        return Err(Error::DimensionMismatch(n, r_y.nrows()));
    }
    if n == 0 {
        return Err(Error::EmptyInput);
    }

    let total: f64 = r_x.iter().zip(r_y.iter()).map(|(a, b)| a * b).sum();
    Ok(total / (n * n) as f64)
}

/// Distance variance dCov(X, X).
pub fn distance_variance(r: ArrayView2<'_, f64>) -> Result<f64> {
    distance_covariance(r, r)
}

/// Distance correlation between two point sets with the same sample count.
///
/// dCor = dCov(X,Y) / sqrt(dCov(X,X)·dCov(Y,Y)), using the same n²
/// normalization as [`distance_covariance`]. Returns 0 when either sample
/// has zero distance variance, i.e. all of its points coincide. The result
/// does not depend on the units of either sample.
///
/// # Arguments
///
/// * `x` - n×p point set
/// * `y` - n×q point set
/// * `metric` - Distance used for both kernels
pub fn distance_correlation(
    x: ArrayView2<'_, f64>,
    y: ArrayView2<'_, f64>,
    metric: Metric,
) -> Result<f64> {
    if x.nrows() != y.nrows() {
        return Err(Error::DimensionMismatch(x.nrows(), y.nrows()));
    }
    let r_x = centered_distances(x, metric)?;
    let r_y = centered_distances(y, metric)?;
    correlation_from_kernels(&r_x, &r_y)
}

/// Distance correlation of two equal-length samples of scalars.
///
/// # Example
///
/// ```rust
/// use estats::distance_correlation_1d;
///
/// let x = [1.0, 2.0, 3.0, 4.0, 5.0];
/// let c = [2.0, 2.0, 2.0, 2.0, 2.0];
///
/// assert!((distance_correlation_1d(&x, &x).unwrap() - 1.0).abs() < 1e-12);
/// assert_eq!(distance_correlation_1d(&x, &c).unwrap(), 0.0);
/// ```
pub fn distance_correlation_1d(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(Error::DimensionMismatch(x.len(), y.len()));
    }
    let x = ArrayView2::from_shape((x.len(), 1), x)
        .map_err(|e| Error::InvalidParameter(e.to_string()))?;
    let y = ArrayView2::from_shape((y.len(), 1), y)
        .map_err(|e| Error::InvalidParameter(e.to_string()))?;
    distance_correlation(x, y, Metric::Euclidean)
}

fn correlation_from_kernels(r_x: &Array2<f64>, r_y: &Array2<f64>) -> Result<f64> {
    let var_x = distance_variance(r_x.view())?;
    let var_y = distance_variance(r_y.view())?;
    // Coincident points give an exactly zero kernel. Taking the roots
    // separately keeps the product clear of underflow at small scales.
    if var_x <= 0.0 || var_y <= 0.0 {
        return Ok(0.0);
    }
    let cov = distance_covariance(r_x.view(), r_y.view())?;
    Ok(cov / (var_x.sqrt() * var_y.sqrt()))
}
