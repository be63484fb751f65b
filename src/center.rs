//! Double centering of distance matrices.

use ndarray::{Array2, ArrayView2, Axis};

use crate::distance::{pairwise_distances, Metric};
use crate::{Error, Result};

/// Double-center a square matrix.
///
/// M'[i,j] = M[i,j] − mean(row i) − mean(column j) + mean(M)
///
/// The output has row and column sums of zero up to rounding. A constant
/// input maps to the zero matrix. The input is not modified.
///
/// # Example
///
/// ```rust
/// use estats::double_center;
/// use ndarray::array;
///
/// let m = array![[0.0, 1.0, 2.0], [1.0, 0.0, 1.0], [2.0, 1.0, 0.0]];
/// let c = double_center(m.view()).unwrap();
///
/// for row in c.rows() {
///     assert!(row.sum().abs() < 1e-12);
/// }
/// ```
pub fn double_center(m: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
    let (rows, cols) = m.dim();
    if rows != cols {
        return Err(Error::NotSquare(rows, cols));
    }
    if rows == 0 {
        return Err(Error::EmptyInput);
    }

    let row_means = m.mean_axis(Axis(1)).ok_or(Error::EmptyInput)?;
    let col_means = m.mean_axis(Axis(0)).ok_or(Error::EmptyInput)?;
    let grand_mean = row_means.mean().ok_or(Error::EmptyInput)?;

    Ok(Array2::from_shape_fn((rows, cols), |(i, j)| {
        m[[i, j]] - row_means[i] - col_means[j] + grand_mean
    }))
}

/// Centered distance kernel R = double_center(D(points)).
pub fn centered_distances(points: ArrayView2<'_, f64>, metric: Metric) -> Result<Array2<f64>> {
    let d = pairwise_distances(points, metric)?;
    double_center(d.view())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn assert_centered(r: &Array2<f64>, tol: f64) {
        for row in r.rows() {
            assert!(row.sum().abs() < tol, "row sum {} not ~0", row.sum());
        }
        for col in r.columns() {
            assert!(col.sum().abs() < tol, "column sum {} not ~0", col.sum());
        }
    }

    #[test]
    fn test_constant_matrix_centers_to_zero() {
        let m = Array2::from_elem((5, 5), 3.25);
        let c = double_center(m.view()).unwrap();
        assert!(c.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_row_and_column_sums_vanish() {
        let mut rng = StdRng::seed_from_u64(3);
        let m = Array2::from_shape_fn((8, 8), |_| rng.gen_range(-10.0..10.0));
        let c = double_center(m.view()).unwrap();
        assert_centered(&c, 1e-9);
    }

    #[test]
    fn test_double_centering_twice_keeps_invariant() {
        let mut rng = StdRng::seed_from_u64(11);
        for n in [2usize, 3, 10, 25] {
            let m = Array2::from_shape_fn((n, n), |_| rng.gen_range(0.0..100.0));
            let once = double_center(m.view()).unwrap();
            let twice = double_center(once.view()).unwrap();
            assert_centered(&twice, 1e-9);
        }
    }

    #[test]
    fn test_input_untouched() {
        let m = array![[0.0, 2.0], [2.0, 0.0]];
        let before = m.clone();
        let c = double_center(m.view()).unwrap();
        assert_eq!(m, before);
        assert_eq!(c, array![[-1.0, 1.0], [1.0, -1.0]]);
    }

    #[test]
    fn test_not_square_rejected() {
        let m = Array2::<f64>::zeros((3, 4));
        assert!(matches!(double_center(m.view()), Err(Error::NotSquare(3, 4))));
    }

    #[test]
    fn test_centered_distances_invariant() {
        let mut rng = StdRng::seed_from_u64(5);
        let x = Array2::from_shape_fn((15, 3), |_| rng.gen::<f64>());
        let r = centered_distances(x.view(), Metric::Euclidean).unwrap();
        assert_centered(&r, 1e-9);
    }
}
