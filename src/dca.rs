//! Distance Covariance Analysis: several projection directions by deflation.
//!
//! The response kernel R_Y is computed once. Each round optimizes a direction
//! against the current predictor matrix, then removes that direction from
//! every row so the next round has to find something new:
//!
//! X ← X − (X·u)·uᵀ
//!
//! After deflation every row of X is orthogonal to u, so all later
//! subgradients are too. Each round also starts from a random vector with the
//! earlier directions projected out, which makes the directions orthogonal
//! in exact arithmetic. In floating point they drift slightly, so callers
//! should expect near-orthogonality rather than exact zeros.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::center::centered_distances;
use crate::distance::{validate_points, Metric};
use crate::pgd::{projected_gradient_descent_from, random_unit_vector, PgdConfig};
use crate::{Error, Result};

// =============================================================================
// Configuration
// =============================================================================

/// Settings for [`optimize_projections`] and [`dca`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DcaConfig {
    /// Optimizer used in every round.
    pub pgd: PgdConfig,
    /// Metric for the response kernel.
    pub metric: Metric,
}

impl DcaConfig {
    pub fn with_pgd(mut self, pgd: PgdConfig) -> Self {
        self.pgd = pgd;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }
}

// =============================================================================
// Projections
// =============================================================================

/// Ordered set of unit projection directions.
///
/// Row r of [`Projections::directions`] is the direction found in round r;
/// earlier rows carry the strongest dependence.
#[derive(Debug, Clone)]
pub struct Projections {
    directions: Array2<f64>,
    objectives: Vec<f64>,
    iterations: Vec<usize>,
    converged: Vec<bool>,
}

impl Projections {
    /// k×p matrix U of directions, one per row.
    pub fn directions(&self) -> ArrayView2<'_, f64> {
        self.directions.view()
    }

    /// Direction found in round `index`.
    pub fn direction(&self, index: usize) -> ArrayView1<'_, f64> {
        self.directions.row(index)
    }

    pub fn len(&self) -> usize {
        self.directions.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.nrows() == 0
    }

    /// Alignment objective reached in each round.
    pub fn objectives(&self) -> &[f64] {
        &self.objectives
    }

    /// Optimizer iterations used in each round.
    pub fn iterations(&self) -> &[usize] {
        &self.iterations
    }

    /// Whether each round met the tolerance within its budget.
    pub fn converged(&self) -> &[bool] {
        &self.converged
    }

    /// Map points into the projected space: X_new·Uᵀ.
    ///
    /// # Example
    ///
    /// ```rust
    /// use estats::{optimize_projections, DcaConfig};
    /// use ndarray::Array2;
    /// use rand::SeedableRng;
    ///
    /// let x = Array2::from_shape_fn((10, 3), |(i, j)| ((i * 7 + j * 3) % 5) as f64);
    /// let y = Array2::from_shape_fn((10, 1), |(i, _)| x[[i, 0]]);
    /// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    ///
    /// let proj = optimize_projections(x.view(), y.view(), 2, &DcaConfig::default(), &mut rng)
    ///     .unwrap();
    /// let z = proj.transform(x.view()).unwrap();
    /// assert_eq!(z.dim(), (10, 2));
    /// ```
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.directions.ncols() {
            return Err(Error::DimensionMismatch(x.ncols(), self.directions.ncols()));
        }
        Ok(x.dot(&self.directions.t()))
    }

    /// Largest |uᵢ·uⱼ| over distinct pairs of directions.
    pub fn max_cross_inner_product(&self) -> f64 {
        let gram = self.directions.dot(&self.directions.t());
        let k = gram.nrows();
        let mut worst = 0.0_f64;
        for i in 0..k {
            for j in (i + 1)..k {
                worst = worst.max(gram[[i, j]].abs());
            }
        }
        worst
    }
}

/// Fitted DCA model together with the embedded training points.
#[derive(Debug, Clone)]
pub struct DcaFit {
    pub projections: Projections,
    /// n×k embedding X·Uᵀ.
    pub embedding: Array2<f64>,
}

// =============================================================================
// Deflation
// =============================================================================

/// Remove the component along unit vector `u` from every row of `x`.
///
/// Returns X − (X·u)·uᵀ as a new matrix.
pub fn deflate(x: ArrayView2<'_, f64>, u: ArrayView1<'_, f64>) -> Result<Array2<f64>> {
    if u.len() != x.ncols() {
        return Err(Error::DimensionMismatch(u.len(), x.ncols()));
    }
    let scores = x.dot(&u);
    let mut out = x.to_owned();
    for (mut row, &score) in out.axis_iter_mut(Axis(0)).zip(scores.iter()) {
        row.scaled_add(-score, &u);
    }
    Ok(out)
}

/// Find `num_dims` mutually orthogonal directions maximizing distance
/// covariance with the response.
///
/// # Arguments
///
/// * `x` - n×p predictors
/// * `y` - n×q response
/// * `num_dims` - Number of directions, 1 ≤ num_dims ≤ p
/// * `config` - Optimizer and metric settings
/// * `rng` - Source of the random starting directions
pub fn optimize_projections<R: Rng + ?Sized>(
    x: ArrayView2<'_, f64>,
    y: ArrayView2<'_, f64>,
    num_dims: usize,
    config: &DcaConfig,
    rng: &mut R,
) -> Result<Projections> {
    validate_points(&x)?;
    if x.nrows() != y.nrows() {
        return Err(Error::DimensionMismatch(x.nrows(), y.nrows()));
    }
    let p = x.ncols();
    if num_dims == 0 || num_dims > p {
        return Err(Error::InvalidParameter(format!(
            "num_dims must be in 1..={}, got {}",
            p, num_dims
        )));
    }

    let r_y = centered_distances(y, config.metric)?;

    let mut directions = Array2::<f64>::zeros((num_dims, p));
    let mut objectives = Vec::with_capacity(num_dims);
    let mut iterations = Vec::with_capacity(num_dims);
    let mut converged = Vec::with_capacity(num_dims);
    let mut working = x.to_owned();

    for round in 0..num_dims {
        let found = directions.slice(s![..round, ..]);
        let u0 = orthogonal_start(found, p, rng)?;
        let outcome = projected_gradient_descent_from(working.view(), r_y.view(), u0, &config.pgd)?;

        log::info!(
            "dca: round {}/{} objective {:.6} ({} iterations{})",
            round + 1,
            num_dims,
            outcome.objective,
            outcome.iterations,
            if outcome.converged { "" } else { ", budget exhausted" }
        );

        working = deflate(working.view(), outcome.direction.view())?;
        directions.row_mut(round).assign(&outcome.direction);
        objectives.push(outcome.objective);
        iterations.push(outcome.iterations);
        converged.push(outcome.converged);
    }

    Ok(Projections {
        directions,
        objectives,
        iterations,
        converged,
    })
}

/// Fit DCA and embed the training predictors.
pub fn dca<R: Rng + ?Sized>(
    x: ArrayView2<'_, f64>,
    y: ArrayView2<'_, f64>,
    num_dims: usize,
    config: &DcaConfig,
    rng: &mut R,
) -> Result<DcaFit> {
    let projections = optimize_projections(x, y, num_dims, config, rng)?;
    let embedding = projections.transform(x)?;
    Ok(DcaFit {
        projections,
        embedding,
    })
}

/// Random unit vector orthogonal to every row of `found`.
fn orthogonal_start<R: Rng + ?Sized>(
    found: ArrayView2<'_, f64>,
    p: usize,
    rng: &mut R,
) -> Result<Array1<f64>> {
    loop {
        let mut v = random_unit_vector(p, rng)?;
        for u in found.rows() {
            let overlap = v.dot(&u);
            v.scaled_add(-overlap, &u);
        }
        let norm = v.dot(&v).sqrt();
        // Rare when the found directions nearly span R^p; redraw.
        if norm > 1e-8 {
            return Ok(v / norm);
        }
    }
}

// =============================================================================
// Class Labels
// =============================================================================

/// One-hot response matrix for class labels.
///
/// Column c is 1 for samples labelled c. Distances between one-hot rows are
/// 0 within a class and √2 across classes, which is the natural response
/// kernel for supervised reduction on categorical targets.
pub fn one_hot(labels: &[usize]) -> Result<Array2<f64>> {
    let classes = labels.iter().max().map(|m| m + 1).ok_or(Error::EmptyInput)?;
    let mut y = Array2::zeros((labels.len(), classes));
    for (i, &label) in labels.iter().enumerate() {
        y[[i, label]] = 1.0;
    }
    Ok(y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::StandardNormal;

    fn gaussian(n: usize, p: usize, rng: &mut StdRng) -> Array2<f64> {
        Array2::from_shape_fn((n, p), |_| rng.sample(StandardNormal))
    }

    /// Shared latent factors: X = Z·A + noise, Y = Z·B + noise.
    fn latent_pair(n: usize, seed: u64) -> (Array2<f64>, Array2<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let z = gaussian(n, 3, &mut rng);
        let a = gaussian(3, 6, &mut rng);
        let b = gaussian(3, 4, &mut rng);
        let x = z.dot(&a) + 0.1 * gaussian(n, 6, &mut rng);
        let y = z.dot(&b) + 0.1 * gaussian(n, 4, &mut rng);
        (x, y)
    }

    #[test]
    fn test_deflate_removes_component() {
        let x = array![[1.0, 2.0, 3.0], [-1.0, 0.5, 4.0], [0.0, 0.0, 1.0]];
        let u = array![0.0, 0.6, 0.8];
        let deflated = deflate(x.view(), u.view()).unwrap();
        for row in deflated.rows() {
            assert!(row.dot(&u).abs() < 1e-12);
        }
        // Orthogonal complement untouched.
        assert_eq!(deflated.column(0), x.column(0));
    }

    #[test]
    fn test_deflate_is_pure() {
        let x = array![[1.0, 1.0], [2.0, -1.0]];
        let before = x.clone();
        let _ = deflate(x.view(), array![1.0, 0.0].view()).unwrap();
        assert_eq!(x, before);
    }

    #[test]
    fn test_directions_are_unit_and_near_orthogonal() {
        let (x, y) = latent_pair(40, 41);
        let mut rng = StdRng::seed_from_u64(1);
        let proj = optimize_projections(x.view(), y.view(), 3, &DcaConfig::default(), &mut rng)
            .unwrap();

        assert_eq!(proj.len(), 3);
        for r in 0..3 {
            let u = proj.direction(r);
            assert!((u.dot(&u) - 1.0).abs() < 1e-9);
        }
        assert!(
            proj.max_cross_inner_product() < 1e-6,
            "max |ui·uj| = {}",
            proj.max_cross_inner_product()
        );
    }

    #[test]
    fn test_two_dims_orthogonal() {
        let (x, y) = latent_pair(50, 42);
        let mut rng = StdRng::seed_from_u64(2);
        let proj = optimize_projections(x.view(), y.view(), 2, &DcaConfig::default(), &mut rng)
            .unwrap();
        let dot = proj.direction(0).dot(&proj.direction(1));
        assert!(dot.abs() < 0.1, "u1·u2 = {}", dot);
    }

    #[test]
    fn test_round_diagnostics_recorded() {
        let (x, y) = latent_pair(40, 43);
        let mut rng = StdRng::seed_from_u64(3);
        let config = DcaConfig::default().with_pgd(PgdConfig::default().with_max_iter(1000));
        let proj = optimize_projections(x.view(), y.view(), 2, &config, &mut rng).unwrap();
        assert!(proj.objectives().iter().all(|v| v.is_finite()));
        assert_eq!(proj.iterations().len(), 2);
        assert_eq!(proj.converged().len(), 2);
    }

    #[test]
    fn test_reproducible_with_seed() {
        let (x, y) = latent_pair(25, 44);
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            optimize_projections(x.view(), y.view(), 2, &DcaConfig::default(), &mut rng)
                .unwrap()
                .directions()
                .to_owned()
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn test_dca_embedding_shape() {
        let (x, y) = latent_pair(30, 45);
        let mut rng = StdRng::seed_from_u64(4);
        let fit = dca(x.view(), y.view(), 2, &DcaConfig::default(), &mut rng).unwrap();
        assert_eq!(fit.embedding.dim(), (30, 2));
        let again = fit.projections.transform(x.view()).unwrap();
        assert_eq!(again, fit.embedding);
    }

    #[test]
    fn test_invalid_num_dims() {
        let (x, y) = latent_pair(10, 46);
        let mut rng = StdRng::seed_from_u64(5);
        for k in [0usize, 7] {
            assert!(matches!(
                optimize_projections(x.view(), y.view(), k, &DcaConfig::default(), &mut rng),
                Err(Error::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_row_count_mismatch() {
        let x = Array2::<f64>::zeros((6, 2));
        let y = Array2::<f64>::zeros((5, 1));
        let mut rng = StdRng::seed_from_u64(6);
        assert!(matches!(
            optimize_projections(x.view(), y.view(), 1, &DcaConfig::default(), &mut rng),
            Err(Error::DimensionMismatch(6, 5))
        ));
    }

    #[test]
    fn test_transform_checks_width() {
        let (x, y) = latent_pair(12, 47);
        let mut rng = StdRng::seed_from_u64(7);
        let proj = optimize_projections(x.view(), y.view(), 1, &DcaConfig::default(), &mut rng)
            .unwrap();
        let wrong = Array2::<f64>::zeros((3, 5));
        assert!(proj.transform(wrong.view()).is_err());
    }

    #[test]
    fn test_one_hot() {
        let y = one_hot(&[0, 2, 1, 2]).unwrap();
        assert_eq!(
            y,
            array![[1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
        );
        assert!(matches!(one_hot(&[]), Err(Error::EmptyInput)));
    }
}
