//! Projected gradient descent on the unit sphere.
//!
//! Finds a unit direction u in predictor space whose 1-D projection X·u has
//! maximal distance covariance with a fixed response kernel R_Y:
//!
//! f(u) = Σᵢⱼ R_Y[i,j]·|u·(X[i] − X[j])| / n²
//!
//! Because R_Y is double-centered, centering the projected distances
//! |u·(X[i] − X[j])| would not change the sum, so f(u) is exactly the
//! distance covariance between X·u and the response.
//!
//! f is piecewise linear in u, so the optimizer follows the subgradient
//!
//! ∂f(u) = Σᵢⱼ R_Y[i,j]·sign(u·(X[i] − X[j]))·(X[i] − X[j]) / n²
//!
//! and descends on −f: `grad = −∂f`, `u ← (u − η·grad)/‖u − η·grad‖`.
//! Every iterate stays on the unit sphere.
//!
//! Each iteration costs O(n²·p).

use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::Rng;
use rand_distr::StandardNormal;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// =============================================================================
// Configuration
// =============================================================================

/// Optimizer settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PgdConfig {
    /// Step size η.
    pub learning_rate: f64,
    /// Iteration budget.
    pub max_iter: usize,
    /// Stop when ‖u_new − u‖ falls below this.
    pub tol: f64,
}

impl Default for PgdConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            max_iter: 500,
            tol: 1e-6,
        }
    }
}

impl PgdConfig {
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "tol must be positive, got {}",
                self.tol
            )));
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidParameter("max_iter must be at least 1".into()));
        }
        Ok(())
    }
}

/// Result of one optimizer run.
#[derive(Debug, Clone)]
pub struct PgdOutcome {
    /// Unit-norm direction.
    pub direction: Array1<f64>,
    /// Alignment objective f(u) at `direction`.
    pub objective: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether the step size dropped below `tol` before the budget ran out.
    pub converged: bool,
}

// =============================================================================
// Objective
// =============================================================================

/// Draw a direction uniformly on the unit sphere in R^p.
///
/// Fails with [`Error::EmptyInput`] when `p` is zero.
pub fn random_unit_vector<R: Rng + ?Sized>(p: usize, rng: &mut R) -> Result<Array1<f64>> {
    if p == 0 {
        return Err(Error::EmptyInput);
    }
    loop {
        let v: Array1<f64> = Array1::from_shape_fn(p, |_| rng.sample(StandardNormal));
        let norm = v.dot(&v).sqrt();
        if norm > f64::EPSILON {
            return Ok(v / norm);
        }
    }
}

/// Alignment objective f(u) = Σᵢⱼ R_Y[i,j]·|u·(X[i] − X[j])| / n².
pub fn projection_objective(
    x: ArrayView2<'_, f64>,
    r_y: ArrayView2<'_, f64>,
    u: ArrayView1<'_, f64>,
) -> Result<f64> {
    check_shapes(&x, &r_y)?;
    if u.len() != x.ncols() {
        return Err(Error::DimensionMismatch(u.len(), x.ncols()));
    }
    let n = x.nrows();
    let scores = x.dot(&u);

    let mut total = 0.0;
    for i in 0..n {
        for j in 0..n {
            total += r_y[[i, j]] * (scores[i] - scores[j]).abs();
        }
    }
    Ok(total / (n * n) as f64)
}

// =============================================================================
// Optimizer
// =============================================================================

/// Run projected gradient descent from a random start.
///
/// # Arguments
///
/// * `x` - n×p predictor matrix
/// * `r_y` - n×n double-centered response kernel, held fixed
/// * `config` - Step size, iteration budget and tolerance
/// * `rng` - Source of the random starting direction
///
/// # Returns
///
/// The final unit direction with diagnostics. Running out of iterations is
/// not an error; the last iterate is returned with `converged = false`.
///
/// # Example
///
/// ```rust
/// use estats::{centered_distances, projected_gradient_descent, Metric, PgdConfig};
/// use ndarray::array;
/// use rand::SeedableRng;
///
/// let x = array![[0.0, 1.0], [1.0, 0.5], [2.0, 0.0], [3.0, 0.7]];
/// let y = array![[0.0], [1.0], [2.0], [3.0]];
/// let r_y = centered_distances(y.view(), Metric::Euclidean).unwrap();
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(0);
/// let out = projected_gradient_descent(x.view(), r_y.view(), &PgdConfig::default(), &mut rng)
///     .unwrap();
/// assert!((out.direction.dot(&out.direction) - 1.0).abs() < 1e-9);
/// ```
pub fn projected_gradient_descent<R: Rng + ?Sized>(
    x: ArrayView2<'_, f64>,
    r_y: ArrayView2<'_, f64>,
    config: &PgdConfig,
    rng: &mut R,
) -> Result<PgdOutcome> {
    check_shapes(&x, &r_y)?;
    let u0 = random_unit_vector(x.ncols(), rng)?;
    projected_gradient_descent_from(x, r_y, u0, config)
}

/// Run projected gradient descent from a given starting direction.
///
/// `u0` is normalized before the first step; it must be non-zero.
pub fn projected_gradient_descent_from(
    x: ArrayView2<'_, f64>,
    r_y: ArrayView2<'_, f64>,
    u0: Array1<f64>,
    config: &PgdConfig,
) -> Result<PgdOutcome> {
    config.validate()?;
    check_shapes(&x, &r_y)?;
    let p = x.ncols();
    if u0.len() != p {
        return Err(Error::DimensionMismatch(u0.len(), p));
    }
    let norm0 = u0.dot(&u0).sqrt();
    if !(norm0.is_finite() && norm0 > 0.0) {
        return Err(Error::InvalidParameter(
            "starting direction must be finite and non-zero".into(),
        ));
    }

    let mut u = u0 / norm0;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;
        let grad = subgradient(&x, &r_y, &u);

        let mut u_new = &u - &(config.learning_rate * &grad);
        let norm = u_new.dot(&u_new).sqrt();
        if !(norm.is_finite() && norm > f64::EPSILON) {
            log::warn!(
                "pgd: step {} left the sphere (norm {}), keeping previous direction",
                iterations,
                norm
            );
            break;
        }
        u_new /= norm;

        let delta = &u_new - &u;
        let step = delta.dot(&delta).sqrt();
        log::trace!("pgd: iteration {} step {:.3e}", iterations, step);
        if step < config.tol {
            converged = true;
            break;
        }
        u = u_new;
    }

    let objective = projection_objective(x, r_y, u.view())?;
    log::debug!(
        "pgd: {} after {} iterations, objective {:.6}",
        if converged { "converged" } else { "stopped" },
        iterations,
        objective
    );

    Ok(PgdOutcome {
        direction: u,
        objective,
        iterations,
        converged,
    })
}

/// Descent direction −∂f(u).
fn subgradient(x: &ArrayView2<'_, f64>, r_y: &ArrayView2<'_, f64>, u: &Array1<f64>) -> Array1<f64> {
    let (n, p) = x.dim();
    let scores = x.dot(u);
    let mut grad = Array1::<f64>::zeros(p);

    for i in 0..n {
        for j in 0..n {
            let weight = r_y[[i, j]] * sign(scores[i] - scores[j]);
            if weight == 0.0 {
                continue;
            }
            // u·(X[i] − X[j]) = scores[i] − scores[j]
            grad.scaled_add(weight, &x.row(i));
            grad.scaled_add(-weight, &x.row(j));
        }
    }

    grad /= -((n * n) as f64);
    grad
}

/// sign with sign(0) = 0.
fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn check_shapes(x: &ArrayView2<'_, f64>, r_y: &ArrayView2<'_, f64>) -> Result<()> {
    let (n, p) = x.dim();
    if n == 0 || p == 0 {
        return Err(Error::EmptyInput);
    }
    if n < 2 {
        return Err(Error::TooFewSamples {
            found: n,
            required: 2,
        });
    }
    if r_y.dim() != (n, n) {
        return Err(Error::DimensionMismatch(n, r_y.nrows()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::center::centered_distances;
    use crate::distance::Metric;
    use ndarray::{array, Array2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn gaussian(n: usize, p: usize, rng: &mut StdRng) -> Array2<f64> {
        Array2::from_shape_fn((n, p), |_| rng.sample(StandardNormal))
    }

    /// Response depends only on the first predictor column.
    fn single_signal(n: usize, p: usize, seed: u64) -> (Array2<f64>, Array2<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let x = gaussian(n, p, &mut rng);
        let y = Array2::from_shape_fn((n, 1), |(i, _)| 3.0 * x[[i, 0]]);
        (x, y)
    }

    #[test]
    fn test_sign_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-0.0), 0.0);
        assert_eq!(sign(2.5), 1.0);
        assert_eq!(sign(-1e-300), -1.0);
    }

    #[test]
    fn test_random_unit_vector() {
        let mut rng = StdRng::seed_from_u64(30);
        for p in [1, 3, 12] {
            let u = random_unit_vector(p, &mut rng).unwrap();
            assert_eq!(u.len(), p);
            assert!((u.dot(&u) - 1.0).abs() < 1e-12);
        }
        assert!(matches!(
            random_unit_vector(0, &mut rng),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn test_output_unit_norm_any_seed() {
        let (x, y) = single_signal(20, 4, 31);
        let r_y = centered_distances(y.view(), Metric::Euclidean).unwrap();
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = projected_gradient_descent(
                x.view(),
                r_y.view(),
                &PgdConfig::default().with_max_iter(50),
                &mut rng,
            )
            .unwrap();
            let norm = out.direction.dot(&out.direction).sqrt();
            assert!((norm - 1.0).abs() < 1e-9, "seed {}: norm {}", seed, norm);
        }
    }

    #[test]
    fn test_objective_does_not_decrease_from_start() {
        let (x, y) = single_signal(30, 3, 32);
        let r_y = centered_distances(y.view(), Metric::Euclidean).unwrap();
        let u0 = array![0.2, 1.0, 0.3];
        let start = projection_objective(x.view(), r_y.view(), u0.view()).unwrap();

        let config = PgdConfig::default().with_learning_rate(0.05);
        let out = projected_gradient_descent_from(x.view(), r_y.view(), u0, &config).unwrap();
        assert!(
            out.objective >= start - 1e-9,
            "objective fell from {} to {}",
            start,
            out.objective
        );
    }

    #[test]
    fn test_finds_signal_direction() {
        let (x, y) = single_signal(40, 3, 33);
        let r_y = centered_distances(y.view(), Metric::Euclidean).unwrap();
        let config = PgdConfig::default().with_learning_rate(0.05).with_max_iter(3000);
        let out = projected_gradient_descent_from(x.view(), r_y.view(), array![0.6, 0.6, 0.53], &config)
            .unwrap();
        assert!(
            out.direction[0].abs() > 0.9,
            "direction {:?} should align with the first axis",
            out.direction
        );
    }

    #[test]
    fn test_two_samples() {
        let x = array![[1.0, 0.0, 2.0], [0.0, 1.0, -1.0]];
        let y = array![[0.0], [5.0]];
        let r_y = centered_distances(y.view(), Metric::Euclidean).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let out = projected_gradient_descent(x.view(), r_y.view(), &PgdConfig::default(), &mut rng)
            .unwrap();
        let norm = out.direction.dot(&out.direction).sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_gradient_converges_immediately() {
        // Identical rows: every pairwise difference is zero.
        let x = Array2::from_elem((5, 3), 1.5);
        let y = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let r_y = centered_distances(y.view(), Metric::Euclidean).unwrap();
        let out = projected_gradient_descent_from(
            x.view(),
            r_y.view(),
            array![0.0, 3.0, 4.0],
            &PgdConfig::default(),
        )
        .unwrap();
        assert!(out.converged);
        assert_eq!(out.iterations, 1);
        assert_eq!(out.direction, array![0.0, 0.6, 0.8]);
    }

    #[test]
    fn test_budget_exhaustion_is_not_an_error() {
        let (x, y) = single_signal(15, 4, 34);
        let r_y = centered_distances(y.view(), Metric::Euclidean).unwrap();
        let config = PgdConfig::default().with_max_iter(3).with_tol(1e-300);
        let mut rng = StdRng::seed_from_u64(5);
        let out = projected_gradient_descent(x.view(), r_y.view(), &config, &mut rng).unwrap();
        assert!(!out.converged);
        assert_eq!(out.iterations, 3);
    }

    #[test]
    fn test_shape_and_config_errors() {
        let x = Array2::<f64>::zeros((4, 2));
        let r_bad = Array2::<f64>::zeros((3, 3));
        let mut rng = StdRng::seed_from_u64(6);
        assert!(matches!(
            projected_gradient_descent(x.view(), r_bad.view(), &PgdConfig::default(), &mut rng),
            Err(Error::DimensionMismatch(4, 3))
        ));

        let r = Array2::<f64>::zeros((4, 4));
        let bad = PgdConfig::default().with_learning_rate(0.0);
        assert!(matches!(
            projected_gradient_descent(x.view(), r.view(), &bad, &mut rng),
            Err(Error::InvalidParameter(_))
        ));
    }
}
