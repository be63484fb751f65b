//! Energy tests of normality.
//!
//! The energy statistic compares a standardized sample y₁…yₙ against
//! Z ~ N(0, I_d):
//!
//! E = n·(2·mean_i E‖yᵢ − Z‖ − E‖Z − Z'‖ − mean_ij ‖yᵢ − yⱼ‖)
//!
//! It is zero in the population exactly when the sample is normal, and large
//! values reject normality. Both tests calibrate the statistic by Monte-Carlo
//! simulation of normal samples with the same shape, since standardization
//! with estimated parameters changes the null distribution.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use rand_distr::StandardNormal;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;

use crate::distance::{condensed_distances, Metric};
use crate::parallel::{iter_maybe_parallel, trial_rng, trial_seeds};
use crate::permutation::smoothed_p_value;
use crate::special::{expected_normal_distance, half_gamma_ratio, normal_cdf, normal_pdf};
use crate::{Error, Result};

/// Eigenvalues below this fraction of the largest make the covariance singular.
const RELATIVE_EIGEN_FLOOR: f64 = 1e-12;

// =============================================================================
// Statistics
// =============================================================================

/// Statistic with its Monte-Carlo p-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalityTest {
    pub statistic: f64,
    /// (#{simulated ≥ observed} + 1) / (num_simulations + 1).
    pub p_value: f64,
}

/// Univariate energy normality statistic.
///
/// With y the sorted sample standardized by its mean and (n − 1)-denominator
/// standard deviation, and k = 1 − n, 3 − n, …, n − 1:
///
/// E = 2·(Σ(2yΦ(y) + 2φ(y)) − n/√π − mean(k·y))
///
/// # Example
///
/// ```rust
/// use estats::normality_statistic;
///
/// let skewed: Vec<f64> = (1..=40).map(|i| (i as f64 / 10.0).exp()).collect();
/// let stat = normality_statistic(&skewed).unwrap();
/// assert!(stat > 0.5);
/// ```
pub fn normality_statistic(x: &[f64]) -> Result<f64> {
    let n = x.len();
    if n < 2 {
        return Err(Error::TooFewSamples {
            found: n,
            required: 2,
        });
    }

    let nf = n as f64;
    let mean = x.iter().sum::<f64>() / nf;
    let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (nf - 1.0);
    let sd = var.sqrt();
    if !(sd.is_finite() && sd > 0.0) {
        return Err(Error::NonFinite("standardized sample (zero variance)"));
    }

    let mut y: Vec<f64> = x.iter().map(|v| (v - mean) / sd).collect();
    y.sort_by(|a, b| a.total_cmp(b));

    let expected: f64 = y
        .iter()
        .map(|&v| 2.0 * v * normal_cdf(v) + 2.0 * normal_pdf(v))
        .sum();
    let rank_term: f64 = y
        .iter()
        .enumerate()
        .map(|(i, &v)| (2.0 * i as f64 + 1.0 - nf) * v)
        .sum::<f64>()
        / nf;

    Ok(2.0 * (expected - nf / std::f64::consts::PI.sqrt() - rank_term))
}

/// Multivariate energy normality statistic.
///
/// The sample is whitened (centered, then multiplied by the inverse
/// symmetric square root of its covariance) before evaluating
///
/// E = n·(2·mean1 − mean2 − mean3)
///
/// with c = Γ((d+1)/2)/Γ(d/2), mean2 = 2c,
/// mean1 = √2·c·mean_i ₁F₁(−½; d/2; −‖yᵢ‖²/2) and
/// mean3 = Σᵢⱼ ‖yᵢ − yⱼ‖ / n².
///
/// # Errors
///
/// `TooFewSamples` for n < 2, `NonFinite` when the covariance is singular
/// or whitening yields non-finite values.
pub fn m_normality_statistic(x: ArrayView2<'_, f64>) -> Result<f64> {
    let (n, d) = x.dim();
    if d == 0 {
        return Err(Error::EmptyInput);
    }
    if n < 2 {
        return Err(Error::TooFewSamples {
            found: n,
            required: 2,
        });
    }

    let y = whiten(x)?;
    let nf = n as f64;

    let mean1 = y
        .rows()
        .into_iter()
        .map(|row| expected_normal_distance(row.dot(&row), d))
        .sum::<f64>()
        / nf;
    let mean2 = 2.0 * half_gamma_ratio(d);
    let mean3 = 2.0 * condensed_distances(y.view(), Metric::Euclidean)?.sum() / (nf * nf);

    Ok(nf * (2.0 * mean1 - mean2 - mean3))
}

// =============================================================================
// Monte-Carlo Tests
// =============================================================================

/// Monte-Carlo energy test of univariate normality.
///
/// # Arguments
///
/// * `x` - Sample
/// * `num_simulations` - Normal samples of size n drawn for the null
/// * `rng` - Seeds the per-simulation generators
pub fn normality_etest<R: Rng + ?Sized>(
    x: &[f64],
    num_simulations: usize,
    rng: &mut R,
) -> Result<NormalityTest> {
    check_simulations(num_simulations)?;
    let statistic = normality_statistic(x)?;
    let n = x.len();

    let seeds = trial_seeds(rng, num_simulations);
    let null = iter_maybe_parallel!(seeds)
        .map(|seed| {
            let mut trial = trial_rng(seed);
            let sample: Vec<f64> = (0..n).map(|_| trial.sample::<f64, _>(StandardNormal)).collect();
            normality_statistic(&sample)
        })
        .collect::<Result<Vec<f64>>>()?;

    let p_value = smoothed_p_value(statistic, &null);
    log::info!(
        "normality e-test: statistic {:.6}, p = {:.4} ({} simulations)",
        statistic,
        p_value,
        num_simulations
    );
    Ok(NormalityTest { statistic, p_value })
}

/// Monte-Carlo energy test of multivariate normality.
///
/// Simulated samples have the same n×d shape as `x`.
pub fn m_normality_etest<R: Rng + ?Sized>(
    x: ArrayView2<'_, f64>,
    num_simulations: usize,
    rng: &mut R,
) -> Result<NormalityTest> {
    check_simulations(num_simulations)?;
    let statistic = m_normality_statistic(x)?;
    let shape = x.dim();

    let seeds = trial_seeds(rng, num_simulations);
    let null = iter_maybe_parallel!(seeds)
        .map(|seed| {
            let mut trial = trial_rng(seed);
            let sample = Array2::from_shape_fn(shape, |_| trial.sample::<f64, _>(StandardNormal));
            m_normality_statistic(sample.view())
        })
        .collect::<Result<Vec<f64>>>()?;

    let p_value = smoothed_p_value(statistic, &null);
    log::info!(
        "multivariate normality e-test: statistic {:.6}, p = {:.4} ({} simulations)",
        statistic,
        p_value,
        num_simulations
    );
    Ok(NormalityTest { statistic, p_value })
}

fn check_simulations(num_simulations: usize) -> Result<()> {
    if num_simulations == 0 {
        return Err(Error::InvalidParameter(
            "num_simulations must be at least 1".into(),
        ));
    }
    Ok(())
}

// =============================================================================
// Whitening
// =============================================================================

/// Center and decorrelate: (X − mean)·S^{-1/2}.
fn whiten(x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
    let (n, d) = x.dim();
    let mean = x.mean_axis(Axis(0)).ok_or(Error::EmptyInput)?;
    let centered = &x - &mean;
    let cov = centered.t().dot(&centered) / (n as f64 - 1.0);

    let (values, vectors) = symmetric_eigen(&cov)?;
    let largest = values.iter().cloned().fold(0.0_f64, f64::max);
    if !(largest.is_finite() && largest > 0.0) {
        return Err(Error::NonFinite("whitening (zero covariance)"));
    }

    let mut inv_sqrt = Array1::<f64>::zeros(d);
    for (k, &value) in values.iter().enumerate() {
        if value <= largest * RELATIVE_EIGEN_FLOOR {
            return Err(Error::NonFinite("whitening (singular covariance)"));
        }
        inv_sqrt[k] = 1.0 / value.sqrt();
    }

    // S^{-1/2} = V·diag(λ^{-1/2})·Vᵀ
    let scaled = &vectors * &inv_sqrt;
    let root = scaled.dot(&vectors.t());
    let whitened = centered.dot(&root);

    if whitened.iter().any(|v| !v.is_finite()) {
        return Err(Error::NonFinite("whitened sample"));
    }
    Ok(whitened)
}

/// Eigenvalues and column eigenvectors of a symmetric matrix.
fn symmetric_eigen(m: &Array2<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
    let d = m.nrows();
    let mat = faer::Mat::<f64>::from_fn(d, d, |i, j| m[[i, j]]);
    let eig = mat
        .as_ref()
        .self_adjoint_eigen(faer::Side::Lower)
        .map_err(|err| Error::Eigen(format!("{err:?}")))?;

    let diag = eig.S();
    let basis = eig.U();
    let values = Array1::from_shape_fn(d, |k| diag[k]);
    let vectors = Array2::from_shape_fn((d, d), |(i, j)| basis[(i, j)]);
    Ok((values, vectors))
}
