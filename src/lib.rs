//! # estats
//!
//! Energy statistics: distance covariance, energy tests of normality, and
//! Distance Covariance Analysis (DCA).
//!
//! ## Why "energy"?
//!
//! Energy statistics treat samples like charged particles and compare them
//! through expected pairwise distances instead of moments. Distance-based
//! statistics detect any kind of dependence, not only linear correlation,
//! and characterize equality of distributions.
//!
//! ## Intuition
//!
//! Build the n×n matrix of pairwise distances for each variable, remove row
//! and column effects by double centering, and sum the element-wise product.
//! If two variables are independent, their centered distance patterns are
//! unrelated and the sum is near zero. If they share structure, close pairs
//! in one are close pairs in the other and the sum is large.
//!
//! DCA turns this into supervised dimensionality reduction: it searches for
//! unit directions u in predictor space whose projections X·u have maximal
//! distance covariance with the response Y, one direction at a time, removing
//! each direction from X before looking for the next.
//!
//! ## Key Functions
//!
//! | Function | Purpose |
//! |----------|---------|
//! | [`pairwise_distances`] | n×n distance matrix under a [`Metric`] |
//! | [`double_center`] | Row/column/grand-mean centering |
//! | [`distance_covariance`] | Σ R_X ⊙ R_Y / n² |
//! | [`distance_correlation`] | Normalized dependence in [0, 1] |
//! | [`projected_gradient_descent`] | One maximizing direction on the unit sphere |
//! | [`optimize_projections`] | k orthogonal directions by deflation |
//! | [`permutation_test`] | Significance of dCov by shuffling Y |
//! | [`normality_etest`] | Energy test of univariate normality |
//! | [`m_normality_etest`] | Energy test of multivariate normality |
//!
//! ## Quick Start
//!
//! ```rust
//! use estats::{dca, dcov_test, DcaConfig, PermutationConfig};
//! use ndarray::Array2;
//! use rand::SeedableRng;
//!
//! let x = Array2::from_shape_fn((30, 3), |(i, j)| ((i * (j + 2)) % 7) as f64);
//! let y = Array2::from_shape_fn((30, 1), |(i, _)| x[[i, 0]] + x[[i, 1]]);
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//!
//! let fit = dca(x.view(), y.view(), 2, &DcaConfig::default(), &mut rng).unwrap();
//! assert_eq!(fit.embedding.dim(), (30, 2));
//!
//! let test = dcov_test(fit.embedding.view(), y.view(), &PermutationConfig::default(), &mut rng)
//!     .unwrap();
//! assert!(test.p_value > 0.0 && test.p_value <= 1.0);
//! ```
//!
//! ## Randomness
//!
//! Every randomized function takes `&mut R where R: Rng`. There is no hidden
//! global generator, so seeded runs are reproducible, including parallel
//! permutation trials (see the `parallel` feature).
//!
//! ## What Can Go Wrong
//!
//! 1. **Quadratic cost**: every statistic materializes n×n matrices and each
//!    optimizer iteration is O(n²·p). Intended for hundreds, not millions, of
//!    samples.
//! 2. **Local optima**: the DCA objective is non-convex and non-smooth.
//!    Different seeds can give different directions.
//! 3. **Near-orthogonality**: deflated directions drift from exact
//!    orthogonality by rounding error.
//! 4. **Singular covariance**: the multivariate normality statistic whitens the
//!    sample and fails with [`Error::NonFinite`] on rank-deficient data.
//! 5. **Few permutations**: with B permutations the smallest attainable
//!    p-value is 1/(B + 1).
//!
//! ## References
//!
//! - Székely, Rizzo & Bakirov (2007). "Measuring and testing dependence by
//!   correlation of distances" (Annals of Statistics)
//! - Székely & Rizzo (2005). "A new test for multivariate normality" (JMVA)
//! - Cowley, Semedo, Zandvakili, Smith, Kohn & Yu (2017). "Distance Covariance
//!   Analysis" (AISTATS)

use thiserror::Error;

mod parallel;

pub mod center;
pub mod dca;
pub mod dcov;
pub mod distance;
pub mod normality;
pub mod permutation;
pub mod pgd;

mod special;

pub use center::{centered_distances, double_center};
pub use dca::{dca, deflate, one_hot, optimize_projections, DcaConfig, DcaFit, Projections};
pub use dcov::{
    distance_correlation, distance_correlation_1d, distance_covariance, distance_variance,
};
pub use distance::{condensed_distances, pairwise_distances, points_from_rows, square_form, Metric};
pub use normality::{
    m_normality_etest, m_normality_statistic, normality_etest, normality_statistic,
    NormalityTest,
};
pub use permutation::{
    dcov_test, permutation_test, smoothed_p_value, PermutationConfig, PermutationTest,
};
pub use pgd::{
    projected_gradient_descent, projected_gradient_descent_from, projection_objective,
    random_unit_vector, PgdConfig, PgdOutcome,
};

/// Errors for energy-statistics operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("empty input")]
    EmptyInput,

    #[error("too few samples: {found} (need at least {required})")]
    TooFewSamples { found: usize, required: usize },

    #[error("dimension mismatch: {0} vs {1}")]
    DimensionMismatch(usize, usize),

    #[error("row {row} has {found} values, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("matrix is not square: {0}x{1}")]
    NotSquare(usize, usize),

    #[error("non-finite result in {0}")]
    NonFinite(&'static str),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("eigendecomposition failed: {0}")]
    Eigen(String),
}

pub type Result<T> = std::result::Result<T, Error>;
