//! Distance Covariance Analysis on data with shared latent factors.
//!
//! Demonstrates:
//! - Finding orthogonal projections of X that track Y
//! - Permutation testing of the observed distance covariance
//! - Class-label responses via one-hot encoding
//!
//! Run: cargo run --example dca_latent

use estats::{
    centered_distances, dca, distance_correlation, one_hot, optimize_projections,
    permutation_test, DcaConfig, Metric, PermutationConfig,
};
use ndarray::Array2;
use rand::prelude::*;
use rand_distr::StandardNormal;

fn gaussian(n: usize, p: usize, rng: &mut StdRng) -> Array2<f64> {
    Array2::from_shape_fn((n, p), |_| rng.sample(StandardNormal))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Distance Covariance Analysis ===\n");

    let mut rng = StdRng::seed_from_u64(42);

    // X and Y are different linear views of the same 5 latent factors.
    let z = gaussian(75, 5, &mut rng);
    let a = gaussian(5, 10, &mut rng);
    let b = gaussian(5, 8, &mut rng);
    let x = z.dot(&a) + 0.1 * gaussian(75, 10, &mut rng);
    let y = z.dot(&b) + 0.1 * gaussian(75, 8, &mut rng);
    println!("X: {:?}, Y: {:?}\n", x.dim(), y.dim());

    // =========================================================================
    // Demo 1: projections
    // =========================================================================
    println!("--- Optimized Projections ---\n");

    let config = DcaConfig::default();
    let projections = optimize_projections(x.view(), y.view(), 2, &config, &mut rng)?;
    for (r, objective) in projections.objectives().iter().enumerate() {
        println!(
            "  u[{}]: objective {:.4}, {} iterations, converged: {}",
            r,
            objective,
            projections.iterations()[r],
            projections.converged()[r]
        );
    }
    println!(
        "  max |ui·uj| = {:.2e}\n",
        projections.max_cross_inner_product()
    );

    let x_projected = projections.transform(x.view())?;
    let dcor_full = distance_correlation(x.view(), y.view(), Metric::Euclidean)?;
    let dcor_proj = distance_correlation(x_projected.view(), y.view(), Metric::Euclidean)?;
    println!("  dCor(X, Y)      = {:.4}", dcor_full);
    println!("  dCor(X·Uᵀ, Y)   = {:.4}\n", dcor_proj);

    // =========================================================================
    // Demo 2: permutation test
    // =========================================================================
    println!("--- Permutation Test ---\n");

    let r_x = centered_distances(x.view(), Metric::Euclidean)?;
    let test = permutation_test(r_x.view(), y.view(), &PermutationConfig::default(), &mut rng)?;
    let null_max = test
        .null_distribution
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    println!("  Observed distance covariance: {:.4}", test.observed);
    println!("  Largest permuted value:       {:.4}", null_max);
    println!("  p-value (100 permutations):   {:.4}\n", test.p_value);

    // =========================================================================
    // Demo 3: class labels as the response
    // =========================================================================
    println!("--- Class Labels ---\n");

    let labels: Vec<usize> = (0..75).map(|i| i % 3).collect();
    let mut x_labelled = gaussian(75, 6, &mut rng);
    for (i, &label) in labels.iter().enumerate() {
        x_labelled[[i, 2]] += 4.0 * label as f64;
    }
    let y_labels = one_hot(&labels)?;
    let fit = dca(x_labelled.view(), y_labels.view(), 1, &config, &mut rng)?;
    println!("  Direction found: {:.3}", fit.projections.direction(0));
    println!("  (class signal lives on feature 2)");

    Ok(())
}
