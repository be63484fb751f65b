//! Optional rayon parallelism for independent Monte-Carlo trials.
//!
//! With the `parallel` feature (default) trial loops run on rayon's global
//! pool; without it they run sequentially. Trial results never depend on the
//! schedule because every trial owns its own seeded RNG.

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

/// Iterate a collection in parallel when the `parallel` feature is enabled.
///
/// ```ignore
/// let stats: Vec<f64> = iter_maybe_parallel!(seeds).map(run_trial).collect();
/// ```
macro_rules! iter_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::iter::IntoParallelIterator;

            IntoParallelIterator::into_par_iter($expr)
        }
        #[cfg(not(feature = "parallel"))]
        {
            IntoIterator::into_iter($expr)
        }
    }};
}

pub(crate) use iter_maybe_parallel;

/// Draw one independent seed per trial from the caller's generator.
///
/// Seeds are drawn sequentially, so the trial streams are reproducible for a
/// given caller seed regardless of how the trials are scheduled.
pub(crate) fn trial_seeds<R: Rng + ?Sized>(rng: &mut R, trials: usize) -> Vec<u64> {
    (0..trials).map(|_| rng.gen::<u64>()).collect()
}

/// Generator for a single trial.
pub(crate) fn trial_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
