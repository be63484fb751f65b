//! Special functions for the energy normality statistics.

use std::f64::consts::PI;

/// Past this argument the Kummer series is replaced by its asymptotic form.
const ASYMPTOTIC_ARG: f64 = 300.0;
const MAX_SERIES_TERMS: usize = 10_000;

/// ln Γ(x) for x ≥ 0.5 (Lanczos, g = 7, n = 9).
pub(crate) fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const P: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_571e-6,
        1.505_632_735_149_311_6e-7,
    ];
    debug_assert!(x >= 0.5);
    let z = x - 1.0;
    let mut a = P[0];
    for (i, coeff) in P.iter().enumerate().skip(1) {
        a += coeff / (z + i as f64);
    }
    let t = z + G + 0.5;
    0.5 * (2.0 * PI).ln() + (z + 0.5) * t.ln() - t + a.ln()
}

/// Γ((d+1)/2) / Γ(d/2), the ratio behind E‖Z − Z'‖ for Z ~ N(0, I_d).
pub(crate) fn half_gamma_ratio(d: usize) -> f64 {
    let d = d as f64;
    (ln_gamma((d + 1.0) / 2.0) - ln_gamma(d / 2.0)).exp()
}

/// ₁F₁(a; b; −x) for x ≥ 0 and b > 0.
///
/// Evaluated through Kummer's transformation e^{−x}·₁F₁(b − a; b; x), whose
/// series has only positive terms when b − a > 0, so there is no
/// cancellation.
pub(crate) fn hyp1f1_neg(a: f64, b: f64, x: f64) -> f64 {
    debug_assert!(x >= 0.0 && b > 0.0 && b - a > 0.0);
    let c = b - a;
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 0..MAX_SERIES_TERMS {
        let k = k as f64;
        term *= (c + k) / (b + k) * x / (k + 1.0);
        sum += term;
        if term < sum * f64::EPSILON {
            break;
        }
    }
    (-x).exp() * sum
}

/// E‖a − Z‖ for Z ~ N(0, I_d), given ‖a‖².
///
/// √2·Γ((d+1)/2)/Γ(d/2)·₁F₁(−½; d/2; −‖a‖²/2), switching to
/// ‖a‖ + (d − 1)/(2‖a‖) for very distant points.
pub(crate) fn expected_normal_distance(sq_norm: f64, d: usize) -> f64 {
    let x = sq_norm / 2.0;
    if x > ASYMPTOTIC_ARG {
        let norm = sq_norm.sqrt();
        return norm + (d as f64 - 1.0) / (2.0 * norm);
    }
    std::f64::consts::SQRT_2 * half_gamma_ratio(d) * hyp1f1_neg(-0.5, d as f64 / 2.0, x)
}

/// Standard normal density.
pub(crate) fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Standard normal CDF.
///
/// erf(t) = 2t/√π·₁F₁(½; 3/2; −t²), with Φ(x) = (1 + erf(x/√2))/2.
pub(crate) fn normal_cdf(x: f64) -> f64 {
    let t = x / std::f64::consts::SQRT_2;
    let t2 = t * t;
    if t2 > ASYMPTOTIC_ARG {
        return if x > 0.0 { 1.0 } else { 0.0 };
    }
    let erf = 2.0 * t / PI.sqrt() * hyp1f1_neg(0.5, 1.5, t2);
    0.5 * (1.0 + erf)
}
