// Copyright © ArkBig
//! Hypothesis-test utilities (§4.6): Welch–Satterthwaite degrees of
//! freedom, the two-sided p-value for equal means, and the sample size
//! needed to push that p-value below a target.

use statrs::distribution::{ContinuousCDF, StudentsT};

/// Welch–Satterthwaite degrees of freedom for two independent samples with
/// variances `v1`, `v2` and sizes `n1`, `n2`.
pub fn deg_of_freedom(v1: f64, v2: f64, n1: usize, n2: usize) -> f64 {
    let n1 = n1 as f64;
    let n2 = n2 as f64;
    let t1 = v1 / n1;
    let t2 = v2 / n2;
    (t1 + t2).powi(2) / (t1.powi(2) / (n1 - 1.0) + t2.powi(2) / (n2 - 1.0))
}

/// Two-sided p-value testing `H0: mu1 == mu2` via Welch's t-test, plus the
/// confidence interval of `mu1 - mu2` at `confidence_level`.
pub fn p_eq(
    mu1: f64,
    mu2: f64,
    n1: usize,
    n2: usize,
    v1: f64,
    v2: f64,
    confidence_level: f64,
) -> (f64, f64, f64) {
    let dof = deg_of_freedom(v1, v2, n1, n2);
    let se = (v1 / n1 as f64 + v2 / n2 as f64).sqrt();
    let diff = mu1 - mu2;
    let t_stat = diff / se;
    let dist = StudentsT::new(0.0, 1.0, dof).expect("invalid degrees of freedom");
    let p_value = 2.0 * (1.0 - dist.cdf(t_stat.abs()));

    let alpha = 1.0 - confidence_level;
    let t_crit = dist.inverse_cdf(1.0 - alpha / 2.0);
    let margin = t_crit * se;
    (p_value, diff - margin, diff + margin)
}

/// Smallest `n2*` that would push the observed p-value below
/// `required_p`, holding `mu1`, `n1`, `v1`, `mu2`, `v2` fixed. Solved with a
/// bounded binary search since Welch's d.o.f. term has no closed-form
/// inverse in `n2`.
pub fn opt_sample_size_for_eq_test(
    mu1: f64,
    n1: usize,
    v1: f64,
    mu2: f64,
    v2: f64,
    required_p: f64,
) -> usize {
    let p_at = |n2: usize| p_eq(mu1, mu2, n1, n2.max(2), v1, v2, 0.95).0;

    let mut lo = 2usize;
    let mut hi = 2usize;
    // Grow the upper bound until the p-value requirement is met (or we hit
    // a sanity ceiling — a caller asking for an unreachable p from
    // identical means would otherwise loop forever).
    const CEILING: usize = 1 << 30;
    while p_at(hi) > required_p {
        if hi >= CEILING {
            return CEILING;
        }
        hi *= 2;
    }
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if p_at(mid) <= required_p {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}
