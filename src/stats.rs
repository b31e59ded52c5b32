// Copyright © ArkBig
//! Subsession statistics: mean, auto-covariance, variance, autocorrelation,
//! optimal subsession size, and confidence-interval width, all parameterized
//! by a [`MeanMethod`] and, for CI width, a [`CiType`].
//!
//! "Subsession" here means: partition `x` into `h = n / q` contiguous blocks
//! of `q` samples, replace each block with its mean, and treat the resulting
//! `h` block-means as the i.i.d. population. Blocking trades sample count
//! for independence: pick `q` large enough that adjacent block-means are no
//! longer materially autocorrelated, then the ordinary Student-t interval on
//! the block-means is valid even though the raw samples were not i.i.d.

use crate::mean::MeanMethod;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Which confidence-interval construction applies to a PI's readings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CiType {
    #[default]
    SampleMean,
    BinomialProportion,
}

/// Aggregates `x` with `mean_method`. Thin wrapper kept for call-site
/// symmetry with the rest of this module's `(x, ...)` signatures.
pub fn mean(x: &[f64], mean_method: MeanMethod) -> f64 {
    mean_method.mean(x)
}

fn block_means(x: &[f64], n: usize, q: usize, mean_method: MeanMethod) -> Vec<f64> {
    let h = n / q;
    (0..h)
        .map(|i| mean_method.mean(&x[i * q..i * q + q]))
        .collect()
}

/// (1/(h−1))·Σ_{i=1..h−1}(u_i − sample_mean)·(u_{i+1} − sample_mean).
///
/// Aborts (panics) if `h < 2`: with a single block there is no lag-1 pair to
/// correlate, which is a caller programming error, not a data condition.
pub fn auto_cov(x: &[f64], n: usize, q: usize, sample_mean: f64, mean_method: MeanMethod) -> f64 {
    let u = block_means(x, n, q, mean_method);
    let h = u.len();
    assert!(h >= 2, "auto_cov requires at least 2 subsessions (h={h})");
    let sum: f64 = (0..h - 1)
        .map(|i| (u[i] - sample_mean) * (u[i + 1] - sample_mean))
        .sum();
    sum / (h - 1) as f64
}

/// (1/(h−1))·Σ_{i=1..h}(u_i − sample_mean)^2 — the sample variance of the
/// `h` block means.
pub fn var(x: &[f64], n: usize, q: usize, sample_mean: f64, mean_method: MeanMethod) -> f64 {
    let u = block_means(x, n, q, mean_method);
    let h = u.len();
    assert!(h >= 2, "var requires at least 2 subsessions (h={h})");
    let sum: f64 = u.iter().map(|ui| (ui - sample_mean).powi(2)).sum();
    sum / (h - 1) as f64
}

/// auto_cov / var. Returns exactly `1.0` (conservative "high correlation")
/// when `var` is zero or the ratio is NaN.
pub fn autocorrelation_coefficient(
    x: &[f64],
    n: usize,
    q: usize,
    sample_mean: f64,
    mean_method: MeanMethod,
) -> f64 {
    let v = var(x, n, q, sample_mean, mean_method);
    if v == 0.0 {
        return 1.0;
    }
    let c = auto_cov(x, n, q, sample_mean, mean_method);
    let rho = c / v;
    if rho.is_nan() {
        1.0
    } else {
        rho
    }
}

/// Smallest `q` in `1..=n/3` with `|ρ(q)| ≤ rho_max`, or `None` if no such
/// `q` exists.
pub fn optimal_subsession_size(
    x: &[f64],
    n: usize,
    mean_method: MeanMethod,
    rho_max: f64,
) -> Option<usize> {
    let sample_mean = mean_method.mean(x);
    let max_q = n / 3;
    for q in 1..=max_q {
        if n / q < 2 {
            continue;
        }
        let rho = autocorrelation_coefficient(x, n, q, sample_mean, mean_method);
        if rho.abs() <= rho_max {
            return Some(q);
        }
    }
    None
}

/// Upper-tail Student-t quantile: the value `T` such that
/// `P(X > T) = upper_tail_prob` for `X ~ t(dof)`.
fn t_upper_quantile(dof: f64, upper_tail_prob: f64) -> f64 {
    let dist = StudentsT::new(0.0, 1.0, dof).expect("invalid degrees of freedom");
    dist.inverse_cdf(1.0 - upper_tail_prob)
}

/// Confidence-interval full width (not half-width) at `confidence_level`,
/// e.g. `0.95`.
///
/// - `SampleMean`: `2·T·√(var/h)` with `T` at d.o.f. `h−1`.
/// - `BinomialProportion`: Wald form `2·T·√(mean·(1−mean)/h)`; `q` is forced
///   to 1 and `mean` must lie in `[0, 1]`.
pub fn confidence_interval_width(
    x: &[f64],
    n: usize,
    q: usize,
    confidence_level: f64,
    mean_method: MeanMethod,
    ci_type: CiType,
) -> crate::error::Result<f64> {
    let alpha = 1.0 - confidence_level;
    match ci_type {
        CiType::SampleMean => {
            let h = n / q;
            if h < 2 {
                return Err(crate::error::PilotError::NotEnoughDataForCi);
            }
            let sample_mean = mean_method.mean(x);
            let v = var(x, n, q, sample_mean, mean_method);
            let t = t_upper_quantile((h - 1) as f64, alpha / 2.0);
            Ok(2.0 * t * (v / h as f64).sqrt())
        }
        CiType::BinomialProportion => {
            let sample_mean = mean_method.mean(x);
            if !(0.0..=1.0).contains(&sample_mean) {
                return Err(crate::error::PilotError::WrongParam(format!(
                    "binomial-proportion mean {sample_mean} is not in [0, 1]"
                )));
            }
            let h = n;
            if h < 2 {
                return Err(crate::error::PilotError::NotEnoughDataForCi);
            }
            let t = t_upper_quantile((h - 1) as f64, alpha / 2.0);
            Ok(2.0 * t * (sample_mean * (1.0 - sample_mean) / h as f64).sqrt())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    const FERRARI: [f64; 48] = [
        1.21, 1.67, 1.71, 1.53, 2.03, 2.15, 1.88, 1.47, 1.47, 1.73, 1.46, 1.95, 1.91, 1.69, 1.39,
        1.93, 1.93, 1.58, 1.25, 1.78, 2.06, 2.04, 1.49, 1.55, 2.22, 2.06, 1.71, 1.73, 1.68, 1.57,
        1.66, 1.95, 1.96, 1.82, 2.01, 2.04, 1.68, 2.09, 1.54, 1.77, 1.74, 1.95, 1.43, 2.10, 1.86,
        2.06, 1.90, 2.16,
    ];

    #[test]
    fn ferrari_mean() {
        let m = mean(&FERRARI, MeanMethod::Arithmetic);
        assert_relative_eq!(m, 1.7564583333333333, epsilon = 1e-12);
    }

    #[test]
    fn ferrari_var_and_autocov_q1() {
        let m = mean(&FERRARI, MeanMethod::Arithmetic);
        let v = var(&FERRARI, 48, 1, m, MeanMethod::Arithmetic);
        let c = auto_cov(&FERRARI, 48, 1, m, MeanMethod::Arithmetic);
        assert_relative_eq!(v, 0.07347442, epsilon = 1e-6);
        assert_relative_eq!(c, 0.04677057, epsilon = 1e-6);
    }

    #[test]
    fn ferrari_rho_q1_and_q2() {
        let m = mean(&FERRARI, MeanMethod::Arithmetic);
        let rho1 = autocorrelation_coefficient(&FERRARI, 48, 1, m, MeanMethod::Arithmetic);
        let rho2 = autocorrelation_coefficient(&FERRARI, 48, 2, m, MeanMethod::Arithmetic);
        assert_relative_eq!(rho1, 0.63655574, epsilon = 1e-6);
        assert_relative_eq!(rho2, 0.55892352, epsilon = 1e-6);
    }

    #[test]
    fn ferrari_q4() {
        let m = mean(&FERRARI, MeanMethod::Arithmetic);
        let v = var(&FERRARI, 48, 4, m, MeanMethod::Arithmetic);
        let rho = autocorrelation_coefficient(&FERRARI, 48, 4, m, MeanMethod::Arithmetic);
        assert_relative_eq!(v, 0.05264711, epsilon = 1e-5);
        assert_relative_eq!(rho, 0.08230987, epsilon = 1e-5);
    }

    #[test]
    fn ferrari_ci95_q4() {
        let ci = confidence_interval_width(
            &FERRARI,
            48,
            4,
            0.95,
            MeanMethod::Arithmetic,
            CiType::SampleMean,
        )
        .unwrap();
        assert_relative_eq!(ci, 0.29157062, epsilon = 1e-5);
    }

    #[test]
    fn ferrari_optimal_subsession_size() {
        let q = optimal_subsession_size(&FERRARI, 48, MeanMethod::Arithmetic, 0.1);
        assert_eq!(q, Some(4));
    }

    #[test]
    fn binomial_proportion_ci() {
        let x: [f64; 20] = [
            1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0,
            1.0, 1.0, 1.0,
        ];
        let ci = confidence_interval_width(
            &x,
            20,
            1,
            0.95,
            MeanMethod::Arithmetic,
            CiType::BinomialProportion,
        )
        .unwrap();
        assert_relative_eq!(ci, 0.46566845, epsilon = 1e-5);
    }

    #[test]
    fn degenerate_autocorrelation_is_one() {
        let x = vec![3.0; 10];
        let rho = autocorrelation_coefficient(&x, 10, 2, 3.0, MeanMethod::Arithmetic);
        assert_eq!(rho, 1.0);
    }

    #[test]
    fn subsession_identity_q1() {
        // auto_cov(x,n,1,.) and var(x,n,1,.) reduce to classic lag-1
        // autocovariance / Bessel-corrected sample variance.
        let x = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let n = x.len();
        let m = mean(&x, MeanMethod::Arithmetic);
        let v = var(&x, n, 1, m, MeanMethod::Arithmetic);
        let manual_var: f64 = x.iter().map(|xi| (xi - m).powi(2)).sum::<f64>() / (n - 1) as f64;
        assert_relative_eq!(v, manual_var, epsilon = 1e-12);

        let c = auto_cov(&x, n, 1, m, MeanMethod::Arithmetic);
        let manual_cov: f64 = (0..n - 1)
            .map(|i| (x[i] - m) * (x[i + 1] - m))
            .sum::<f64>()
            / (n - 1) as f64;
        assert_relative_eq!(c, manual_cov, epsilon = 1e-12);
    }
}
