// Copyright © ArkBig
//! WPS (work-per-second) linear regression (§4.5): fits
//! `duration = α + w / v` across rounds, after subsession grouping for
//! autocorrelation control.
//!
//! The fit itself runs in seconds, not nanoseconds, to keep the OLS
//! condition number reasonable (§9); conversion to/from nanoseconds happens
//! only at the round-record boundary.

use crate::error::{PilotError, Result};
use crate::mean::MeanMethod;
use crate::stats;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Outcome of fitting the WPS model to a set of rounds.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WpsFit {
    /// Intercept, in seconds.
    pub alpha: f64,
    /// Slope `v = 1/m`, in work-units per second.
    pub v: f64,
    /// Width of the confidence interval of `v`.
    pub v_ci: f64,
    /// Sum of squared residuals at the subsession level.
    pub ssr: f64,
    /// `ssr` as a percentage of total sum of squares.
    pub ssr_percent: f64,
    /// Subsession sample count `h`.
    pub h: usize,
    /// Subsession size `q`.
    pub q: usize,
}

fn sample_variance(x: &[f64], mean: f64) -> f64 {
    x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (x.len() - 1) as f64
}

fn covariance(x: &[f64], y: &[f64], mean_x: f64, mean_y: f64) -> f64 {
    x.iter()
        .zip(y)
        .map(|(xi, yi)| (xi - mean_x) * (yi - mean_y))
        .sum::<f64>()
        / (x.len() - 1) as f64
}

/// Fits the WPS model.
///
/// `work_amounts[i]` and `durations_ns[i]` are parallel per-round arrays;
/// `duration_threshold_ns` drops rounds too short to trust (mirrors the
/// controller's own short-round rejection, applied again here because WPS
/// may be asked to fit over a different round subset than the caller used).
pub fn fit(
    work_amounts: &[f64],
    durations_ns: &[f64],
    rho_max: f64,
    duration_threshold_ns: f64,
) -> Result<WpsFit> {
    assert_eq!(work_amounts.len(), durations_ns.len());

    let (w_raw, d_raw_ns): (Vec<f64>, Vec<f64>) = work_amounts
        .iter()
        .zip(durations_ns)
        .filter(|(_, &d)| d > duration_threshold_ns)
        .map(|(&w, &d)| (w, d))
        .unzip();
    let n_raw = w_raw.len();
    if n_raw < 3 {
        return Err(PilotError::NotEnoughData);
    }

    let d_raw_sec: Vec<f64> = d_raw_ns.iter().map(|d| d / NANOS_PER_SEC).collect();

    let naive_v: Vec<f64> = w_raw.iter().zip(&d_raw_sec).map(|(w, d)| w / d).collect();
    let q = stats::optimal_subsession_size(&naive_v, n_raw, MeanMethod::Harmonic, rho_max)
        .ok_or(PilotError::NotEnoughData)?;

    let h = n_raw / q;
    if h < 3 {
        return Err(PilotError::NotEnoughData);
    }

    let mut w_sub = vec![0.0; h];
    let mut d_sub = vec![0.0; h];
    for i in 0..h {
        let lo = i * q;
        let hi = lo + q;
        w_sub[i] = w_raw[lo..hi].iter().sum();
        d_sub[i] = d_raw_sec[lo..hi].iter().sum();
    }

    let mean_w_sub = w_sub.iter().sum::<f64>() / h as f64;
    let mean_d_sub = d_sub.iter().sum::<f64>() / h as f64;
    let var_w_sub = sample_variance(&w_sub, mean_w_sub);
    if var_w_sub == 0.0 {
        return Err(PilotError::NotEnoughData);
    }
    let cov_wd_sub = covariance(&w_sub, &d_sub, mean_w_sub, mean_d_sub);
    let m = cov_wd_sub / var_w_sub;
    let alpha = mean_d_sub - m * mean_w_sub;
    if m == 0.0 {
        return Err(PilotError::NotEnoughData);
    }
    let v = 1.0 / m;

    let ssr_sub: f64 = w_sub
        .iter()
        .zip(&d_sub)
        .map(|(w, d)| (d - (alpha + m * w)).powi(2))
        .sum();
    let sst_sub: f64 = d_sub.iter().map(|d| (d - mean_d_sub).powi(2)).sum();
    let ssr_percent = if sst_sub > 0.0 {
        100.0 * ssr_sub / sst_sub
    } else {
        0.0
    };

    // Faithful to the original implementation: sigma^2 is the subsession
    // residual variance (h-2 d.o.f.), but it is normalized against the
    // *raw*, ungrouped work-amount variance scaled by (n_raw - 1) rather
    // than the subsession variance scaled by (h - 1). See DESIGN.md.
    let sigma2 = ssr_sub / (h - 2) as f64;
    let mean_w_raw = w_raw.iter().sum::<f64>() / n_raw as f64;
    let var_w_raw = sample_variance(&w_raw, mean_w_raw);
    let std_err_m = (sigma2 / ((n_raw - 1) as f64 * var_w_raw)).sqrt();

    let m_lo = m - 2.0 * std_err_m;
    let m_hi = m + 2.0 * std_err_m;
    let v_ci = if m_lo != 0.0 && m_hi != 0.0 {
        (1.0 / m_lo - 1.0 / m_hi).abs()
    } else {
        f64::INFINITY
    };

    Ok(WpsFit {
        alpha,
        v,
        v_ci,
        ssr: ssr_sub,
        ssr_percent,
        h,
        q,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn linear_regression_scenario_a() {
        let w: Vec<f64> = vec![50.0, 100.0, 150.0, 200.0, 250.0];
        let residuals = [20.0, -9.0, -18.0, -25.0, 30.0];
        let alpha_true = 42.0;
        let v_true = 0.5;
        let d_ns: Vec<f64> = w
            .iter()
            .zip(residuals)
            .map(|(w, eps)| (w / v_true + alpha_true + eps) * 1_000_000_000.0)
            .collect();

        let fit = fit(&w, &d_ns, 0.1, 0.0).unwrap();
        assert!(
            (fit.ssr - 2030.0).abs() < 10.0,
            "ssr={} expected ~2030",
            fit.ssr
        );
        assert!((fit.alpha - 44.0).abs() < 4.0, "alpha={}", fit.alpha);
        assert!((fit.v - 0.5).abs() < 0.1, "v={}", fit.v);
        assert!((fit.v_ci - 0.18).abs() < 0.01, "v_ci={}", fit.v_ci);
    }

    #[test]
    fn too_few_rounds_is_not_enough_data() {
        let w = vec![10.0, 20.0];
        let d = vec![1e9, 2e9];
        let err = fit(&w, &d, 0.1, 0.0).unwrap_err();
        assert_eq!(err, PilotError::NotEnoughData);
    }

    #[test]
    fn short_rounds_are_filtered_out() {
        let w = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        let d = vec![1.0, 2e9, 3e9, 4e9, 5e9];
        // first round is far below threshold and must be dropped, leaving
        // exactly 4 usable rounds.
        let fit = fit(&w, &d, 0.5, 1e6);
        assert!(fit.is_ok());
    }
}
