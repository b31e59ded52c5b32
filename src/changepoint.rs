// Copyright © ArkBig
//! E-Divisive-with-Means (EDM) change-point detection (§4.4): a
//! non-parametric, permutation-tested method for locating mean shifts in a
//! sequence, plus the dominant-segment policy used for warm-up removal.
//!
//! `detect_changepoints` performs binary segmentation: it repeatedly finds
//! the most significant single split in each still-unsplit region (scored
//! by the E-divisive statistic below) and recurses while a permutation test
//! keeps rejecting the no-change-point null at the `percent` significance
//! level. This is the same divide-and-conquer structure the `ecp` family of
//! E-Divisive implementations uses, simplified to the univariate case this
//! crate needs.

use crate::error::{PilotError, Result};
use rand::seq::SliceRandom;
use rand::thread_rng;

/// Default minimum segment length a change-point split (or a dominant
/// segment) must respect.
pub const MIN_CHANGEPOINT_DETECTION_SAMPLE_SIZE: usize = 30;

/// Number of label permutations used to estimate each candidate split's
/// significance. Large enough that the Ferrari-style "obvious" mean shifts
/// in this crate's own tests are detected essentially every run, small
/// enough to keep `analytical_result` recomputation cheap.
const PERMUTATIONS: usize = 199;

/// Sum over all unordered pairs `i<j` of `|x_i − x_j|^degree`.
fn pairwise_energy(x: &[f64], degree: i32) -> f64 {
    let mut sum = 0.0;
    for i in 0..x.len() {
        for j in (i + 1)..x.len() {
            sum += (x[i] - x[j]).abs().powi(degree);
        }
    }
    sum
}

/// E-divisive statistic `Q(tau)` for every valid split point of `x`,
/// indexed by `tau` (the left segment's length). `Q[0]` and the last two
/// entries are left at `0.0` (no valid split there).
fn divergence_profile(x: &[f64], degree: i32) -> Vec<f64> {
    let n = x.len();
    let mut q = vec![0.0_f64; n];
    if n < 4 {
        return q;
    }
    for tau in 2..=(n - 2) {
        let (a, b) = x.split_at(tau);
        let m = a.len() as f64;
        let k = b.len() as f64;
        let mut between = 0.0;
        for &ai in a {
            for &bi in b {
                between += (ai - bi).abs().powi(degree);
            }
        }
        let within_a = pairwise_energy(a, degree);
        let within_b = pairwise_energy(b, degree);
        let e = 2.0 * between / (m * k) - 2.0 * within_a / (m * m) - 2.0 * within_b / (k * k);
        q[tau] = (m * k / n as f64) * e;
    }
    q
}

/// Largest `Q(tau)` (and its index) within `[min_size, len − min_size]`.
fn best_split(q: &[f64], min_size: usize) -> Option<(usize, f64)> {
    if q.len() < 2 * min_size {
        return None;
    }
    (min_size..=q.len() - min_size)
        .map(|tau| (tau, q[tau]))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
}

/// Permutation p-value for observing a split at least as strong as
/// `observed` under the null that `x` has no change point: the fraction of
/// random relabelings whose best split score is `>= observed`.
fn permutation_p_value(x: &[f64], degree: i32, min_size: usize, observed: f64) -> f64 {
    let mut rng = thread_rng();
    let mut shuffled = x.to_vec();
    let mut at_least_as_strong = 1; // the observed sample itself counts once.
    for _ in 0..PERMUTATIONS {
        shuffled.shuffle(&mut rng);
        let profile = divergence_profile(&shuffled, degree);
        if let Some((_, score)) = best_split(&profile, min_size) {
            if score >= observed {
                at_least_as_strong += 1;
            }
        }
    }
    at_least_as_strong as f64 / (PERMUTATIONS + 1) as f64
}

fn detect_rec(
    x: &[f64],
    offset: usize,
    percent: f64,
    degree: i32,
    min_size: usize,
    out: &mut Vec<usize>,
) {
    if x.len() < 2 * min_size {
        return;
    }
    let profile = divergence_profile(x, degree);
    let Some((tau, score)) = best_split(&profile, min_size) else {
        return;
    };
    let p = permutation_p_value(x, degree, min_size, score);
    if p > percent {
        return;
    }
    out.push(offset + tau);
    detect_rec(&x[..tau], offset, percent, degree, min_size, out);
    detect_rec(&x[tau..], offset + tau, percent, degree, min_size, out);
}

/// Sorted list of change-point indices in `x` (each index is the start of
/// the segment following the change).
pub fn detect_changepoints(x: &[f64], n: usize, percent: f64, degree: i32) -> Vec<usize> {
    debug_assert_eq!(x.len(), n);
    let mut out = Vec::new();
    detect_rec(
        x,
        0,
        percent,
        degree,
        MIN_CHANGEPOINT_DETECTION_SAMPLE_SIZE.min(n / 2).max(1),
        &mut out,
    );
    out.sort_unstable();
    out
}

/// Single strongest change point in `x`, without recursing into the
/// resulting sub-segments ("EDM-tail" variant): used by fixed-percentage
/// warm-up removal, which only needs one cut near the start of the series.
pub fn find_one_changepoint(x: &[f64], n: usize, percent: f64, degree: i32) -> Result<usize> {
    debug_assert_eq!(x.len(), n);
    let min_size = MIN_CHANGEPOINT_DETECTION_SAMPLE_SIZE.min(n / 2).max(1);
    let profile = divergence_profile(x, degree);
    let (tau, score) = best_split(&profile, min_size).ok_or(PilotError::NoChangepoint)?;
    let p = permutation_p_value(x, degree, min_size, score);
    if p > percent {
        return Err(PilotError::NoChangepoint);
    }
    Ok(tau)
}

/// The longest inter-change-point segment, expressed as a half-open
/// `[begin, end)` range, provided it both exceeds `ceil(n/2)` samples and
/// is at least `min_size` long. Returned boundaries are exact with respect
/// to this crate's own change-point detector — the original C
/// implementation documents its own boundaries as "approximate"; see
/// DESIGN.md.
pub fn find_dominant_segment(
    x: &[f64],
    n: usize,
    min_size: usize,
    percent: f64,
    degree: i32,
) -> Result<(usize, usize)> {
    debug_assert_eq!(x.len(), n);
    let mut bounds = vec![0];
    bounds.extend(detect_changepoints(x, n, percent, degree));
    bounds.push(n);
    bounds.dedup();

    let half = n.div_ceil(2);
    bounds
        .windows(2)
        .map(|w| (w[0], w[1]))
        .filter(|(b, e)| e - b > half && e - b >= min_size)
        .max_by_key(|(b, e)| e - b)
        .ok_or(PilotError::NoDominantSegment)
}

#[cfg(test)]
mod test {
    use super::*;

    fn step_series(counts_values: &[(usize, f64)]) -> Vec<f64> {
        counts_values
            .iter()
            .flat_map(|(count, value)| std::iter::repeat(*value).take(*count))
            .collect()
    }

    #[test]
    fn two_changepoints_in_step_series() {
        let x = step_series(&[(30, 1.1), (30, 5.1), (30, 1.1)]);
        let cps = detect_changepoints(&x, x.len(), 0.25, 1);
        assert_eq!(cps.len(), 2, "expected two change points, got {cps:?}");
        assert!((cps[0] as i64 - 30).abs() <= 2, "first cp near 30: {cps:?}");
        assert!((cps[1] as i64 - 60).abs() <= 2, "second cp near 60: {cps:?}");
    }

    #[test]
    fn dominant_segment_found_for_asymmetric_steps() {
        let x = step_series(&[(30, 1.1), (130, 5.1), (30, 1.1)]);
        let (begin, end) = find_dominant_segment(
            &x,
            x.len(),
            MIN_CHANGEPOINT_DETECTION_SAMPLE_SIZE,
            0.25,
            1,
        )
        .unwrap();
        assert!((begin as i64 - 30).abs() <= 3, "begin near 30, got {begin}");
        assert!((end as i64 - 160).abs() <= 3, "end near 160, got {end}");
        assert!(end - begin > x.len() / 2);
    }

    #[test]
    fn dominant_segment_fails_for_symmetric_steps() {
        let x = step_series(&[(30, 1.1), (30, 5.1), (30, 1.1)]);
        let err = find_dominant_segment(
            &x,
            x.len(),
            MIN_CHANGEPOINT_DETECTION_SAMPLE_SIZE,
            0.25,
            1,
        )
        .unwrap_err();
        assert_eq!(err, PilotError::NoDominantSegment);
    }

    #[test]
    fn no_changepoint_in_flat_series() {
        let x = vec![2.0; 90];
        let err = find_one_changepoint(&x, x.len(), 0.25, 1).unwrap_err();
        assert_eq!(err, PilotError::NoChangepoint);
    }

    #[test]
    fn one_changepoint_tail_variant_finds_single_cut() {
        let x = step_series(&[(40, 10.0), (40, 1.0)]);
        let tau = find_one_changepoint(&x, x.len(), 0.25, 1).unwrap();
        assert!((tau as i64 - 40).abs() <= 2, "cut near 40, got {tau}");
    }
}
