// Copyright © ArkBig
//! Analytical-result aggregator (§4.10): a point-in-time snapshot computed
//! from everything a [`crate::workload::Workload`] has stored so far.
//!
//! The snapshot owns its own copies of every number it reports (`Clone`),
//! so a caller can hold on to one round's result while the controller moves
//! on to the next.

use crate::changepoint;
use crate::mean::MeanMethod;
use crate::sample_size;
use crate::stats::{self, CiType};
use crate::workload::{RequiredSampleSizeFn, Workload};
use std::fmt;
use std::time::Duration;

/// Default parameters fed to [`changepoint::find_dominant_segment`] when
/// computing the "dominant segment" view of a PI's data.
const SEGMENT_MIN_SIZE: usize = changepoint::MIN_CHANGEPOINT_DETECTION_SAMPLE_SIZE;
const SEGMENT_PERCENT: f64 = 0.25;
const SEGMENT_DEGREE: i32 = 1;

/// Statistics over one slice of a PI's readings (either "raw", meaning
/// every accepted round, or "dominant segment", meaning the longest
/// post-change-point stable run).
#[derive(Debug, Clone, PartialEq)]
pub struct PiReadingStats {
    pub sample_count: usize,
    pub mean: f64,
    pub formatted_mean: f64,
    pub variance: f64,
    pub autocorrelation_coefficient: f64,
    /// `None` when the sample count is too small to say.
    pub required_sample_size: Option<usize>,
    pub optimal_subsession_size: Option<usize>,
    pub subsession_variance: Option<f64>,
    pub subsession_autocorrelation: Option<f64>,
    pub ci_width: Option<f64>,
    pub formatted_ci_width: Option<f64>,
}

impl PiReadingStats {
    /// `required_sample_size_override`, when present, replaces the built-in
    /// CI-derived calculation with the user-supplied hook's verdict (§4.7).
    fn compute(
        data: &[f64],
        mean_method: MeanMethod,
        ci_type: CiType,
        confidence_level: f64,
        rho_max: f64,
        required_ci: &crate::config::RequiredCi,
        required_sample_size_override: Option<&RequiredSampleSizeFn>,
        fmt: impl Fn(f64) -> f64,
    ) -> Option<Self> {
        if data.len() < 2 {
            return None;
        }
        let mean = mean_method.mean(data);
        let var = stats::var(data, data.len(), 1, mean, mean_method);
        let rho = stats::autocorrelation_coefficient(data, data.len(), 1, mean, mean_method);

        let q = stats::optimal_subsession_size(data, data.len(), mean_method, rho_max);
        let (subsession_variance, subsession_autocorrelation) = match q {
            Some(q) => (
                Some(stats::var(data, data.len(), q, mean, mean_method)),
                Some(stats::autocorrelation_coefficient(
                    data,
                    data.len(),
                    q,
                    mean,
                    mean_method,
                )),
            ),
            None => (None, None),
        };

        let required_sample_size = if let Some(hook) = required_sample_size_override {
            hook(data)
        } else {
            required_ci.half_width(mean).and_then(|half_width| {
                sample_size::optimal_sample_size(
                    data,
                    data.len(),
                    half_width,
                    mean_method,
                    ci_type,
                    confidence_level,
                    rho_max,
                )
                .ok()
                .map(|r| r.required_sample_size)
            })
        };

        let ci_width = q.and_then(|q| {
            stats::confidence_interval_width(data, data.len(), q, confidence_level, mean_method, ci_type)
                .ok()
        });

        Some(Self {
            sample_count: data.len(),
            mean,
            formatted_mean: fmt(mean),
            variance: var,
            autocorrelation_coefficient: rho,
            required_sample_size,
            optimal_subsession_size: q,
            subsession_variance,
            subsession_autocorrelation,
            ci_width,
            formatted_ci_width: ci_width.map(&fmt),
        })
    }
}

/// Unit-reading counterpart of [`PiReadingStats`], with the extra flag
/// §4.10 calls for: whether `required_sample_size` came from a
/// user-supplied override rather than the built-in calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct PiUnitReadingStats {
    pub stats: PiReadingStats,
    pub required_sample_size_from_hook: bool,
}

/// Everything the snapshot knows about one PI.
#[derive(Debug, Clone, PartialEq)]
pub struct PiSnapshot {
    pub name: String,
    pub unit: String,
    pub raw_readings: Option<PiReadingStats>,
    pub dominant_segment_readings: Option<PiReadingStats>,
    pub raw_unit_readings: Option<PiUnitReadingStats>,
    pub dominant_segment_unit_readings: Option<PiUnitReadingStats>,
    pub last_changepoint: Option<usize>,
}

/// WPS section of the snapshot (§4.5, §4.10).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WpsSnapshot {
    pub has_data: bool,
    pub harmonic_mean_v: f64,
    pub naive_v_error: f64,
    pub alpha: f64,
    pub v: f64,
    pub v_ci: f64,
    pub h: usize,
    pub ssr: f64,
    pub ssr_percent: f64,
}

impl Default for WpsSnapshot {
    fn default() -> Self {
        Self {
            has_data: false,
            harmonic_mean_v: 0.0,
            naive_v_error: 0.0,
            alpha: 0.0,
            v: 0.0,
            v_ci: 0.0,
            h: 0,
            ssr: 0.0,
            ssr_percent: 0.0,
        }
    }
}

/// Full point-in-time snapshot (§4.10): one entry per PI, the WPS section,
/// and session-level totals.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticalResult {
    pub pis: Vec<PiSnapshot>,
    pub wps: WpsSnapshot,
    pub num_of_pi: usize,
    pub num_of_rounds: usize,
    pub session_duration: Duration,
}

impl AnalyticalResult {
    /// Recomputes a full snapshot from `wl`'s current state (§4.9 step 8).
    pub fn compute(wl: &Workload) -> Self {
        let rejected = wl.rejected_flags();
        let mut pis = Vec::with_capacity(wl.pi_infos().len());

        for (p, info) in wl.pi_infos().iter().enumerate() {
            let per_pi = wl.per_pi(p);
            let readings = per_pi.accepted_readings(&rejected);
            let unit_readings = per_pi.accepted_unit_readings(&rejected);

            let raw_readings = PiReadingStats::compute(
                &readings,
                info.reading_mean_method,
                info.reading_ci_type,
                wl.config().confidence_level,
                wl.config().autocorrelation_coefficient_limit,
                &wl.config().required_ci,
                wl.calc_required_readings_func(),
                |v| info.format_reading(v),
            );

            let last_changepoint =
                changepoint::find_one_changepoint(&readings, readings.len(), SEGMENT_PERCENT, SEGMENT_DEGREE)
                    .ok();

            let dominant_segment_readings = changepoint::find_dominant_segment(
                &readings,
                readings.len(),
                SEGMENT_MIN_SIZE,
                SEGMENT_PERCENT,
                SEGMENT_DEGREE,
            )
            .ok()
            .and_then(|(b, e)| {
                PiReadingStats::compute(
                    &readings[b..e],
                    info.reading_mean_method,
                    info.reading_ci_type,
                    wl.config().confidence_level,
                    wl.config().autocorrelation_coefficient_limit,
                    &wl.config().required_ci,
                    wl.calc_required_readings_func(),
                    |v| info.format_reading(v),
                )
            });

            let raw_unit_readings = PiReadingStats::compute(
                &unit_readings,
                info.unit_reading_mean_method,
                info.reading_ci_type,
                wl.config().confidence_level,
                wl.config().autocorrelation_coefficient_limit,
                &wl.config().required_ci,
                wl.calc_required_unit_readings_func(),
                |v| info.format_unit_reading(v),
            )
            .map(|stats| PiUnitReadingStats {
                stats,
                required_sample_size_from_hook: wl.calc_required_unit_readings_func().is_some(),
            });

            let dominant_segment_unit_readings = changepoint::find_dominant_segment(
                &unit_readings,
                unit_readings.len(),
                SEGMENT_MIN_SIZE,
                SEGMENT_PERCENT,
                SEGMENT_DEGREE,
            )
            .ok()
            .and_then(|(b, e)| {
                PiReadingStats::compute(
                    &unit_readings[b..e],
                    info.unit_reading_mean_method,
                    info.reading_ci_type,
                    wl.config().confidence_level,
                    wl.config().autocorrelation_coefficient_limit,
                    &wl.config().required_ci,
                    wl.calc_required_unit_readings_func(),
                    |v| info.format_unit_reading(v),
                )
            })
            .map(|stats| PiUnitReadingStats {
                stats,
                required_sample_size_from_hook: wl.calc_required_unit_readings_func().is_some(),
            });

            pis.push(PiSnapshot {
                name: info.name.clone(),
                unit: info.unit.clone(),
                raw_readings,
                dominant_segment_readings,
                raw_unit_readings,
                dominant_segment_unit_readings,
                last_changepoint,
            });
        }

        let wps = if wl.config().wps_enabled {
            let w = wl.accepted_work_amounts();
            let d = wl.accepted_durations_ns();
            let threshold = wl.config().short_round_detection_threshold.as_nanos() as f64;
            match crate::wps::fit(&w, &d, wl.config().autocorrelation_coefficient_limit, threshold) {
                Ok(fit) => {
                    let naive_v: Vec<f64> = w.iter().zip(&d).map(|(w, d)| w / (d / 1e9)).collect();
                    let harmonic_mean_v = MeanMethod::Harmonic.mean(&naive_v);
                    let naive_v_error = if harmonic_mean_v != 0.0 {
                        (fit.v - harmonic_mean_v).abs() / harmonic_mean_v
                    } else {
                        0.0
                    };
                    WpsSnapshot {
                        has_data: true,
                        harmonic_mean_v,
                        naive_v_error,
                        alpha: fit.alpha,
                        v: fit.v,
                        v_ci: fit.v_ci,
                        h: fit.h,
                        ssr: fit.ssr,
                        ssr_percent: fit.ssr_percent,
                    }
                }
                Err(_) => WpsSnapshot::default(),
            }
        } else {
            WpsSnapshot::default()
        };

        Self {
            pis,
            wps,
            num_of_pi: wl.pi_infos().len(),
            num_of_rounds: wl.num_of_rounds(),
            session_duration: wl.session_duration(),
        }
    }
}

impl fmt::Display for AnalyticalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "workload summary: {} PI(s), {} round(s), {:?} elapsed",
            self.num_of_pi, self.num_of_rounds, self.session_duration
        )?;
        for pi in &self.pis {
            write!(f, "  {} ({})", pi.name, pi.unit)?;
            if let Some(raw) = &pi.raw_readings {
                write!(
                    f,
                    ": n={} mean={:.6} var={:.6}",
                    raw.sample_count, raw.formatted_mean, raw.variance
                )?;
            } else {
                write!(f, ": insufficient data")?;
            }
            writeln!(f)?;
        }
        if self.wps.has_data {
            writeln!(
                f,
                "  wps: v={:.6} v_ci={:.6} alpha={:.6}",
                self.wps.v, self.wps.v_ci, self.wps.alpha
            )?;
        }
        Ok(())
    }
}
