// Copyright © ArkBig
//! Next-round planners (§4.8): pluggable strategies that each propose
//! whether more rounds are needed and how much work the next round should
//! do. The controller ORs every planner's verdict and takes the largest
//! proposed work amount, clamped to `work_amount_limit`.

use crate::baseline::ReadingType;
use crate::hypothesis;
use crate::mean::MeanMethod;
use crate::sample_size;
use crate::stats;
use crate::workload::Workload;

/// One planner's verdict for the upcoming round.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlannerDecision {
    pub need_more: bool,
    pub work_amount: f64,
}

impl PlannerDecision {
    fn satisfied() -> Self {
        Self {
            need_more: false,
            work_amount: 0.0,
        }
    }
}

/// Checks whether `data`'s CI (at `wl`'s configured requirement) is
/// satisfied, also enforcing the configured floor on sample size. No active
/// requirement is trivially satisfied. If `wl` has a
/// `calc_required_readings_func` hook installed, its verdict on the required
/// sample size replaces the built-in CI-derived calculation entirely.
fn ci_requirement_met(
    data: &[f64],
    mean_method: MeanMethod,
    ci_type: stats::CiType,
    wl: &Workload,
) -> bool {
    if data.len() < 2 {
        return false;
    }
    if let Some(hook) = wl.calc_required_readings_func() {
        return match hook(data) {
            Some(required) => data.len() >= required.max(wl.config().min_sample_size),
            None => false,
        };
    }
    let mean = mean_method.mean(data);
    let Some(half_width) = wl.config().required_ci.half_width(mean) else {
        return data.len() >= wl.config().min_sample_size;
    };
    match sample_size::optimal_sample_size(
        data,
        data.len(),
        half_width,
        mean_method,
        ci_type,
        wl.config().confidence_level,
        wl.config().autocorrelation_coefficient_limit,
    ) {
        Ok(result) => data.len() >= result.required_sample_size.max(wl.config().min_sample_size),
        Err(_) => false,
    }
}

/// Meets minimum round duration: extrapolates linearly from the last
/// round's `w/d` ratio so the next round's projected duration clears the
/// short-round threshold.
pub fn min_duration_planner(wl: &Workload) -> PlannerDecision {
    let threshold_ns = wl.config().short_round_detection_threshold.as_nanos() as f64;
    let Some(last) = wl.rounds().last() else {
        return PlannerDecision {
            need_more: true,
            work_amount: wl.config().init_work_amount,
        };
    };
    if (last.duration_ns as f64) >= threshold_ns {
        return PlannerDecision::satisfied();
    }
    let scale = if last.duration_ns > 0 {
        (threshold_ns / last.duration_ns as f64).max(2.0)
    } else {
        2.0
    };
    PlannerDecision {
        need_more: true,
        work_amount: (last.work_amount * scale).max(wl.config().init_work_amount),
    }
}

/// Satisfies readings' CI: work amount has no effect on reading count, so
/// the proposal is always `init_work_amount`.
pub fn readings_ci_planner(wl: &Workload) -> PlannerDecision {
    let rejected = wl.rejected_flags();
    for (p, info) in wl.pi_infos().iter().enumerate() {
        if !info.reading_must_satisfy {
            continue;
        }
        let data = wl.per_pi(p).accepted_readings(&rejected);
        if !ci_requirement_met(&data, info.reading_mean_method, info.reading_ci_type, wl) {
            return PlannerDecision {
                need_more: true,
                work_amount: wl.config().init_work_amount,
            };
        }
    }
    PlannerDecision::satisfied()
}

/// Satisfies unit-readings' CI: extrapolates the work amount needed to
/// close the sample-count gap at the currently observed
/// unit-readings-per-work-unit rate.
pub fn unit_readings_ci_planner(wl: &Workload) -> PlannerDecision {
    let rejected = wl.rejected_flags();
    let total_work: f64 = wl.accepted_work_amounts().iter().sum();
    let mut decision = PlannerDecision::satisfied();

    for (p, info) in wl.pi_infos().iter().enumerate() {
        if !info.unit_reading_must_satisfy {
            continue;
        }
        let data = wl.per_pi(p).accepted_unit_readings(&rejected);
        if data.len() < 2 {
            decision.need_more = true;
            decision.work_amount = decision.work_amount.max(wl.config().init_work_amount);
            continue;
        }
        let required = if let Some(hook) = wl.calc_required_unit_readings_func() {
            hook(&data).map(|req| req.max(wl.config().min_sample_size))
        } else {
            let mean = info.unit_reading_mean_method.mean(&data);
            let Some(half_width) = wl.config().required_ci.half_width(mean) else {
                continue;
            };
            sample_size::optimal_sample_size(
                &data,
                data.len(),
                half_width,
                info.unit_reading_mean_method,
                info.reading_ci_type,
                wl.config().confidence_level,
                wl.config().autocorrelation_coefficient_limit,
            )
            .ok()
            .map(|r| r.required_sample_size.max(wl.config().min_sample_size))
        };

        let needed = match required {
            Some(req) if data.len() < req => req - data.len(),
            Some(_) => continue,
            None => {
                decision.need_more = true;
                decision.work_amount = decision.work_amount.max(wl.config().init_work_amount);
                continue;
            }
        };

        decision.need_more = true;
        let rate = if total_work > 0.0 {
            data.len() as f64 / total_work
        } else {
            0.0
        };
        let extrapolated = if rate > 0.0 {
            needed as f64 / rate
        } else {
            wl.config().init_work_amount
        };
        decision.work_amount = decision
            .work_amount
            .max(extrapolated.max(wl.config().init_work_amount));
    }
    decision
}

/// Satisfies WPS's CI: pushes the largest currently-allowed work amount
/// toward the regression, since a wider spread of work amounts stabilizes
/// the slope estimate.
pub fn wps_ci_planner(wl: &Workload) -> PlannerDecision {
    if !wl.config().wps_enabled {
        return PlannerDecision::satisfied();
    }
    let w = wl.accepted_work_amounts();
    let d = wl.accepted_durations_ns();
    let threshold = wl.config().short_round_detection_threshold.as_nanos() as f64;

    let fallback_amount = if wl.config().work_amount_limit > 0.0 {
        wl.config().work_amount_limit
    } else {
        wl.rounds()
            .last()
            .map(|r| r.work_amount * 2.0)
            .unwrap_or(wl.config().init_work_amount)
    };

    match crate::wps::fit(&w, &d, wl.config().autocorrelation_coefficient_limit, threshold) {
        Ok(fit) => {
            let Some(half_width) = wl.config().required_ci.half_width(fit.v) else {
                return PlannerDecision::satisfied();
            };
            if fit.v_ci > 2.0 * half_width {
                PlannerDecision {
                    need_more: true,
                    work_amount: fallback_amount,
                }
            } else {
                PlannerDecision::satisfied()
            }
        }
        Err(_) => PlannerDecision {
            need_more: true,
            work_amount: fallback_amount,
        },
    }
}

/// Compares each PI with a baseline against a significance target; the
/// default two-sided significance threshold mirrors a conventional 95%
/// confidence requirement (`required_p = 0.05`).
pub fn comparison_planner(wl: &Workload) -> PlannerDecision {
    const REQUIRED_P: f64 = 0.05;
    let rejected = wl.rejected_flags();

    for (p, info) in wl.pi_infos().iter().enumerate() {
        let Some(baseline) = wl.baseline_for(p, ReadingType::Reading) else {
            continue;
        };
        let data = wl.per_pi(p).accepted_readings(&rejected);
        if data.len() < 2 {
            continue;
        }
        let mean = info.reading_mean_method.mean(&data);
        let var = stats::var(&data, data.len(), 1, mean, info.reading_mean_method);
        let (p_value, _, _) = hypothesis::p_eq(
            mean,
            baseline.mean,
            data.len(),
            baseline.sample_size,
            var,
            baseline.variance,
            wl.config().confidence_level,
        );
        if p_value > REQUIRED_P {
            let n2 = hypothesis::opt_sample_size_for_eq_test(
                baseline.mean,
                baseline.sample_size,
                baseline.variance,
                mean,
                var,
                REQUIRED_P,
            );
            if n2 <= data.len() {
                continue;
            }
            let per_round_samples = (data.len() as f64 / wl.num_of_rounds().max(1) as f64).max(1.0);
            let last_w = wl
                .rounds()
                .last()
                .map(|r| r.work_amount)
                .unwrap_or(wl.config().init_work_amount);
            let amount = (n2 as f64 - data.len() as f64) / per_round_samples * last_w;
            return PlannerDecision {
                need_more: true,
                work_amount: amount.max(wl.config().init_work_amount),
            };
        }
    }
    PlannerDecision::satisfied()
}

/// The five built-in planners in §4.8's table order.
pub fn builtin_planners() -> [fn(&Workload) -> PlannerDecision; 5] {
    [
        min_duration_planner,
        readings_ci_planner,
        unit_readings_ci_planner,
        wps_ci_planner,
        comparison_planner,
    ]
}

/// Aggregates every enabled planner: `need_more` is their OR, and
/// `work_amount` is the largest proposal clamped to `work_amount_limit`.
pub fn aggregate(wl: &Workload) -> PlannerDecision {
    let mut need_more = false;
    let mut work_amount = wl.config().init_work_amount;
    for planner in builtin_planners() {
        let decision = planner(wl);
        if decision.need_more {
            need_more = true;
            work_amount = work_amount.max(decision.work_amount);
        }
    }
    if wl.config().work_amount_limit > 0.0 {
        work_amount = work_amount.min(wl.config().work_amount_limit);
    }
    PlannerDecision {
        need_more,
        work_amount,
    }
}
