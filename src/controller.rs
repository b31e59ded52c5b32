// Copyright © ArkBig
//! Controller / session loop (§4.9): the closed control loop that decides
//! how many rounds a workload needs and drives them to completion.

use crate::analytical_result::AnalyticalResult;
use crate::error::{PilotError, Result};
use crate::planner::{self, PlannerDecision};
use crate::workload::Workload;
use log::{debug, trace};

/// One round's raw results, as returned by the workload callback.
pub struct WorkloadReport {
    pub duration_ns: i64,
    pub readings: Vec<f64>,
    pub unit_readings: Vec<Vec<f64>>,
}

/// A workload callback: invoked with the round index and the work amount
/// the controller wants performed, returns the round's measurements or an
/// error string that becomes `PilotError::WlFail`.
pub type WorkloadFn<'a> = dyn FnMut(usize, f64) -> std::result::Result<WorkloadReport, String> + 'a;

/// `PRE_WORKLOAD_RUN` / `POST_WORKLOAD_RUN` hooks (§4.9, §6): return `false`
/// to abort the session from that point.
pub type Hook<'a> = dyn FnMut(&Workload) -> bool + 'a;

/// Overrides the built-in planner aggregation (§4.8); primarily for tests.
pub type WorkAmountHook<'a> = dyn Fn(&Workload) -> PlannerDecision + 'a;

/// How a session loop ended. Unlike a hard failure, every variant still
/// carries a usable [`AnalyticalResult`] — see §7's category (d).
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// All planners are satisfied; this is the ordinary, successful exit.
    Satisfied,
    DurationLimit,
    Hook,
    Request,
}

/// Outcome of [`run_workload`]: the loop's terminal state plus the final
/// snapshot computed from whatever data had been ingested.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub reason: StopReason,
    pub result: AnalyticalResult,
}

/// Optional hooks a caller may install before calling [`run_workload`].
/// Left at `None`, each has the meaning §4.8/§4.9 documents for "not set".
/// These are ephemeral, per-call overrides; the required-sample-size
/// calculation hooks (§4.7) are session-persistent and live on
/// [`Workload`] instead (`set_calc_required_readings_func` /
/// `set_calc_required_unit_readings_func`).
#[derive(Default)]
pub struct SessionHooks<'a> {
    pub pre: Option<Box<Hook<'a>>>,
    pub post: Option<Box<Hook<'a>>>,
    pub next_round_work_amount: Option<Box<WorkAmountHook<'a>>>,
}

/// Runs the session loop (§4.9) to completion, repeatedly invoking
/// `workload_fn` until the planners are satisfied or a stop condition
/// fires. `wl` accumulates every round ingested along the way, so it
/// remains usable (e.g. for further `import_benchmark_results` calls)
/// after this returns.
pub fn run_workload(
    wl: &mut Workload,
    hooks: &mut SessionHooks,
    workload_fn: &mut WorkloadFn,
) -> Result<SessionOutcome> {
    loop {
        if let Some(pre) = hooks.pre.as_mut() {
            if !pre(wl) {
                debug!("pilot: PRE_WORKLOAD_RUN hook requested stop");
                return Ok(SessionOutcome {
                    reason: StopReason::Hook,
                    result: AnalyticalResult::compute(wl),
                });
            }
        }

        let decision = match hooks.next_round_work_amount.as_ref() {
            Some(hook) => hook(wl),
            None => planner::aggregate(wl),
        };
        trace!(
            "pilot: planner decision need_more={} work_amount={}",
            decision.need_more,
            decision.work_amount
        );
        if !decision.need_more {
            return Ok(SessionOutcome {
                reason: StopReason::Satisfied,
                result: AnalyticalResult::compute(wl),
            });
        }

        let round = wl.num_of_rounds();
        let report = workload_fn(round, decision.work_amount).map_err(PilotError::WlFail)?;
        debug!(
            "pilot: round {round} work_amount={} duration_ns={}",
            decision.work_amount, report.duration_ns
        );

        wl.import_benchmark_results(
            round,
            decision.work_amount,
            report.duration_ns,
            report.readings,
            report.unit_readings,
        )?;

        if wl.too_many_rejected_rounds() {
            return Err(PilotError::TooManyRejectedRounds);
        }

        if let Some(post) = hooks.post.as_mut() {
            if !post(wl) {
                debug!("pilot: POST_WORKLOAD_RUN hook requested stop");
                return Ok(SessionOutcome {
                    reason: StopReason::Hook,
                    result: AnalyticalResult::compute(wl),
                });
            }
        }

        let result = AnalyticalResult::compute(wl);

        let limit = wl.config().session_duration_limit;
        if !limit.is_zero() && wl.session_duration() >= limit {
            return Ok(SessionOutcome {
                reason: StopReason::DurationLimit,
                result,
            });
        }
        if wl.is_stop_requested() {
            return Ok(SessionOutcome {
                reason: StopReason::Request,
                result,
            });
        }
    }
}
