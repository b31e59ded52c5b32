// Copyright © ArkBig
//! Workload container (§4.7): owns round records, per-PI readings, and
//! configuration; ingests rounds and performs warm-up removal.

use crate::baseline::{Baseline, ReadingType};
use crate::changepoint;
use crate::config::{WarmUpRemovalMethod, WorkloadConfig};
use crate::error::{PilotError, Result};
use crate::pi::{PerPi, PiInfo, WarmupBounds};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Per-round bookkeeping shared by every PI: work amount, wall-clock
/// duration, and whether the round was rejected as too short.
pub struct RoundRecord {
    pub work_amount: f64,
    pub duration_ns: i64,
    pub rejected: bool,
}

/// A user-supplied replacement for the built-in required-sample-size
/// calculation (§4.7 `set_calc_required_readings_func` /
/// `set_calc_required_unit_readings_func`), given the accepted data for one
/// PI. `None` means "insufficient data", same as the built-in calculation's
/// error case.
pub type RequiredSampleSizeFn = Box<dyn Fn(&[f64]) -> Option<usize> + Send + Sync>;

/// The workload container (§4.7): owns all round data, PI metadata, and
/// baseline comparisons for one benchmark session.
pub struct Workload {
    name: String,
    config: WorkloadConfig,
    pi_infos: Vec<PiInfo>,
    per_pi: Vec<PerPi>,
    rounds: Vec<RoundRecord>,
    baselines: Vec<Baseline>,
    stop_requested: Arc<AtomicBool>,
    consecutive_rejected: usize,
    calc_required_readings_func: Option<RequiredSampleSizeFn>,
    calc_required_unit_readings_func: Option<RequiredSampleSizeFn>,
}

impl Workload {
    /// Creates an empty workload (§4.7 `create`). `pi_infos.len()` must
    /// equal `config.num_of_pi`.
    pub fn new(
        name: impl Into<String>,
        config: WorkloadConfig,
        pi_infos: Vec<PiInfo>,
    ) -> Result<Self> {
        if pi_infos.len() != config.num_of_pi {
            return Err(PilotError::WrongParam(format!(
                "pi_infos has {} entries but config.num_of_pi is {}",
                pi_infos.len(),
                config.num_of_pi
            )));
        }
        let per_pi = (0..pi_infos.len()).map(PerPi::new).collect();
        Ok(Self {
            name: name.into(),
            config,
            pi_infos,
            per_pi,
            rounds: Vec::new(),
            baselines: Vec::new(),
            stop_requested: Arc::new(AtomicBool::new(false)),
            consecutive_rejected: 0,
            calc_required_readings_func: None,
            calc_required_unit_readings_func: None,
        })
    }

    /// Installs a replacement for the built-in readings required-sample-size
    /// calculation, consulted by `readings_ci_planner` and the analytical
    /// result's `required_sample_size` field alike.
    pub fn set_calc_required_readings_func(&mut self, f: RequiredSampleSizeFn) {
        self.calc_required_readings_func = Some(f);
    }

    /// Unit-readings counterpart of [`Self::set_calc_required_readings_func`].
    pub fn set_calc_required_unit_readings_func(&mut self, f: RequiredSampleSizeFn) {
        self.calc_required_unit_readings_func = Some(f);
    }

    pub fn calc_required_readings_func(&self) -> Option<&RequiredSampleSizeFn> {
        self.calc_required_readings_func.as_ref()
    }

    pub fn calc_required_unit_readings_func(&self) -> Option<&RequiredSampleSizeFn> {
        self.calc_required_unit_readings_func.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &WorkloadConfig {
        &self.config
    }

    pub fn num_of_rounds(&self) -> usize {
        self.rounds.len()
    }

    pub fn pi_infos(&self) -> &[PiInfo] {
        &self.pi_infos
    }

    pub fn pi_info(&self, piid: usize) -> &PiInfo {
        &self.pi_infos[piid]
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    pub fn per_pi(&self, piid: usize) -> &PerPi {
        &self.per_pi[piid]
    }

    /// A cloneable handle for requesting a cooperative stop from another
    /// thread (§5): `stop_workload()` is the only mutator this handle
    /// exposes.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop_requested.clone()
    }

    /// Asynchronous stop request, observed at the next round boundary.
    pub fn stop_workload(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub fn set_baseline(&mut self, baseline: Baseline) {
        self.baselines.retain(|b| {
            !(b.piid == baseline.piid && b.reading_type == baseline.reading_type)
        });
        self.baselines.push(baseline);
    }

    pub fn load_baseline_file(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        for b in crate::baseline::load_baseline_file(path)? {
            self.set_baseline(b);
        }
        Ok(())
    }

    pub fn baseline_for(&self, piid: usize, rt: ReadingType) -> Option<&Baseline> {
        self.baselines
            .iter()
            .find(|b| b.piid == piid && b.reading_type == rt)
    }

    pub fn rejected_flags(&self) -> Vec<bool> {
        self.rounds.iter().map(|r| r.rejected).collect()
    }

    pub fn accepted_work_amounts(&self) -> Vec<f64> {
        self.rounds
            .iter()
            .filter(|r| !r.rejected)
            .map(|r| r.work_amount)
            .collect()
    }

    pub fn accepted_durations_ns(&self) -> Vec<f64> {
        self.rounds
            .iter()
            .filter(|r| !r.rejected)
            .map(|r| r.duration_ns as f64)
            .collect()
    }

    pub fn session_duration(&self) -> Duration {
        let total: u64 = self
            .rounds
            .iter()
            .map(|r| r.duration_ns.max(0) as u64)
            .sum();
        Duration::from_nanos(total)
    }

    pub fn too_many_rejected_rounds(&self) -> bool {
        self.consecutive_rejected > self.config.max_consecutive_rejected_rounds
    }

    /// Ingests one round's results (§4.7 `import_benchmark_results`):
    /// `round == num_of_rounds()` appends a new round, any other (already
    /// ingested) round index overwrites it in place.
    pub fn import_benchmark_results(
        &mut self,
        round: usize,
        work_amount: f64,
        duration_ns: i64,
        readings: Vec<f64>,
        unit_readings: Vec<Vec<f64>>,
    ) -> Result<()> {
        if readings.len() != self.pi_infos.len() || unit_readings.len() != self.pi_infos.len() {
            return Err(PilotError::WrongParam(
                "readings/unit_readings length must equal num_of_pi".into(),
            ));
        }
        let num_unit_readings = unit_readings.iter().find(|ur| !ur.is_empty()).map(Vec::len);
        if let Some(expected) = num_unit_readings {
            if unit_readings
                .iter()
                .any(|ur| !ur.is_empty() && ur.len() != expected)
            {
                return Err(PilotError::WrongParam(
                    "every non-empty unit_readings[p] in a round must share the same length".into(),
                ));
            }
        }
        if duration_ns <= 0 {
            return Err(PilotError::WrongParam("duration must be positive".into()));
        }
        if round > self.rounds.len() {
            return Err(PilotError::WrongParam(format!(
                "round {round} is beyond the next appendable round {}",
                self.rounds.len()
            )));
        }

        let rejected = self.config.short_workload_check
            && duration_ns <= self.config.short_round_detection_threshold.as_nanos() as i64;

        let record = RoundRecord {
            work_amount,
            duration_ns,
            rejected,
        };

        if round == self.rounds.len() {
            self.rounds.push(record);
            for (p, ur) in unit_readings.into_iter().enumerate() {
                let bounds = self.remove_warm_up(&ur);
                self.per_pi[p].readings.push(readings[p]);
                self.per_pi[p].unit_readings.push(ur);
                self.per_pi[p].warmup.push(bounds);
            }
        } else {
            self.rounds[round] = record;
            for (p, ur) in unit_readings.into_iter().enumerate() {
                let bounds = self.remove_warm_up(&ur);
                self.per_pi[p].readings[round] = readings[p];
                self.per_pi[p].unit_readings[round] = ur;
                self.per_pi[p].warmup[round] = bounds;
            }
        }

        if rejected {
            self.consecutive_rejected += 1;
        } else {
            self.consecutive_rejected = 0;
        }
        Ok(())
    }

    fn remove_warm_up(&self, unit_readings: &[f64]) -> WarmupBounds {
        let n = unit_readings.len();
        if n == 0 {
            return WarmupBounds { begin: 0, end: 0 };
        }
        match self.config.warm_up_removal_method {
            WarmUpRemovalMethod::None => WarmupBounds { begin: 0, end: n },
            WarmUpRemovalMethod::FixedPercentage(pct) => {
                let begin = (pct.clamp(0.0, 1.0) * n as f64).round() as usize;
                WarmupBounds {
                    begin: begin.min(n),
                    end: n,
                }
            }
            WarmUpRemovalMethod::Edm { percent, degree } => {
                match changepoint::find_one_changepoint(unit_readings, n, percent, degree) {
                    Ok(cut) => WarmupBounds { begin: cut, end: n },
                    Err(_) => WarmupBounds { begin: 0, end: n },
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::WorkloadConfigBuilder;

    fn workload(n_pi: usize) -> Workload {
        let config = WorkloadConfigBuilder::new()
            .num_of_pi(n_pi)
            .build()
            .unwrap();
        let infos = (0..n_pi)
            .map(|i| PiInfo::new(format!("pi{i}"), "unit"))
            .collect();
        Workload::new("test", config, infos).unwrap()
    }

    #[test]
    fn append_then_overwrite_round() {
        let mut wl = workload(1);
        wl.import_benchmark_results(0, 10.0, 1_000_000, vec![42.0], vec![vec![1.0, 2.0, 3.0]])
            .unwrap();
        assert_eq!(wl.num_of_rounds(), 1);
        assert_eq!(wl.per_pi(0).readings, vec![42.0]);

        wl.import_benchmark_results(0, 10.0, 1_000_000, vec![100.0], vec![vec![9.0, 9.0]])
            .unwrap();
        assert_eq!(wl.num_of_rounds(), 1, "overwrite must not append");
        assert_eq!(wl.per_pi(0).readings, vec![100.0]);
    }

    #[test]
    fn warm_up_removal_none_keeps_everything() {
        let mut wl = workload(1);
        wl.import_benchmark_results(0, 1.0, 1_000_000, vec![1.0], vec![vec![1.0, 2.0, 3.0, 4.0]])
            .unwrap();
        let bounds = wl.per_pi(0).warmup[0];
        assert_eq!(bounds, WarmupBounds { begin: 0, end: 4 });
    }

    #[test]
    fn warm_up_removal_fixed_percentage_trims_leading_fraction() {
        let config = WorkloadConfigBuilder::new()
            .num_of_pi(1)
            .warm_up_removal_method(WarmUpRemovalMethod::FixedPercentage(0.25))
            .build()
            .unwrap();
        let mut wl = Workload::new("t", config, vec![PiInfo::new("p", "u")]).unwrap();
        wl.import_benchmark_results(
            0,
            1.0,
            1_000_000,
            vec![1.0],
            vec![vec![0.0; 8]],
        )
        .unwrap();
        assert_eq!(wl.per_pi(0).warmup[0], WarmupBounds { begin: 2, end: 8 });
    }

    #[test]
    fn rejects_mismatched_reading_counts() {
        let mut wl = workload(2);
        let err = wl
            .import_benchmark_results(0, 1.0, 1_000, vec![1.0], vec![vec![], vec![]])
            .unwrap_err();
        assert!(matches!(err, PilotError::WrongParam(_)));
    }

    #[test]
    fn rejects_unit_readings_of_differing_length_across_pis() {
        let mut wl = workload(2);
        let err = wl
            .import_benchmark_results(
                0,
                1.0,
                1_000_000,
                vec![1.0, 2.0],
                vec![vec![0.0; 5], vec![0.0; 9]],
            )
            .unwrap_err();
        assert!(matches!(err, PilotError::WrongParam(_)));
    }

    #[test]
    fn empty_unit_readings_do_not_conflict_with_a_populated_pi() {
        let mut wl = workload(2);
        wl.import_benchmark_results(0, 1.0, 1_000_000, vec![1.0, 2.0], vec![vec![], vec![0.0; 4]])
            .unwrap();
        assert_eq!(wl.num_of_rounds(), 1);
    }

    #[test]
    fn calc_required_readings_hook_is_stored_and_retrievable() {
        let mut wl = workload(1);
        assert!(wl.calc_required_readings_func().is_none());
        wl.set_calc_required_readings_func(Box::new(|data| Some(data.len() + 1)));
        let hook = wl.calc_required_readings_func().unwrap();
        assert_eq!(hook(&[1.0, 2.0]), Some(3));
    }

    #[test]
    fn short_round_is_rejected_when_check_enabled() {
        let config = WorkloadConfigBuilder::new()
            .num_of_pi(1)
            .short_workload_check(true)
            .short_round_detection_threshold(Duration::from_millis(100))
            .build()
            .unwrap();
        let mut wl = Workload::new("t", config, vec![PiInfo::new("p", "u")]).unwrap();
        wl.import_benchmark_results(0, 1.0, 1_000_000, vec![1.0], vec![vec![]])
            .unwrap();
        assert!(wl.rounds()[0].rejected);
    }
}
