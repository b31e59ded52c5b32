// Copyright © ArkBig
//! Exercises the ambient-stack surfaces (config validation, error
//! round-tripping, baseline loading, planner overrides) end-to-end rather
//! than purely through unit tests, the way the teacher's `tests/` directory
//! checks observable behavior instead of internals.

use pilot::{
    config::WorkloadConfigBuilder, controller, pi::PiInfo, planner::PlannerDecision,
    workload::Workload, PilotError,
};
use std::io::Write;

#[test]
fn config_builder_rejects_invalid_confidence_level() {
    let err = WorkloadConfigBuilder::new()
        .num_of_pi(1)
        .confidence_level(1.5)
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        PilotError::WrongParam("confidence_level must be in [0, 1)".into())
    );
}

#[test]
fn pilot_error_exposes_stable_numeric_codes() {
    assert_eq!(PilotError::NotInit.code(), 11);
    assert_eq!(PilotError::TooManyRejectedRounds.code(), 20);
    assert!(PilotError::NotEnoughData.is_insufficient_data());
}

#[test]
fn baseline_file_round_trips_into_workload() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "piid,reading_type,mean,sample_size,variance").unwrap();
    writeln!(file, "0,0,2.0,64,0.05").unwrap();
    file.flush().unwrap();

    let config = WorkloadConfigBuilder::new().num_of_pi(1).build().unwrap();
    let mut wl = Workload::new("bench", config, vec![PiInfo::new("latency", "ms")]).unwrap();
    wl.load_baseline_file(file.path()).unwrap();

    let baseline = wl
        .baseline_for(0, pilot::ReadingType::Reading)
        .expect("baseline should be loaded");
    assert_eq!(baseline.sample_size, 64);
    assert!((baseline.mean - 2.0).abs() < 1e-9);
}

#[test]
fn work_amount_hook_bypasses_builtin_planners_entirely() {
    let config = WorkloadConfigBuilder::new()
        .num_of_pi(1)
        .work_amount_limit(1_000.0)
        .build()
        .unwrap();
    let mut wl = Workload::new("bench", config, vec![PiInfo::new("latency", "ms")]).unwrap();
    let mut hooks = controller::SessionHooks {
        next_round_work_amount: Some(Box::new(|wl: &Workload| PlannerDecision {
            need_more: wl.num_of_rounds() < 2,
            work_amount: 7.0,
        })),
        ..Default::default()
    };
    let mut seen_amounts = Vec::new();
    let mut workload_fn = |_round: usize, work_amount: f64| {
        seen_amounts.push(work_amount);
        Ok(controller::WorkloadReport {
            duration_ns: 1_000_000,
            readings: vec![1.0],
            unit_readings: vec![vec![]],
        })
    };
    controller::run_workload(&mut wl, &mut hooks, &mut workload_fn).unwrap();
    assert_eq!(seen_amounts, vec![7.0, 7.0]);
}
