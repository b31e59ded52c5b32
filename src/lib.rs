// Copyright © ArkBig
//! Pilot is a benchmark-driving library: given a workload callback that
//! performs a parameterizable amount of work and reports timing and
//! per-unit measurements, it decides how many rounds — and how much work
//! per round — are needed until the estimated performance indices meet a
//! statistical quality target, or a resource limit stops it.
//!
//! The entry points are [`workload::Workload`] to describe and accumulate a
//! session, and [`controller::run_workload`] to drive it.

pub mod analytical_result;
pub mod baseline;
pub mod changepoint;
pub mod config;
pub mod controller;
pub mod error;
pub mod hypothesis;
pub mod mean;
pub mod pi;
pub mod planner;
pub mod sample_size;
pub mod stats;
pub mod workload;
pub mod wps;

pub use analytical_result::AnalyticalResult;
pub use baseline::{Baseline, ReadingType};
pub use config::{RequiredCi, WarmUpRemovalMethod, WorkloadConfig, WorkloadConfigBuilder};
pub use controller::{run_workload, SessionHooks, SessionOutcome, StopReason, WorkloadReport};
pub use error::{PilotError, Result};
pub use mean::MeanMethod;
pub use pi::PiInfo;
pub use planner::PlannerDecision;
pub use stats::CiType;
pub use workload::Workload;
