// Copyright © ArkBig
//! Workload configuration and its builder (§3, §4.7).
//!
//! Assembled the same defaulted-fields-then-`build()`-validates shape the
//! teacher crate uses for its CLI arguments struct, so embedding code
//! configures a session the way the original binary configures a run.

use crate::error::{PilotError, Result};
use std::time::Duration;

/// How a PI's unit readings should be trimmed of their leading,
/// non-stationary warm-up phase.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WarmUpRemovalMethod {
    #[default]
    None,
    FixedPercentage(f64),
    Edm {
        percent: f64,
        degree: i32,
    },
}

/// Which form of required confidence-interval width is active. At most one
/// of the two is meaningful at a time (§3's "negative means ignore").
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RequiredCi {
    #[default]
    None,
    FractionOfMean(f64),
    Absolute(f64),
}

impl RequiredCi {
    /// Resolves the CI half-width target for a PI whose current mean is
    /// `mean`, or `None` if no requirement is active.
    pub fn half_width(&self, mean: f64) -> Option<f64> {
        match self {
            RequiredCi::None => None,
            RequiredCi::FractionOfMean(frac) => Some(frac * mean.abs() / 2.0),
            RequiredCi::Absolute(v) => Some(v / 2.0),
        }
    }
}

/// Static session configuration (§3's "Workload configuration" entity).
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    pub num_of_pi: usize,
    pub init_work_amount: f64,
    /// Upper bound on work amount per round; `0.0` means the workload has
    /// no work-amount concept.
    pub work_amount_limit: f64,
    pub required_ci: RequiredCi,
    pub autocorrelation_coefficient_limit: f64,
    pub min_sample_size: usize,
    pub session_desired_duration: Duration,
    pub session_duration_limit: Duration,
    pub short_round_detection_threshold: Duration,
    pub short_workload_check: bool,
    pub warm_up_removal_method: WarmUpRemovalMethod,
    pub wps_enabled: bool,
    pub wps_must_satisfy: bool,
    pub confidence_level: f64,
    pub max_consecutive_rejected_rounds: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            num_of_pi: 0,
            init_work_amount: 1.0,
            work_amount_limit: 0.0,
            required_ci: RequiredCi::None,
            autocorrelation_coefficient_limit: 0.1,
            min_sample_size: 200,
            session_desired_duration: Duration::from_secs(0),
            session_duration_limit: Duration::from_secs(0),
            short_round_detection_threshold: Duration::from_millis(0),
            short_workload_check: false,
            warm_up_removal_method: WarmUpRemovalMethod::None,
            wps_enabled: false,
            wps_must_satisfy: false,
            confidence_level: 0.95,
            max_consecutive_rejected_rounds: 5,
        }
    }
}

/// Builder for [`WorkloadConfig`]; `build()` validates and returns
/// `Err(PilotError::WrongParam(..))` on inconsistent input.
#[derive(Debug, Clone, Default)]
pub struct WorkloadConfigBuilder {
    config: WorkloadConfig,
}

impl WorkloadConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_of_pi(mut self, n: usize) -> Self {
        self.config.num_of_pi = n;
        self
    }

    pub fn init_work_amount(mut self, v: f64) -> Self {
        self.config.init_work_amount = v;
        self
    }

    pub fn work_amount_limit(mut self, v: f64) -> Self {
        self.config.work_amount_limit = v;
        self
    }

    pub fn required_confidence_interval(mut self, fraction_of_mean: f64, absolute: f64) -> Self {
        self.config.required_ci = if fraction_of_mean >= 0.0 {
            RequiredCi::FractionOfMean(fraction_of_mean)
        } else if absolute >= 0.0 {
            RequiredCi::Absolute(absolute)
        } else {
            RequiredCi::None
        };
        self
    }

    pub fn autocorrelation_coefficient_limit(mut self, v: f64) -> Self {
        self.config.autocorrelation_coefficient_limit = v;
        self
    }

    pub fn min_sample_size(mut self, v: usize) -> Self {
        self.config.min_sample_size = v;
        self
    }

    pub fn session_desired_duration(mut self, v: Duration) -> Self {
        self.config.session_desired_duration = v;
        self
    }

    pub fn session_duration_limit(mut self, v: Duration) -> Self {
        self.config.session_duration_limit = v;
        self
    }

    pub fn short_round_detection_threshold(mut self, v: Duration) -> Self {
        self.config.short_round_detection_threshold = v;
        self
    }

    pub fn short_workload_check(mut self, v: bool) -> Self {
        self.config.short_workload_check = v;
        self
    }

    pub fn warm_up_removal_method(mut self, v: WarmUpRemovalMethod) -> Self {
        self.config.warm_up_removal_method = v;
        self
    }

    pub fn wps_analysis(mut self, enabled: bool, must_satisfy: bool) -> Self {
        self.config.wps_enabled = enabled;
        self.config.wps_must_satisfy = must_satisfy;
        self
    }

    pub fn confidence_level(mut self, v: f64) -> Self {
        self.config.confidence_level = v;
        self
    }

    pub fn max_consecutive_rejected_rounds(mut self, v: usize) -> Self {
        self.config.max_consecutive_rejected_rounds = v;
        self
    }

    pub fn build(self) -> Result<WorkloadConfig> {
        let c = self.config;
        if c.num_of_pi == 0 {
            return Err(PilotError::WrongParam(
                "num_of_pi must be greater than zero".into(),
            ));
        }
        if c.work_amount_limit < 0.0 {
            return Err(PilotError::WrongParam(
                "work_amount_limit must not be negative".into(),
            ));
        }
        if let RequiredCi::FractionOfMean(f) = c.required_ci {
            if f < 0.0 {
                return Err(PilotError::WrongParam(
                    "fraction_of_mean must not be negative".into(),
                ));
            }
        }
        if let RequiredCi::Absolute(v) = c.required_ci {
            if v < 0.0 {
                return Err(PilotError::WrongParam(
                    "absolute CI requirement must not be negative".into(),
                ));
            }
        }
        if !(0.0..1.0).contains(&c.confidence_level) {
            return Err(PilotError::WrongParam(
                "confidence_level must be in [0, 1)".into(),
            ));
        }
        Ok(c)
    }
}
