// Copyright © ArkBig
//! Optimal sample-size calculator (§4.3): given data, a desired confidence
//! interval half-width, and limits, returns the subsession size `q` that
//! should be used and the total sample count required to hit that width.

use crate::error::{PilotError, Result};
use crate::mean::MeanMethod;
use crate::stats::{self, CiType};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Result of [`optimal_sample_size`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OptSampleSize {
    pub q: usize,
    pub required_sample_size: usize,
}

/// Computes `(q, required_sample_size)` for a target CI *half-width* `e`.
///
/// For `SampleMean`, `q` is first chosen via
/// [`stats::optimal_subsession_size`]; for `BinomialProportion`, `q` is
/// fixed at 1. The required sample size is then
/// `ceil(var · (T / e)^2)` with `T` the Student-t quantile at `h−1` d.o.f.
pub fn optimal_sample_size(
    x: &[f64],
    n: usize,
    e: f64,
    mean_method: MeanMethod,
    ci_type: CiType,
    confidence_level: f64,
    rho_max: f64,
) -> Result<OptSampleSize> {
    let q = match ci_type {
        CiType::SampleMean => {
            stats::optimal_subsession_size(x, n, mean_method, rho_max)
                .ok_or(PilotError::NotEnoughDataForCi)?
        }
        CiType::BinomialProportion => 1,
    };
    let h = n / q;
    if h < 2 {
        return Err(PilotError::NotEnoughDataForCi);
    }
    let alpha = 1.0 - confidence_level;
    let dist = StudentsT::new(0.0, 1.0, (h - 1) as f64).expect("invalid degrees of freedom");
    let t = dist.inverse_cdf(1.0 - alpha / 2.0);

    let sample_mean = mean_method.mean(x);
    let var = match ci_type {
        CiType::SampleMean => stats::var(x, n, q, sample_mean, mean_method),
        CiType::BinomialProportion => sample_mean * (1.0 - sample_mean),
    };

    let required = (var * (t / e).powi(2)).ceil();
    if !required.is_finite() || required < 0.0 {
        return Err(PilotError::NotEnoughDataForCi);
    }
    Ok(OptSampleSize {
        q,
        required_sample_size: required as usize,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    const FERRARI: [f64; 48] = [
        1.21, 1.67, 1.71, 1.53, 2.03, 2.15, 1.88, 1.47, 1.47, 1.73, 1.46, 1.95, 1.91, 1.69, 1.39,
        1.93, 1.93, 1.58, 1.25, 1.78, 2.06, 2.04, 1.49, 1.55, 2.22, 2.06, 1.71, 1.73, 1.68, 1.57,
        1.66, 1.95, 1.96, 1.82, 2.01, 2.04, 1.68, 2.09, 1.54, 1.77, 1.74, 1.95, 1.43, 2.10, 1.86,
        2.06, 1.90, 2.16,
    ];

    #[test]
    fn ferrari_scenario() {
        let mean = MeanMethod::Arithmetic.mean(&FERRARI);
        let e = 0.1 * mean / 2.0;
        let result = optimal_sample_size(
            &FERRARI,
            48,
            e,
            MeanMethod::Arithmetic,
            CiType::SampleMean,
            0.95,
            0.1,
        )
        .unwrap();
        assert_eq!(result.q, 4);
        assert_eq!(result.required_sample_size, 34);
    }

    #[test]
    fn monotonicity_larger_width_needs_fewer_samples() {
        let mean = MeanMethod::Arithmetic.mean(&FERRARI);
        let tight = optimal_sample_size(
            &FERRARI,
            48,
            0.05 * mean,
            MeanMethod::Arithmetic,
            CiType::SampleMean,
            0.95,
            0.1,
        )
        .unwrap();
        let loose = optimal_sample_size(
            &FERRARI,
            48,
            0.2 * mean,
            MeanMethod::Arithmetic,
            CiType::SampleMean,
            0.95,
            0.1,
        )
        .unwrap();
        assert!(loose.required_sample_size <= tight.required_sample_size);
    }
}
