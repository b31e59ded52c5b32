// Copyright © ArkBig
//! Performance-index (PI) metadata and the per-PI record that replaces the
//! original C ABI's parallel pointer arrays (§9).

use crate::mean::MeanMethod;
use crate::stats::CiType;

/// A display formatter applied only to presentation fields of the
/// analytical-result snapshot; never to the stored raw data.
pub type Formatter = Box<dyn Fn(f64) -> f64 + Send + Sync>;

/// Static, per-PI configuration. Immutable once the first round has been
/// ingested (§3).
pub struct PiInfo {
    pub name: String,
    pub unit: String,
    pub reading_fmt: Option<Formatter>,
    pub unit_reading_fmt: Option<Formatter>,
    pub reading_must_satisfy: bool,
    pub unit_reading_must_satisfy: bool,
    pub reading_mean_method: MeanMethod,
    pub unit_reading_mean_method: MeanMethod,
    pub reading_ci_type: CiType,
}

impl PiInfo {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            reading_fmt: None,
            unit_reading_fmt: None,
            reading_must_satisfy: true,
            unit_reading_must_satisfy: false,
            reading_mean_method: MeanMethod::Arithmetic,
            unit_reading_mean_method: MeanMethod::Arithmetic,
            reading_ci_type: CiType::SampleMean,
        }
    }

    pub fn with_must_satisfy(mut self, reading: bool, unit_reading: bool) -> Self {
        self.reading_must_satisfy = reading;
        self.unit_reading_must_satisfy = unit_reading;
        self
    }

    pub fn with_mean_methods(mut self, reading: MeanMethod, unit_reading: MeanMethod) -> Self {
        self.reading_mean_method = reading;
        self.unit_reading_mean_method = unit_reading;
        self
    }

    pub fn with_ci_type(mut self, ci_type: CiType) -> Self {
        self.reading_ci_type = ci_type;
        self
    }

    pub fn with_reading_fmt(mut self, f: Formatter) -> Self {
        self.reading_fmt = Some(f);
        self
    }

    pub fn with_unit_reading_fmt(mut self, f: Formatter) -> Self {
        self.unit_reading_fmt = Some(f);
        self
    }

    pub(crate) fn format_reading(&self, v: f64) -> f64 {
        self.reading_fmt.as_ref().map_or(v, |f| f(v))
    }

    pub(crate) fn format_unit_reading(&self, v: f64) -> f64 {
        self.unit_reading_fmt.as_ref().map_or(v, |f| f(v))
    }
}

/// Warm-up boundary within a round's unit-reading vector: the retained
/// slice is `unit_readings[begin..end]`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct WarmupBounds {
    pub begin: usize,
    pub end: usize,
}

/// Everything the container stores for a single PI, aligned by round index
/// with the workload's round records.
#[derive(Default)]
pub struct PerPi {
    pub info_index: usize,
    /// `readings[r]` is PI's reading for round `r`.
    pub readings: Vec<f64>,
    /// `unit_readings[r]` is PI's full (pre-warm-up-removal) unit-reading
    /// vector for round `r`.
    pub unit_readings: Vec<Vec<f64>>,
    /// `warmup[r]` is the retained slice bounds within `unit_readings[r]`.
    pub warmup: Vec<WarmupBounds>,
}

impl PerPi {
    pub fn new(info_index: usize) -> Self {
        Self {
            info_index,
            ..Default::default()
        }
    }

    /// Readings of non-rejected rounds only, in round order.
    pub fn accepted_readings<'a>(&'a self, rejected: &'a [bool]) -> Vec<f64> {
        self.readings
            .iter()
            .zip(rejected)
            .filter(|(_, r)| !**r)
            .map(|(v, _)| *v)
            .collect()
    }

    /// Post-warm-up-removal unit readings of non-rejected rounds,
    /// flattened into a single sequence.
    pub fn accepted_unit_readings(&self, rejected: &[bool]) -> Vec<f64> {
        let mut out = Vec::new();
        for (r, ur) in self.unit_readings.iter().enumerate() {
            if rejected[r] {
                continue;
            }
            let bounds = self.warmup[r];
            out.extend_from_slice(&ur[bounds.begin..bounds.end]);
        }
        out
    }
}
