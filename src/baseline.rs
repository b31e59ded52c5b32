// Copyright © ArkBig
//! Baseline data (§3, §6): per-(PI, reading-type) mean/sample-size/variance
//! triples used by the comparison planner, settable programmatically or
//! loaded from a CSV file.

use crate::error::{PilotError, Result};
use std::path::Path;

/// Which statistic a baseline entry refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadingType {
    Reading,
    UnitReading,
    Wps,
}

impl ReadingType {
    fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(ReadingType::Reading),
            1 => Ok(ReadingType::UnitReading),
            2 => Ok(ReadingType::Wps),
            other => Err(PilotError::Io(format!(
                "unknown reading-type code {other} in baseline file"
            ))),
        }
    }
}

/// A single baseline observation to compare future rounds against.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Baseline {
    pub piid: usize,
    pub reading_type: ReadingType,
    pub mean: f64,
    pub sample_size: usize,
    pub variance: f64,
}

/// Parses a baseline CSV: one header line, then one data row per
/// `(piid, reading_type)` with columns `piid, reading_type, mean,
/// sample_size, variance`. Any parse failure yields `ERR_IO`.
pub fn load_baseline_file(path: impl AsRef<Path>) -> Result<Vec<Baseline>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let mut out = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.len() < 5 {
            return Err(PilotError::Io(format!(
                "baseline row has {} columns, need 5",
                record.len()
            )));
        }
        let parse_usize = |s: &str| -> Result<usize> {
            s.trim()
                .parse::<usize>()
                .map_err(|e| PilotError::Io(e.to_string()))
        };
        let parse_f64 = |s: &str| -> Result<f64> {
            s.trim()
                .parse::<f64>()
                .map_err(|e| PilotError::Io(e.to_string()))
        };
        let piid = parse_usize(&record[0])?;
        let rt_code: u8 = parse_usize(&record[1])? as u8;
        let reading_type = ReadingType::from_code(rt_code)?;
        let mean = parse_f64(&record[2])?;
        let sample_size = parse_usize(&record[3])?;
        let variance = parse_f64(&record[4])?;
        out.push(Baseline {
            piid,
            reading_type,
            mean,
            sample_size,
            variance,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{contents}").unwrap();
        f
    }

    #[test]
    fn parses_a_well_formed_file() {
        let f = write_csv(
            "piid,reading_type,mean,sample_size,variance\n\
             0,0,1.75,48,0.073\n\
             0,1,3.2,900,0.5\n\
             0,2,0.5,20,0.01\n",
        );
        let baselines = load_baseline_file(f.path()).unwrap();
        assert_eq!(baselines.len(), 3);
        assert_eq!(baselines[0].reading_type, ReadingType::Reading);
        assert_eq!(baselines[1].reading_type, ReadingType::UnitReading);
        assert_eq!(baselines[2].reading_type, ReadingType::Wps);
        assert_eq!(baselines[0].sample_size, 48);
    }

    #[test]
    fn malformed_row_is_io_error() {
        let f = write_csv("piid,reading_type,mean,sample_size,variance\nnot_a_number,0,1.0,1,1.0\n");
        let err = load_baseline_file(f.path()).unwrap_err();
        assert!(matches!(err, PilotError::Io(_)));
    }
}
