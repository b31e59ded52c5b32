// Copyright © ArkBig
//! Error taxonomy for the pilot core.
//!
//! Discriminants mirror the stable numeric error codes of the original
//! C ABI so that embedding code mapping codes 1:1 never hits a missing case.

use thiserror::Error;

/// All recoverable failures the core can report.
///
/// Programmer errors (invalid PI index, reconfiguration after data has been
/// ingested) are not represented here: they panic at the call site instead,
/// matching §7's taxonomy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PilotError {
    #[error("invalid parameter: {0}")]
    WrongParam(String),

    #[error("allocation failure")]
    NoMem,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("unknown hook kind")]
    UnknownHook,

    #[error("workload is not initialized")]
    NotInit,

    #[error("workload callback failed: {0}")]
    WlFail(String),

    #[error("session stopped: cumulative duration reached the hard limit")]
    StoppedByDurationLimit,

    #[error("session stopped: a hook requested abort")]
    StoppedByHook,

    #[error("session stopped: stop_workload() was requested")]
    StoppedByRequest,

    #[error("too many consecutive rejected rounds")]
    TooManyRejectedRounds,

    #[error("not enough data")]
    NotEnoughData,

    #[error("not enough data to satisfy the confidence interval")]
    NotEnoughDataForCi,

    #[error("no dominant segment found")]
    NoDominantSegment,

    #[error("round duration below the short-round threshold")]
    RoundTooShort,

    #[error("no significant change-point found")]
    NoChangepoint,

    #[error("not implemented")]
    NotImpl,

    #[error("linked against an incompatible version")]
    LinkedWrongVer,
}

impl PilotError {
    /// The stable numeric code from §6, for embedding code that needs the
    /// original C ABI's integer values.
    pub fn code(&self) -> i32 {
        match self {
            PilotError::WrongParam(_) => 2,
            PilotError::NoMem => 3,
            PilotError::Io(_) => 5,
            PilotError::UnknownHook => 6,
            PilotError::NotInit => 11,
            PilotError::WlFail(_) => 12,
            PilotError::StoppedByDurationLimit => 13,
            PilotError::StoppedByHook => 14,
            PilotError::StoppedByRequest => 15,
            PilotError::TooManyRejectedRounds => 20,
            PilotError::NotEnoughData => 30,
            PilotError::NotEnoughDataForCi => 31,
            PilotError::NoDominantSegment => 32,
            PilotError::RoundTooShort => 33,
            PilotError::NoChangepoint => 34,
            PilotError::NotImpl => 200,
            PilotError::LinkedWrongVer => 201,
        }
    }

    /// True for category (c) of §7: insufficient-data conditions that a
    /// planner should read as "need more rounds", not as a session failure.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            PilotError::NotEnoughData
                | PilotError::NotEnoughDataForCi
                | PilotError::NoDominantSegment
                | PilotError::NoChangepoint
        )
    }
}

impl From<csv::Error> for PilotError {
    fn from(e: csv::Error) -> Self {
        PilotError::Io(e.to_string())
    }
}

impl From<std::io::Error> for PilotError {
    fn from(e: std::io::Error) -> Self {
        PilotError::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PilotError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_match_table() {
        assert_eq!(PilotError::WrongParam(String::new()).code(), 2);
        assert_eq!(PilotError::NoMem.code(), 3);
        assert_eq!(PilotError::Io(String::new()).code(), 5);
        assert_eq!(PilotError::UnknownHook.code(), 6);
        assert_eq!(PilotError::NotInit.code(), 11);
        assert_eq!(PilotError::WlFail(String::new()).code(), 12);
        assert_eq!(PilotError::StoppedByDurationLimit.code(), 13);
        assert_eq!(PilotError::StoppedByHook.code(), 14);
        assert_eq!(PilotError::StoppedByRequest.code(), 15);
        assert_eq!(PilotError::TooManyRejectedRounds.code(), 20);
        assert_eq!(PilotError::NotEnoughData.code(), 30);
        assert_eq!(PilotError::NotEnoughDataForCi.code(), 31);
        assert_eq!(PilotError::NoDominantSegment.code(), 32);
        assert_eq!(PilotError::RoundTooShort.code(), 33);
        assert_eq!(PilotError::NoChangepoint.code(), 34);
        assert_eq!(PilotError::NotImpl.code(), 200);
        assert_eq!(PilotError::LinkedWrongVer.code(), 201);
    }

    #[test]
    fn insufficient_data_category() {
        assert!(PilotError::NotEnoughData.is_insufficient_data());
        assert!(PilotError::NotEnoughDataForCi.is_insufficient_data());
        assert!(PilotError::NoDominantSegment.is_insufficient_data());
        assert!(PilotError::NoChangepoint.is_insufficient_data());
        assert!(!PilotError::WlFail(String::new()).is_insufficient_data());
        assert!(!PilotError::StoppedByHook.is_insufficient_data());
    }

    #[test]
    fn display_is_non_empty() {
        for e in [
            PilotError::WrongParam("x".into()),
            PilotError::NoMem,
            PilotError::NotInit,
        ] {
            assert!(!e.to_string().is_empty());
        }
    }
}
