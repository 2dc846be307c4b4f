//! Execution status of a QRS task run, and its classification.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Execution status as reported by QRS (`lastExecutionResult.status`).
///
/// QRS sends this as a plain integer. Codes we do not know about are kept
/// in `Other` so they can still be logged verbatim.
///
/// `Other` is meant for codes outside 0..=14. A known code wrapped in `Other`
/// anyway (`Other(7)`) compares, hashes, names and classifies exactly like its
/// named variant: equality and classification go through `code()`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ExecutionStatus {
    NeverStarted,
    Triggered,
    Started,
    Queued,
    AbortInitiated,
    Aborting,
    Aborted,
    FinishedSuccess,
    FinishedFail,
    Skipped,
    Retry,
    Error,
    Reset,
    DistributionQueue,
    DistributionRunning,
    Other(i32),
}

/// How a final status should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalOutcome {
    Success,
    Failure,
}

/// The three disjoint classes of [`ExecutionStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// No further transition is expected for this run.
    Final(FinalOutcome),

    /// Still moving through the Qlik Sense pipeline.
    Intermediate,

    /// Not part of either list (NeverStarted, Skipped, Reset, unknown codes).
    Unclassified,
}

impl ExecutionStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::NeverStarted,
            1 => Self::Triggered,
            2 => Self::Started,
            3 => Self::Queued,
            4 => Self::AbortInitiated,
            5 => Self::Aborting,
            6 => Self::Aborted,
            7 => Self::FinishedSuccess,
            8 => Self::FinishedFail,
            9 => Self::Skipped,
            10 => Self::Retry,
            11 => Self::Error,
            12 => Self::Reset,
            13 => Self::DistributionQueue,
            14 => Self::DistributionRunning,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::NeverStarted => 0,
            Self::Triggered => 1,
            Self::Started => 2,
            Self::Queued => 3,
            Self::AbortInitiated => 4,
            Self::Aborting => 5,
            Self::Aborted => 6,
            Self::FinishedSuccess => 7,
            Self::FinishedFail => 8,
            Self::Skipped => 9,
            Self::Retry => 10,
            Self::Error => 11,
            Self::Reset => 12,
            Self::DistributionQueue => 13,
            Self::DistributionRunning => 14,
            Self::Other(code) => code,
        }
    }

    /// `Other(known code)` mapped back to its named variant.
    fn canonical(self) -> Self {
        Self::from_code(self.code())
    }

    pub fn name(self) -> &'static str {
        match self.canonical() {
            Self::NeverStarted => "NeverStarted",
            Self::Triggered => "Triggered",
            Self::Started => "Started",
            Self::Queued => "Queued",
            Self::AbortInitiated => "AbortInitiated",
            Self::Aborting => "Aborting",
            Self::Aborted => "Aborted",
            Self::FinishedSuccess => "FinishedSuccess",
            Self::FinishedFail => "FinishedFail",
            Self::Skipped => "Skipped",
            Self::Retry => "Retry",
            Self::Error => "Error",
            Self::Reset => "Reset",
            Self::DistributionQueue => "DistributionQueue",
            Self::DistributionRunning => "DistributionRunning",
            Self::Other(_) => "Unknown",
        }
    }

    /// The classification table. Router and queue both go through here.
    pub fn classify(self) -> StatusClass {
        match self.canonical() {
            Self::FinishedSuccess => StatusClass::Final(FinalOutcome::Success),
            Self::Aborted | Self::FinishedFail | Self::Error => {
                StatusClass::Final(FinalOutcome::Failure)
            }
            Self::Triggered
            | Self::Started
            | Self::Queued
            | Self::AbortInitiated
            | Self::Aborting
            | Self::Retry
            | Self::DistributionQueue
            | Self::DistributionRunning => StatusClass::Intermediate,
            Self::NeverStarted | Self::Skipped | Self::Reset | Self::Other(_) => {
                StatusClass::Unclassified
            }
        }
    }

    pub fn is_final(self) -> bool {
        matches!(self.classify(), StatusClass::Final(_))
    }

    pub fn is_intermediate(self) -> bool {
        matches!(self.classify(), StatusClass::Intermediate)
    }
}

/// Is this status final (Aborted, FinishedSuccess, FinishedFail, Error)?
pub fn is_final_state(status: ExecutionStatus) -> bool {
    status.is_final()
}

/// Is this status one where the run is still in progress?
pub fn is_intermediate_state(status: ExecutionStatus) -> bool {
    status.is_intermediate()
}

impl PartialEq for ExecutionStatus {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for ExecutionStatus {}

impl Hash for ExecutionStatus {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code().hash(state);
    }
}

impl From<i32> for ExecutionStatus {
    fn from(code: i32) -> Self {
        Self::from_code(code)
    }
}

impl From<ExecutionStatus> for i32 {
    fn from(status: ExecutionStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::aborted(6, FinalOutcome::Failure)]
    #[case::finished_success(7, FinalOutcome::Success)]
    #[case::finished_fail(8, FinalOutcome::Failure)]
    #[case::error(11, FinalOutcome::Failure)]
    fn final_codes_map_to_outcome(#[case] code: i32, #[case] expected: FinalOutcome) {
        let status = ExecutionStatus::from_code(code);
        assert_eq!(status.classify(), StatusClass::Final(expected));
    }

    #[rstest]
    #[case::triggered(1)]
    #[case::started(2)]
    #[case::queued(3)]
    #[case::abort_initiated(4)]
    #[case::aborting(5)]
    #[case::retry(10)]
    #[case::distribution_queue(13)]
    #[case::distribution_running(14)]
    fn intermediate_codes(#[case] code: i32) {
        assert!(is_intermediate_state(ExecutionStatus::from_code(code)));
    }

    #[rstest]
    #[case::never_started(0)]
    #[case::skipped(9)]
    #[case::reset(12)]
    #[case::unknown(42)]
    #[case::negative(-1)]
    fn unclassified_codes(#[case] code: i32) {
        let status = ExecutionStatus::from_code(code);
        assert_eq!(status.classify(), StatusClass::Unclassified);
    }

    #[test]
    fn classification_is_total_and_disjoint() {
        for code in 0..=14 {
            let status = ExecutionStatus::from_code(code);
            let is_final = is_final_state(status);
            let is_intermediate = is_intermediate_state(status);
            assert!(!(is_final && is_intermediate), "code {code} is in both classes");

            let unclassified = status.classify() == StatusClass::Unclassified;
            let classes = [is_final, is_intermediate, unclassified];
            assert_eq!(classes.iter().filter(|c| **c).count(), 1, "code {code}");
        }
    }

    #[test]
    fn codes_roundtrip_through_enum() {
        for code in -2..=20 {
            assert_eq!(ExecutionStatus::from_code(code).code(), code);
        }
    }

    #[test]
    fn serializes_as_integer() {
        let s = serde_json::to_string(&ExecutionStatus::DistributionQueue).unwrap();
        assert_eq!(s, "13");

        let back: ExecutionStatus = serde_json::from_str("8").unwrap();
        assert_eq!(back, ExecutionStatus::FinishedFail);
    }

    #[test]
    fn other_wrapping_a_known_code_behaves_like_the_named_variant() {
        let wrapped = ExecutionStatus::Other(7);

        assert_eq!(wrapped, ExecutionStatus::FinishedSuccess);
        assert_eq!(wrapped.classify(), StatusClass::Final(FinalOutcome::Success));
        assert_eq!(wrapped.name(), "FinishedSuccess");

        let mut seen = std::collections::HashSet::new();
        seen.insert(ExecutionStatus::FinishedSuccess);
        assert!(seen.contains(&wrapped));

        assert_ne!(ExecutionStatus::Other(99), ExecutionStatus::Other(98));
        assert!(!ExecutionStatus::Other(99).is_final());
    }

    #[test]
    fn display_includes_name_and_code() {
        assert_eq!(ExecutionStatus::Queued.to_string(), "Queued(3)");
        assert_eq!(ExecutionStatus::Other(99).to_string(), "Unknown(99)");
    }
}
