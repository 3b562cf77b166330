// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// The final classification of a test case.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// The test case passed.
    Pass,

    /// The test case failed, either through an explicit failure, an assertion or a falsy return
    /// value.
    Fail,

    /// The test case was skipped.
    Skip,

    /// The test case could not be run, typically because class setup failed.
    Blocked,

    /// The test case raised an error that wasn't a verdict signal.
    Error,
}

impl Verdict {
    /// Returns all known variants, in the order they're summarized.
    pub fn variants() -> &'static [Verdict] {
        &[
            Verdict::Pass,
            Verdict::Fail,
            Verdict::Skip,
            Verdict::Blocked,
            Verdict::Error,
        ]
    }

    /// Returns the string form of this verdict, as it appears in result lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::Skip => "SKIP",
            Verdict::Blocked => "BLOCKED",
            Verdict::Error => "ERROR",
        }
    }

    /// Returns true if a test case with this verdict was actually executed.
    ///
    /// Skipped and blocked test cases are requested but never run to completion.
    pub fn is_executed(self) -> bool {
        !matches!(self, Verdict::Skip | Verdict::Blocked)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A secondary error attached to a test case record.
///
/// Secondary errors come from teardown or procedure callbacks that failed after the primary
/// verdict was already known. They never change the verdict.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExtraError {
    /// Where the error came from, for example `teardown_test` or `on_fail`.
    pub source: String,

    /// The rendered error message.
    pub message: String,
}

/// A serializable snapshot of a single test case execution.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RecordSummary {
    /// The name of the test case.
    pub test_name: String,

    /// The tag of the test class the test case belongs to.
    pub test_class: String,

    /// The time the test case began, in milliseconds since the Unix epoch.
    pub begin_time: i64,

    /// The time the test case ended, in milliseconds since the Unix epoch.
    pub end_time: Option<i64>,

    /// The verdict. `None` only for a record that is still in flight.
    pub verdict: Option<Verdict>,

    /// Human-readable details: the signal message, skip reason or error text.
    pub details: Option<String>,

    /// Structured extras attached to the signal that produced the verdict.
    pub extras: Option<serde_json::Value>,

    /// Secondary errors, in the order they were recorded.
    #[serde(default)]
    pub extra_errors: Vec<ExtraError>,
}

/// Counts of verdicts across a test class run.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunSummary {
    /// The number of test cases requested.
    pub requested: usize,

    /// The number of test cases that were actually executed (neither skipped nor blocked).
    pub executed: usize,

    /// The number of test cases that passed.
    pub passed: usize,

    /// The number of test cases that failed.
    pub failed: usize,

    /// The number of test cases that were skipped.
    pub skipped: usize,

    /// The number of test cases that were blocked.
    pub blocked: usize,

    /// The number of test cases that raised an unexpected error.
    pub error: usize,

    /// The total number of records.
    pub total: usize,
}

impl RunSummary {
    /// Returns the count for the given verdict.
    pub fn count(&self, verdict: Verdict) -> usize {
        match verdict {
            Verdict::Pass => self.passed,
            Verdict::Fail => self.failed,
            Verdict::Skip => self.skipped,
            Verdict::Blocked => self.blocked,
            Verdict::Error => self.error,
        }
    }

    /// Returns true if no test case failed or raised an unexpected error.
    pub fn is_all_pass(&self) -> bool {
        self.failed == 0 && self.error == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Requested {}, Executed {}, Passed {}, Failed {}, Skipped {}, Blocked {}, Error {}",
            self.requested,
            self.executed,
            self.passed,
            self.failed,
            self.skipped,
            self.blocked,
            self.error,
        )
    }
}
