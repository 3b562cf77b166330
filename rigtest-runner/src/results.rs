// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregated results for a test class run.

use crate::record::TestResultRecord;
use rigtest_metadata::{RunSummary, Verdict};

/// Every record produced by a test class run, in the order the test cases were attempted.
#[derive(Clone, Debug, Default)]
pub struct TestResults {
    requested: Vec<String>,
    records: Vec<TestResultRecord>,
}

impl TestResults {
    /// Creates an empty set of results.
    pub fn new() -> Self {
        Self::default()
    }

    /// The names of the test cases that were requested, in order.
    pub fn requested(&self) -> &[String] {
        &self.requested
    }

    /// Every record, in the order the test cases were attempted.
    pub fn records(&self) -> &[TestResultRecord] {
        &self.records
    }

    pub(crate) fn add_requested(&mut self, test_name: impl Into<String>) {
        self.requested.push(test_name.into());
    }

    /// Removes one occurrence of `test_name` from the requested list.
    ///
    /// Used for test cases whose result is suppressed.
    pub(crate) fn remove_requested(&mut self, test_name: &str) {
        if let Some(index) = self.requested.iter().position(|name| name == test_name) {
            self.requested.remove(index);
        }
    }

    /// Appends a record. Duplicate test names are allowed.
    pub fn add_record(&mut self, record: TestResultRecord) {
        self.records.push(record);
    }

    /// Records that passed.
    pub fn passed(&self) -> impl Iterator<Item = &TestResultRecord> + '_ {
        self.with_verdict(Verdict::Pass)
    }

    /// Records that failed.
    pub fn failed(&self) -> impl Iterator<Item = &TestResultRecord> + '_ {
        self.with_verdict(Verdict::Fail)
    }

    /// Records that were skipped.
    pub fn skipped(&self) -> impl Iterator<Item = &TestResultRecord> + '_ {
        self.with_verdict(Verdict::Skip)
    }

    /// Records that were blocked.
    pub fn blocked(&self) -> impl Iterator<Item = &TestResultRecord> + '_ {
        self.with_verdict(Verdict::Blocked)
    }

    /// Records that ended with an unexpected error.
    pub fn errors(&self) -> impl Iterator<Item = &TestResultRecord> + '_ {
        self.with_verdict(Verdict::Error)
    }

    /// Records for test cases that actually ran, i.e. were neither skipped nor blocked.
    pub fn executed(&self) -> impl Iterator<Item = &TestResultRecord> + '_ {
        self.records
            .iter()
            .filter(|record| record.verdict().is_some_and(Verdict::is_executed))
    }

    fn with_verdict(&self, verdict: Verdict) -> impl Iterator<Item = &TestResultRecord> + '_ {
        self.records
            .iter()
            .filter(move |record| record.verdict() == Some(verdict))
    }

    /// Returns true if no record failed or ended with an error.
    pub fn is_all_pass(&self) -> bool {
        !self
            .records
            .iter()
            .any(|record| matches!(record.verdict(), Some(Verdict::Fail | Verdict::Error)))
    }

    /// Returns counts per verdict.
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            requested: self.requested.len(),
            total: self.records.len(),
            ..RunSummary::default()
        };
        for verdict in self.records.iter().filter_map(|record| record.verdict()) {
            if verdict.is_executed() {
                summary.executed += 1;
            }
            match verdict {
                Verdict::Pass => summary.passed += 1,
                Verdict::Fail => summary.failed += 1,
                Verdict::Skip => summary.skipped += 1,
                Verdict::Blocked => summary.blocked += 1,
                Verdict::Error => summary.error += 1,
            }
        }
        summary
    }

    /// Appends another set of results to this one.
    pub fn merge(&mut self, other: TestResults) {
        self.requested.extend(other.requested);
        self.records.extend(other.records);
    }
}
