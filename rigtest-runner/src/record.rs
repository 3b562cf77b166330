// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Result records for individual test case executions.
//!
//! A record is created in flight as a [`PendingRecord`] when a test case begins. Exactly one of the
//! terminal methods ([`pass`](PendingRecord::pass), [`fail`](PendingRecord::fail),
//! [`skip`](PendingRecord::skip), [`blocked`](PendingRecord::blocked) or
//! [`unknown`](PendingRecord::unknown)) consumes it and produces the finished
//! [`TestResultRecord`], so a verdict can't be set twice.

use crate::{
    outcome::{TestSignal, UnexpectedError},
    time::{CaseClock, log_line_timestamp},
};
use rigtest_metadata::{ExtraError, RecordSummary, Verdict};
use serde_json::Value;
use std::fmt;

/// Something that can explain why a test case reached its verdict.
///
/// Implemented for signals, errors and plain strings.
pub trait RecordCause {
    /// The human-readable details to store on the record.
    fn details(&self) -> Option<String>;

    /// Structured extras to store on the record.
    fn extras(&self) -> Option<Value> {
        None
    }
}

impl RecordCause for TestSignal {
    fn details(&self) -> Option<String> {
        TestSignal::details(self).map(ToOwned::to_owned)
    }

    fn extras(&self) -> Option<Value> {
        TestSignal::extras(self).cloned()
    }
}

impl RecordCause for UnexpectedError {
    fn details(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl RecordCause for str {
    fn details(&self) -> Option<String> {
        Some(self.to_owned())
    }
}

impl RecordCause for String {
    fn details(&self) -> Option<String> {
        Some(self.clone())
    }
}

/// The result of a single test case execution.
#[derive(Clone, Debug)]
pub struct TestResultRecord {
    test_name: String,
    test_class: String,
    begin_time: i64,
    log_begin_time: String,
    end_time: Option<i64>,
    log_end_time: Option<String>,
    verdict: Option<Verdict>,
    details: Option<String>,
    extras: Option<Value>,
    extra_errors: Vec<ExtraError>,
}

impl TestResultRecord {
    /// The name of the test case.
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// The tag of the test class this test case belongs to.
    pub fn test_class(&self) -> &str {
        &self.test_class
    }

    /// The time the test case began, in milliseconds since the Unix epoch.
    pub fn begin_time(&self) -> i64 {
        self.begin_time
    }

    /// The begin time, formatted for log lines.
    pub fn log_begin_time(&self) -> &str {
        &self.log_begin_time
    }

    /// The time the test case ended, in milliseconds since the Unix epoch.
    pub fn end_time(&self) -> Option<i64> {
        self.end_time
    }

    /// The end time, formatted for log lines.
    pub fn log_end_time(&self) -> Option<&str> {
        self.log_end_time.as_deref()
    }

    /// The verdict of this test case.
    ///
    /// This is `None` only while the test case is still in flight, which procedure callbacks can
    /// observe when dispatched from teardown. Records in [`TestResults`](crate::results::TestResults)
    /// always have a verdict.
    pub fn verdict(&self) -> Option<Verdict> {
        self.verdict
    }

    /// The details of the verdict: a signal message, skip reason or error text.
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Structured extras attached to the signal that produced the verdict.
    pub fn extras(&self) -> Option<&Value> {
        self.extras.as_ref()
    }

    /// Secondary errors, in the order they were recorded.
    pub fn extra_errors(&self) -> &[ExtraError] {
        &self.extra_errors
    }

    /// Records a secondary error without changing the verdict.
    pub fn add_error(&mut self, source: impl Into<String>, error: &dyn fmt::Display) {
        self.extra_errors.push(ExtraError {
            source: source.into(),
            message: error.to_string(),
        });
    }

    /// Returns the serializable form of this record.
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            test_name: self.test_name.clone(),
            test_class: self.test_class.clone(),
            begin_time: self.begin_time,
            end_time: self.end_time,
            verdict: self.verdict,
            details: self.details.clone(),
            extras: self.extras.clone(),
            extra_errors: self.extra_errors.clone(),
        }
    }
}

impl fmt::Display for TestResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = self.verdict.map_or("UNKNOWN", Verdict::as_str);
        write!(f, "{} {} {}", self.test_class, self.test_name, verdict)?;
        if let Some(details) = &self.details {
            write!(f, ": {details}")?;
        }
        Ok(())
    }
}

/// A record for a test case that is still in flight.
#[derive(Debug)]
pub struct PendingRecord {
    record: TestResultRecord,
    clock: CaseClock,
}

impl PendingRecord {
    /// Begins a new record, stamping the begin time.
    pub fn begin(test_name: impl Into<String>, test_class: impl Into<String>) -> Self {
        let clock = CaseClock::start();
        let start_time = clock.began_at();
        Self {
            record: TestResultRecord {
                test_name: test_name.into(),
                test_class: test_class.into(),
                begin_time: start_time.timestamp_millis(),
                log_begin_time: log_line_timestamp(start_time),
                end_time: None,
                log_end_time: None,
                verdict: None,
                details: None,
                extras: None,
                extra_errors: Vec::new(),
            },
            clock,
        }
    }

    /// The name of the test case.
    pub fn test_name(&self) -> &str {
        &self.record.test_name
    }

    /// The time the test case began, in milliseconds since the Unix epoch.
    pub fn begin_time(&self) -> i64 {
        self.record.begin_time
    }

    /// Returns a view of the in-flight record. Its verdict is `None`.
    pub fn as_record(&self) -> &TestResultRecord {
        &self.record
    }

    pub(crate) fn as_record_mut(&mut self) -> &mut TestResultRecord {
        &mut self.record
    }

    /// Records a secondary error.
    pub fn add_error(&mut self, source: impl Into<String>, error: &dyn fmt::Display) {
        self.record.add_error(source, error);
    }

    /// Finishes the record as passed.
    pub fn pass(self, cause: Option<&dyn RecordCause>) -> TestResultRecord {
        self.finish_with(Verdict::Pass, cause)
    }

    /// Finishes the record as failed.
    pub fn fail(self, cause: Option<&dyn RecordCause>) -> TestResultRecord {
        self.finish_with(Verdict::Fail, cause)
    }

    /// Finishes the record as skipped.
    pub fn skip<C: RecordCause + ?Sized>(self, cause: &C) -> TestResultRecord {
        self.finish(Verdict::Skip, cause.details(), cause.extras())
    }

    /// Finishes the record as blocked.
    pub fn blocked<C: RecordCause + ?Sized>(self, cause: &C) -> TestResultRecord {
        self.finish(Verdict::Blocked, cause.details(), cause.extras())
    }

    /// Finishes the record with an unexpected error.
    pub fn unknown<C: RecordCause + ?Sized>(self, error: &C) -> TestResultRecord {
        self.finish(Verdict::Error, error.details(), error.extras())
    }

    fn finish_with(self, verdict: Verdict, cause: Option<&dyn RecordCause>) -> TestResultRecord {
        match cause {
            Some(cause) => self.finish(verdict, cause.details(), cause.extras()),
            None => self.finish(verdict, None, None),
        }
    }

    fn finish(
        self,
        verdict: Verdict,
        details: Option<String>,
        extras: Option<Value>,
    ) -> TestResultRecord {
        let Self { mut record, clock } = self;
        let end_time = clock.now();
        record.end_time = Some(end_time.timestamp_millis());
        record.log_end_time = Some(log_line_timestamp(end_time));
        record.verdict = Some(verdict);
        record.details = details;
        record.extras = extras;
        record
    }
}
