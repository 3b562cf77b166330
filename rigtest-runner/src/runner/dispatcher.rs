// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch of procedure hooks (`on_pass`, `on_fail` and friends).
//!
//! A procedure hook runs after a test case's verdict is known. Whatever the hook raises is
//! contained: it is recorded against the test case as a secondary error, and the run continues.
//! The one exception is an abort-all signal, which is handed back to the caller so that aborting
//! works from any hook.

use super::{Abort, TEST_CASE_TOKEN, TestClass, TestClassContext};
use crate::{
    outcome::{Raised, TestSignal, catch_raised},
    record::TestResultRecord,
};
use std::fmt;
use tracing::{error, info};

/// A procedure hook on [`TestClass`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Procedure {
    /// [`TestClass::on_pass`].
    OnPass,

    /// [`TestClass::on_fail`].
    OnFail,

    /// [`TestClass::on_skip`].
    OnSkip,

    /// [`TestClass::on_blocked`].
    OnBlocked,

    /// [`TestClass::on_exception`].
    OnException,
}

impl Procedure {
    /// The name of the hook. Errors raised by the hook are recorded under this name.
    pub fn name(self) -> &'static str {
        match self {
            Self::OnPass => "on_pass",
            Self::OnFail => "on_fail",
            Self::OnSkip => "on_skip",
            Self::OnBlocked => "on_blocked",
            Self::OnException => "on_exception",
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An abort-all signal raised from a hook.
#[derive(Debug)]
pub(super) struct AbortAllRequest {
    pub(super) reason: String,
}

impl From<AbortAllRequest> for Abort {
    fn from(request: AbortAllRequest) -> Self {
        Abort::All {
            reason: request.reason,
        }
    }
}

impl<T: TestClass> TestClassContext<T> {
    /// Runs the bookkeeping for `procedure`, then the user's hook.
    pub(super) fn dispatch(
        &mut self,
        procedure: Procedure,
        record: &mut TestResultRecord,
    ) -> Result<(), AbortAllRequest> {
        self.procedure_bookkeeping(procedure, record);

        let test_name = record.test_name().to_owned();
        let begin_time = record.begin_time();
        let instance = &mut self.instance;
        let result = catch_raised(|| match procedure {
            Procedure::OnPass => instance.on_pass(&test_name, begin_time),
            Procedure::OnFail => instance.on_fail(&test_name, begin_time),
            Procedure::OnSkip => instance.on_skip(&test_name, begin_time),
            Procedure::OnBlocked => instance.on_blocked(&test_name, begin_time),
            Procedure::OnException => instance.on_exception(&test_name, begin_time),
        });

        match result {
            Ok(()) => Ok(()),
            Err(Raised::Signal(TestSignal::AbortAll { reason })) => Err(AbortAllRequest { reason }),
            Err(raised) => {
                error!(
                    "error executing {procedure} for {test_name} in {}: {raised}",
                    self.tag
                );
                record.add_error(procedure.name(), &raised);
                Ok(())
            }
        }
    }

    fn procedure_bookkeeping(&mut self, procedure: Procedure, record: &TestResultRecord) {
        let test_name = record.test_name();
        let verdict = record.verdict().map_or("UNKNOWN", |verdict| verdict.as_str());
        match procedure {
            Procedure::OnPass => {
                if let Some(details) = record.details() {
                    info!("{details}");
                }
                info!("{TEST_CASE_TOKEN} {test_name} {verdict}");
            }
            Procedure::OnFail => {
                if let Some(details) = record.details() {
                    error!("{details}");
                }
                info!("{TEST_CASE_TOKEN} {test_name} {verdict}");
                let sources = self.instance.diagnostic_sources();
                if !sources.is_empty() {
                    self.diagnostics
                        .collect(&sources, test_name, record.begin_time());
                }
            }
            Procedure::OnSkip => {
                info!("{TEST_CASE_TOKEN} {test_name} {verdict}");
                info!("reason to skip: {}", record.details().unwrap_or_default());
            }
            Procedure::OnBlocked => {
                info!("{TEST_CASE_TOKEN} {test_name} {verdict}");
                info!("reason to block: {}", record.details().unwrap_or_default());
            }
            Procedure::OnException => {
                let details = record
                    .extra_errors()
                    .last()
                    .map(|extra| extra.message.as_str())
                    .or(record.details())
                    .unwrap_or_default();
                error!("exception in {test_name}: {details}");
            }
        }
    }
}
