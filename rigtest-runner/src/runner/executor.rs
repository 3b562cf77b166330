// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The executor for individual test cases.
//!
//! A test case goes through setup, its body and teardown. Teardown runs no matter how setup or
//! the body ended. Only then is the outcome classified into a verdict, the matching procedure
//! hooks dispatched and the record added to the results.

use super::{
    Abort, Procedure, TEST_CASE_TOKEN, TestArgs, TestClass, TestClassContext,
    dispatcher::AbortAllRequest,
};
use crate::{
    errors::DisplayErrorChain,
    outcome::{
        IntoTestReturn, Raised, TestError, TestReturn, TestSignal, UnexpectedError, catch_raised,
    },
    record::{PendingRecord, TestResultRecord},
};
use std::fmt;
use tracing::{debug, error, info};

/// The phases a test case goes through, in order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum TestCasePhase {
    /// The record has been created but nothing has run yet.
    NotStarted,

    /// [`TestClass::setup_test`] is running.
    Setup,

    /// The test body is running.
    Running,

    /// [`TestClass::teardown_test`] is running.
    Teardown,

    /// The outcome has been classified. This is the final phase.
    Classified,
}

impl fmt::Display for TestCasePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not started",
            Self::Setup => "setup",
            Self::Running => "running",
            Self::Teardown => "teardown",
            Self::Classified => "classified",
        };
        f.write_str(s)
    }
}

struct PhaseTracker<'a> {
    test_name: &'a str,
    phase: TestCasePhase,
}

impl<'a> PhaseTracker<'a> {
    fn new(test_name: &'a str) -> Self {
        Self {
            test_name,
            phase: TestCasePhase::NotStarted,
        }
    }

    fn enter(&mut self, next: TestCasePhase) {
        debug_assert!(next > self.phase, "phases only move forward");
        debug!(
            test_name = self.test_name,
            "test case phase: {} -> {next}", self.phase
        );
        self.phase = next;
    }
}

/// How a test case ended, before classification.
#[derive(Debug)]
enum Termination {
    Signal(TestSignal),
    Assertion(String),
    Unexpected(UnexpectedError),
    Returned(TestReturn),
}

impl From<Result<TestReturn, Raised>> for Termination {
    fn from(result: Result<TestReturn, Raised>) -> Self {
        match result {
            Ok(value) => Self::Returned(value),
            Err(Raised::Signal(signal)) => Self::Signal(signal),
            Err(Raised::Assertion(message)) => Self::Assertion(message),
            Err(Raised::Unexpected(error)) => Self::Unexpected(error),
        }
    }
}

const ON_PASS: &[Procedure] = &[Procedure::OnPass];
const ON_FAIL: &[Procedure] = &[Procedure::OnFail];
const ON_SKIP: &[Procedure] = &[Procedure::OnSkip];
const ON_BLOCKED: &[Procedure] = &[Procedure::OnBlocked];
// An unexpected error is always also a failure.
const ON_EXCEPTION_THEN_FAIL: &[Procedure] = &[Procedure::OnException, Procedure::OnFail];

/// What to do with a classified test case.
enum Classified {
    Record {
        record: TestResultRecord,
        procedures: &'static [Procedure],
        abort: Option<Abort>,
    },
    Silent,
}

impl<T: TestClass> TestClassContext<T> {
    /// Executes one test case and adds its record to the results.
    ///
    /// `body` is called exactly once with `args`, between [`TestClass::setup_test`] and
    /// [`TestClass::teardown_test`], unless setup fails. Returns an [`Abort`] if the test case asked
    /// for the class or the run to stop; its record has been added by then.
    pub fn exec_one_testcase<F, R>(
        &mut self,
        test_name: &str,
        body: F,
        args: &TestArgs,
    ) -> Result<(), Abort>
    where
        F: FnOnce(&mut Self, &TestArgs) -> Result<R, TestError>,
        R: IntoTestReturn,
    {
        let mut pending = PendingRecord::begin(test_name, &self.tag);
        let mut phase = PhaseTracker::new(test_name);
        info!("{TEST_CASE_TOKEN} {test_name}");

        phase.enter(TestCasePhase::Setup);
        // Generated test cases run nested inside their trigger's body.
        let outer_test_name = self.current_test_name.replace(test_name.to_owned());
        let instance = &mut self.instance;
        let body_result = match catch_raised(|| instance.setup_test(test_name)) {
            Ok(true) => {
                phase.enter(TestCasePhase::Running);
                catch_raised(|| body(self, args).map(IntoTestReturn::into_test_return))
            }
            // The body never ran, so a pass raised from setup can't count as one.
            Ok(false) | Err(Raised::Signal(TestSignal::Pass { .. })) => {
                Err(Raised::Assertion(format!("Setup for {test_name} failed.")))
            }
            Err(raised) => Err(raised),
        };
        let mut termination = Termination::from(body_result);

        phase.enter(TestCasePhase::Teardown);
        let instance = &mut self.instance;
        let teardown_result = catch_raised(|| instance.teardown_test(test_name));
        self.current_test_name = outer_test_name;
        match teardown_result {
            Ok(()) => {}
            Err(Raised::Signal(signal)) if signal.is_abort() => {
                error!("{test_name}: teardown_test aborted: {signal}");
                termination = Termination::Signal(signal);
            }
            Err(raised) => {
                error!("error in teardown_test for {test_name}: {raised}");
                pending.add_error("teardown_test", &raised);
                if let Err(AbortAllRequest { reason }) =
                    self.dispatch(Procedure::OnException, pending.as_record_mut())
                {
                    termination = Termination::Signal(TestSignal::AbortAll { reason });
                }
            }
        }

        phase.enter(TestCasePhase::Classified);
        match self.classify(pending, termination) {
            Classified::Record {
                mut record,
                procedures,
                mut abort,
            } => {
                for &procedure in procedures {
                    if let Err(request) = self.dispatch(procedure, &mut record) {
                        abort = Some(request.into());
                        break;
                    }
                }
                self.results.add_record(record);
                abort.map_or(Ok(()), Err)
            }
            Classified::Silent => {
                debug!("{test_name} is a trigger for generated test cases, not reporting it");
                self.results.remove_requested(test_name);
                Ok(())
            }
        }
    }

    fn classify(&self, pending: PendingRecord, termination: Termination) -> Classified {
        let (record, procedures, abort) = match termination {
            Termination::Signal(signal) => match signal {
                TestSignal::Fail { .. } => {
                    self.log_failure(pending.test_name(), &signal);
                    (pending.fail(Some(&signal)), ON_FAIL, None)
                }
                TestSignal::Skip { .. } => (pending.skip(&signal), ON_SKIP, None),
                TestSignal::AbortClass { ref reason } => {
                    let abort = Abort::Class {
                        reason: reason.clone(),
                    };
                    (pending.fail(Some(&signal)), ON_FAIL, Some(abort))
                }
                TestSignal::AbortAll { ref reason } => {
                    let abort = Abort::All {
                        reason: reason.clone(),
                    };
                    (pending.fail(Some(&signal)), ON_FAIL, Some(abort))
                }
                TestSignal::Pass { .. } => (pending.pass(Some(&signal)), ON_PASS, None),
                TestSignal::Silent => return Classified::Silent,
                TestSignal::Blocked { .. } => (pending.blocked(&signal), ON_BLOCKED, None),
            },
            Termination::Assertion(message) => {
                self.log_failure(pending.test_name(), &message);
                (pending.fail(Some(&message)), ON_FAIL, None)
            }
            Termination::Unexpected(error) => {
                error!(
                    "unexpected error in {}: {}",
                    pending.test_name(),
                    DisplayErrorChain::new(&error)
                );
                (pending.unknown(&error), ON_EXCEPTION_THEN_FAIL, None)
            }
            Termination::Returned(value) if value.is_pass() => {
                (pending.pass(None), ON_PASS, None)
            }
            Termination::Returned(_) => (pending.fail(None), ON_FAIL, None),
        };

        Classified::Record {
            record,
            procedures,
            abort,
        }
    }

    fn log_failure(&self, test_name: &str, cause: &dyn fmt::Debug) {
        if self.config.test_failure_tracebacks() {
            error!("{test_name} failed: {cause:#?}");
        } else {
            debug!("{test_name} failed: {cause:?}");
        }
    }
}
