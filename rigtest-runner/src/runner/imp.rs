// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    Abort, GeneratedTestOptions, Procedure, TEST_CASE_TOKEN, TEST_NAME_PREFIX, TestArgs, TestBody,
    TestCases, TestClass, TestClassContext, dispatcher::AbortAllRequest,
};
use crate::{
    config::TestClassConfig,
    errors::{AbortAllError, ClassRunError},
    outcome::{IntoTestReturn, Raised, TestError, TestReturn, TestSignal, catch_raised},
    record::PendingRecord,
    results::TestResults,
};
use std::{fmt, mem, rc::Rc};
use tracing::{error, info, warn};

/// The reason recorded for every test case when class setup fails.
pub const CLASS_SETUP_FAILED: &str = "Failed class setup";

/// Runs the test cases of a single test class.
///
/// The class goes through setup, then each selected test case in order, then teardown.
/// Teardown always runs, even if setup failed or a test case aborted the run.
///
/// When the runner is dropped, [`TestClass::clean_up`] is called.
pub struct TestClassRunner<T: TestClass> {
    ctx: TestClassContext<T>,
}

impl<T: TestClass> TestClassRunner<T> {
    /// Creates a new runner for `instance`, bound to `config`.
    pub fn new(instance: T, config: TestClassConfig) -> Self {
        Self {
            ctx: TestClassContext::new(instance, config),
        }
    }

    /// Runs the test class.
    ///
    /// `test_names` selects the test cases to run. If it is empty, the class's
    /// [`declared_tests`](TestClass::declared_tests) are used, and if those are empty too, every
    /// registered test case whose name starts with `test_`. Each test case runs
    /// `test_case_iterations` times in a row.
    ///
    /// Names without a registered test case are not an error: they are recorded as skipped.
    ///
    /// Results accumulate across calls. The returned results are a snapshot; they are also
    /// available through [`results`](Self::results).
    pub fn run(
        &mut self,
        test_names: &[&str],
        test_case_iterations: usize,
    ) -> Result<TestResults, ClassRunError> {
        let tag = self.ctx.tag.clone();
        info!("==========> {tag} <==========");

        let test_cases = self.ctx.instance.test_cases();
        let names = self.resolve_names(test_names, &test_cases);
        if let Some(invalid) = names
            .iter()
            .find(|name| !name.starts_with(TEST_NAME_PREFIX))
        {
            return Err(ClassRunError::InvalidTestName {
                class: tag,
                test_name: invalid.clone(),
            });
        }

        let tests: Vec<_> = names
            .into_iter()
            .map(|name| {
                let body = match test_cases.get(&name) {
                    Some(body) => Rc::clone(body),
                    None => {
                        warn!("{TEST_CASE_TOKEN} {name} not found in {tag}, it will be skipped");
                        missing_test(&name)
                    }
                };
                (name, body)
            })
            .collect();
        for (name, _) in &tests {
            self.ctx.results.add_requested(name.as_str());
        }

        let instance = &mut self.ctx.instance;
        let config = &self.ctx.config;
        let outcome = match catch_raised(|| instance.setup_class(config)) {
            Ok(true) => self.exec_all(&tests, test_case_iterations),
            Ok(false) => {
                error!("failed to set up {tag}");
                self.block_all(&tests)
            }
            Err(raised) => {
                error!("failed to set up {tag}: {raised}");
                let blocked = self.block_all(&tests);
                match raised {
                    Raised::Signal(TestSignal::AbortAll { reason }) => {
                        Err(AbortAllRequest { reason })
                    }
                    _ => blocked,
                }
            }
        };
        // Teardown runs regardless, and an abort from it only wins if nothing aborted earlier.
        let teardown = self.teardown_class();
        let outcome = outcome.and(teardown);

        info!(
            "Summary for test class {tag}: {}",
            self.ctx.results.summary()
        );
        match outcome {
            Ok(()) => Ok(self.ctx.results.clone()),
            Err(AbortAllRequest { reason }) => {
                error!("aborting all test runs from {tag}: {reason}");
                Err(AbortAllError::new(reason, self.ctx.results.clone()).into())
            }
        }
    }

    /// Executes one test case outside of [`run`](Self::run).
    ///
    /// See [`TestClassContext::exec_one_testcase`].
    pub fn exec_one_testcase<F, R>(
        &mut self,
        test_name: &str,
        body: F,
        args: &TestArgs,
    ) -> Result<(), Abort>
    where
        F: FnOnce(&mut TestClassContext<T>, &TestArgs) -> Result<R, TestError>,
        R: IntoTestReturn,
    {
        self.ctx.exec_one_testcase(test_name, body, args)
    }

    /// Runs one generated test case per setting.
    ///
    /// See [`TestClassContext::run_generated_testcases`].
    pub fn run_generated_testcases<S, F, R>(
        &mut self,
        body: F,
        settings: impl IntoIterator<Item = S>,
        options: GeneratedTestOptions<'_, S>,
    ) -> Result<Vec<S>, Abort>
    where
        S: fmt::Display,
        F: Fn(&mut TestClassContext<T>, &S, &TestArgs) -> Result<R, TestError>,
        R: IntoTestReturn,
    {
        self.ctx.run_generated_testcases(body, settings, options)
    }

    /// The results collected so far.
    pub fn results(&self) -> &TestResults {
        &self.ctx.results
    }

    /// Consumes the runner, returning the results collected so far.
    ///
    /// [`TestClass::clean_up`] runs before this returns.
    pub fn into_results(mut self) -> TestResults {
        mem::take(&mut self.ctx.results)
    }

    /// The context test cases run in.
    pub fn context(&self) -> &TestClassContext<T> {
        &self.ctx
    }

    /// The context test cases run in, mutably.
    pub fn context_mut(&mut self) -> &mut TestClassContext<T> {
        &mut self.ctx
    }

    fn resolve_names(&self, test_names: &[&str], test_cases: &TestCases<T>) -> Vec<String> {
        if !test_names.is_empty() {
            return test_names.iter().map(|&name| name.to_owned()).collect();
        }
        let declared = self.ctx.instance.declared_tests();
        if !declared.is_empty() {
            return declared;
        }
        test_cases
            .names()
            .filter(|name| name.starts_with(TEST_NAME_PREFIX))
            .map(ToOwned::to_owned)
            .collect()
    }

    fn exec_all(
        &mut self,
        tests: &[(String, TestBody<T>)],
        test_case_iterations: usize,
    ) -> Result<(), AbortAllRequest> {
        let args = self.ctx.config.cli_args().clone();
        for (name, body) in tests {
            for _ in 0..test_case_iterations {
                match self.ctx.exec_one_testcase(name, &**body, &args) {
                    Ok(()) => {}
                    Err(Abort::Class { reason }) => {
                        error!("aborting test class {}: {reason}", self.ctx.tag);
                        return Ok(());
                    }
                    Err(Abort::All { reason }) => return Err(AbortAllRequest { reason }),
                }
            }
        }
        Ok(())
    }

    /// Records every test case as blocked, without running any test code other than the
    /// `on_blocked` hook.
    fn block_all(&mut self, tests: &[(String, TestBody<T>)]) -> Result<(), AbortAllRequest> {
        let signal = TestSignal::blocked(CLASS_SETUP_FAILED);
        let mut outcome = Ok(());
        for (name, _) in tests {
            let mut record =
                PendingRecord::begin(name.as_str(), self.ctx.tag.as_str()).blocked(&signal);
            let dispatched = self.ctx.dispatch(Procedure::OnBlocked, &mut record);
            self.ctx.results.add_record(record);
            outcome = outcome.and(dispatched);
        }
        outcome
    }

    fn teardown_class(&mut self) -> Result<(), AbortAllRequest> {
        let instance = &mut self.ctx.instance;
        match catch_raised(|| instance.teardown_class()) {
            Ok(()) => Ok(()),
            Err(Raised::Signal(TestSignal::AbortAll { reason })) => Err(AbortAllRequest { reason }),
            Err(raised) => {
                error!("error in teardown_class for {}: {raised}", self.ctx.tag);
                Ok(())
            }
        }
    }
}

impl<T: TestClass> Drop for TestClassRunner<T> {
    fn drop(&mut self) {
        let instance = &mut self.ctx.instance;
        if let Err(raised) = catch_raised(|| instance.clean_up()) {
            error!("error cleaning up {}: {raised}", self.ctx.tag);
        }
    }
}

impl<T: TestClass> fmt::Debug for TestClassRunner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestClassRunner")
            .field("ctx", &self.ctx)
            .finish()
    }
}

/// A stand-in for a requested test case that isn't registered. It always skips.
fn missing_test<T: TestClass>(test_name: &str) -> TestBody<T> {
    let reason = format!("Test {test_name} does not exist");
    Rc::new(
        move |_: &mut TestClassContext<T>, _: &TestArgs| -> Result<TestReturn, TestError> {
            Err(TestSignal::skip(reason.as_str()).into())
        },
    )
}
