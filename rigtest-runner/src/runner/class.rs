// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    config::{TestClassConfig, UserParams},
    diagnostics::{DiagnosticSource, DiagnosticsCollector},
    outcome::{IntoTestReturn, TestError, TestReturn},
    results::TestResults,
};
use derive_where::derive_where;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::{
    fmt,
    ops::{Deref, DerefMut},
    rc::Rc,
    sync::Arc,
};

/// A test class: a set of test cases sharing device controllers and life-cycle hooks.
///
/// Every method has a default. A minimal test class only implements
/// [`test_cases`](Self::test_cases).
///
/// Hooks report failure the same way test bodies do: by returning a
/// [`TestSignal`](crate::outcome::TestSignal) or any other error, or by panicking. The setup hooks
/// can additionally return `Ok(false)` to signal failure without an error.
pub trait TestClass: Sized + 'static {
    /// The name this class is reported under. Defaults to the type name.
    fn tag(&self) -> String {
        short_type_name::<Self>().to_owned()
    }

    /// The test cases to run when the caller doesn't name any.
    ///
    /// If this is empty, every registered test case whose name starts with `test_` runs, in
    /// registration order.
    fn declared_tests(&self) -> Vec<String> {
        Vec::new()
    }

    /// The test cases this class provides.
    fn test_cases(&self) -> TestCases<Self> {
        TestCases::new()
    }

    /// Devices to collect bug reports from when a test case fails.
    fn diagnostic_sources(&self) -> Vec<Arc<dyn DiagnosticSource>> {
        Vec::new()
    }

    /// Called once before any test case runs.
    ///
    /// On failure, every test case is recorded as blocked.
    fn setup_class(&mut self, _config: &TestClassConfig) -> HookResult {
        Ok(true)
    }

    /// Called once after all test cases have run, even if class setup failed.
    fn teardown_class(&mut self) -> Result<(), TestError> {
        Ok(())
    }

    /// Called before each test case. On failure, the test case fails.
    fn setup_test(&mut self, _test_name: &str) -> HookResult {
        Ok(true)
    }

    /// Called after each test case, however it ended.
    fn teardown_test(&mut self, _test_name: &str) -> Result<(), TestError> {
        Ok(())
    }

    /// Called when a test case passes.
    fn on_pass(&mut self, _test_name: &str, _begin_time: i64) -> Result<(), TestError> {
        Ok(())
    }

    /// Called when a test case fails, including when it ends with an unexpected error.
    fn on_fail(&mut self, _test_name: &str, _begin_time: i64) -> Result<(), TestError> {
        Ok(())
    }

    /// Called when a test case is skipped.
    fn on_skip(&mut self, _test_name: &str, _begin_time: i64) -> Result<(), TestError> {
        Ok(())
    }

    /// Called when a test case is blocked.
    fn on_blocked(&mut self, _test_name: &str, _begin_time: i64) -> Result<(), TestError> {
        Ok(())
    }

    /// Called when a test case or its teardown ends with an unexpected error.
    fn on_exception(&mut self, _test_name: &str, _begin_time: i64) -> Result<(), TestError> {
        Ok(())
    }

    /// Called once when the runner is dropped. Cleans up anything set up in the constructor.
    fn clean_up(&mut self) -> Result<(), TestError> {
        Ok(())
    }
}

/// The result of a setup hook. `Ok(false)` means setup failed.
pub type HookResult = Result<bool, TestError>;

/// A registered test case body.
pub type TestBody<T> = Rc<dyn Fn(&mut TestClassContext<T>, &TestArgs) -> Result<TestReturn, TestError>>;

/// The test cases of a test class, in registration order.
#[derive_where(Clone, Default)]
pub struct TestCases<T> {
    cases: IndexMap<String, TestBody<T>>,
}

impl<T: TestClass> TestCases<T> {
    /// Creates an empty set of test cases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a test case. Registering a name twice replaces the earlier body.
    pub fn add<F, R>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut TestClassContext<T>, &TestArgs) -> Result<R, TestError> + 'static,
        R: IntoTestReturn,
    {
        self.cases.insert(
            name.into(),
            Rc::new(move |ctx: &mut TestClassContext<T>, args: &TestArgs| {
                body(ctx, args).map(IntoTestReturn::into_test_return)
            }),
        );
        self
    }

    /// Looks up a test case by name.
    pub fn get(&self, name: &str) -> Option<&TestBody<T>> {
        self.cases.get(name)
    }

    /// The names of all registered test cases, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.cases.keys().map(String::as_str)
    }

    /// The number of registered test cases.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Returns true if no test cases are registered.
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

impl<T> fmt::Debug for TestCases<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.cases.keys()).finish()
    }
}

/// Arguments forwarded verbatim to a test body.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct TestArgs {
    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<Value>,

    /// Keyword arguments, in the order they were given.
    #[serde(default)]
    pub kwargs: IndexMap<String, Value>,
}

impl TestArgs {
    /// Creates an empty set of arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn with_arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Adds a keyword argument.
    pub fn with_kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }

    /// Returns the positional argument at `index`.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Returns the keyword argument `name`.
    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        self.kwargs.get(name)
    }

    /// Returns true if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }
}

/// A test class instance together with the state the engine keeps for it.
///
/// Test case bodies receive this by mutable reference. It derefs to the class instance.
pub struct TestClassContext<T> {
    pub(super) instance: T,
    pub(super) tag: String,
    pub(super) config: TestClassConfig,
    pub(super) results: TestResults,
    pub(super) current_test_name: Option<String>,
    pub(super) diagnostics: DiagnosticsCollector,
}

impl<T: TestClass> TestClassContext<T> {
    pub(super) fn new(instance: T, config: TestClassConfig) -> Self {
        let tag = instance.tag();
        let diagnostics = DiagnosticsCollector::new(&config);
        Self {
            instance,
            tag,
            config,
            results: TestResults::new(),
            current_test_name: None,
            diagnostics,
        }
    }
}

impl<T> TestClassContext<T> {
    /// The tag of the test class.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The config bound to the test class.
    pub fn config(&self) -> &TestClassConfig {
        &self.config
    }

    /// The user params from the config.
    pub fn user_params(&self) -> UserParams<'_> {
        self.config.user_params()
    }

    /// The results collected so far.
    pub fn results(&self) -> &TestResults {
        &self.results
    }

    /// The name of the test case currently between setup and teardown, if any.
    pub fn current_test_name(&self) -> Option<&str> {
        self.current_test_name.as_deref()
    }

    /// The test class instance.
    pub fn instance(&self) -> &T {
        &self.instance
    }

    /// The test class instance, mutably.
    pub fn instance_mut(&mut self) -> &mut T {
        &mut self.instance
    }
}

impl<T> Deref for TestClassContext<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.instance
    }
}

impl<T> DerefMut for TestClassContext<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.instance
    }
}

impl<T> fmt::Debug for TestClassContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestClassContext")
            .field("tag", &self.tag)
            .field("current_test_name", &self.current_test_name)
            .field("results", &self.results)
            .finish_non_exhaustive()
    }
}

fn short_type_name<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}
