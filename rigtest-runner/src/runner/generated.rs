// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data-driven test generation: one test case per setting.

use super::{Abort, TestArgs, TestClass, TestClassContext};
use crate::{
    helpers::truncate_on_char_boundary,
    outcome::{IntoTestReturn, TestError, catch_raised},
};
use std::{collections::HashSet, fmt};
use tracing::{debug, error};

/// The maximum length of a generated test name, in bytes.
///
/// Test names end up in log file names, so they're held to the usual file name limit.
pub const MAX_FILENAME_LEN: usize = 255;

/// Computes the name of a generated test case from its setting and the forwarded arguments.
pub type NameFunc<'a, S> = Box<dyn Fn(&S, &TestArgs) -> Result<String, TestError> + 'a>;

/// Options for [`TestClassContext::run_generated_testcases`].
pub struct GeneratedTestOptions<'a, S> {
    tag: String,
    name_func: Option<NameFunc<'a, S>>,
    args: TestArgs,
}

impl<'a, S> GeneratedTestOptions<'a, S> {
    /// Creates options with the given tag. Test names default to `"<tag> <setting>"`.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name_func: None,
            args: TestArgs::new(),
        }
    }

    /// Names each generated test case with `name_func` instead.
    ///
    /// If `name_func` fails, the error is logged and the default name is used.
    pub fn with_name_func<F>(mut self, name_func: F) -> Self
    where
        F: Fn(&S, &TestArgs) -> Result<String, TestError> + 'a,
    {
        self.name_func = Some(Box::new(name_func));
        self
    }

    /// Forwards `args` to every generated test case, after its setting.
    pub fn with_args(mut self, args: TestArgs) -> Self {
        self.args = args;
        self
    }

    fn test_name(&self, setting: &S) -> String
    where
        S: fmt::Display,
    {
        let default = format!("{} {setting}", self.tag);
        let Some(name_func) = &self.name_func else {
            return default;
        };
        match catch_raised(|| name_func(setting, &self.args)) {
            Ok(name) => name,
            Err(raised) => {
                error!(
                    "failed to get test name from name_func, falling back to `{default}`: {raised}"
                );
                default
            }
        }
    }
}

impl<S> fmt::Debug for GeneratedTestOptions<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedTestOptions")
            .field("tag", &self.tag)
            .field("name_func", &self.name_func.as_ref().map(|_| "<function>"))
            .field("args", &self.args)
            .finish()
    }
}

impl<T: TestClass> TestClassContext<T> {
    /// Runs one generated test case per setting, in order.
    ///
    /// Each test case calls `body` with a reference to its setting and the forwarded arguments.
    /// A test case that aborts stops the batch, and the abort is returned.
    ///
    /// Returns the settings whose test case didn't pass.
    pub fn run_generated_testcases<S, F, R>(
        &mut self,
        body: F,
        settings: impl IntoIterator<Item = S>,
        options: GeneratedTestOptions<'_, S>,
    ) -> Result<Vec<S>, Abort>
    where
        S: fmt::Display,
        F: Fn(&mut Self, &S, &TestArgs) -> Result<R, TestError>,
        R: IntoTestReturn,
    {
        let mut seen = HashSet::new();
        let mut failed_settings = Vec::new();
        for setting in settings {
            let test_name = unique_name(options.test_name(&setting), &seen);
            seen.insert(test_name.clone());
            self.results.add_requested(test_name.as_str());

            let passed_before = self.results.passed().count();
            self.exec_one_testcase(
                &test_name,
                |ctx: &mut Self, args: &TestArgs| body(ctx, &setting, args),
                &options.args,
            )?;
            if self.results.passed().count() != passed_before + 1 {
                debug!("generated test case {test_name} did not pass");
                failed_settings.push(setting);
            }
        }
        Ok(failed_settings)
    }
}

/// Truncates `name` to [`MAX_FILENAME_LEN`], then adds a ` (N)` suffix if it collides with a
/// name in `seen`.
fn unique_name(mut name: String, seen: &HashSet<String>) -> String {
    truncate_on_char_boundary(&mut name, MAX_FILENAME_LEN);
    if !seen.contains(&name) {
        return name;
    }
    let mut n = 2_usize;
    loop {
        let suffix = format!(" ({n})");
        let mut candidate = name.clone();
        truncate_on_char_boundary(&mut candidate, MAX_FILENAME_LEN - suffix.len());
        candidate.push_str(&suffix);
        if !seen.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
