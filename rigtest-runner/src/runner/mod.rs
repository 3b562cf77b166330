// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test class runner.
//!
//! The main structure in this module is [`TestClassRunner`]. Test classes implement
//! [`TestClass`] and register their test cases with [`TestCases`]; each test case body receives
//! a [`TestClassContext`], which derefs to the class instance and can run further test cases
//! (see [`TestClassContext::run_generated_testcases`]).

mod class;
mod dispatcher;
mod executor;
mod generated;
mod imp;

pub use class::*;
pub use dispatcher::Procedure;
pub use executor::TestCasePhase;
pub use generated::*;
pub use imp::*;

use crate::outcome::{TestError, TestSignal};

/// Prefix for log lines about individual test cases.
pub const TEST_CASE_TOKEN: &str = "[Test Case]";

/// Every test case name must start with this prefix.
pub const TEST_NAME_PREFIX: &str = "test_";

/// A request to stop running test cases, returned by
/// [`TestClassContext::exec_one_testcase`].
///
/// The record for the test case that asked for the abort has already been added to the results.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Abort {
    /// Stop running the rest of this test class.
    Class {
        /// Why the class was aborted.
        reason: String,
    },

    /// Stop the whole run.
    All {
        /// Why the run was aborted.
        reason: String,
    },
}

impl Abort {
    /// Returns the reason for the abort.
    pub fn reason(&self) -> &str {
        match self {
            Self::Class { reason } | Self::All { reason } => reason,
        }
    }
}

impl From<Abort> for TestError {
    fn from(abort: Abort) -> Self {
        match abort {
            Abort::Class { reason } => TestError::Signal(TestSignal::AbortClass { reason }),
            Abort::All { reason } => TestError::Signal(TestSignal::AbortAll { reason }),
        }
    }
}
