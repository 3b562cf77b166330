// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! The test class life-cycle engine for rigtest.
//!
//! A test class is a type implementing [`runner::TestClass`]: it owns its device controllers and
//! registers its test cases explicitly. A [`runner::TestClassRunner`] drives the class through
//! class setup, per-test setup, execution and teardown, and class teardown, turning whatever the
//! test code raised into a [`record::TestResultRecord`] collected in a [`results::TestResults`].
//!
//! Test code reports verdicts by returning [`outcome::TestSignal`]s (see also the [`asserts`]
//! helpers), plain errors, or by panicking.

pub mod asserts;
pub mod config;
pub mod diagnostics;
pub mod errors;
mod helpers;
pub mod outcome;
pub mod output;
pub mod record;
pub mod results;
pub mod runner;
mod time;
