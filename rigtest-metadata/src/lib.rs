// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured, serializable views of rigtest results.
//!
//! These types are produced by `rigtest-runner` and consumed by whatever writes reports for a
//! test run. They carry no engine logic: a [`RecordSummary`] is a snapshot of a single test case
//! execution, and a [`RunSummary`] is the count of verdicts across a test class run.

mod summary;

pub use summary::*;
