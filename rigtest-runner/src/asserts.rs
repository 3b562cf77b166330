// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers that turn conditions into [`TestSignal`]s.
//!
//! Each helper returns `Result<(), TestSignal>`, so test bodies can use `?` on them:
//!
//! ```
//! use rigtest_runner::{asserts, outcome::TestError};
//!
//! fn check_rssi(rssi: i32) -> Result<(), TestError> {
//!     asserts::skip_if(rssi == 0, "no signal reported")?;
//!     asserts::assert_true(rssi > -80, format!("rssi {rssi} below threshold"))?;
//!     Ok(())
//! }
//! # assert!(check_rssi(-60).is_ok());
//! ```

use crate::outcome::TestSignal;
use std::fmt;

/// Fails the test case if `condition` is false.
pub fn assert_true(condition: bool, message: impl Into<String>) -> Result<(), TestSignal> {
    if condition {
        Ok(())
    } else {
        Err(TestSignal::fail(message))
    }
}

/// Fails the test case if `condition` is true.
pub fn assert_false(condition: bool, message: impl Into<String>) -> Result<(), TestSignal> {
    assert_true(!condition, message)
}

/// Fails the test case if `first != second`.
///
/// The failure message includes both values.
pub fn assert_equal<T>(first: &T, second: &T, message: Option<&str>) -> Result<(), TestSignal>
where
    T: PartialEq + fmt::Debug + ?Sized,
{
    if first == second {
        return Ok(());
    }
    let mut text = format!("{first:?} != {second:?}");
    if let Some(message) = message {
        text.push(' ');
        text.push_str(message);
    }
    Err(TestSignal::fail(text))
}

/// Fails the test case unconditionally.
pub fn fail(message: impl Into<String>) -> Result<(), TestSignal> {
    Err(TestSignal::fail(message))
}

/// Skips the test case unconditionally.
pub fn skip(reason: impl Into<String>) -> Result<(), TestSignal> {
    Err(TestSignal::skip(reason))
}

/// Skips the test case if `condition` is true.
pub fn skip_if(condition: bool, reason: impl Into<String>) -> Result<(), TestSignal> {
    if condition { skip(reason) } else { Ok(()) }
}

/// Marks the test case as blocked.
pub fn block(reason: impl Into<String>) -> Result<(), TestSignal> {
    Err(TestSignal::blocked(reason))
}

/// Ends the test case early with a pass.
pub fn explicit_pass(message: impl Into<String>) -> Result<(), TestSignal> {
    Err(TestSignal::pass(message))
}

/// Fails the test case and aborts the rest of the test class.
pub fn abort_class(reason: impl Into<String>) -> Result<(), TestSignal> {
    Err(TestSignal::abort_class(reason))
}

/// Aborts the test class if `condition` is true.
pub fn abort_class_if(condition: bool, reason: impl Into<String>) -> Result<(), TestSignal> {
    if condition {
        abort_class(reason)
    } else {
        Ok(())
    }
}

/// Fails the test case and aborts the whole run.
pub fn abort_all(reason: impl Into<String>) -> Result<(), TestSignal> {
    Err(TestSignal::abort_all(reason))
}

/// Aborts the whole run if `condition` is true.
pub fn abort_all_if(condition: bool, reason: impl Into<String>) -> Result<(), TestSignal> {
    if condition { abort_all(reason) } else { Ok(()) }
}
