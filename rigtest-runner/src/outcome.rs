// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outcome signals raised by test bodies and hooks.
//!
//! Test code communicates verdicts out of arbitrarily deep call stacks by returning a
//! [`TestSignal`] in the error position. Anything else that ends up there is an
//! [`UnexpectedError`], and a panic (typically from `assert!` and friends) is an assertion
//! failure. The engine sorts every one of these into exactly one [`Raised`] case.

use crate::helpers::panic_message;
use serde_json::Value;
use std::{
    error, fmt,
    panic::{self, AssertUnwindSafe},
};
use thiserror::Error;

/// A verdict-carrying signal raised by test code.
///
/// Signals are the expected way for a test body or hook to end early. They are distinct from
/// [`UnexpectedError`]s, which are always treated as worse than a failure.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TestSignal {
    /// The test case passed explicitly.
    #[error("{message}")]
    Pass {
        /// Details about the pass.
        message: String,

        /// Structured data to attach to the record.
        extras: Option<Value>,
    },

    /// The test case failed.
    #[error("{message}")]
    Fail {
        /// Why the test case failed.
        message: String,

        /// Structured data to attach to the record.
        extras: Option<Value>,
    },

    /// The test case was skipped.
    #[error("{reason}")]
    Skip {
        /// Why the test case was skipped.
        reason: String,

        /// Structured data to attach to the record.
        extras: Option<Value>,
    },

    /// The test case could not be run.
    #[error("{reason}")]
    Blocked {
        /// Why the test case was blocked.
        reason: String,

        /// Structured data to attach to the record.
        extras: Option<Value>,
    },

    /// Fail this test case and stop running the rest of the test class.
    #[error("{reason}")]
    AbortClass {
        /// Why the test class was aborted.
        reason: String,
    },

    /// Fail this test case and stop the whole run.
    #[error("{reason}")]
    AbortAll {
        /// Why the run was aborted.
        reason: String,
    },

    /// Suppress reporting for this test case.
    ///
    /// Used by trigger test cases that only exist to run generated test cases.
    #[error("test case result suppressed")]
    Silent,
}

impl TestSignal {
    /// Creates a [`TestSignal::Pass`] with no extras.
    pub fn pass(message: impl Into<String>) -> Self {
        Self::Pass {
            message: message.into(),
            extras: None,
        }
    }

    /// Creates a [`TestSignal::Fail`] with no extras.
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail {
            message: message.into(),
            extras: None,
        }
    }

    /// Creates a [`TestSignal::Skip`] with no extras.
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip {
            reason: reason.into(),
            extras: None,
        }
    }

    /// Creates a [`TestSignal::Blocked`] with no extras.
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self::Blocked {
            reason: reason.into(),
            extras: None,
        }
    }

    /// Creates a [`TestSignal::AbortClass`].
    pub fn abort_class(reason: impl Into<String>) -> Self {
        Self::AbortClass {
            reason: reason.into(),
        }
    }

    /// Creates a [`TestSignal::AbortAll`].
    pub fn abort_all(reason: impl Into<String>) -> Self {
        Self::AbortAll {
            reason: reason.into(),
        }
    }

    /// Attaches structured extras to this signal.
    ///
    /// Abort and silent signals carry no extras; for those this is a no-op.
    pub fn with_extras(mut self, new_extras: Value) -> Self {
        match &mut self {
            Self::Pass { extras, .. }
            | Self::Fail { extras, .. }
            | Self::Skip { extras, .. }
            | Self::Blocked { extras, .. } => *extras = Some(new_extras),
            Self::AbortClass { .. } | Self::AbortAll { .. } | Self::Silent => {}
        }
        self
    }

    /// Returns the message or reason carried by this signal.
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Pass { message, .. } | Self::Fail { message, .. } => Some(message),
            Self::Skip { reason, .. }
            | Self::Blocked { reason, .. }
            | Self::AbortClass { reason }
            | Self::AbortAll { reason } => Some(reason),
            Self::Silent => None,
        }
    }

    /// Returns the structured extras carried by this signal, if any.
    pub fn extras(&self) -> Option<&Value> {
        match self {
            Self::Pass { extras, .. }
            | Self::Fail { extras, .. }
            | Self::Skip { extras, .. }
            | Self::Blocked { extras, .. } => extras.as_ref(),
            Self::AbortClass { .. } | Self::AbortAll { .. } | Self::Silent => None,
        }
    }

    /// Returns true if this signal aborts the test class or the run.
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::AbortClass { .. } | Self::AbortAll { .. })
    }
}

/// An error raised by test code that isn't a [`TestSignal`].
///
/// Typically a driver or I/O error from a device controller.
#[derive(Debug)]
pub struct UnexpectedError {
    inner: Box<dyn error::Error + Send + Sync>,
}

impl UnexpectedError {
    /// Creates an unexpected error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self {
            inner: message.into(),
        }
    }

    fn from_boxed(inner: Box<dyn error::Error + Send + Sync>) -> Self {
        Self { inner }
    }

    /// Returns the underlying error.
    pub fn get_ref(&self) -> &(dyn error::Error + Send + Sync + 'static) {
        &*self.inner
    }
}

impl fmt::Display for UnexpectedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl error::Error for UnexpectedError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.inner.source()
    }
}

/// The error type returned by test bodies and hooks.
///
/// Any error type converts into this with `?`. A [`TestSignal`], even one that was boxed up
/// along the way, always converts to [`TestError::Signal`].
#[derive(Debug)]
pub enum TestError {
    /// A verdict signal.
    Signal(TestSignal),

    /// Any other error.
    Unexpected(UnexpectedError),
}

impl TestError {
    /// Creates an unexpected error from a plain message.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(UnexpectedError::msg(message))
    }

    /// Returns the signal, if this is one.
    pub fn as_signal(&self) -> Option<&TestSignal> {
        match self {
            Self::Signal(signal) => Some(signal),
            Self::Unexpected(_) => None,
        }
    }
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(signal) => fmt::Display::fmt(signal, f),
            Self::Unexpected(error) => fmt::Display::fmt(error, f),
        }
    }
}

impl<E> From<E> for TestError
where
    E: error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        let boxed: Box<dyn error::Error + Send + Sync> = Box::new(error);
        let boxed = match boxed.downcast::<TestSignal>() {
            Ok(signal) => return Self::Signal(*signal),
            Err(boxed) => boxed,
        };
        match boxed.downcast::<UnexpectedError>() {
            Ok(unexpected) => Self::Unexpected(*unexpected),
            Err(boxed) => Self::Unexpected(UnexpectedError::from_boxed(boxed)),
        }
    }
}

/// The value a test body returned without raising.
///
/// Most test bodies report failure via signals or assertions, but legacy bodies may simply
/// return `false`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TestReturn {
    /// The body returned nothing. Counts as a pass.
    Unit,

    /// The body returned a boolean. `false` counts as a failure.
    Bool(bool),
}

impl TestReturn {
    /// Returns true if this return value counts as a pass.
    pub fn is_pass(self) -> bool {
        match self {
            Self::Unit => true,
            Self::Bool(value) => value,
        }
    }
}

/// Conversion from a test body's return value into a [`TestReturn`].
pub trait IntoTestReturn {
    /// Performs the conversion.
    fn into_test_return(self) -> TestReturn;
}

impl IntoTestReturn for () {
    fn into_test_return(self) -> TestReturn {
        TestReturn::Unit
    }
}

impl IntoTestReturn for bool {
    fn into_test_return(self) -> TestReturn {
        TestReturn::Bool(self)
    }
}

impl IntoTestReturn for Option<bool> {
    fn into_test_return(self) -> TestReturn {
        match self {
            Some(value) => TestReturn::Bool(value),
            None => TestReturn::Unit,
        }
    }
}

impl IntoTestReturn for TestReturn {
    fn into_test_return(self) -> TestReturn {
        self
    }
}

/// Everything a guarded call into test code can end with, other than returning normally.
#[derive(Debug)]
pub(crate) enum Raised {
    /// A verdict signal.
    Signal(TestSignal),

    /// A panic, treated as an assertion failure. Carries the panic message.
    Assertion(String),

    /// Any other error.
    Unexpected(UnexpectedError),
}

impl From<TestError> for Raised {
    fn from(error: TestError) -> Self {
        match error {
            TestError::Signal(signal) => Self::Signal(signal),
            TestError::Unexpected(error) => Self::Unexpected(error),
        }
    }
}

impl fmt::Display for Raised {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(signal) => fmt::Display::fmt(signal, f),
            Self::Assertion(message) => write!(f, "assertion failed: {message}"),
            Self::Unexpected(error) => fmt::Display::fmt(error, f),
        }
    }
}

/// Calls into test code, converting both error returns and panics into [`Raised`].
pub(crate) fn catch_raised<R>(f: impl FnOnce() -> Result<R, TestError>) -> Result<R, Raised> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(error.into()),
        Err(payload) => Err(Raised::Assertion(panic_message(&*payload))),
    }
}
