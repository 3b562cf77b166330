// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by rigtest.

use crate::results::TestResults;
use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error, fmt};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse rigtest config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
///
/// Returned by [`ConfigParseError::kind`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// The config contained keys that aren't recognized.
    #[error("unknown config keys: {}", .keys.join(", "))]
    UnknownKeys {
        /// The unknown keys, as dotted paths.
        keys: Vec<String>,
    },
}

/// An error that occurred while reading a user parameter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UserParamError {
    /// A required parameter was not provided.
    #[error("missing required user param `{name}`")]
    Missing {
        /// The name of the parameter.
        name: String,
    },

    /// A parameter was provided but has the wrong shape.
    #[error("invalid value for user param `{name}`")]
    Invalid {
        /// The name of the parameter.
        name: String,

        /// The deserialization error.
        #[source]
        error: serde_json::Error,
    },
}

/// An error that stopped a test class run.
///
/// Returned by [`TestClassRunner::run`](crate::runner::TestClassRunner::run).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClassRunError {
    /// A requested test name doesn't follow the `test_` naming convention.
    ///
    /// This is checked before class setup runs, so no test code has been invoked.
    #[error("test name `{test_name}` in class `{class}` does not start with `test_`")]
    InvalidTestName {
        /// The tag of the test class.
        class: String,

        /// The offending test name.
        test_name: String,
    },

    /// The run was aborted. The results collected so far are attached.
    #[error(transparent)]
    AbortAll(#[from] AbortAllError),
}

impl ClassRunError {
    /// Returns the results attached to this error, if it is an abort.
    pub fn results(&self) -> Option<&TestResults> {
        match self {
            Self::InvalidTestName { .. } => None,
            Self::AbortAll(error) => Some(error.results()),
        }
    }
}

/// A request to abort the entire run, carrying every result collected up to that point.
#[derive(Debug, Error)]
#[error("run aborted: {reason}")]
pub struct AbortAllError {
    reason: String,
    results: TestResults,
}

impl AbortAllError {
    pub(crate) fn new(reason: impl Into<String>, results: TestResults) -> Self {
        Self {
            reason: reason.into(),
            results,
        }
    }

    /// Returns the reason given for the abort.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns the results collected before the abort.
    pub fn results(&self) -> &TestResults {
        &self.results
    }

    /// Consumes self, returning the results collected before the abort.
    pub fn into_results(self) -> TestResults {
        self.results
    }
}

/// An error reported by a [`DiagnosticSource`](crate::diagnostics::DiagnosticSource).
pub type DiagnosticSourceError = Box<dyn error::Error + Send + Sync>;

/// An error that occurred while collecting diagnostics from a device.
///
/// These errors are logged by the collector and never affect a verdict.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiagnosticError {
    /// Taking a bug report failed on every attempt.
    #[error("failed to take bug report on `{device}` after {attempts} attempts")]
    BugReport {
        /// The device the bug report was taken on.
        device: String,

        /// The number of attempts made.
        attempts: usize,

        /// The error from the final attempt.
        #[source]
        error: DiagnosticSourceError,
    },

    /// Collecting extra logs failed.
    #[error("failed to collect extra logs on `{device}`")]
    ExtraLogs {
        /// The device the logs were collected from.
        device: String,

        /// The underlying error.
        #[source]
        error: DiagnosticSourceError,
    },

    /// Device code panicked while collecting diagnostics.
    #[error("collecting diagnostics on `{device}` panicked: {message}")]
    Panicked {
        /// The device being collected from.
        device: String,

        /// The panic message.
        message: String,
    },

    /// The worker pool could not be built.
    #[error("failed to build diagnostics thread pool")]
    ThreadPoolBuild(#[source] rayon::ThreadPoolBuildError),
}

/// An error parsing the `RIGTEST_LOG` filter.
#[derive(Debug, Error)]
#[error("unable to parse RIGTEST_LOG filter `{input}`")]
pub struct LogFilterParseError {
    input: String,
    #[source]
    error: Box<dyn error::Error + Send + Sync>,
}

impl LogFilterParseError {
    pub(crate) fn new(input: impl Into<String>, error: Box<dyn error::Error + Send + Sync>) -> Self {
        Self {
            input: input.into(),
            error,
        }
    }
}

/// Displays an error along with its chain of sources.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: error::Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: error::Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        let mut curr = self.error.source();
        while let Some(source) = curr {
            write!(f, "\n  caused by: {source}")?;
            curr = source.source();
        }
        Ok(())
    }
}
