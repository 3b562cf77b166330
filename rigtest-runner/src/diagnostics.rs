// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collecting bug reports and extra logs from devices after a failure.
//!
//! Collection fans out across every [`DiagnosticSource`] a test class exposes, on a bounded worker
//! pool. It never affects a verdict: failures are logged and returned for inspection, and never
//! propagated.

use crate::{
    config::TestClassConfig,
    errors::{DiagnosticError, DiagnosticSourceError, DisplayErrorChain},
    helpers::panic_message,
};
use camino::{Utf8Path, Utf8PathBuf};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, PoisonError},
};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A device that can produce diagnostics.
pub trait DiagnosticSource: Send + Sync {
    /// A name for the device, used in logs.
    fn name(&self) -> &str;

    /// Takes a bug report for the given test case.
    fn take_bug_report(&self, test_name: &str, begin_time: i64)
    -> Result<(), DiagnosticSourceError>;

    /// Collects extra logs for the given test case, such as crash reports.
    fn take_extra_logs(
        &self,
        _test_name: &str,
        _begin_time: i64,
    ) -> Result<(), DiagnosticSourceError> {
        Ok(())
    }
}

/// The number of workers used to collect diagnostics.
pub const DIAGNOSTICS_WORKERS: usize = 10;

/// The number of times a bug report is attempted before giving up.
pub const BUG_REPORT_ATTEMPTS: usize = 3;

/// Collects diagnostics from devices, subject to the configured skip policy.
#[derive(Debug)]
pub struct DiagnosticsCollector {
    log_path: Utf8PathBuf,
    no_bug_report_on_fail: bool,
    soft_output_size_limit: Option<u64>,
    // Once the log directory passes the limit it won't shrink again.
    size_limit_reached: bool,
    // Built on first use and kept for the life of the collector.
    pool: Option<ThreadPool>,
}

impl DiagnosticsCollector {
    /// Creates a new collector from the given config.
    pub fn new(config: &TestClassConfig) -> Self {
        Self {
            log_path: config.log_path().to_owned(),
            no_bug_report_on_fail: config.no_bug_report_on_fail(),
            soft_output_size_limit: config.soft_output_size_limit(),
            size_limit_reached: false,
            pool: None,
        }
    }

    /// Returns the reason collection should be skipped, if any.
    pub fn skip_reason(&mut self) -> Option<SkipReason> {
        if self.no_bug_report_on_fail {
            return Some(SkipReason::Disabled);
        }
        if self.size_limit_reached {
            return Some(SkipReason::SizeLimitReached);
        }
        let limit = self.soft_output_size_limit?;
        let size = directory_size(&self.log_path);
        if size > limit {
            info!(
                "skipping bug report: log directory `{}` is {size} bytes, over the limit of {limit}",
                self.log_path,
            );
            self.size_limit_reached = true;
            return Some(SkipReason::SizeLimitReached);
        }
        None
    }

    /// Takes a bug report and extra logs from every source in parallel.
    ///
    /// Waits for all sources to finish.
    pub fn collect(
        &mut self,
        sources: &[Arc<dyn DiagnosticSource>],
        test_name: &str,
        begin_time: i64,
    ) -> DiagnosticsOutcome {
        if let Some(reason) = self.skip_reason() {
            debug!("not collecting diagnostics for {test_name}: {reason:?}");
            return DiagnosticsOutcome::Skipped(reason);
        }
        if sources.is_empty() {
            return DiagnosticsOutcome::Collected { errors: Vec::new() };
        }

        let pool = match self.pool() {
            Ok(pool) => pool,
            Err(error) => {
                warn!("{}", DisplayErrorChain::new(&error));
                return DiagnosticsOutcome::Collected {
                    errors: vec![error],
                };
            }
        };

        let errors = Mutex::new(Vec::new());
        let errors_ref = &errors;
        pool.scope(|scope| {
            for source in sources {
                scope.spawn(move |_| {
                    let result = contain_panic(source.name(), || {
                        take_bug_report(&**source, test_name, begin_time)
                    });
                    if let Err(error) = result {
                        push_error(errors_ref, error);
                    }
                });
                scope.spawn(move |_| {
                    let result = contain_panic(source.name(), || {
                        source
                            .take_extra_logs(test_name, begin_time)
                            .map_err(|error| DiagnosticError::ExtraLogs {
                                device: source.name().to_owned(),
                                error,
                            })
                    });
                    if let Err(error) = result {
                        push_error(errors_ref, error);
                    }
                });
            }
        });

        let errors = errors.into_inner().unwrap_or_else(PoisonError::into_inner);
        DiagnosticsOutcome::Collected { errors }
    }

    fn pool(&mut self) -> Result<&ThreadPool, DiagnosticError> {
        let pool = match self.pool.take() {
            Some(pool) => pool,
            None => ThreadPoolBuilder::new()
                .num_threads(DIAGNOSTICS_WORKERS)
                .thread_name(|idx| format!("rigtest-diagnostics-{idx}"))
                .build()
                .map_err(DiagnosticError::ThreadPoolBuild)?,
        };
        Ok(self.pool.insert(pool))
    }
}

/// Why diagnostics collection was skipped.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SkipReason {
    /// `no_bug_report_on_fail` is set.
    Disabled,

    /// The log directory is over `soft_output_size_limit`.
    SizeLimitReached,
}

/// The outcome of a call to [`DiagnosticsCollector::collect`].
#[derive(Debug)]
pub enum DiagnosticsOutcome {
    /// Collection was skipped.
    Skipped(SkipReason),

    /// Collection ran. Any errors have already been logged.
    Collected {
        /// Errors from individual sources.
        errors: Vec<DiagnosticError>,
    },
}

fn take_bug_report(
    source: &dyn DiagnosticSource,
    test_name: &str,
    begin_time: i64,
) -> Result<(), DiagnosticError> {
    let mut attempt = 1;
    loop {
        match source.take_bug_report(test_name, begin_time) {
            Ok(()) => return Ok(()),
            Err(error) if attempt >= BUG_REPORT_ATTEMPTS => {
                return Err(DiagnosticError::BugReport {
                    device: source.name().to_owned(),
                    attempts: attempt,
                    error,
                });
            }
            Err(error) => {
                warn!(
                    "[{}] bug report attempt {attempt} failed: {error}",
                    source.name()
                );
                attempt += 1;
            }
        }
    }
}

/// Runs a worker body, turning a panic in device code into an error.
fn contain_panic(
    device: &str,
    f: impl FnOnce() -> Result<(), DiagnosticError>,
) -> Result<(), DiagnosticError> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(DiagnosticError::Panicked {
            device: device.to_owned(),
            message: panic_message(&*payload),
        })
    })
}

fn push_error(errors: &Mutex<Vec<DiagnosticError>>, error: DiagnosticError) {
    warn!("{}", DisplayErrorChain::new(&error));
    errors
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(error);
}

/// Returns the total size of regular files under `path`, in bytes.
///
/// Entries that can't be read are ignored.
fn directory_size(path: &Utf8Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}
