// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wall-clock stamps for the beginning and end of a test case.
//!
//! The begin stamp is read from the realtime clock so it lines up with device logs. The end stamp
//! is derived from it by adding the monotonic elapsed time, which keeps a host clock adjustment
//! mid-test from producing an end before the begin.

use chrono::{DateTime, Local};
use std::time::Instant;

/// The format used for timestamps in log lines: `MM-DD HH:MM:SS.mmm`.
pub(crate) const LOG_LINE_TIMESTAMP_FORMAT: &str = "%m-%d %H:%M:%S%.3f";

/// A clock started when a test case begins.
#[derive(Clone, Debug)]
pub(crate) struct CaseClock {
    began_at: DateTime<Local>,
    monotonic: Instant,
}

impl CaseClock {
    pub(crate) fn start() -> Self {
        Self {
            began_at: Local::now(),
            monotonic: Instant::now(),
        }
    }

    pub(crate) fn began_at(&self) -> DateTime<Local> {
        self.began_at
    }

    /// The begin stamp plus however long the clock has been running.
    pub(crate) fn now(&self) -> DateTime<Local> {
        self.began_at + self.monotonic.elapsed()
    }
}

/// Formats a timestamp the way it appears in log lines.
pub(crate) fn log_line_timestamp(time: DateTime<Local>) -> String {
    time.format(LOG_LINE_TIMESTAMP_FORMAT).to_string()
}
