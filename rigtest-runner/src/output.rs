// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logging setup for binaries that drive test classes.
//!
//! The engine itself only emits [`tracing`] events. A binary that wants them on stderr calls
//! [`init_logging`] once at startup; the filter is read from the `RIGTEST_LOG` environment
//! variable, using [`Targets`] syntax (e.g. `info,rigtest_runner::runner=debug`).

use crate::{errors::LogFilterParseError, time::log_line_timestamp};
use chrono::Local;
use owo_colors::{OwoColorize, Style, style};
use std::{fmt, sync::Once};
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// The environment variable holding the log filter.
pub const LOG_ENV_VAR: &str = "RIGTEST_LOG";

/// Specifies whether to colorize output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub enum Color {
    /// Colorize if stderr supports it and `NO_COLOR` isn't set.
    #[default]
    Auto,

    /// Always try to colorize.
    Always,

    /// Never try to colorize.
    Never,
}

impl Color {
    /// Resolves `Auto` against what `stream` supports.
    pub fn should_colorize(self, stream: supports_color::Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

/// Installs a stderr logger filtered by `RIGTEST_LOG`.
///
/// Only the first call has any effect. If the embedding binary has already installed a global
/// subscriber, that subscriber is left in place.
pub fn init_logging(color: Color) -> Result<(), LogFilterParseError> {
    let targets = parse_log_filter(&std::env::var(LOG_ENV_VAR).unwrap_or_default())?;

    let formatter = LineFormatter {
        colorize: color.should_colorize(supports_color::Stream::Stderr),
    };

    INIT_LOGGER.call_once(|| {
        let layer = tracing_subscriber::fmt::layer()
            .event_format(formatter)
            .with_writer(std::io::stderr)
            .with_filter(targets);

        // An error here means a global subscriber is already set.
        let _ = tracing_subscriber::registry().with(layer).try_init();
    });

    Ok(())
}

fn parse_log_filter(input: &str) -> Result<Targets, LogFilterParseError> {
    // If the filter is empty, use the standard level filter instead.
    if input.is_empty() {
        return Ok(Targets::new().with_default(LevelFilter::INFO));
    }
    input
        .parse()
        .map_err(|error| LogFilterParseError::new(input, Box::new(error)))
}

/// Writes events as `MM-DD HH:MM:SS.mmm LEVEL message`, the layout of test class log files.
struct LineFormatter {
    colorize: bool,
}

impl LineFormatter {
    fn level_style(&self, level: Level) -> Style {
        if !self.colorize {
            return Style::new();
        }
        match level {
            Level::ERROR => style().red().bold(),
            Level::WARN => style().yellow().bold(),
            Level::TRACE => style().dimmed(),
            _ => style().bold(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = *event.metadata().level();
        let label = format!("{level:<5}");
        write!(
            writer,
            "{} {} ",
            log_line_timestamp(Local::now()),
            label.style(self.level_style(level)),
        )?;

        let mut fields = FieldWriter {
            writer: &mut writer,
            // Structured fields are noise at info and above.
            verbose: level >= Level::DEBUG,
            result: Ok(()),
        };
        event.record(&mut fields);
        fields.result?;

        writeln!(writer)
    }
}

struct FieldWriter<'w, 'a> {
    writer: &'a mut format::Writer<'w>,
    verbose: bool,
    result: fmt::Result,
}

impl Visit for FieldWriter<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if self.result.is_err() {
            return;
        }
        self.result = match field.name() {
            "message" => write!(self.writer, "{value:?}"),
            name if self.verbose => write!(self.writer, " [{name}={value:?}]"),
            _ => Ok(()),
        };
    }
}

static INIT_LOGGER: Once = Once::new();
