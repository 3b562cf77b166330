// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for test classes.
//!
//! A [`TestClassConfig`] is bound to a test class before any life-cycle method runs. It is read
//! from TOML, layered over built-in defaults and then over `RIGTEST_CONFIG_`-prefixed environment
//! variables. Unknown keys are rejected when the config is built.

use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind, UserParamError},
    runner::TestArgs,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{
    Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, builder::DefaultState,
};
use indexmap::IndexMap;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::warn;

/// Configuration bound to a test class instance.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TestClassConfig {
    testbed_name: String,
    log_path: Utf8PathBuf,
    #[serde(default)]
    test_failure_tracebacks: bool,
    #[serde(default)]
    no_bug_report_on_fail: bool,
    #[serde(default)]
    soft_output_size_limit: Option<u64>,
    #[serde(default)]
    cli_args: TestArgs,
    #[serde(default)]
    user_params: IndexMap<String, Value>,
}

impl TestClassConfig {
    /// Contains the default config as a TOML file.
    ///
    /// User configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Environment configuration uses this prefix, plus a _.
    ///
    /// Nested keys are separated by `__`, e.g. `RIGTEST_CONFIG_USER_PARAMS__WIFI_SSID`.
    pub const ENVIRONMENT_PREFIX: &'static str = "RIGTEST_CONFIG";

    /// The name used in errors for configs that don't come from a file.
    const INLINE_CONFIG_NAME: &'static str = "<inline>";

    /// Reads the config from the given TOML file, layered over the defaults and under environment
    /// variables.
    pub fn from_file(config_file: &Utf8Path) -> Result<Self, ConfigParseError> {
        let builder = Self::make_default_config()
            .add_source(File::new(config_file.as_str(), FileFormat::Toml))
            .add_source(Self::environment());
        Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(config_file, kind))
    }

    /// Reads the config from a TOML string, layered over the defaults.
    ///
    /// Environment variables are not consulted.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigParseError> {
        let builder =
            Self::make_default_config().add_source(File::from_str(toml, FileFormat::Toml));
        Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(Self::INLINE_CONFIG_NAME, kind))
    }

    /// The name of the testbed this class runs against.
    pub fn testbed_name(&self) -> &str {
        &self.testbed_name
    }

    /// The directory logs and diagnostics are written to.
    pub fn log_path(&self) -> &Utf8Path {
        &self.log_path
    }

    /// Whether failures are logged with full debug detail.
    pub fn test_failure_tracebacks(&self) -> bool {
        self.test_failure_tracebacks
    }

    /// Whether to skip collecting bug reports when a test case fails.
    pub fn no_bug_report_on_fail(&self) -> bool {
        self.no_bug_report_on_fail
    }

    /// Once the log directory grows past this many bytes, bug reports are no longer collected.
    pub fn soft_output_size_limit(&self) -> Option<u64> {
        self.soft_output_size_limit
    }

    /// Arguments forwarded to every test body run by the class runner.
    pub fn cli_args(&self) -> &TestArgs {
        &self.cli_args
    }

    /// Replaces the arguments forwarded to test bodies.
    pub fn with_cli_args(mut self, cli_args: TestArgs) -> Self {
        self.cli_args = cli_args;
        self
    }

    /// Free-form parameters for test classes.
    pub fn user_params(&self) -> UserParams<'_> {
        UserParams {
            params: &self.user_params,
        }
    }

    fn environment() -> Environment {
        Environment::with_prefix(Self::ENVIRONMENT_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<Self, ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: TestClassConfig =
            serde_path_to_error::deserialize(ignored_de).map_err(|error| {
                // The config crate also reports the key; drop it in favor of the path.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        if !ignored.is_empty() {
            return Err(ConfigParseErrorKind::UnknownKeys {
                keys: ignored.into_iter().collect(),
            });
        }

        Ok(config)
    }
}

/// The same values as [`TestClassConfig::DEFAULT_CONFIG`], without parsing it.
impl Default for TestClassConfig {
    fn default() -> Self {
        Self {
            testbed_name: "default".to_owned(),
            log_path: Utf8PathBuf::from("logs"),
            test_failure_tracebacks: false,
            no_bug_report_on_fail: false,
            soft_output_size_limit: None,
            cli_args: TestArgs::default(),
            user_params: IndexMap::new(),
        }
    }
}

/// Typed access to [user params](TestClassConfig::user_params).
#[derive(Clone, Copy, Debug)]
pub struct UserParams<'cfg> {
    params: &'cfg IndexMap<String, Value>,
}

impl<'cfg> UserParams<'cfg> {
    /// Returns the raw value of a parameter.
    pub fn get(&self, name: &str) -> Option<&'cfg Value> {
        self.params.get(name)
    }

    /// Returns true if the parameter was provided.
    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Reads a parameter that must be provided.
    pub fn required<T: DeserializeOwned>(&self, name: &str) -> Result<T, UserParamError> {
        match self.parse(name)? {
            Some(value) => Ok(value),
            None => Err(UserParamError::Missing {
                name: name.to_owned(),
            }),
        }
    }

    /// Reads a parameter that may be omitted, logging a warning if it is.
    pub fn optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, UserParamError> {
        let value = self.parse(name)?;
        if value.is_none() {
            warn!("missing optional user param `{name}` in configuration, continuing");
        }
        Ok(value)
    }

    /// Reads a parameter, falling back to `default` if it isn't provided.
    ///
    /// A value in the config always wins over the default.
    pub fn or_default<T: DeserializeOwned>(
        &self,
        name: &str,
        default: T,
    ) -> Result<T, UserParamError> {
        Ok(self.parse(name)?.unwrap_or(default))
    }

    fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, UserParamError> {
        self.params
            .get(name)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|error| UserParamError::Invalid {
                    name: name.to_owned(),
                    error,
                })
            })
            .transpose()
    }
}
