//! Engine configuration from agent-style arguments.
//!
//! Arguments are `key=value` pairs separated by commas, e.g. `verbose=true,io_tracking=off`.
//! A bare key means `true`. Unknown keys and unreadable booleans are rejected so that typos do
//! not silently fall back to defaults.

use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator};

use crate::{Error, Result};

/// Recognized configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ConfigKey {
    /// Log every instrumented method at info level.
    Verbose,
    /// Install the I/O-tracking transformer next to the tracking rewriter.
    IoTracking,
}

/// Switches consumed at engine construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineConfig {
    /// Log instrumented methods at info level instead of debug.
    pub verbose: bool,
    /// Enable the I/O-tracking transformer.
    pub io_tracking: bool,
}

fn parse_bool(key: ConfigKey, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!(
            "{} expects a boolean, got '{other}'",
            key.as_ref()
        ))),
    }
}

impl EngineConfig {
    /// Parse agent arguments. `None` or an empty string yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] for unknown keys or invalid values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probeweave::engine::EngineConfig;
    ///
    /// let config = EngineConfig::from_agent_args(Some("verbose, io_tracking=off"))?;
    /// assert!(config.verbose);
    /// assert!(!config.io_tracking);
    /// # Ok::<(), probeweave::Error>(())
    /// ```
    pub fn from_agent_args(args: Option<&str>) -> Result<Self> {
        let mut config = EngineConfig::default();
        let Some(args) = args else {
            return Ok(config);
        };

        for pair in args.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = match pair.split_once('=') {
                Some((key, value)) => (key.trim(), Some(value)),
                None => (pair, None),
            };
            let key = ConfigKey::from_str(key).map_err(|_| {
                let known: Vec<_> = ConfigKey::iter().map(|k| k.as_ref().to_string()).collect();
                Error::Config(format!("unknown key '{key}', expected one of {}", known.join(", ")))
            })?;
            let value = match value {
                Some(value) => parse_bool(key, value)?,
                None => true,
            };
            match key {
                ConfigKey::Verbose => config.verbose = value,
                ConfigKey::IoTracking => config.io_tracking = value,
            }
        }
        Ok(config)
    }
}

impl FromStr for EngineConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EngineConfig::from_agent_args(Some(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() -> Result<()> {
        assert_eq!(EngineConfig::from_agent_args(None)?, EngineConfig::default());
        assert_eq!("".parse::<EngineConfig>()?, EngineConfig::default());
        assert_eq!(" , ".parse::<EngineConfig>()?, EngineConfig::default());
        Ok(())
    }

    #[test]
    fn pairs_and_bare_keys() -> Result<()> {
        let config: EngineConfig = "verbose=yes,io_tracking=1".parse()?;
        assert!(config.verbose && config.io_tracking);

        let config: EngineConfig = "IO_TRACKING".parse()?;
        assert!(config.io_tracking && !config.verbose);

        let config: EngineConfig = "verbose=on, verbose = OFF".parse()?;
        assert!(!config.verbose, "last occurrence wins");
        Ok(())
    }

    #[test]
    fn rejects_unknown_input() {
        assert!(matches!("colour=red".parse::<EngineConfig>(), Err(Error::Config(_))));
        assert!(matches!("verbose=maybe".parse::<EngineConfig>(), Err(Error::Config(_))));
    }
}
