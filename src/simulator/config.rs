use std::time::Duration;

/// Inclusive range a simulated delay is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub const ZERO: Self = Self::from_millis(0, 0);

    pub const fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min: Duration::from_millis(min_ms),
            max: Duration::from_millis(max_ms),
        }
    }

    pub const fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }
}

/// Latency and failure profile of the simulated upstream.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatorConfig {
    /// Range used for most requests.
    pub short_delay: DelayRange,
    /// Range used with probability `long_delay_probability`.
    pub long_delay: DelayRange,
    pub long_delay_probability: f64,
    /// Probability that a request fails after its delay, independent of the regime.
    pub error_probability: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            short_delay: DelayRange::from_millis(500, 2_000),
            long_delay: DelayRange::from_millis(10_000, 15_000),
            long_delay_probability: 0.1,
            error_probability: 0.5,
        }
    }
}

/// Invalid simulator configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    Probability { name: &'static str, value: f64 },
    #[error("{name} is inverted: {min_ms} ms > {max_ms} ms")]
    InvertedRange {
        name: &'static str,
        min_ms: u128,
        max_ms: u128,
    },
    #[error("invalid {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl SimulatorConfig {
    /// No delay at all, failing with `error_probability`.
    pub fn instant(error_probability: f64) -> Self {
        Self {
            short_delay: DelayRange::ZERO,
            long_delay: DelayRange::ZERO,
            long_delay_probability: 0.0,
            error_probability,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("long_delay_probability", self.long_delay_probability)?;
        check_probability("error_probability", self.error_probability)?;
        check_range("short_delay", self.short_delay)?;
        check_range("long_delay", self.long_delay)?;
        Ok(())
    }

    /// Reads overrides from `FLAKY_BOATS_*` environment variables.
    ///
    /// - `FLAKY_BOATS_SHORT_DELAY_MS` / `FLAKY_BOATS_LONG_DELAY_MS`: `min-max` or a single value
    /// - `FLAKY_BOATS_LONG_DELAY_PROBABILITY`, `FLAKY_BOATS_ERROR_PROBABILITY`: `0.0..=1.0`
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SimulatorConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("FLAKY_BOATS_SHORT_DELAY_MS") {
            config.short_delay = parse_range("FLAKY_BOATS_SHORT_DELAY_MS", &raw)?;
        }
        if let Some(raw) = lookup("FLAKY_BOATS_LONG_DELAY_MS") {
            config.long_delay = parse_range("FLAKY_BOATS_LONG_DELAY_MS", &raw)?;
        }
        if let Some(raw) = lookup("FLAKY_BOATS_LONG_DELAY_PROBABILITY") {
            config.long_delay_probability =
                parse_f64("FLAKY_BOATS_LONG_DELAY_PROBABILITY", &raw)?;
        }
        if let Some(raw) = lookup("FLAKY_BOATS_ERROR_PROBABILITY") {
            config.error_probability = parse_f64("FLAKY_BOATS_ERROR_PROBABILITY", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Probability { name, value })
    }
}

fn check_range(name: &'static str, range: DelayRange) -> Result<(), ConfigError> {
    if range.min > range.max {
        return Err(ConfigError::InvertedRange {
            name,
            min_ms: range.min.as_millis(),
            max_ms: range.max.as_millis(),
        });
    }
    Ok(())
}

fn parse_f64(key: &str, raw: &str) -> Result<f64, ConfigError> {
    raw.trim().parse::<f64>().map_err(|err| ConfigError::Invalid {
        key: key.to_owned(),
        reason: err.to_string(),
    })
}

fn parse_millis(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|err| ConfigError::Invalid {
        key: key.to_owned(),
        reason: format!("'{}': {err}", raw.trim()),
    })
}

fn parse_range(key: &str, raw: &str) -> Result<DelayRange, ConfigError> {
    match raw.split_once('-') {
        Some((min, max)) => Ok(DelayRange::from_millis(
            parse_millis(key, min)?,
            parse_millis(key, max)?,
        )),
        None => {
            let fixed = parse_millis(key, raw)?;
            Ok(DelayRange::fixed(Duration::from_millis(fixed)))
        }
    }
}
