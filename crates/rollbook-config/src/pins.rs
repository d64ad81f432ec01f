//! Registration PIN issuance policy.
//!
//! # Environment Variables
//!
//! - `PIN_CODE_LENGTH`: Characters per code (default: 10, clamped to 8..=32)
//! - `PIN_VALIDITY_DAYS`: Days until a new PIN expires (default: 30, at most 3650)
//! - `PIN_MAX_ATTEMPTS`: Candidates drawn per PIN before giving up (default: 1000)
//! - `PIN_MAX_BATCH`: Largest batch a single request may issue (default: 500)

use std::env;

pub const MIN_CODE_LENGTH: usize = 8;
pub const MAX_CODE_LENGTH: usize = 32;
pub const MAX_VALIDITY_DAYS: i64 = 3650;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PinConfig {
    pub code_length: usize,
    pub validity_days: i64,
    pub max_attempts: u32,
    pub max_batch: i64,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            code_length: 10,
            validity_days: 30,
            max_attempts: 1000,
            max_batch: 500,
        }
    }
}

impl PinConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Unparseable or
    /// non-positive values fall back to the defaults.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let code_length = lookup("PIN_CODE_LENGTH")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.code_length)
            .clamp(MIN_CODE_LENGTH, MAX_CODE_LENGTH);

        let validity_days = lookup("PIN_VALIDITY_DAYS")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.validity_days)
            .min(MAX_VALIDITY_DAYS);

        let max_attempts = lookup("PIN_MAX_ATTEMPTS")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.max_attempts);

        let max_batch = lookup("PIN_MAX_BATCH")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.max_batch);

        Self {
            code_length,
            validity_days,
            max_attempts,
            max_batch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = PinConfig::from_lookup(|_| None);
        assert_eq!(config, PinConfig::default());
        assert_eq!(config.code_length, 10);
        assert_eq!(config.validity_days, 30);
    }

    #[test]
    fn test_reads_values() {
        let config = PinConfig::from_lookup(lookup_from(&[
            ("PIN_CODE_LENGTH", "12"),
            ("PIN_VALIDITY_DAYS", "7"),
            ("PIN_MAX_ATTEMPTS", "50"),
            ("PIN_MAX_BATCH", "20"),
        ]));
        assert_eq!(config.code_length, 12);
        assert_eq!(config.validity_days, 7);
        assert_eq!(config.max_attempts, 50);
        assert_eq!(config.max_batch, 20);
    }

    #[test]
    fn test_code_length_is_clamped() {
        let short = PinConfig::from_lookup(lookup_from(&[("PIN_CODE_LENGTH", "4")]));
        assert_eq!(short.code_length, MIN_CODE_LENGTH);

        let long = PinConfig::from_lookup(lookup_from(&[("PIN_CODE_LENGTH", "64")]));
        assert_eq!(long.code_length, MAX_CODE_LENGTH);
    }

    #[test]
    fn test_validity_days_is_capped() {
        let config = PinConfig::from_lookup(lookup_from(&[("PIN_VALIDITY_DAYS", "100000000")]));
        assert_eq!(config.validity_days, MAX_VALIDITY_DAYS);

        let config = PinConfig::from_lookup(lookup_from(&[("PIN_VALIDITY_DAYS", "3650")]));
        assert_eq!(config.validity_days, 3650);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = PinConfig::from_lookup(lookup_from(&[
            ("PIN_VALIDITY_DAYS", "0"),
            ("PIN_MAX_ATTEMPTS", "lots"),
            ("PIN_MAX_BATCH", "-3"),
        ]));
        assert_eq!(config.validity_days, 30);
        assert_eq!(config.max_attempts, 1000);
        assert_eq!(config.max_batch, 500);
    }
}
