//! Engine configuration.

use std::{env, str::FromStr, time::Duration};

/// What `reset` does when an execution of a non-concurrent buffer is still in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum InFlightReset {
    /// Fail immediately with `InUse`.
    Fail,
    /// Wait for completion up to the timeout, then fail with `InUse`.
    Wait(Duration),
}

/// Configuration shared by command pools, buffers and encoders.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Number of fence slots per barrier stage.
    pub fence_ring_capacity: usize,

    /// Keep released commands in free lists for reuse.
    pub object_pooling: bool,

    /// Encode events as native shared event operations when the device supports them.
    pub native_events: bool,

    /// Render contiguous multiview views in one layered native pass when supported.
    pub layered_multiview: bool,

    /// Log emulation fallbacks that cost performance.
    pub performance_warnings: bool,

    /// Policy of resetting buffers with executions in flight.
    pub in_flight_reset: InFlightReset,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fence_ring_capacity: 64,
            object_pooling: true,
            native_events: true,
            layered_multiview: true,
            performance_warnings: true,
            in_flight_reset: InFlightReset::Fail,
        }
    }
}

impl Config {
    /// Default configuration overridden by `FORGE_*` environment variables.
    ///
    /// Recognized variables are `FORGE_FENCE_RING_CAPACITY`, `FORGE_OBJECT_POOLING`,
    /// `FORGE_NATIVE_EVENTS`, `FORGE_LAYERED_MULTIVIEW`, `FORGE_PERFORMANCE_WARNINGS`
    /// and `FORGE_RESET_WAIT_MS`. Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Default configuration overridden by values from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(capacity) = parse::<usize>(&lookup, "FORGE_FENCE_RING_CAPACITY") {
            if capacity > 0 {
                config.fence_ring_capacity = capacity;
            } else {
                log::warn!("FORGE_FENCE_RING_CAPACITY must be positive");
            }
        }
        if let Some(flag) = parse_flag(&lookup, "FORGE_OBJECT_POOLING") {
            config.object_pooling = flag;
        }
        if let Some(flag) = parse_flag(&lookup, "FORGE_NATIVE_EVENTS") {
            config.native_events = flag;
        }
        if let Some(flag) = parse_flag(&lookup, "FORGE_LAYERED_MULTIVIEW") {
            config.layered_multiview = flag;
        }
        if let Some(flag) = parse_flag(&lookup, "FORGE_PERFORMANCE_WARNINGS") {
            config.performance_warnings = flag;
        }
        if let Some(ms) = parse::<u64>(&lookup, "FORGE_RESET_WAIT_MS") {
            config.in_flight_reset = InFlightReset::Wait(Duration::from_millis(ms));
        }

        log::debug!("Engine configuration: {:#?}", config);
        config
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let value = lookup(name)?;
    match value.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring {}={:?}: not a number", name, value);
            None
        }
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<bool> {
    let value = lookup(name)?;
    match value.trim() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        other => {
            log::warn!("Ignoring {}={:?}: not a flag", name, other);
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup_overrides_defaults() {
        let config = Config::from_lookup(|name| match name {
            "FORGE_FENCE_RING_CAPACITY" => Some("8".to_owned()),
            "FORGE_OBJECT_POOLING" => Some("off".to_owned()),
            "FORGE_RESET_WAIT_MS" => Some("250".to_owned()),
            _ => None,
        });

        assert_eq!(config.fence_ring_capacity, 8);
        assert!(!config.object_pooling);
        assert!(config.native_events);
        assert_eq!(
            config.in_flight_reset,
            InFlightReset::Wait(Duration::from_millis(250))
        );
    }

    #[test]
    fn invalid_values_are_ignored() {
        let config = Config::from_lookup(|name| match name {
            "FORGE_FENCE_RING_CAPACITY" => Some("0".to_owned()),
            "FORGE_NATIVE_EVENTS" => Some("maybe".to_owned()),
            _ => None,
        });

        assert_eq!(config, Config::default());
    }
}
