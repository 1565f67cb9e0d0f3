use std::time::Duration;

use log::{LevelFilter, warn};

pub const TICK_ENV: &str = "PROCSCHED_TICK_MS";
pub const LOG_ENV: &str = "PROCSCHED_LOG";
pub const DRY_RUN_ENV: &str = "PROCSCHED_DRY_RUN";

const DEFAULT_TICK_MS: u64 = 1000;

/// Runtime settings taken from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Wall-clock length of one simulated second.
    pub tick: Duration,
    pub log_level: LevelFilter,
    /// Use the in-process executor instead of forking.
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(DEFAULT_TICK_MS),
            log_level: LevelFilter::Info,
            dry_run: false,
        }
    }
}

impl Config {
    /// Build from an arbitrary variable lookup. Unparseable values keep their
    /// defaults; the returned warnings should be logged once logging is up.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let (config, _) = Self::from_lookup_with_warnings(lookup);
        config
    }

    pub fn from_lookup_with_warnings(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> (Self, Vec<String>) {
        let mut config = Config::default();
        let mut warnings = Vec::new();

        if let Some(raw) = lookup(TICK_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.tick = Duration::from_millis(ms),
                Err(_) => warnings.push(format!(
                    "ignoring {TICK_ENV}={raw:?}; using {DEFAULT_TICK_MS} ms"
                )),
            }
        }

        if let Some(raw) = lookup(LOG_ENV) {
            match raw.trim().parse::<LevelFilter>() {
                Ok(level) => config.log_level = level,
                Err(_) => warnings.push(format!("ignoring {LOG_ENV}={raw:?}; using info")),
            }
        }

        if let Some(raw) = lookup(DRY_RUN_ENV) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => config.dry_run = true,
                "0" | "false" | "no" | "" => config.dry_run = false,
                _ => warnings.push(format!("ignoring {DRY_RUN_ENV}={raw:?}")),
            }
        }

        (config, warnings)
    }

    pub fn log_warnings(warnings: &[String]) {
        for w in warnings {
            warn!("{w}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_to_real_seconds() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config, Config::default());
        assert_eq!(config.tick, Duration::from_secs(1));
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            (TICK_ENV, "5"),
            (LOG_ENV, "debug"),
            (DRY_RUN_ENV, "true"),
        ]));
        assert_eq!(config.tick, Duration::from_millis(5));
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert!(config.dry_run);
    }

    #[test]
    fn bad_values_fall_back_with_a_warning() {
        let (config, warnings) =
            Config::from_lookup_with_warnings(lookup(&[(TICK_ENV, "fast"), (LOG_ENV, "loud")]));
        assert_eq!(config.tick, Duration::from_secs(1));
        assert_eq!(config.log_level, LevelFilter::Info);
        assert_eq!(warnings.len(), 2);
    }
}
