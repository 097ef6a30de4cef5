//! Configuration loading: optional JSON file named by `FORGEHR_CONFIG`, then
//! `FORGEHR_*` environment overrides.
//!
//! An override that does not parse is logged and ignored; the file (or
//! default) value stays in effect.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use forgehr_ai::{EngineConfig, OverflowPolicy};
use thiserror::Error;
use tracing::{info, warn};

pub const CONFIG_PATH_VAR: &str = "FORGEHR_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load from the process environment.
pub fn load() -> Result<EngineConfig, ConfigError> {
    load_with(|name| std::env::var(name).ok())
}

/// Load using `lookup` in place of the process environment.
pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<EngineConfig, ConfigError> {
    let mut config = match lookup(CONFIG_PATH_VAR).filter(|p| !p.trim().is_empty()) {
        Some(path) => read_file(Path::new(&path))?,
        None => EngineConfig::default(),
    };
    apply_env_overrides(&mut config, &lookup);
    Ok(config)
}

pub fn read_file(path: &Path) -> Result<EngineConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "engine config loaded");
    Ok(config)
}

fn parse_overflow(raw: &str) -> Option<OverflowPolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "queue" => Some(OverflowPolicy::Queue),
        "reject" => Some(OverflowPolicy::Reject),
        _ => None,
    }
}

fn override_with<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    target: &mut T,
    parse: impl Fn(&str) -> Option<T>,
) {
    let Some(raw) = lookup(name) else {
        return;
    };
    match parse(&raw) {
        Some(value) => *target = value,
        None => warn!(var = name, value = %raw, "ignoring unparsable config override"),
    }
}

fn number<T: FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}

fn fraction(raw: &str) -> Option<f64> {
    number::<f64>(raw).filter(|v| (0.0..=1.0).contains(v))
}

fn non_negative(raw: &str) -> Option<f64> {
    number::<f64>(raw).filter(|v| v.is_finite() && *v >= 0.0)
}

pub fn apply_env_overrides(config: &mut EngineConfig, lookup: &impl Fn(&str) -> Option<String>) {
    let inv = &mut config.invocation;
    override_with(lookup, "FORGEHR_TIMEOUT_MS", &mut inv.timeout_ms, number);
    override_with(lookup, "FORGEHR_MAX_RETRIES", &mut inv.max_retries, number);
    override_with(lookup, "FORGEHR_BASE_BACKOFF_MS", &mut inv.base_backoff_ms, number);
    override_with(lookup, "FORGEHR_MAX_BACKOFF_MS", &mut inv.max_backoff_ms, number);
    override_with(lookup, "FORGEHR_MAX_IN_FLIGHT", &mut inv.max_in_flight, number);
    override_with(lookup, "FORGEHR_OVERFLOW", &mut inv.overflow, parse_overflow);

    let q = &mut config.quality;
    override_with(lookup, "FORGEHR_QUALITY_WINDOW", &mut q.window, number);
    override_with(lookup, "FORGEHR_ACCURACY_FLOOR", &mut q.accuracy_floor, fraction);
    override_with(lookup, "FORGEHR_MIN_OUTCOMES", &mut q.min_outcomes, number);
    override_with(lookup, "FORGEHR_LATENCY_BUDGET_MS", &mut q.latency_budget_ms, non_negative);
    override_with(lookup, "FORGEHR_COST_BUDGET", &mut q.cost_budget, non_negative);

    override_with(
        lookup,
        "FORGEHR_CONFIDENCE_FLOOR",
        &mut config.regression.confidence_floor,
        fraction,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn temp_config(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("forgehr-{name}-{}.json", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn no_file_and_no_env_is_default() {
        assert_eq!(load_with(env(&[])).unwrap(), EngineConfig::default());
    }

    #[test]
    fn env_overrides_apply_and_bad_values_are_ignored() {
        let config = load_with(env(&[
            ("FORGEHR_TIMEOUT_MS", "1500"),
            ("FORGEHR_OVERFLOW", "Reject"),
            ("FORGEHR_ACCURACY_FLOOR", "1.7"),
            ("FORGEHR_MAX_IN_FLIGHT", "many"),
            ("FORGEHR_CONFIDENCE_FLOOR", "0.75"),
        ]))
        .unwrap();

        assert_eq!(config.invocation.timeout_ms, 1500);
        assert_eq!(config.invocation.overflow, OverflowPolicy::Reject);
        assert_eq!(config.invocation.max_in_flight, 8);
        assert_eq!(config.quality.accuracy_floor, 0.8);
        assert_eq!(config.regression.confidence_floor, 0.75);
    }

    #[test]
    fn file_values_are_overridden_by_env() {
        let path = temp_config(
            "override",
            r#"{"invocation": {"timeout_ms": 900, "max_retries": 5}}"#,
        );
        let path_str = path.to_string_lossy().to_string();
        let config = load_with(env(&[
            (CONFIG_PATH_VAR, path_str.as_str()),
            ("FORGEHR_MAX_RETRIES", "1"),
        ]))
        .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.invocation.timeout_ms, 900);
        assert_eq!(config.invocation.max_retries, 1);
    }

    #[test]
    fn unreadable_and_invalid_files_are_errors() {
        let err = load_with(env(&[(CONFIG_PATH_VAR, "/nonexistent/forgehr.json")])).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));

        let path = temp_config("invalid", "{ not json");
        let err = read_file(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
