use std::{fs, io, path::Path};

use anyhow::Context;
use client_core::{settings::normalize_api_base, PlaygroundSettings};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "playground.toml";
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Optional on-disk overrides. Timings are fixed and not configurable.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    api_base: Option<String>,
    log: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub settings: PlaygroundSettings,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings: PlaygroundSettings::default(),
            log_filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}

/// Layers defaults, the config file, the environment and the command line,
/// in that order. An explicitly named config file must exist; the default
/// one is optional.
pub fn load_config(
    config_path: Option<&Path>,
    cli_api_base: Option<&str>,
) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::default();

    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut config, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound && config_path.is_none() => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    }

    apply_env(&mut config, |key| std::env::var(key).ok());

    if let Some(api_base) = cli_api_base {
        config.settings.api_base = api_base.to_string();
    }

    config.settings.api_base = normalize_api_base(&config.settings.api_base)
        .with_context(|| format!("invalid API base '{}'", config.settings.api_base))?;
    Ok(config)
}

fn apply_file(config: &mut AppConfig, raw: &str) -> anyhow::Result<()> {
    let file: FileConfig = toml::from_str(raw)?;
    if let Some(api_base) = file.api_base {
        config.settings.api_base = api_base;
    }
    if let Some(log) = file.log {
        config.log_filter = log;
    }
    Ok(())
}

fn apply_env(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("QUANTUM_API_BASE") {
        config.settings.api_base = v;
    }
    if let Some(v) = lookup("APP__API_BASE") {
        config.settings.api_base = v;
    }
    if let Some(v) = lookup("APP__LOG") {
        config.log_filter = v;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn file_overrides_defaults() {
        let mut config = AppConfig::default();
        apply_file(
            &mut config,
            "api_base = \"http://sim.local:9000/api\"\nlog = \"debug\"\n",
        )
        .expect("parse");
        assert_eq!(config.settings.api_base, "http://sim.local:9000/api");
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.settings.poll_interval, PlaygroundSettings::default().poll_interval);
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let mut config = AppConfig::default();
        assert!(apply_file(&mut config, "poll_interval_ms = 5\n").is_err());
    }

    #[test]
    fn app_prefixed_env_wins_over_plain_env() {
        let mut config = AppConfig::default();
        apply_env(
            &mut config,
            env_of(&[
                ("QUANTUM_API_BASE", "http://plain:1/api"),
                ("APP__API_BASE", "http://prefixed:2/api"),
            ]),
        );
        assert_eq!(config.settings.api_base, "http://prefixed:2/api");

        let mut config = AppConfig::default();
        apply_env(&mut config, env_of(&[("QUANTUM_API_BASE", "http://plain:1/api")]));
        assert_eq!(config.settings.api_base, "http://plain:1/api");
    }

    #[test]
    fn explicit_config_file_and_cli_flag_layer_in_order() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("quantum_playground_test_{suffix}.toml"));
        fs::write(&path, "api_base = \"http://from-file:8000/api/\"\n").expect("write config");

        let from_file = load_config(Some(&path), None).expect("load");
        // Only assert when the environment does not override the base.
        if env::var("QUANTUM_API_BASE").is_err() && env::var("APP__API_BASE").is_err() {
            assert_eq!(from_file.settings.api_base, "http://from-file:8000/api");
        }

        let from_cli = load_config(Some(&path), Some("https://cli.example/api")).expect("load");
        assert_eq!(from_cli.settings.api_base, "https://cli.example/api");

        fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn missing_explicit_config_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/playground.toml")), None)
            .expect_err("missing file");
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn cli_api_base_is_validated() {
        let err = load_config(None, Some("ftp://sim/api")).expect_err("unsupported scheme");
        assert!(err.to_string().contains("invalid API base"));
    }
}
