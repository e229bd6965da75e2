use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;

use crate::{
    domain::order::TimelineKind,
    integration::runtime::RuntimeOptions,
    model::timeline::DEFAULT_PAGE_SIZE,
    utils,
};

const CONFIG: &str = include_str!("../../.config/config.json5");

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub _data_dir: PathBuf,
    #[serde(default)]
    pub _config_dir: PathBuf,
}

/// Tuning knobs of a timeline
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelineConfig {
    pub kind: TimelineKind,
    pub page_size: usize,
    pub scroll_threshold: f64,
    pub scroll_debounce_ms: u64,
    pub typing_timeout_ms: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            kind: TimelineKind::Feed,
            page_size: DEFAULT_PAGE_SIZE,
            scroll_threshold: 200.0,
            scroll_debounce_ms: 300,
            typing_timeout_ms: 3000,
            fetch_timeout_secs: 10,
        }
    }
}

impl TimelineConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            scroll_threshold: self.scroll_threshold,
            scroll_debounce: Duration::from_millis(self.scroll_debounce_ms),
            typing_timeout: Duration::from_millis(self.typing_timeout_ms),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default, flatten)]
    pub config: AppConfig,
    #[serde(default)]
    pub relays: Vec<String>,
    #[serde(default)]
    pub timeline: TimelineConfig,
}

impl Config {
    /// Load the configuration from the config directory
    ///
    /// Every file is optional; missing values fall back to the embedded
    /// defaults.
    pub fn new() -> Result<Self, ConfigError> {
        let default_config = Self::default_config()?;
        let data_dir = utils::get_data_dir();
        let config_dir = utils::get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("_data_dir", data_dir.to_string_lossy().into_owned())?
            .set_default("_config_dir", config_dir.to_string_lossy().into_owned())?;

        let config_files = [
            ("config.json5", config::FileFormat::Json5),
            ("config.json", config::FileFormat::Json),
            ("config.yaml", config::FileFormat::Yaml),
            ("config.toml", config::FileFormat::Toml),
            ("config.ini", config::FileFormat::Ini),
        ];
        let mut found_config = false;
        for (file, format) in &config_files {
            builder = builder.add_source(
                config::File::from(config_dir.join(file))
                    .format(*format)
                    .required(false),
            );
            if config_dir.join(file).exists() {
                found_config = true
            }
        }
        if !found_config {
            log::info!("No configuration file found, using defaults");
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        Ok(cfg.merge_defaults(default_config))
    }

    /// Parse a JSON5 document on top of the embedded defaults
    pub fn from_json5(source: &str) -> Result<Self, ConfigError> {
        let default_config = Self::default_config()?;
        let cfg: Self = json5::from_str(source)
            .map_err(|e| ConfigError::Message(format!("Failed to parse config: {e}")))?;
        Ok(cfg.merge_defaults(default_config))
    }

    fn default_config() -> Result<Self, ConfigError> {
        json5::from_str(CONFIG)
            .map_err(|e| ConfigError::Message(format!("Failed to load default config: {e}")))
    }

    fn merge_defaults(mut self, default_config: Config) -> Self {
        if self.relays.is_empty() {
            self.relays.clone_from(&default_config.relays);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_parses() {
        let cfg = Config::default_config().expect("embedded config is valid");

        assert!(!cfg.relays.is_empty());
        assert_eq!(cfg.timeline, TimelineConfig::default());
    }

    #[test]
    fn test_overrides() {
        let cfg = Config::from_json5(
            r#"{
                relays: ["wss://relay.example.com"],
                timeline: { kind: "chat", page_size: 50 },
            }"#,
        )
        .expect("valid config");

        assert_eq!(cfg.relays, vec!["wss://relay.example.com".to_owned()]);
        assert_eq!(cfg.timeline.kind, TimelineKind::Chat);
        assert_eq!(cfg.timeline.page_size, 50);
        // Unspecified values keep their defaults
        assert_eq!(cfg.timeline.scroll_debounce_ms, 300);
    }

    #[test]
    fn test_missing_relays_fall_back_to_defaults() {
        let cfg = Config::from_json5("{}").expect("valid config");
        assert!(!cfg.relays.is_empty());
    }

    #[test]
    fn test_invalid_kind_is_rejected() {
        assert!(Config::from_json5(r#"{ timeline: { kind: "thread" } }"#).is_err());
    }

    #[test]
    fn test_runtime_options() {
        let options = TimelineConfig::default().runtime_options();

        assert_eq!(options.scroll_debounce, Duration::from_millis(300));
        assert_eq!(options.typing_timeout, Duration::from_millis(3000));
    }

    #[test]
    fn test_config() {
        // Config::new() must succeed with or without files in the config dir
        match Config::new() {
            Ok(cfg) => assert!(!cfg.relays.is_empty(), "relays should not be empty"),
            Err(e) => panic!("Config failed to load: {e:?}"),
        }
    }
}
