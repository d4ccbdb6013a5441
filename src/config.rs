use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const API_URL_ENV: &str = "MAILSTAT_API_URL";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub mouse: bool,
    pub debounce: Duration,
    pub chart_entries: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub ui: UiConfig,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "failed to parse config file: {}", e),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    api: RawApiConfig,
    #[serde(default)]
    ui: RawUiConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawApiConfig {
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

impl Default for RawApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawUiConfig {
    #[serde(default = "default_mouse")]
    mouse: bool,
    #[serde(default = "default_debounce_ms")]
    debounce_ms: u64,
    #[serde(default = "default_chart_entries")]
    chart_entries: usize,
}

impl Default for RawUiConfig {
    fn default() -> Self {
        Self {
            mouse: default_mouse(),
            debounce_ms: default_debounce_ms(),
            chart_entries: default_chart_entries(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_mouse() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_chart_entries() -> usize {
    20
}

impl Config {
    /// Load the config file at `path`. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Self::parse("");
        }
        let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::parse(&contents)
    }

    fn parse(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        validate_base_url(&raw.api.base_url)?;
        if raw.api.timeout_secs == 0 {
            return Err(ConfigError::Parse(
                "timeout_secs must be greater than 0 in [api]".to_string(),
            ));
        }
        if raw.ui.chart_entries == 0 {
            return Err(ConfigError::Parse(
                "chart_entries must be greater than 0 in [ui]".to_string(),
            ));
        }

        Ok(Config {
            api: ApiConfig {
                base_url: normalize_base_url(&raw.api.base_url),
                timeout: Duration::from_secs(raw.api.timeout_secs),
            },
            ui: UiConfig {
                mouse: raw.ui.mouse,
                debounce: Duration::from_millis(raw.ui.debounce_ms),
                chart_entries: raw.ui.chart_entries,
            },
        })
    }

    /// Apply the `--api-url` flag or the `MAILSTAT_API_URL` environment variable.
    /// The flag takes precedence over the environment.
    pub fn with_overrides(
        mut self,
        flag_url: Option<&str>,
        env_url: Option<&str>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = flag_url.or(env_url).filter(|u| !u.trim().is_empty()) {
            validate_base_url(url)?;
            self.api.base_url = normalize_base_url(url);
        }
        Ok(self)
    }
}

fn validate_base_url(url: &str) -> Result<(), ConfigError> {
    let pattern = Regex::new(r"^https?://[^\s/]+(/\S*)?$")
        .map_err(|e| ConfigError::Parse(e.to_string()))?;
    if pattern.is_match(url.trim()) {
        Ok(())
    } else {
        Err(ConfigError::Parse(format!(
            "invalid base_url '{}': expected http:// or https:// URL",
            url
        )))
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
