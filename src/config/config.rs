use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::export::QuoteStyle;

/// Environment variable that overrides `server.base_url`
pub const URL_ENV_VAR: &str = "ABSENSI_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub refresh: RefreshConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the attendance server
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Reload period in milliseconds
    pub period_ms: u64,

    /// Whether the live toggle starts switched on
    pub start_live: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// "verbatim" matches the dashboard button, "escaped" doubles embedded quotes
    pub quote_style: QuoteStyle,

    /// Directory exports are written to (current directory when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            period_ms: 5000,
            start_live: true,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            quote_style: QuoteStyle::Verbatim,
            output_dir: None,
        }
    }
}

impl RefreshConfig {
    pub fn period(&self) -> Duration {
        // A zero period would spin the timer
        Duration::from_millis(self.period_ms.max(100))
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Config {
    /// Load config from `path`, falling back to defaults when no file exists
    /// yet, then apply environment overrides
    pub fn load_or_default(path: &std::path::Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(URL_ENV_VAR) {
            if !url.trim().is_empty() {
                self.server.base_url = url.trim().to_string();
            }
        }
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("absensi-web").join("config.toml"))
    }

    /// Default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# absensi-web configuration
# Location: ~/.config/absensi-web/config.toml (Linux)
#           ~/Library/Application Support/absensi-web/config.toml (macOS)
#           %APPDATA%\absensi-web\config.toml (Windows)

[server]
# Attendance server (ABSENSI_URL overrides this)
base_url = "http://localhost:5000"

# Seconds before a page request is abandoned
timeout_secs = 10

[refresh]
# Reload period for watch mode, in milliseconds
period_ms = 5000

# Start watch mode with live refresh switched on
start_live = true

[export]
# "verbatim" wraps cells in quotes exactly like the dashboard's Export button.
# "escaped" also doubles quotes inside cells so spreadsheets read them correctly.
quote_style = "verbatim"

# Where exported CSV files go (leave commented for the current directory)
# output_dir = "/home/pi/exports"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://localhost:5000");
        assert_eq!(config.refresh.period(), Duration::from_millis(5000));
        assert!(config.refresh.start_live);
        assert_eq!(config.export.quote_style, QuoteStyle::Verbatim);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.server.base_url, parsed.server.base_url);
        assert_eq!(config.refresh.period_ms, parsed.refresh.period_ms);
    }

    #[test]
    fn test_commented_template_parses() {
        let parsed: Config = toml::from_str(&Config::create_default_with_comments()).unwrap();
        assert_eq!(parsed.refresh.period_ms, 5000);
        assert!(parsed.export.output_dir.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [export]
            quote_style = "escaped"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.export.quote_style, QuoteStyle::Escaped);
        assert_eq!(parsed.server.timeout_secs, 10);
        assert_eq!(parsed.refresh.period_ms, 5000);
    }

    #[test]
    fn test_zero_period_is_clamped() {
        let refresh = RefreshConfig {
            period_ms: 0,
            start_live: false,
        };
        assert_eq!(refresh.period(), Duration::from_millis(100));
    }
}
