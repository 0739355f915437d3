use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Station configuration from `spielviel.yaml` plus `SPIELVIEL_*` environment overrides
///
/// Every section falls back to defaults, so an empty file (or no file) is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub api: ApiSettings,
    pub scanner: ScannerSettings,
    pub kiosk: KioskSettings,
    pub notifications: NotificationSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL of the SpielViel REST API, without trailing slash
    pub base_url: String,

    /// Bearer token for authenticated endpoints
    pub token: Option<String>,

    /// External program-availability JSON feed
    pub program_url: String,

    /// Transport timeout; no per-request timeout is layered on top
    pub timeout_secs: u64,

    pub top_games_limit: usize,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            token: None,
            program_url: "http://localhost:8000/program.json".to_string(),
            timeout_secs: default_timeout_secs(),
            top_games_limit: 10,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Keystrokes further apart than this are treated as human typing
    pub max_key_interval_ms: u64,

    /// Shortest buffer accepted as a barcode
    pub min_barcode_length: usize,

    /// Whether scanning starts enabled
    pub enabled: bool,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            max_key_interval_ms: 40,
            min_barcode_length: 8,
            enabled: true,
        }
    }
}

impl ScannerSettings {
    pub fn max_key_interval(&self) -> Duration {
        Duration::from_millis(self.max_key_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskSettings {
    pub program_ms: u64,
    pub player_searches_ms: u64,
    pub top_games_ms: u64,

    /// Redraw period of the terminal display
    pub frame_interval_ms: u64,
}

impl Default for KioskSettings {
    fn default() -> Self {
        Self {
            program_ms: 20_000,
            player_searches_ms: 15_000,
            top_games_ms: 15_000,
            frame_interval_ms: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub ttl_ms: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self { ttl_ms: 4_000 }
    }
}

impl NotificationSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: Utf8PathBuf,
    pub prefix: String,
    pub debug: bool,

    /// Also log to stderr. Off by default: the terminal belongs to the kiosk display.
    pub console: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: Utf8PathBuf::from("logs"),
            prefix: "spielviel".to_string(),
            debug: false,
            console: false,
        }
    }
}

/// Rejected configuration values
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("scanner.max_key_interval_ms must be greater than zero")]
    ZeroKeyInterval,

    #[error("scanner.min_barcode_length must be greater than zero")]
    ZeroBarcodeLength,

    #[error("kiosk slide duration {0} must be greater than zero")]
    ZeroSlideDuration(&'static str),

    #[error("api.base_url is empty")]
    MissingBaseUrl,
}

impl StationConfig {
    /// Check values that would make the scanner or rotator misbehave
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scanner.max_key_interval_ms == 0 {
            return Err(ConfigError::ZeroKeyInterval);
        }
        if self.scanner.min_barcode_length == 0 {
            return Err(ConfigError::ZeroBarcodeLength);
        }
        for (name, value) in [
            ("program_ms", self.kiosk.program_ms),
            ("player_searches_ms", self.kiosk.player_searches_ms),
            ("top_games_ms", self.kiosk.top_games_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroSlideDuration(name));
            }
        }
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        Ok(())
    }
}
