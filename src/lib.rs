// SpielViel Station - barcode scan station and kiosk display
//
// This is the library crate containing the scan pipeline, the slide rotator and the
// API client. The binary crate (main.rs) provides the terminal entry point.

pub mod api;
pub mod config;
pub mod events;
pub mod input;
pub mod kiosk;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod scanner;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use api::{ApiClient, ApiError, GameApi};
pub use config::ConfigManager;
pub use input::{InputHub, InputSource};
pub use kiosk::{KioskDisplay, KioskHandle, SlideRotator};
pub use metrics::Metrics;
pub use models::{AppState, StationConfig};
pub use scanner::{ScanDetector, ScanQueue};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
