//! Data models for the SpielViel station.
//!
//! - [`Game`], [`GameAction`], [`GameScanResult`]: game records and the decoded outcome of a scan
//! - [`KioskData`] and its parts ([`ProgramMap`], [`PlayerSearch`], [`TopGame`]): the three kiosk data sets
//! - [`StationConfig`]: layered configuration (YAML file + environment)
//! - [`AppState`]: the client-side mirror of games, prompts, and notifications
//!
//! State updates go through [`StateManager`](crate::state::StateManager) so that every change
//! is broadcast.

pub mod app_state;
pub mod config;
pub mod game;
pub mod kiosk;

pub use app_state::{AppState, Notification, NotificationLevel};
pub use config::{
    ApiSettings, ConfigError, KioskSettings, LoggingSettings, NotificationSettings,
    ScannerSettings, StationConfig,
};
pub use game::{Game, GameAction, GameScanResult, ScanAction, ScanResponse};
pub use kiosk::{
    KioskData, PlayerSearch, PlayerSearchGroups, ProgramEntry, ProgramMap, TopGame,
    flatten_open_searches,
};
