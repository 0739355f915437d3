use serde::{Deserialize, Serialize};
use std::fmt;

/// A game record as returned by the SpielViel API.
///
/// Availability counts are owned by the server; the client only mirrors
/// whatever the latest response carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: i64,
    pub title: String,

    #[serde(default)]
    pub ean: Option<String>,

    /// Total physical copies owned by the library
    #[serde(default)]
    pub total_copies: u32,

    /// Copies currently on the shelf
    #[serde(default)]
    pub available_copies: u32,

    #[serde(default)]
    pub times_borrowed: u32,
}

impl Game {
    /// Number of copies currently lent out
    pub fn borrowed_copies(&self) -> u32 {
        self.total_copies.saturating_sub(self.available_copies)
    }

    /// Some, but not all, copies are out
    pub fn is_partially_available(&self) -> bool {
        self.available_copies > 0 && self.available_copies < self.total_copies
    }
}

/// A definitive mutation on a game record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameAction {
    Borrow,
    Return,
}

impl fmt::Display for GameAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameAction::Borrow => write!(f, "borrow"),
            GameAction::Return => write!(f, "return"),
        }
    }
}

/// The `action` field of a scan-by-EAN response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanAction {
    Borrow,
    Return,
    Inconclusive,
}

/// Wire shape of `PUT /games/game/scan_by_ean/{barcode}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub action: ScanAction,

    #[serde(flatten)]
    pub game: Game,
}

/// Decoded outcome of submitting a barcode to the remote resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameScanResult {
    /// The server decided and already performed the action
    Resolved { action: GameAction, game: Game },

    /// The server could not decide; a human has to pick
    Inconclusive { game: Game },
}

impl GameScanResult {
    pub fn game(&self) -> &Game {
        match self {
            GameScanResult::Resolved { game, .. } | GameScanResult::Inconclusive { game } => game,
        }
    }
}

impl From<ScanResponse> for GameScanResult {
    fn from(response: ScanResponse) -> Self {
        let game = response.game;
        match response.action {
            ScanAction::Borrow => GameScanResult::Resolved {
                action: GameAction::Borrow,
                game,
            },
            ScanAction::Return => GameScanResult::Resolved {
                action: GameAction::Return,
                game,
            },
            ScanAction::Inconclusive => GameScanResult::Inconclusive { game },
        }
    }
}
