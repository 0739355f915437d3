use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One entry of the event program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEntry {
    pub title: String,

    /// Start time as published by the program feed (e.g. "14:30")
    pub start: String,

    #[serde(default)]
    pub end: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    /// Remaining seats, if the program feed tracks them
    #[serde(default)]
    pub available: Option<u32>,
}

/// Event program keyed by day, in feed order
pub type ProgramMap = IndexMap<String, Vec<ProgramEntry>>;

/// A "looking for players" post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSearch {
    pub id: i64,
    pub game_title: String,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub time: Option<String>,

    pub players_needed: u32,

    #[serde(default)]
    pub players_joined: u32,
}

impl PlayerSearch {
    /// Still has empty seats
    pub fn is_open(&self) -> bool {
        self.players_joined < self.players_needed
    }

    pub fn seats_left(&self) -> u32 {
        self.players_needed.saturating_sub(self.players_joined)
    }
}

/// Player searches grouped by the API (by day or table)
pub type PlayerSearchGroups = IndexMap<String, Vec<PlayerSearch>>;

/// One row of the borrowed-games leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopGame {
    pub title: String,
    pub times_borrowed: u32,
}

/// The three data sets a kiosk rotation is built from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KioskData {
    pub program: ProgramMap,
    pub open_searches: Vec<PlayerSearch>,
    pub top_games: Vec<TopGame>,
}

/// Flatten grouped searches into a single list of searches that still need players
pub fn flatten_open_searches(groups: PlayerSearchGroups) -> Vec<PlayerSearch> {
    groups
        .into_values()
        .flatten()
        .filter(PlayerSearch::is_open)
        .collect()
}
