//! Kiosk slide rotation.
//!
//! [`SlideRotator`] is the index state machine, [`SlideTimer`] the single
//! cancellable auto-advance timer, and [`KioskDisplay`] the task that owns both and
//! reacts to timer expiry, arrow keys, and fresh data. [`render`] turns the current
//! view into terminal lines.

pub mod display;
pub mod render;
pub mod rotator;
pub mod timer;

pub use display::{KioskCommand, KioskDisplay, KioskHandle, KioskView, RoundCompleteCallback};
pub use rotator::SlideRotator;
pub use timer::SlideTimer;

use crate::models::{KioskData, KioskSettings, PlayerSearch, ProgramMap, TopGame};
use std::fmt;
use std::time::Duration;

/// Which of the three fixed views a slide shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlideId {
    Program,
    PlayerSearches,
    TopGames,
}

impl SlideId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlideId::Program => "program",
            SlideId::PlayerSearches => "player-searches",
            SlideId::TopGames => "top-games",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SlideId::Program => "Programm",
            SlideId::PlayerSearches => "Mitspieler gesucht",
            SlideId::TopGames => "Top-Spiele",
        }
    }
}

impl fmt::Display for SlideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The data bound to a slide; the variant decides which renderer runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlideData {
    Program(ProgramMap),
    PlayerSearches(Vec<PlayerSearch>),
    TopGames(Vec<TopGame>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    pub id: SlideId,
    pub data: SlideData,
    pub duration: Duration,
}

/// Build the rotation for one data set: program, open searches, top games
pub fn build_slides(data: KioskData, settings: &KioskSettings) -> Vec<Slide> {
    vec![
        Slide {
            id: SlideId::Program,
            data: SlideData::Program(data.program),
            duration: Duration::from_millis(settings.program_ms),
        },
        Slide {
            id: SlideId::PlayerSearches,
            data: SlideData::PlayerSearches(data.open_searches),
            duration: Duration::from_millis(settings.player_searches_ms),
        },
        Slide {
            id: SlideId::TopGames,
            data: SlideData::TopGames(data.top_games),
            duration: Duration::from_millis(settings.top_games_ms),
        },
    ]
}
