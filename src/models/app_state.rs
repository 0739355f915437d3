use crate::models::Game;
use indexmap::IndexMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Severity of a transient notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationLevel::Info => write!(f, "info"),
            NotificationLevel::Error => write!(f, "error"),
        }
    }
}

/// A user-visible message that dismisses itself after a fixed time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub message: String,
    pub expires_at: Instant,
}

impl Notification {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Client-side view of the station.
///
/// The server is the only source of truth for games; the catalog here is a
/// mirror of whatever the latest responses carried. Wrapped by
/// [`crate::state::StateManager`], which is the only way to mutate it.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Known games keyed by id, in first-seen order
    pub games: IndexMap<i64, Game>,

    // Scan activity
    pub scanning_enabled: bool,
    pub last_scan: Option<String>,
    pub scans_handled: usize,

    /// Game awaiting a human borrow/return decision
    pub pending_prompt: Option<Game>,

    // Transient notifications
    pub notifications: Vec<Notification>,
    pub next_notification_id: u64,
    pub notification_ttl: Duration,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            games: IndexMap::new(),

            scanning_enabled: true,
            last_scan: None,
            scans_handled: 0,

            pending_prompt: None,

            notifications: Vec::new(),
            next_notification_id: 1,
            notification_ttl: Duration::from_secs(4),
        }
    }
}

impl AppState {
    /// Insert or replace a game record, returning true if anything changed
    pub fn upsert_game(&mut self, game: Game) -> bool {
        match self.games.get(&game.id) {
            Some(existing) if *existing == game => false,
            _ => {
                self.games.insert(game.id, game);
                true
            }
        }
    }

    /// Queue a notification that expires `notification_ttl` after `now`
    pub fn push_notification(
        &mut self,
        level: NotificationLevel,
        message: String,
        now: Instant,
    ) -> u64 {
        let id = self.next_notification_id;
        self.next_notification_id += 1;
        self.notifications.push(Notification {
            id,
            level,
            message,
            expires_at: now + self.notification_ttl,
        });
        id
    }

    /// Drop expired notifications, returning how many were removed
    pub fn prune_notifications(&mut self, now: Instant) -> usize {
        let before = self.notifications.len();
        self.notifications.retain(|n| !n.is_expired(now));
        before - self.notifications.len()
    }

    pub fn game_by_ean(&self, ean: &str) -> Option<&Game> {
        self.games
            .values()
            .find(|g| g.ean.as_deref() == Some(ean))
    }
}
