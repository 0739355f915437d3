// State management module
//
// This module provides the StateManager which wraps AppState with thread-safe access
// using Arc<RwLock<T>> and emits change events for the display.

use crate::models::{AppState, Game, NotificationLevel};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// A game record was inserted or changed
    GameUpdated {
        id: i64,
        title: String,
        available_copies: u32,
    },

    /// The whole catalog was replaced
    CatalogReplaced {
        count: usize,
    },

    /// Scanner was enabled or disabled
    ScanningToggled {
        enabled: bool,
    },

    /// A barcode entered the scan pipeline
    ScanReceived {
        barcode: String,
    },

    /// The disambiguation prompt opened or closed
    PromptChanged {
        game_id: Option<i64>,
    },

    /// A transient notification was raised
    NotificationRaised {
        id: u64,
        level: NotificationLevel,
        message: String,
    },

    /// Expired notifications were dismissed
    NotificationsExpired {
        count: usize,
    },
}

/// Thread-safe state manager with event emission
///
/// - Provides thread-safe access to [`AppState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Supports subscribing to state changes via tokio broadcast channels
///
/// Always use `StateManager` instead of touching [`AppState`] directly:
/// - [`read()`](Self::read) for reading state
/// - [`update()`](Self::update) for mutations with automatic event emission
/// - [`subscribe()`](Self::subscribe) for listening to state changes
pub struct StateManager {
    state: Arc<RwLock<AppState>>,

    /// Broadcast channel for emitting state change events
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with default state
    ///
    /// The broadcast channel buffers 100 events.
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            state_tx,
        }
    }

    /// Create a StateManager whose notifications live for `ttl`
    pub fn with_notification_ttl(ttl: Duration) -> Self {
        let manager = Self::new();
        manager.write_lock().notification_ttl = ttl;
        manager
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, AppState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, AppState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get a clone of the current state
    pub fn snapshot(&self) -> AppState {
        self.read_lock().clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let prompt_open = state_manager.read(|state| state.pending_prompt.is_some());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.read_lock();
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// 1. Captures the old state
    /// 2. Applies the update function
    /// 3. Detects what changed
    /// 4. Emits appropriate events
    ///
    /// # Returns
    /// The StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        let mut state = self.write_lock();
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);
        drop(state);

        for change in &changes {
            // Nobody listening is fine
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        let catalog_replaced = new.games.len() < old.games.len()
            || old.games.keys().any(|id| !new.games.contains_key(id));

        if catalog_replaced {
            changes.push(StateChange::CatalogReplaced {
                count: new.games.len(),
            });
        } else {
            for game in new.games.values() {
                if old.games.get(&game.id) != Some(game) {
                    changes.push(StateChange::GameUpdated {
                        id: game.id,
                        title: game.title.clone(),
                        available_copies: game.available_copies,
                    });
                }
            }
        }

        if old.scanning_enabled != new.scanning_enabled {
            changes.push(StateChange::ScanningToggled {
                enabled: new.scanning_enabled,
            });
        }

        if new.scans_handled != old.scans_handled {
            if let Some(barcode) = &new.last_scan {
                changes.push(StateChange::ScanReceived {
                    barcode: barcode.clone(),
                });
            }
        }

        let old_prompt = old.pending_prompt.as_ref().map(|g| g.id);
        let new_prompt = new.pending_prompt.as_ref().map(|g| g.id);
        if old_prompt != new_prompt {
            changes.push(StateChange::PromptChanged {
                game_id: new_prompt,
            });
        }

        let old_max_id = old.next_notification_id;
        for notification in new.notifications.iter().filter(|n| n.id >= old_max_id) {
            changes.push(StateChange::NotificationRaised {
                id: notification.id,
                level: notification.level,
                message: notification.message.clone(),
            });
        }

        let expired = old
            .notifications
            .iter()
            .filter(|n| !new.notifications.iter().any(|m| m.id == n.id))
            .count();
        if expired > 0 {
            changes.push(StateChange::NotificationsExpired { count: expired });
        }

        changes
    }

    // Convenience methods for common state updates

    /// Mirror a game record returned by the server
    pub fn upsert_game(&self, game: Game) -> Vec<StateChange> {
        self.update(|state| {
            state.upsert_game(game);
        })
    }

    /// Replace the whole catalog
    pub fn replace_games(&self, games: Vec<Game>) -> Vec<StateChange> {
        self.update(|state| {
            state.games = games.into_iter().map(|g| (g.id, g)).collect();
        })
    }

    pub fn set_scanning_enabled(&self, enabled: bool) -> Vec<StateChange> {
        self.update(|state| state.scanning_enabled = enabled)
    }

    /// Record that a barcode entered the pipeline
    pub fn record_scan(&self, barcode: &str) -> Vec<StateChange> {
        self.update(|state| {
            state.last_scan = Some(barcode.to_string());
            state.scans_handled += 1;
        })
    }

    pub fn set_pending_prompt(&self, game: Option<Game>) -> Vec<StateChange> {
        self.update(|state| state.pending_prompt = game)
    }

    /// Raise a transient notification
    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) -> Vec<StateChange> {
        self.notify_at(level, message, Instant::now())
    }

    pub fn notify_at(
        &self,
        level: NotificationLevel,
        message: impl Into<String>,
        now: Instant,
    ) -> Vec<StateChange> {
        let message = message.into();
        match level {
            NotificationLevel::Error => tracing::warn!(%message, "Error notification"),
            NotificationLevel::Info => tracing::debug!(%message, "Info notification"),
        }
        self.update(|state| {
            state.push_notification(level, message, now);
        })
    }

    /// Dismiss notifications whose time is up
    pub fn prune_notifications(&self, now: Instant) -> Vec<StateChange> {
        // Skip the write lock (and the state clone) when nothing expired
        if !self.read(|s| s.notifications.iter().any(|n| n.is_expired(now))) {
            return Vec::new();
        }
        self.update(|state| {
            state.prune_notifications(now);
        })
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Make StateManager cloneable for sharing across threads
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}
