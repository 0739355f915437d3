use crate::api::{ApiError, GameApi};
use crate::models::{Game, GameAction, NotificationLevel};
use crate::state::StateManager;
use std::sync::Arc;

/// How a mutation reaches the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationMode {
    /// Call the borrow/return endpoint, then mirror the returned record
    Remote,

    /// The server already did it (scan resolution); only mirror the record
    LocalOnly,
}

/// Shared borrow/return helper for buttons, prompts, and the scan pipeline
#[derive(Clone)]
pub struct GameMutator {
    api: Arc<dyn GameApi>,
    state: Arc<StateManager>,
}

impl GameMutator {
    pub fn new(api: Arc<dyn GameApi>, state: Arc<StateManager>) -> Self {
        Self { api, state }
    }

    /// Apply `action` to `game` and mirror the result locally.
    ///
    /// In [`MutationMode::LocalOnly`] no request is made and `game` is taken as
    /// the post-action record.
    pub async fn mutate(
        &self,
        action: GameAction,
        game: &Game,
        mode: MutationMode,
    ) -> Result<Game, ApiError> {
        let updated = match mode {
            MutationMode::Remote => match action {
                GameAction::Borrow => self.api.borrow_game(game.id).await?,
                GameAction::Return => self.api.return_game(game.id).await?,
            },
            MutationMode::LocalOnly => game.clone(),
        };

        tracing::info!(
            game_id = updated.id,
            %action,
            ?mode,
            available = updated.available_copies,
            "Game updated"
        );

        self.state.upsert_game(updated.clone());
        let verb = match action {
            GameAction::Borrow => "Borrowed",
            GameAction::Return => "Returned",
        };
        self.state
            .notify(NotificationLevel::Info, format!("{}: {}", verb, updated.title));

        Ok(updated)
    }

    /// Interactive borrow; failures become a notification as well as an error
    pub async fn borrow(&self, game: &Game) -> Result<Game, ApiError> {
        self.remote_with_notice(GameAction::Borrow, game).await
    }

    /// Interactive return; failures become a notification as well as an error
    pub async fn return_game(&self, game: &Game) -> Result<Game, ApiError> {
        self.remote_with_notice(GameAction::Return, game).await
    }

    async fn remote_with_notice(&self, action: GameAction, game: &Game) -> Result<Game, ApiError> {
        let result = self.mutate(action, game, MutationMode::Remote).await;
        if let Err(e) = &result {
            tracing::error!(game_id = game.id, %action, "Mutation failed: {}", e);
            self.state.notify(
                NotificationLevel::Error,
                format!("Could not {} {}: {}", action, game.title, e.user_message()),
            );
        }
        result
    }
}
