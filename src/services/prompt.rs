use super::games::GameMutator;
use crate::events::{InconclusiveReceiver, InconclusiveScan};
use crate::input::{InputSource, Key, KeyInput, Phase, Subscription};
use crate::models::{Game, GameAction};
use crate::scanner::ScanDetector;
use crate::state::StateManager;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

/// What the person at the station picked for an ambiguous scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    Borrow,
    Return,
    Dismiss,
}

impl PromptChoice {
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::Char('b') | Key::Char('B') => Some(PromptChoice::Borrow),
            Key::Char('r') | Key::Char('R') => Some(PromptChoice::Return),
            Key::Escape => Some(PromptChoice::Dismiss),
            _ => None,
        }
    }
}

/// Answer slot of the prompt currently on screen; empty once answered
type ChoiceSlot = Arc<Mutex<Option<oneshot::Sender<PromptChoice>>>>;

fn lock_slot(slot: &ChoiceSlot) -> MutexGuard<'_, Option<oneshot::Sender<PromptChoice>>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Single consumer of inconclusive scans.
///
/// Each scan pauses the scanner, shows the game as the pending prompt, and waits for
/// a [`PromptChoice`]. Borrow and return go to the server through [`GameMutator`].
///
/// Every prompt gets its own answer slot. A choice made while no prompt is waiting,
/// or after the current one was answered, is dropped and never carries over to
/// the next scan.
pub struct ScanPrompt {
    inconclusive: InconclusiveReceiver,
    slot: ChoiceSlot,
    mutator: GameMutator,
    state: Arc<StateManager>,
    detector: Arc<ScanDetector>,
}

impl ScanPrompt {
    pub fn new(
        inconclusive: InconclusiveReceiver,
        mutator: GameMutator,
        state: Arc<StateManager>,
        detector: Arc<ScanDetector>,
    ) -> (Self, PromptHandle) {
        let slot: ChoiceSlot = Arc::new(Mutex::new(None));
        let handle = PromptHandle {
            slot: Arc::clone(&slot),
            state: Arc::clone(&state),
        };
        let prompt = Self {
            inconclusive,
            slot,
            mutator,
            state,
            detector,
        };
        (prompt, handle)
    }

    /// Handle ambiguous scans until the producer side is gone
    pub async fn run(mut self) {
        while let Some(scan) = self.inconclusive.recv().await {
            self.resolve(scan).await;
        }
        tracing::debug!("Inconclusive channel closed, prompt stopped");
    }

    /// Ask for one decision and apply it. Returns the updated game, if any.
    pub async fn resolve(&mut self, scan: InconclusiveScan) -> Option<Game> {
        let InconclusiveScan { barcode, game } = scan;
        tracing::info!(%barcode, game_id = game.id, "Asking for borrow or return");

        let scanner_was_enabled = self.detector.is_enabled();
        self.detector.set_enabled(false);
        self.state.set_scanning_enabled(false);

        let (answer_tx, answer_rx) = oneshot::channel();
        *lock_slot(&self.slot) = Some(answer_tx);
        self.state.set_pending_prompt(Some(game.clone()));

        let choice = answer_rx.await.unwrap_or(PromptChoice::Dismiss);
        tracing::debug!(game_id = game.id, ?choice, "Prompt answered");

        let updated = match choice {
            PromptChoice::Borrow => self.apply(GameAction::Borrow, &game).await,
            PromptChoice::Return => self.apply(GameAction::Return, &game).await,
            PromptChoice::Dismiss => None,
        };

        lock_slot(&self.slot).take();
        self.state.set_pending_prompt(None);
        self.detector.set_enabled(scanner_was_enabled);
        self.state.set_scanning_enabled(scanner_was_enabled);

        updated
    }

    async fn apply(&self, action: GameAction, game: &Game) -> Option<Game> {
        let result = match action {
            GameAction::Borrow => self.mutator.borrow(game).await,
            GameAction::Return => self.mutator.return_game(game).await,
        };
        // The mutator already turned a failure into a notification
        result.ok()
    }
}

/// Sends choices to a running [`ScanPrompt`]
#[derive(Clone)]
pub struct PromptHandle {
    slot: ChoiceSlot,
    state: Arc<StateManager>,
}

impl PromptHandle {
    /// Answer the waiting prompt. Returns false if none is waiting for an answer.
    pub fn choose(&self, choice: PromptChoice) -> bool {
        match lock_slot(&self.slot).take() {
            Some(answer) => answer.send(choice).is_ok(),
            None => {
                tracing::debug!(?choice, "No prompt waiting, choice ignored");
                false
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.read(|s| s.pending_prompt.is_some())
    }

    /// `b`, `r` and `Esc` answer the prompt; ignored while nothing is waiting
    pub fn bind_keys(&self, source: &dyn InputSource) -> Subscription {
        let handle = self.clone();
        source.on_key(
            Phase::Bubble,
            Arc::new(move |input: &KeyInput| {
                if let Some(choice) = PromptChoice::from_key(input.key) {
                    handle.choose(choice);
                }
            }),
        )
    }
}
