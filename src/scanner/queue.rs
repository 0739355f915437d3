use crate::api::GameApi;
use crate::events::{InconclusiveScan, InconclusiveSender};
use crate::metrics::Metrics;
use crate::models::{GameAction, GameScanResult, NotificationLevel};
use crate::services::games::{GameMutator, MutationMode};
use crate::state::StateManager;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::Notify;

/// What happened to one barcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Resolved(GameAction),
    Inconclusive,
    Failed,
}

/// Resolves one barcode against the server and applies the result
pub struct ScanProcessor {
    api: Arc<dyn GameApi>,
    mutator: GameMutator,
    state: Arc<StateManager>,
    inconclusive: InconclusiveSender,
    metrics: Arc<Metrics>,
}

impl ScanProcessor {
    pub fn new(
        api: Arc<dyn GameApi>,
        state: Arc<StateManager>,
        inconclusive: InconclusiveSender,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            mutator: GameMutator::new(Arc::clone(&api), Arc::clone(&state)),
            api,
            state,
            inconclusive,
            metrics,
        }
    }

    /// Resolve `barcode`. Never fails: errors end up as notifications.
    pub async fn process(&self, barcode: &str) -> ScanOutcome {
        self.state.record_scan(barcode);

        let started = Instant::now();
        let result = self.api.scan_by_ean(barcode).await;
        self.metrics.record_resolve_time(started.elapsed());

        match result {
            Ok(GameScanResult::Inconclusive { game }) => {
                tracing::info!(barcode, game_id = game.id, "Scan inconclusive, asking for a decision");
                self.metrics.record_scan_inconclusive();
                self.inconclusive.send(InconclusiveScan {
                    barcode: barcode.to_string(),
                    game,
                });
                ScanOutcome::Inconclusive
            }
            Ok(GameScanResult::Resolved { action, game }) => {
                tracing::info!(barcode, game_id = game.id, %action, "Scan resolved by server");
                self.metrics.record_scan_resolved();
                // The server already performed the action; mirror it only
                match self.mutator.mutate(action, &game, MutationMode::LocalOnly).await {
                    Ok(_) => ScanOutcome::Resolved(action),
                    Err(e) => {
                        tracing::error!(barcode, "Failed to apply scan result: {}", e);
                        ScanOutcome::Failed
                    }
                }
            }
            Err(e) => {
                tracing::error!(barcode, "Scan resolution failed: {}", e);
                self.metrics.record_scan_failure();
                self.state.notify(
                    NotificationLevel::Error,
                    format!("Scan {} failed: {}", barcode, e.user_message()),
                );
                ScanOutcome::Failed
            }
        }
    }
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<String>,
    processing: bool,
}

struct QueueInner {
    state: Mutex<QueueState>,
    processor: ScanProcessor,
    runtime: Handle,
    idle: Notify,
}

impl QueueInner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// FIFO of scanned barcodes with at most one resolution in flight.
///
/// [`push`](Self::push) may be called from any thread; the first push into an idle
/// queue spawns a drain task on the runtime, which pops and awaits one barcode at a
/// time until the queue is empty. Later pushes only append.
#[derive(Clone)]
pub struct ScanQueue {
    inner: Arc<QueueInner>,
}

impl ScanQueue {
    pub fn new(processor: ScanProcessor, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                processor,
                runtime,
                idle: Notify::new(),
            }),
        }
    }

    pub fn push(&self, barcode: String) {
        {
            let mut state = self.inner.lock();
            state.pending.push_back(barcode);
            tracing::debug!(pending = state.pending.len(), "Barcode queued");
            if state.processing {
                return;
            }
            state.processing = true;
        }

        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(Self::drain(inner));
    }

    async fn drain(inner: Arc<QueueInner>) {
        loop {
            let next = {
                let mut state = inner.lock();
                match state.pending.pop_front() {
                    Some(barcode) => barcode,
                    None => {
                        state.processing = false;
                        break;
                    }
                }
            };
            inner.processor.process(&next).await;
        }
        inner.idle.notify_waiters();
    }

    /// A consumer callback for [`ScanDetector::set_on_scan`](super::ScanDetector::set_on_scan)
    pub fn consumer(&self) -> impl Fn(String) + Send + Sync + 'static {
        let queue = self.clone();
        move |barcode| queue.push(barcode)
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn is_processing(&self) -> bool {
        self.inner.lock().processing
    }

    /// Wait until nothing is queued or in flight
    pub async fn idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if !self.is_processing() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, MockGameApi};
    use crate::events::inconclusive_channel;
    use crate::models::Game;
    use std::sync::atomic::Ordering;

    fn game(id: i64) -> Game {
        Game {
            id,
            title: format!("Game {}", id),
            ean: None,
            total_copies: 2,
            available_copies: 1,
            times_borrowed: 0,
        }
    }

    #[tokio::test]
    async fn test_resolved_scan_is_mirrored_without_mutation_calls() {
        let mut api = MockGameApi::new();
        api.expect_scan_by_ean()
            .withf(|barcode| barcode == "12345678")
            .times(1)
            .returning(|_| {
                Ok(GameScanResult::Resolved {
                    action: GameAction::Borrow,
                    game: game(1),
                })
            });
        api.expect_borrow_game().never();
        api.expect_return_game().never();

        let state = Arc::new(StateManager::new());
        let metrics = Arc::new(Metrics::new());
        let (tx, mut rx) = inconclusive_channel();
        let processor = ScanProcessor::new(Arc::new(api), Arc::clone(&state), tx, Arc::clone(&metrics));

        let outcome = processor.process("12345678").await;

        assert_eq!(outcome, ScanOutcome::Resolved(GameAction::Borrow));
        assert!(state.read(|s| s.games.contains_key(&1)));
        assert!(rx.try_recv().is_none());
        assert_eq!(metrics.scans_resolved.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_inconclusive_scan_is_forwarded() {
        let mut api = MockGameApi::new();
        api.expect_scan_by_ean()
            .returning(|_| Ok(GameScanResult::Inconclusive { game: game(2) }));

        let state = Arc::new(StateManager::new());
        let (tx, mut rx) = inconclusive_channel();
        let processor = ScanProcessor::new(Arc::new(api), Arc::clone(&state), tx, Arc::new(Metrics::new()));

        assert_eq!(processor.process("87654321").await, ScanOutcome::Inconclusive);

        let forwarded = rx.try_recv().unwrap();
        assert_eq!(forwarded.barcode, "87654321");
        assert_eq!(forwarded.game.id, 2);
        // Nothing is mirrored until a human decides
        assert!(state.read(|s| s.games.is_empty()));
    }

    #[tokio::test]
    async fn test_failure_notifies_and_queue_moves_on() {
        let mut api = MockGameApi::new();
        api.expect_scan_by_ean()
            .withf(|barcode| barcode == "BAD00000")
            .returning(|_| {
                Err(ApiError::Status {
                    status: 404,
                    url: "http://test".to_string(),
                })
            });
        api.expect_scan_by_ean()
            .withf(|barcode| barcode == "GOOD0000")
            .returning(|_| {
                Ok(GameScanResult::Resolved {
                    action: GameAction::Return,
                    game: game(3),
                })
            });

        let state = Arc::new(StateManager::new());
        let (tx, _rx) = inconclusive_channel();
        let processor = ScanProcessor::new(Arc::new(api), Arc::clone(&state), tx, Arc::new(Metrics::new()));
        let queue = ScanQueue::new(processor, Handle::current());

        queue.push("BAD00000".to_string());
        queue.push("GOOD0000".to_string());
        queue.idle().await;

        assert_eq!(queue.pending_len(), 0);
        assert!(state.read(|s| s.games.contains_key(&3)));
        let messages: Vec<String> =
            state.read(|s| s.notifications.iter().map(|n| n.message.clone()).collect());
        assert!(messages.iter().any(|m| m == "Scan BAD00000 failed: Unknown game"));
    }

    #[tokio::test]
    async fn test_idle_waits_for_drain() {
        let mut api = MockGameApi::new();
        api.expect_scan_by_ean().returning(|_| {
            Err(ApiError::Status {
                status: 503,
                url: "http://test".to_string(),
            })
        });

        let (tx, _rx) = inconclusive_channel();
        let processor = ScanProcessor::new(
            Arc::new(api),
            Arc::new(StateManager::new()),
            tx,
            Arc::new(Metrics::new()),
        );
        let queue = ScanQueue::new(processor, Handle::current());

        let mut empty = tokio_test::task::spawn(queue.idle());
        tokio_test::assert_ready!(empty.poll());

        queue.push("12345678".to_string());
        let mut waiting = tokio_test::task::spawn(queue.idle());
        tokio_test::assert_pending!(waiting.poll());

        queue.idle().await;
        assert!(waiting.is_woken());
        tokio_test::assert_ready!(waiting.poll());
    }
}
