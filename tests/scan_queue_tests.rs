//! Integration tests for the single-flight scan queue
//!
//! These tests use a scripted GameApi that records when each resolution starts
//! and ends (on tokio's paused clock) and verify:
//! - Barcodes are resolved strictly in arrival order
//! - No two resolutions overlap
//! - Inconclusive results reach the consumer before the next scan starts
//! - Failures do not stall the queue

use async_trait::async_trait;
use spielviel_station::api::{ApiError, GameApi};
use spielviel_station::events::{InconclusiveReceiver, inconclusive_channel};
use spielviel_station::metrics::Metrics;
use spielviel_station::models::{
    Game, GameAction, GameScanResult, NotificationLevel, PlayerSearchGroups, ProgramMap, TopGame,
};
use spielviel_station::scanner::{ScanProcessor, ScanQueue};
use spielviel_station::state::StateManager;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Call {
    barcode: String,
    started: Instant,
    ended: Instant,
    /// Inconclusive scans already delivered when this call started
    inconclusive_seen: Vec<String>,
}

#[derive(Clone)]
enum Script {
    Resolve(GameAction),
    Inconclusive,
    Fail(u16),
}

struct ScriptedApi {
    scripts: HashMap<String, (Duration, Script)>,
    calls: Mutex<Vec<Call>>,
    in_flight: Mutex<u32>,
    max_in_flight: Mutex<u32>,
    inconclusive: Mutex<Option<InconclusiveReceiver>>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedApi {
    fn new(scripts: &[(&str, u64, Script)]) -> Self {
        Self {
            scripts: scripts
                .iter()
                .map(|(code, ms, script)| {
                    (code.to_string(), (Duration::from_millis(*ms), script.clone()))
                })
                .collect(),
            calls: Mutex::new(Vec::new()),
            in_flight: Mutex::new(0),
            max_in_flight: Mutex::new(0),
            inconclusive: Mutex::new(None),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn watch_inconclusive(&self, rx: InconclusiveReceiver) {
        *self.inconclusive.lock().unwrap() = Some(rx);
    }

    fn drain_inconclusive(&self) -> Vec<String> {
        let mut guard = self.inconclusive.lock().unwrap();
        let mut seen = self.seen.lock().unwrap();
        if let Some(rx) = guard.as_mut() {
            while let Some(scan) = rx.try_recv() {
                seen.push(scan.barcode);
            }
        }
        seen.clone()
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

fn game(id: i64, available: u32) -> Game {
    Game {
        id,
        title: format!("Game {}", id),
        ean: None,
        total_copies: 5,
        available_copies: available,
        times_borrowed: 0,
    }
}

#[async_trait]
impl GameApi for ScriptedApi {
    async fn scan_by_ean(&self, barcode: &str) -> Result<GameScanResult, ApiError> {
        let started = Instant::now();
        let inconclusive_seen = self.drain_inconclusive();
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            *in_flight += 1;
            let mut max = self.max_in_flight.lock().unwrap();
            *max = (*max).max(*in_flight);
        }

        let (delay, script) = self
            .scripts
            .get(barcode)
            .cloned()
            .unwrap_or((Duration::ZERO, Script::Fail(404)));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        *self.in_flight.lock().unwrap() -= 1;
        self.calls.lock().unwrap().push(Call {
            barcode: barcode.to_string(),
            started,
            ended: Instant::now(),
            inconclusive_seen,
        });

        let id = barcode.len() as i64;
        match script {
            Script::Resolve(action) => Ok(GameScanResult::Resolved {
                action,
                game: game(id, 3),
            }),
            Script::Inconclusive => Ok(GameScanResult::Inconclusive { game: game(id, 2) }),
            Script::Fail(status) => Err(ApiError::Status {
                status,
                url: format!("http://test/games/game/scan_by_ean/{}", barcode),
            }),
        }
    }

    async fn borrow_game(&self, _id: i64) -> Result<Game, ApiError> {
        panic!("scan path must not call borrow_game");
    }

    async fn return_game(&self, _id: i64) -> Result<Game, ApiError> {
        panic!("scan path must not call return_game");
    }

    async fn list_games(&self) -> Result<Vec<Game>, ApiError> {
        Ok(Vec::new())
    }

    async fn top_games(&self, _limit: usize) -> Result<Vec<TopGame>, ApiError> {
        Ok(Vec::new())
    }

    async fn program(&self) -> Result<ProgramMap, ApiError> {
        Ok(ProgramMap::new())
    }

    async fn player_searches(&self) -> Result<PlayerSearchGroups, ApiError> {
        Ok(PlayerSearchGroups::new())
    }
}

fn queue_with(api: Arc<ScriptedApi>) -> (ScanQueue, Arc<StateManager>, Arc<Metrics>) {
    let state = Arc::new(StateManager::new());
    let metrics = Arc::new(Metrics::new());
    let (tx, rx) = inconclusive_channel();
    api.watch_inconclusive(rx);

    let processor = ScanProcessor::new(api, Arc::clone(&state), tx, Arc::clone(&metrics));
    let queue = ScanQueue::new(processor, tokio::runtime::Handle::current());
    (queue, state, metrics)
}

#[tokio::test(start_paused = true)]
async fn test_scenario_inconclusive_then_resolved() {
    let api = Arc::new(ScriptedApi::new(&[
        ("A", 100, Script::Inconclusive),
        ("BB", 0, Script::Resolve(GameAction::Borrow)),
        ("CCC", 0, Script::Resolve(GameAction::Return)),
    ]));
    let (queue, state, metrics) = queue_with(Arc::clone(&api));

    queue.push("A".to_string());
    queue.push("BB".to_string());
    queue.push("CCC".to_string());
    queue.idle().await;

    let calls = api.calls();
    let order: Vec<&str> = calls.iter().map(|c| c.barcode.as_str()).collect();
    assert_eq!(order, vec!["A", "BB", "CCC"]);

    // A took 100ms; B could only start after it settled
    assert!(calls[1].started >= calls[0].ended);
    assert!(calls[1].started - calls[0].started >= Duration::from_millis(100));

    // The inconclusive event for A was out before B began
    assert!(calls[0].inconclusive_seen.is_empty());
    assert_eq!(calls[1].inconclusive_seen, vec!["A".to_string()]);

    // B and C were mirrored locally; A waits for a human
    let snapshot = state.snapshot();
    assert!(snapshot.games.contains_key(&2));
    assert!(snapshot.games.contains_key(&3));
    assert!(!snapshot.games.contains_key(&1));
    assert_eq!(snapshot.scans_handled, 3);
    assert_eq!(metrics.scans_inconclusive.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.scans_resolved.load(Ordering::Relaxed), 2);
}

#[tokio::test(start_paused = true)]
async fn test_burst_is_serialized_in_order() {
    let codes: Vec<String> = (0..10).map(|i| format!("{:0>8}", i)).collect();
    let scripts: Vec<(&str, u64, Script)> = codes
        .iter()
        .enumerate()
        .map(|(i, code)| {
            (
                code.as_str(),
                ((10 - i) * 7) as u64,
                Script::Resolve(GameAction::Borrow),
            )
        })
        .collect();
    let api = Arc::new(ScriptedApi::new(&scripts));
    let (queue, _state, _metrics) = queue_with(Arc::clone(&api));

    for code in &codes {
        queue.push(code.clone());
    }
    queue.idle().await;

    let calls = api.calls();
    assert_eq!(calls.len(), codes.len());
    for (call, code) in calls.iter().zip(&codes) {
        assert_eq!(&call.barcode, code);
    }
    for pair in calls.windows(2) {
        assert!(pair[1].started > pair[0].started);
        assert!(pair[1].started >= pair[0].ended);
    }
    assert_eq!(*api.max_in_flight.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_push_while_processing_joins_the_same_drain() {
    let api = Arc::new(ScriptedApi::new(&[
        ("SLOW0001", 50, Script::Resolve(GameAction::Borrow)),
        ("LATE0002", 0, Script::Resolve(GameAction::Return)),
    ]));
    let (queue, _state, _metrics) = queue_with(Arc::clone(&api));

    queue.push("SLOW0001".to_string());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(queue.is_processing());

    queue.push("LATE0002".to_string());
    assert_eq!(queue.pending_len(), 1);
    queue.idle().await;

    let order: Vec<String> = api.calls().into_iter().map(|c| c.barcode).collect();
    assert_eq!(order, vec!["SLOW0001", "LATE0002"]);
    assert!(!queue.is_processing());
}

#[tokio::test(start_paused = true)]
async fn test_failure_does_not_stall_queue() {
    let api = Arc::new(ScriptedApi::new(&[
        ("FAIL0001", 20, Script::Fail(500)),
        ("OK000002", 0, Script::Resolve(GameAction::Borrow)),
    ]));
    let (queue, state, metrics) = queue_with(Arc::clone(&api));

    queue.push("FAIL0001".to_string());
    queue.push("OK000002".to_string());
    queue.idle().await;

    assert_eq!(api.calls().len(), 2);
    assert_eq!(metrics.scan_failures.load(Ordering::Relaxed), 1);

    let errors: Vec<String> = state.read(|s| {
        s.notifications
            .iter()
            .filter(|n| n.level == NotificationLevel::Error)
            .map(|n| n.message.clone())
            .collect()
    });
    assert_eq!(errors, vec!["Scan FAIL0001 failed: Server error (500)".to_string()]);
}
