//! SpielViel Station - barcode scan station and kiosk display
//!
//! Main entry point for the terminal application.
//!
//! # Overview
//!
//! One terminal acts both as the kiosk screen and as the scan station:
//! - The kiosk rotates through program, open player searches and top games,
//!   refetching the data after every full round
//! - A keyboard-emulating barcode scanner can be used at any time; scans are
//!   resolved against the server one at a time
//! - Ambiguous scans pause the scanner and ask for `b` (borrow), `r` (return)
//!   or `Esc`
//!
//! # Execution Flow
//!
//! 1. Load `SpielViel Data/spielviel.yaml` (or the directory given as the first
//!    argument), writing defaults if missing
//! 2. Initialize logging → logs/spielviel.<date>
//! 3. Create the tokio runtime and the API client
//! 4. Seed the catalog and load the first kiosk data set
//! 5. Wire input hub → scan detector → scan queue, and the kiosk display
//! 6. Redraw every `kiosk.frame_interval_ms` until Ctrl-C or until terminal input
//!    fails
//! 7. Restore the terminal, drain the scan queue, log the metrics summary

use anyhow::{Context, Result};
use crossterm::{cursor, queue, style, terminal};
use spielviel_station::config::ConfigManager;
use spielviel_station::events::inconclusive_channel;
use spielviel_station::input::terminal::{TerminalReader, TerminalSession};
use spielviel_station::input::{InputHub, InputSource, Key, KeyInput, Phase};
use spielviel_station::kiosk::render::render_frame;
use spielviel_station::kiosk::{KioskDisplay, build_slides};
use spielviel_station::models::{KioskData, NotificationLevel, StationConfig};
use spielviel_station::scanner::{ScanDetector, ScanProcessor, ScanQueue};
use spielviel_station::services::{GameMutator, KioskRefresher, ScanPrompt, load_kiosk_data};
use spielviel_station::{APP_NAME, ApiClient, GameApi, Metrics, StateManager, VERSION};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

const DEFAULT_CONFIG_DIR: &str = "SpielViel Data";

fn main() -> Result<()> {
    let config_dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_DIR.to_string());

    let config_manager = ConfigManager::new(&config_dir)?;
    config_manager.write_default_if_missing()?;
    let config = config_manager.load()?;

    let _log_guard = spielviel_station::logging::setup_logging(&config.logging)?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("spielviel-worker")
        .build()
        .context("Failed to create tokio runtime")?;

    let result = runtime.block_on(run_station(config));

    runtime.shutdown_timeout(Duration::from_secs(5));
    tracing::info!("Application shutdown complete");

    result.map_err(|e| {
        tracing::error!("Station error: {:#}", e);
        e
    })
}

async fn run_station(config: StationConfig) -> Result<()> {
    let runtime = tokio::runtime::Handle::current();
    let metrics = Arc::new(Metrics::new());
    let state = Arc::new(StateManager::with_notification_ttl(config.notifications.ttl()));
    state.set_scanning_enabled(config.scanner.enabled);

    let api: Arc<dyn GameApi> =
        Arc::new(ApiClient::new(&config.api).context("Failed to create API client")?);

    match api.list_games().await {
        Ok(games) => {
            tracing::info!(count = games.len(), "Catalog loaded");
            state.replace_games(games);
        }
        Err(e) => {
            tracing::warn!("Catalog not loaded: {}", e);
            state.notify(NotificationLevel::Error, e.user_message());
        }
    }

    let initial = match load_kiosk_data(api.as_ref(), &config.api).await {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!("Initial kiosk data not loaded: {}", e);
            state.notify(
                NotificationLevel::Error,
                format!("Kiosk data not loaded: {}", e.user_message()),
            );
            KioskData::default()
        }
    };

    // Scan pipeline: input hub -> detector -> queue -> server
    let hub = InputHub::new();
    let detector =
        Arc::new(ScanDetector::new(&config.scanner).with_metrics(Arc::clone(&metrics)));
    let _scanner = detector.attach(&hub);

    let (inconclusive_tx, inconclusive_rx) = inconclusive_channel();
    let processor = ScanProcessor::new(
        Arc::clone(&api),
        Arc::clone(&state),
        inconclusive_tx,
        Arc::clone(&metrics),
    );
    let scan_queue = ScanQueue::new(processor, runtime.clone());
    detector.set_on_scan(scan_queue.consumer());

    let mutator = GameMutator::new(Arc::clone(&api), Arc::clone(&state));
    let (prompt, prompt_handle) = ScanPrompt::new(
        inconclusive_rx,
        mutator,
        Arc::clone(&state),
        Arc::clone(&detector),
    );
    let _prompt_keys = prompt_handle.bind_keys(&hub);
    let prompt_task = tokio::spawn(prompt.run());

    // Kiosk
    let (mut display, kiosk) = KioskDisplay::new(build_slides(initial, &config.kiosk));
    let refresher = KioskRefresher::new(
        Arc::clone(&api),
        Arc::clone(&state),
        Arc::clone(&metrics),
        config.api.clone(),
        config.kiosk.clone(),
        kiosk.clone(),
        runtime.clone(),
    );
    display.on_round_complete(move || refresher.trigger());
    let display_task = tokio::spawn(display.run());
    let _kiosk_keys = kiosk.bind_keys(&hub);

    let shutdown = Arc::new(Notify::new());
    let _quit_keys = {
        let shutdown = Arc::clone(&shutdown);
        hub.on_key(
            Phase::Bubble,
            Arc::new(move |input: &KeyInput| {
                if input.key == Key::Interrupt {
                    shutdown.notify_one();
                }
            }),
        )
    };

    let session = TerminalSession::start()?;
    let mut reader = TerminalReader::spawn(hub.clone(), Arc::clone(&shutdown))?;
    tracing::info!("Station ready");

    let view = kiosk.view();
    let mut frames =
        tokio::time::interval(Duration::from_millis(config.kiosk.frame_interval_ms.max(10)));
    let mut stdout = io::stdout();

    let draw_result = loop {
        tokio::select! {
            _ = shutdown.notified() => break Ok(()),
            _ = frames.tick() => {
                state.prune_notifications(std::time::Instant::now());
                let current = view.borrow().clone();
                let snapshot = state.snapshot();
                let (width, _) = terminal::size().unwrap_or((80, 24));
                let lines = render_frame(&current, &snapshot, tokio::time::Instant::now(), width as usize);
                if let Err(e) = draw(&mut stdout, &lines) {
                    break Err(e);
                }
            }
        }
    };

    tracing::info!("Shutting down");
    reader.stop();
    drop(session);

    kiosk.shutdown();
    if display_task.await.is_err() {
        tracing::warn!("Kiosk display task ended abnormally");
    }
    prompt_task.abort();

    if tokio::time::timeout(Duration::from_secs(5), scan_queue.idle())
        .await
        .is_err()
    {
        tracing::warn!(
            pending = scan_queue.pending_len(),
            "Scan queue still busy at shutdown"
        );
    }

    metrics.log_summary();
    draw_result
}

fn draw(out: &mut impl Write, lines: &[String]) -> Result<()> {
    queue!(
        out,
        cursor::MoveTo(0, 0),
        terminal::Clear(terminal::ClearType::All)
    )?;
    for line in lines {
        queue!(out, style::Print(line), cursor::MoveToNextLine(1))?;
    }
    out.flush().context("Failed to draw frame")?;
    Ok(())
}
