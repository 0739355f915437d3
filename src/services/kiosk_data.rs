use crate::api::{ApiError, GameApi};
use crate::kiosk::{KioskHandle, build_slides};
use crate::metrics::Metrics;
use crate::models::{
    ApiSettings, KioskData, KioskSettings, NotificationLevel, flatten_open_searches,
};
use crate::state::StateManager;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;

/// Fetch the three kiosk data sets concurrently.
///
/// Fails as a whole if any request fails; the caller decides whether to keep
/// showing older data.
pub async fn load_kiosk_data(
    api: &dyn GameApi,
    settings: &ApiSettings,
) -> Result<KioskData, ApiError> {
    let (program, searches, top_games) = tokio::try_join!(
        api.program(),
        api.player_searches(),
        api.top_games(settings.top_games_limit),
    )?;

    let open_searches = flatten_open_searches(searches);
    tracing::debug!(
        program_days = program.len(),
        open_searches = open_searches.len(),
        top_games = top_games.len(),
        "Kiosk data loaded"
    );

    Ok(KioskData {
        program,
        open_searches,
        top_games,
    })
}

/// Reloads kiosk data when a rotation round completes
#[derive(Clone)]
pub struct KioskRefresher {
    api: Arc<dyn GameApi>,
    state: Arc<StateManager>,
    metrics: Arc<Metrics>,
    api_settings: ApiSettings,
    kiosk_settings: KioskSettings,
    display: KioskHandle,
    runtime: Handle,
    in_flight: Arc<AtomicBool>,
}

impl KioskRefresher {
    pub fn new(
        api: Arc<dyn GameApi>,
        state: Arc<StateManager>,
        metrics: Arc<Metrics>,
        api_settings: ApiSettings,
        kiosk_settings: KioskSettings,
        display: KioskHandle,
        runtime: Handle,
    ) -> Self {
        Self {
            api,
            state,
            metrics,
            api_settings,
            kiosk_settings,
            display,
            runtime,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a background refresh unless one is already running.
    ///
    /// Safe to call from the round-complete callback, which runs synchronously
    /// inside the display task.
    pub fn trigger(&self) {
        self.metrics.record_round_completed();

        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("Kiosk refresh already running");
            return;
        }

        let refresher = self.clone();
        self.runtime.spawn(async move {
            refresher.refresh().await;
            refresher.in_flight.store(false, Ordering::SeqCst);
        });
    }

    /// Fetch and swap in new slides. On failure the current slides stay up.
    pub async fn refresh(&self) -> bool {
        match load_kiosk_data(self.api.as_ref(), &self.api_settings).await {
            Ok(data) => {
                let slides = build_slides(data, &self.kiosk_settings);
                self.display.replace_slides(slides)
            }
            Err(e) => {
                tracing::error!("Kiosk refresh failed: {}", e);
                self.state.notify(
                    NotificationLevel::Error,
                    format!("Kiosk data not refreshed: {}", e.user_message()),
                );
                false
            }
        }
    }
}
