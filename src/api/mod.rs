//! SpielViel REST API access.
//!
//! [`GameApi`] is the seam the scan pipeline, the mutation helper, and the kiosk
//! loader depend on; [`ApiClient`] is the reqwest implementation. Tests swap in
//! fakes or the generated `MockGameApi`.
//!
//! Endpoints used:
//! - `PUT /games/game/scan_by_ean/{barcode}` resolves a barcode and performs the action
//! - `PUT /borrow_game/{id}` and `PUT /return_game/{id}` for interactive mutations
//! - `GET /games` for the catalog
//! - `GET /games/leaderboard?limit=N` for the top-games slide
//! - `GET /player_search` for the open-searches slide
//! - the external program feed configured as `api.program_url`

pub mod error;

pub use error::ApiError;

use crate::models::{
    ApiSettings, Game, GameScanResult, PlayerSearchGroups, ProgramMap, ScanResponse, TopGame,
};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Remote operations the station needs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameApi: Send + Sync {
    /// Resolve a barcode; the server performs the action unless inconclusive
    async fn scan_by_ean(&self, barcode: &str) -> Result<GameScanResult, ApiError>;

    async fn borrow_game(&self, id: i64) -> Result<Game, ApiError>;

    async fn return_game(&self, id: i64) -> Result<Game, ApiError>;

    async fn list_games(&self) -> Result<Vec<Game>, ApiError>;

    async fn top_games(&self, limit: usize) -> Result<Vec<TopGame>, ApiError>;

    async fn program(&self) -> Result<ProgramMap, ApiError>;

    async fn player_searches(&self) -> Result<PlayerSearchGroups, ApiError>;
}

/// HTTP client for the SpielViel API
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    program_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let base_url = Url::parse(&settings.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", settings.base_url, e)))?;
        let program_url = Url::parse(&settings.program_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", settings.program_url, e)))?;

        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(settings.base_url.clone()));
        }

        tracing::info!(base_url = %base_url, authenticated = settings.token.is_some(), "API client ready");

        Ok(Self {
            http,
            base_url,
            program_url,
            token: settings.token.clone(),
        })
    }

    /// Build `base_url/seg/seg/...`, percent-encoding each segment
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        authenticated: bool,
    ) -> Result<T, ApiError> {
        tracing::debug!(%method, %url, "API request");

        let mut request = self.http.request(method, url.clone());
        if authenticated {
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthorized(url.to_string()));
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl GameApi for ApiClient {
    async fn scan_by_ean(&self, barcode: &str) -> Result<GameScanResult, ApiError> {
        let url = self.endpoint(&["games", "game", "scan_by_ean", barcode]);
        let response: ScanResponse = self.send(Method::PUT, url, true).await?;
        Ok(response.into())
    }

    async fn borrow_game(&self, id: i64) -> Result<Game, ApiError> {
        let url = self.endpoint(&["borrow_game", &id.to_string()]);
        self.send(Method::PUT, url, true).await
    }

    async fn return_game(&self, id: i64) -> Result<Game, ApiError> {
        let url = self.endpoint(&["return_game", &id.to_string()]);
        self.send(Method::PUT, url, true).await
    }

    async fn list_games(&self) -> Result<Vec<Game>, ApiError> {
        let url = self.endpoint(&["games"]);
        self.send(Method::GET, url, true).await
    }

    async fn top_games(&self, limit: usize) -> Result<Vec<TopGame>, ApiError> {
        let mut url = self.endpoint(&["games", "leaderboard"]);
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        self.send(Method::GET, url, true).await
    }

    async fn program(&self) -> Result<ProgramMap, ApiError> {
        // External feed, no bearer token
        self.send(Method::GET, self.program_url.clone(), false).await
    }

    async fn player_searches(&self) -> Result<PlayerSearchGroups, ApiError> {
        let url = self.endpoint(&["player_search"]);
        self.send(Method::GET, url, true).await
    }
}
