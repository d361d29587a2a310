#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vinyl_companion::api::models::{PlaybackSnapshot, TokenResponse, TrackInfo};
use vinyl_companion::api::RemoteApi;
use vinyl_companion::app::UrlOpener;
use vinyl_companion::clock::Clock;
use vinyl_companion::{AppError, AppResult};

/// Clock pinned to a test-chosen instant.
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn at(now_ms: i64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicI64::new(now_ms),
        })
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Captures authorize URLs instead of opening a browser.
#[derive(Clone, Default)]
pub struct RecordingOpener {
    pub urls: Arc<Mutex<Vec<String>>>,
}

impl UrlOpener for RecordingOpener {
    fn open(&self, url: &str) -> std::io::Result<()> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

pub fn token_response(
    access_token: &str,
    refresh_token: Option<&str>,
    expires_in: u64,
) -> TokenResponse {
    TokenResponse {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(|t| t.to_string()),
        expires_in,
    }
}

pub fn snapshot(track_id: &str, is_playing: bool, progress_ms: u64, duration_ms: u64) -> PlaybackSnapshot {
    PlaybackSnapshot {
        track_id: track_id.to_string(),
        is_playing,
        progress_ms,
        duration_ms,
        fetched_at: chrono::Utc::now(),
        track: Some(TrackInfo {
            id: track_id.to_string(),
            title: format!("title of {}", track_id),
            artists: "Artist".into(),
            album: "Album".into(),
            artwork_url: None,
        }),
    }
}

pub fn drain_events(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<vinyl_companion::AppEvent>,
) -> Vec<vinyl_companion::AppEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

/// Scripted stand-in for the Spotify client.
#[derive(Default)]
pub struct MockApi {
    pub exchange_results: Mutex<Vec<Result<TokenResponse, String>>>,
    pub refresh_results: Mutex<Vec<Result<TokenResponse, String>>>,
    /// Artificial latency on refresh so tests can overlap concurrent calls.
    pub refresh_delay: Mutex<Option<Duration>>,
    pub exchange_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    /// What both playback endpoints currently observe.
    pub current: Mutex<Option<PlaybackSnapshot>>,
    pub track_fetches: AtomicUsize,
    pub state_fetches: AtomicUsize,
    pub play_results: Mutex<Vec<Result<(), AppError>>>,
    pub pause_results: Mutex<Vec<Result<(), AppError>>>,
    pub access_token: Mutex<Option<String>>,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_exchange(&self, result: Result<TokenResponse, &str>) {
        self.exchange_results
            .lock()
            .unwrap()
            .push(result.map_err(|e| e.to_string()));
    }

    pub fn script_refresh(&self, result: Result<TokenResponse, &str>) {
        self.refresh_results
            .lock()
            .unwrap()
            .push(result.map_err(|e| e.to_string()));
    }

    pub fn set_current(&self, snapshot: Option<PlaybackSnapshot>) {
        *self.current.lock().unwrap() = snapshot;
    }

    pub fn configured_token(&self) -> Option<String> {
        self.access_token.lock().unwrap().clone()
    }
}

impl RemoteApi for MockApi {
    fn build_authorize_url(&self, state: &str) -> String {
        format!("https://accounts.example/authorize?state={}", state)
    }

    async fn exchange_code(&self, _code: &str) -> AppResult<TokenResponse> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.exchange_results.lock().unwrap().pop();
        match next {
            Some(Ok(token)) => Ok(token),
            Some(Err(message)) => Err(AppError::ExchangeFailed(message)),
            None => Err(AppError::ExchangeFailed("unscripted exchange".into())),
        }
    }

    async fn refresh(&self, _refresh_token: &str) -> AppResult<TokenResponse> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.refresh_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.refresh_results.lock().unwrap().pop();
        match next {
            Some(Ok(token)) => Ok(token),
            Some(Err(message)) => Err(AppError::RefreshFailed(message)),
            None => Err(AppError::RefreshFailed("unscripted refresh".into())),
        }
    }

    async fn get_current_track(&self) -> AppResult<Option<PlaybackSnapshot>> {
        self.track_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.current.lock().unwrap().clone())
    }

    async fn get_playback_state(&self) -> AppResult<Option<PlaybackSnapshot>> {
        self.state_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.current.lock().unwrap().clone())
    }

    async fn play(&self, _uri: Option<&str>) -> AppResult<()> {
        self.play_results.lock().unwrap().pop().unwrap_or(Ok(()))
    }

    async fn pause(&self) -> AppResult<()> {
        self.pause_results.lock().unwrap().pop().unwrap_or(Ok(()))
    }

    fn set_tokens(&self, access_token: &str) {
        *self.access_token.lock().unwrap() = Some(access_token.to_string());
    }

    fn reset_tokens(&self) {
        *self.access_token.lock().unwrap() = None;
    }
}
