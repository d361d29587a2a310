use crate::api::models::{ApiErrorEnvelope, PlaybackSnapshot, PlayerStateResponse, TokenResponse};
use crate::api::{auth, RemoteApi};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use std::sync::RwLock;

const BASE_URL: &str = "https://api.spotify.com/v1";

/// Thin bearer-token client for the Spotify Web API.
///
/// Holds the currently configured access token; the token is only ever
/// written by the session controller (exchange, refresh, logout).
pub struct SpotifyClient {
    http: reqwest::Client,
    config: AppConfig,
    access_token: RwLock<Option<String>>,
}

impl SpotifyClient {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent("vinyl-companion/0.1.0")
            .build()?;

        Ok(Self {
            http,
            config,
            access_token: RwLock::new(None),
        })
    }

    fn auth_headers(&self) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let token = self.access_token.read().unwrap();
        if let Some(token) = token.as_deref() {
            let auth_value = format!("Bearer {}", token);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value).map_err(|e| AppError::Config(e.to_string()))?,
            );
        }
        Ok(headers)
    }

    async fn get_player(&self, path: &str) -> AppResult<Option<PlaybackSnapshot>> {
        let url = format!("{}{}", BASE_URL, path);
        let headers = self.auth_headers()?;
        let response = self.http.get(&url).headers(headers).send().await?;

        // 204: no active device / nothing playing
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::Playback { status, message });
        }

        let state: PlayerStateResponse = response.json().await?;
        Ok(PlaybackSnapshot::from_response(state, chrono::Utc::now()))
    }

    /// Classifies transport-command failures: 403 with a PREMIUM_REQUIRED
    /// reason becomes its own kind, everything else is transient.
    async fn check_command_response(&self, response: reqwest::Response) -> AppResult<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::FORBIDDEN {
            if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(&body) {
                if envelope.error.reason.as_deref() == Some("PREMIUM_REQUIRED") {
                    return Err(AppError::PremiumRequired);
                }
            }
        }
        Err(AppError::Playback {
            status: status.as_u16(),
            message: body,
        })
    }
}

impl RemoteApi for SpotifyClient {
    fn build_authorize_url(&self, state: &str) -> String {
        auth::build_authorize_url(&self.config.client_id, &self.config.redirect_uri, state)
    }

    async fn exchange_code(&self, code: &str) -> AppResult<TokenResponse> {
        auth::exchange_code(
            &self.http,
            &self.config.client_id,
            &self.config.client_secret,
            &self.config.redirect_uri,
            code,
        )
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> AppResult<TokenResponse> {
        auth::refresh_token(
            &self.http,
            &self.config.client_id,
            &self.config.client_secret,
            refresh_token,
        )
        .await
    }

    async fn get_current_track(&self) -> AppResult<Option<PlaybackSnapshot>> {
        self.get_player("/me/player/currently-playing").await
    }

    async fn get_playback_state(&self) -> AppResult<Option<PlaybackSnapshot>> {
        self.get_player("/me/player").await
    }

    async fn play(&self, uri: Option<&str>) -> AppResult<()> {
        let url = format!("{}/me/player/play", BASE_URL);
        let headers = self.auth_headers()?;
        let mut request = self.http.put(&url).headers(headers);
        if let Some(uri) = uri {
            request = request.json(&serde_json::json!({ "uris": [uri] }));
        }
        let response = request.send().await?;
        self.check_command_response(response).await
    }

    async fn pause(&self) -> AppResult<()> {
        let url = format!("{}/me/player/pause", BASE_URL);
        let headers = self.auth_headers()?;
        let response = self.http.put(&url).headers(headers).send().await?;
        self.check_command_response(response).await
    }

    fn set_tokens(&self, access_token: &str) {
        let mut token = self.access_token.write().unwrap();
        *token = Some(access_token.to_string());
    }

    fn reset_tokens(&self) {
        let mut token = self.access_token.write().unwrap();
        *token = None;
    }
}
