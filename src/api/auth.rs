use crate::api::models::TokenResponse;
use crate::error::{AppError, AppResult};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use rand::Rng;

const AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Fixed scope set; everything the poller and the transport commands need.
pub const SCOPES: [&str; 4] = [
    "user-read-playback-state",
    "user-modify-playback-state",
    "user-read-currently-playing",
    "streaming",
];

/// Opaque CSRF token carried through the redirect round-trip.
pub fn generate_state() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..16).map(|_| rng.gen::<u8>()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

pub fn build_authorize_url(client_id: &str, redirect_uri: &str, state: &str) -> String {
    let scopes = SCOPES.join(" ");
    let url = format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
        AUTH_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&scopes),
        urlencoding::encode(state),
    );
    log::info!("Auth URL: {}", url);
    url
}

fn basic_auth(client_id: &str, client_secret: &str) -> String {
    let credentials = format!("{}:{}", client_id, client_secret);
    format!("Basic {}", STANDARD.encode(credentials.as_bytes()))
}

/// Exchange an authorization code for the initial token pair.
pub async fn exchange_code(
    http: &reqwest::Client,
    client_id: &str,
    client_secret: &str,
    redirect_uri: &str,
    code: &str,
) -> AppResult<TokenResponse> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri),
    ];

    let response = http
        .post(TOKEN_URL)
        .header("Authorization", basic_auth(client_id, client_secret))
        .form(&params)
        .send()
        .await?;

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::ExchangeFailed(body));
    }

    let token: TokenResponse = response.json().await?;
    Ok(token)
}

/// Refresh an expired access token using the refresh_token grant.
pub async fn refresh_token(
    http: &reqwest::Client,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> AppResult<TokenResponse> {
    let params = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ];

    let response = http
        .post(TOKEN_URL)
        .header("Authorization", basic_auth(client_id, client_secret))
        .form(&params)
        .send()
        .await?;

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::RefreshFailed(body));
    }

    let token: TokenResponse = response.json().await?;
    Ok(token)
}
