pub mod auth;
pub mod client;
pub mod models;

use crate::error::AppResult;
use models::{PlaybackSnapshot, TokenResponse};
use std::future::Future;

/// The remote service surface the rest of the app consumes. `SpotifyClient`
/// is the real implementation; tests substitute a scripted one.
///
/// Only the OAuth flow controller mutates the configured tokens; every other
/// caller just reads through this interface.
pub trait RemoteApi: Send + Sync + 'static {
    fn build_authorize_url(&self, state: &str) -> String;

    fn exchange_code(&self, code: &str)
        -> impl Future<Output = AppResult<TokenResponse>> + Send;

    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = AppResult<TokenResponse>> + Send;

    /// Current track identity and play flag, `None` when nothing is loaded
    /// in the remote player.
    fn get_current_track(
        &self,
    ) -> impl Future<Output = AppResult<Option<PlaybackSnapshot>>> + Send;

    /// Playback position for the fine-grained progress poll.
    fn get_playback_state(
        &self,
    ) -> impl Future<Output = AppResult<Option<PlaybackSnapshot>>> + Send;

    /// Start playback of `uri`, or resume the current context when `None`.
    fn play(&self, uri: Option<&str>) -> impl Future<Output = AppResult<()>> + Send;

    fn pause(&self) -> impl Future<Output = AppResult<()>> + Send;

    fn set_tokens(&self, access_token: &str);

    fn reset_tokens(&self);
}
