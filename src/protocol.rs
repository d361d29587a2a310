use crate::api::RemoteApi;
use crate::error::{AppError, AppResult};
use crate::session::{AuthState, SessionController};
use std::sync::Arc;
use url::Url;

/// Custom URI scheme registered with the OS by the integration layer.
pub const PROTOCOL_SCHEME: &str = "vinyl-music-player";
const CALLBACK_HOST: &str = "oauth";
const CALLBACK_PATH: &str = "/callback";

/// One inbound redirect, consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolCallback {
    pub code: Option<String>,
    pub error: Option<String>,
    pub raw_url: String,
}

/// Parses a raw redirect URL into a callback. Anything that is not a
/// well-formed `vinyl-music-player://oauth/callback` URL is rejected as
/// `InvalidCallback`.
pub fn parse(raw: &str) -> AppResult<ProtocolCallback> {
    let url =
        Url::parse(raw).map_err(|e| AppError::InvalidCallback(format!("{}: {}", raw, e)))?;

    if url.scheme() != PROTOCOL_SCHEME {
        return Err(AppError::InvalidCallback(format!(
            "unexpected scheme '{}'",
            url.scheme()
        )));
    }
    if url.host_str() != Some(CALLBACK_HOST) || url.path() != CALLBACK_PATH {
        return Err(AppError::InvalidCallback(format!(
            "unexpected callback location '{}'",
            raw
        )));
    }

    let mut code = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    Ok(ProtocolCallback {
        code,
        error,
        raw_url: raw.to_string(),
    })
}

/// Routes inbound redirect URLs to the session controller. URLs arrive from
/// the OS integration layer, either via the native "opened via URL" path or
/// forwarded from a redirected second launch; both channels land here.
pub struct ProtocolDispatcher<A: RemoteApi> {
    session: Arc<SessionController<A>>,
}

impl<A: RemoteApi> ProtocolDispatcher<A> {
    pub fn new(session: Arc<SessionController<A>>) -> Self {
        Self { session }
    }

    /// Handle one redirect URL. Never panics or propagates parse failures;
    /// a malformed URL surfaces to the user as a generic auth error.
    pub async fn handle_url(&self, raw: &str) {
        log::info!("Handling protocol URL: {}", raw);

        // A stale or duplicate redirect after login must not restart the
        // exchange or disturb the session.
        if self.session.state() == AuthState::Authenticated {
            log::info!("Already authenticated, dropping callback: {}", raw);
            return;
        }

        let callback = match parse(raw) {
            Ok(callback) => callback,
            Err(e) => {
                log::error!("Error parsing protocol URL: {}", e);
                self.session.complete_with_error("Invalid callback URL").await;
                return;
            }
        };

        if let Some(error) = callback.error {
            self.session.complete_with_error(&error).await;
            return;
        }

        match callback.code {
            Some(code) => {
                log::info!("Found authorization code, exchanging for tokens...");
                if let Err(e) = self.session.complete_with_code(&code).await {
                    log::error!("Code exchange failed: {}", e);
                }
            }
            None => log::warn!("No authorization code found in URL"),
        }
    }
}
