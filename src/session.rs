use crate::api::{auth, RemoteApi};
use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::events::{AppEvent, EventSink};
use crate::store::{TokenRecord, TokenStore};
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};

/// In-memory authentication state machine. Exactly one per process; never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// Redirect sent, awaiting the protocol callback.
    Authenticating,
    Exchanging,
    Refreshing,
    Authenticated,
    Failed(String),
}

impl AuthState {
    pub fn name(&self) -> &'static str {
        match self {
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::Authenticating => "authenticating",
            AuthState::Exchanging => "exchanging",
            AuthState::Refreshing => "refreshing",
            AuthState::Authenticated => "authenticated",
            AuthState::Failed(_) => "failed",
        }
    }
}

type SharedRefresh = Shared<BoxFuture<'static, Result<(), String>>>;

/// Owns the OAuth token lifecycle: startup restore, authorize-URL handoff,
/// code exchange, serialized refresh and logout. The only component that
/// configures tokens on the remote client.
pub struct SessionController<A: RemoteApi> {
    api: Arc<A>,
    store: Arc<TokenStore>,
    clock: Arc<dyn Clock>,
    events: EventSink,
    /// Current state, observable via `subscribe`.
    state: watch::Sender<AuthState>,
    /// At most one in-memory copy of the persisted record.
    record: RwLock<Option<TokenRecord>>,
    /// Concurrent refresh triggers coalesce onto this future.
    refresh_in_flight: Mutex<Option<SharedRefresh>>,
}

impl<A: RemoteApi> SessionController<A> {
    pub fn new(
        api: Arc<A>,
        store: Arc<TokenStore>,
        clock: Arc<dyn Clock>,
        events: EventSink,
    ) -> Arc<Self> {
        Arc::new(Self {
            api,
            store,
            clock,
            events,
            state: watch::channel(AuthState::Unauthenticated).0,
            record: RwLock::new(None),
            refresh_in_flight: Mutex::new(None),
        })
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Watch auth-state transitions, for work that must not outlive the
    /// credentials (the poller, most notably).
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: AuthState) {
        let next_name = next.name();
        let prev = self.state.send_replace(next);
        log::info!("auth state: {} -> {}", prev.name(), next_name);
    }

    /// Restore the session from the credential store. Valid cached tokens
    /// authenticate without a network call; expired ones with a refresh token
    /// go through one refresh attempt.
    pub async fn startup(self: &Arc<Self>) {
        let Some(record) = self.store.load() else {
            log::info!("No cached tokens, login required");
            return;
        };

        if !record.is_expired(self.clock.now_ms()) {
            log::info!("Valid tokens found in cache");
            self.api.set_tokens(&record.access_token);
            *self.record.write().await = Some(record);
            self.set_state(AuthState::Authenticated);
            self.events.emit(AppEvent::AuthSuccess);
            return;
        }

        if record.refresh_token.is_empty() {
            log::info!("Cached tokens expired and no refresh token, login required");
            return;
        }

        log::info!("Cached tokens expired, attempting refresh...");
        *self.record.write().await = Some(record);
        match self.refresh().await {
            Ok(()) => self.events.emit(AppEvent::AuthSuccess),
            // refresh already cleared the store and reset state; the user
            // just sees a normal login prompt
            Err(e) => log::warn!("Startup refresh failed: {}", e),
        }
    }

    /// Build the authorization URL for external display and start waiting for
    /// the redirect. No network call happens here.
    pub async fn initiate(&self) -> AppResult<String> {
        let state = self.state();
        if !matches!(state, AuthState::Unauthenticated | AuthState::Failed(_)) {
            return Err(AppError::InvalidTransition {
                from: state.name(),
                operation: "initiate",
            });
        }

        let url = self.api.build_authorize_url(&auth::generate_state());
        self.set_state(AuthState::Authenticating);
        Ok(url)
    }

    /// Exchange the authorization code delivered by the protocol callback.
    pub async fn complete_with_code(&self, code: &str) -> AppResult<()> {
        let state = self.state();
        if state != AuthState::Authenticating {
            log::warn!("Ignoring authorization code in state {}", state.name());
            return Err(AppError::InvalidTransition {
                from: state.name(),
                operation: "complete_with_code",
            });
        }

        self.set_state(AuthState::Exchanging);
        match self.api.exchange_code(code).await {
            Ok(token) => {
                let record = TokenRecord::issued(
                    token.access_token,
                    token.refresh_token.unwrap_or_default(),
                    token.expires_in,
                    self.clock.now_ms(),
                );
                if let Err(e) = self.store.save(&record) {
                    log::error!("Failed to save tokens: {}", e);
                }
                self.api.set_tokens(&record.access_token);
                *self.record.write().await = Some(record);
                self.set_state(AuthState::Authenticated);
                self.events.emit(AppEvent::AuthSuccess);
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                log::error!("Error getting tokens: {}", message);
                self.set_state(AuthState::Failed(message.clone()));
                self.events.emit(AppEvent::AuthError { message });
                Err(e)
            }
        }
    }

    /// Record a provider-reported authorization failure (or a malformed
    /// callback) without attempting an exchange.
    pub async fn complete_with_error(&self, error: &str) {
        let state = self.state();
        if state != AuthState::Authenticating {
            log::warn!(
                "Ignoring callback error '{}' in state {}",
                error,
                state.name()
            );
            return;
        }

        log::error!("OAuth error: {}", error);
        self.set_state(AuthState::Failed(error.to_string()));
        self.events.emit(AppEvent::AuthError {
            message: error.to_string(),
        });
    }

    /// Refresh the access token. At most one refresh is ever in flight;
    /// concurrent callers await the same network operation and share its
    /// outcome. Failure clears the stored credentials (a broken refresh token
    /// must not be retried silently) and forces a fresh login.
    pub async fn refresh(self: &Arc<Self>) -> AppResult<()> {
        let shared = {
            let mut slot = self.refresh_in_flight.lock().await;
            match slot.as_ref() {
                Some(in_flight) => in_flight.clone(),
                None => {
                    let this = Arc::clone(self);
                    let fut = async move { this.run_refresh().await }.boxed().shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };

        let result = shared.clone().await;
        // A newer refresh may already occupy the slot; only clear our own.
        {
            let mut slot = self.refresh_in_flight.lock().await;
            if slot.as_ref().is_some_and(|f| f.ptr_eq(&shared)) {
                slot.take();
            }
        }
        result.map_err(AppError::RefreshFailed)
    }

    async fn run_refresh(&self) -> Result<(), String> {
        let refresh_token = {
            let record = self.record.read().await;
            match record.as_ref() {
                Some(r) if !r.refresh_token.is_empty() => r.refresh_token.clone(),
                _ => match self.store.load() {
                    Some(r) if !r.refresh_token.is_empty() => r.refresh_token,
                    _ => return Err("no refresh token available".into()),
                },
            }
        };

        self.set_state(AuthState::Refreshing);
        match self.api.refresh(&refresh_token).await {
            Ok(token) => {
                // Carry the old refresh token forward unless a new one was issued
                let next_refresh = token
                    .refresh_token
                    .filter(|t| !t.is_empty())
                    .unwrap_or(refresh_token);
                let record = TokenRecord::issued(
                    token.access_token,
                    next_refresh,
                    token.expires_in,
                    self.clock.now_ms(),
                );
                if let Err(e) = self.store.save(&record) {
                    log::error!("Failed to save refreshed tokens: {}", e);
                }
                self.api.set_tokens(&record.access_token);
                *self.record.write().await = Some(record);
                self.set_state(AuthState::Authenticated);
                log::info!("Tokens refreshed successfully");
                Ok(())
            }
            Err(e) => {
                let message = match e {
                    AppError::RefreshFailed(msg) => msg,
                    other => other.to_string(),
                };
                log::warn!(
                    "Token refresh failed: {}. User will need to re-login.",
                    message
                );
                if let Err(clear_err) = self.store.clear() {
                    log::error!("Failed to clear token cache: {}", clear_err);
                }
                self.api.reset_tokens();
                *self.record.write().await = None;
                self.set_state(AuthState::Unauthenticated);
                Err(message)
            }
        }
    }

    /// Drop the credential record and reset the client. Valid from any state.
    pub async fn logout(&self) {
        if let Err(e) = self.store.clear() {
            log::warn!("Error clearing tokens: {}", e);
        }
        self.api.reset_tokens();
        *self.record.write().await = None;
        self.set_state(AuthState::Unauthenticated);
    }
}
