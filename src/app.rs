use crate::api::models::PlaybackCapability;
use crate::api::RemoteApi;
use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::events::EventSink;
use crate::poller::{Poller, PollerConfig};
use crate::protocol::ProtocolDispatcher;
use crate::session::{AuthState, SessionController};
use crate::store::TokenStore;
use std::sync::{Arc, Mutex};

/// Hands the authorize URL to the user's default browser. The OS-integration
/// layer supplies the real implementation; tests record the URL instead.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

pub struct BrowserOpener;

impl UrlOpener for BrowserOpener {
    fn open(&self, url: &str) -> std::io::Result<()> {
        open::that(url)
    }
}

/// Owns the session, the poller and the playback-capability flag, and exposes
/// the command surface the presentation layer calls. The presentation layer
/// never touches session or poller state directly.
pub struct Controller<A: RemoteApi> {
    api: Arc<A>,
    session: Arc<SessionController<A>>,
    dispatcher: ProtocolDispatcher<A>,
    poller: Arc<Poller<A>>,
    opener: Box<dyn UrlOpener>,
    capability: Mutex<PlaybackCapability>,
}

impl<A: RemoteApi> Controller<A> {
    /// Must run inside the tokio runtime: spawns the auth-state watcher that
    /// halts polling when the session leaves its credentials behind.
    pub fn new(
        api: Arc<A>,
        store: TokenStore,
        clock: Arc<dyn Clock>,
        events: EventSink,
        opener: Box<dyn UrlOpener>,
        poller_config: PollerConfig,
    ) -> Self {
        let store = Arc::new(store);
        let session = SessionController::new(
            Arc::clone(&api),
            store,
            clock,
            events.clone(),
        );
        let dispatcher = ProtocolDispatcher::new(Arc::clone(&session));
        let poller = Arc::new(Poller::new(Arc::clone(&api), poller_config, events));

        // A failed refresh resets the session from anywhere; no remote call
        // may be issued once the session is unauthenticated, so the poller
        // cannot wait for an explicit logout.
        let mut state_rx = session.subscribe();
        let watched = Arc::clone(&poller);
        tokio::spawn(async move {
            while state_rx.changed().await.is_ok() {
                if *state_rx.borrow_and_update() == AuthState::Unauthenticated {
                    watched.stop();
                }
            }
        });

        Self {
            api,
            session,
            dispatcher,
            poller,
            opener,
            capability: Mutex::new(PlaybackCapability::Unknown),
        }
    }

    pub fn session(&self) -> &Arc<SessionController<A>> {
        &self.session
    }

    pub fn capability(&self) -> PlaybackCapability {
        *self.capability.lock().unwrap()
    }

    /// Restore cached credentials and, when that lands in `Authenticated`,
    /// start polling.
    pub async fn startup(&self) {
        self.session.startup().await;
        if self.session.state() == AuthState::Authenticated {
            self.poller.start().await;
        }
    }

    /// Begin the login flow: build the authorize URL and open it externally.
    pub async fn login(&self) -> AppResult<()> {
        let url = self.session.initiate().await?;
        if let Err(e) = self.opener.open(&url) {
            log::error!("Failed to open browser: {}", e);
            // Land in Failed so the user can retry the login
            self.session.complete_with_error("Could not open browser").await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Stop polling without touching stored credentials, for process exit.
    pub fn shutdown(&self) {
        self.poller.stop();
    }

    /// Clear credentials and stop polling. Safe from any state.
    pub async fn logout(&self) {
        self.poller.stop();
        self.session.logout().await;
        *self.capability.lock().unwrap() = PlaybackCapability::Unknown;
    }

    /// Inbound redirect URL from the OS integration layer. Starts the poller
    /// once the exchange lands in `Authenticated`.
    pub async fn handle_protocol_url(&self, raw: &str) {
        self.dispatcher.handle_url(raw).await;
        if self.session.state() == AuthState::Authenticated {
            self.poller.start().await;
        }
    }

    /// Play `uri`, or resume the current context when `None`.
    pub async fn play(&self, uri: Option<&str>) -> AppResult<()> {
        self.command(self.api.play(uri).await)
    }

    pub async fn pause(&self) -> AppResult<()> {
        self.command(self.api.pause().await)
    }

    /// Fold a transport-command outcome into the capability flag. The flag
    /// only informs user messaging; polling and auth state are unaffected.
    fn command(&self, result: AppResult<()>) -> AppResult<()> {
        match &result {
            Ok(()) => {
                *self.capability.lock().unwrap() = PlaybackCapability::Premium;
            }
            Err(AppError::PremiumRequired) => {
                log::warn!("Playback command rejected: premium required");
                *self.capability.lock().unwrap() = PlaybackCapability::Restricted;
            }
            Err(e) => log::error!("Playback command failed: {}", e),
        }
        result
    }
}
