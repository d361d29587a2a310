use serde::Serialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

pub const AUTH_SUCCESS: &str = "auth-success";
pub const AUTH_ERROR: &str = "auth-error";
pub const TRACK_DISPLAY_UPDATE: &str = "track-display-update";
pub const PLAY_STATE_UPDATE: &str = "play-state-update";
pub const NEEDLE_POSITION_UPDATE: &str = "needle-position-update";
pub const NEEDLE_RESET_ANIMATION: &str = "needle-reset-animation";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDisplayPayload {
    pub track_id: String,
    pub title: String,
    pub artists: String,
    pub album: String,
    pub artwork_url: Option<String>,
    pub duration_ms: u64,
    pub is_playing: bool,
}

/// Everything the core ever tells the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum AppEvent {
    AuthSuccess,
    AuthError { message: String },
    TrackDisplayUpdate(TrackDisplayPayload),
    PlayStateUpdate { is_playing: bool },
    NeedlePositionUpdate { angle: f64 },
    NeedleResetAnimation,
}

impl AppEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::AuthSuccess => AUTH_SUCCESS,
            AppEvent::AuthError { .. } => AUTH_ERROR,
            AppEvent::TrackDisplayUpdate(_) => TRACK_DISPLAY_UPDATE,
            AppEvent::PlayStateUpdate { .. } => PLAY_STATE_UPDATE,
            AppEvent::NeedlePositionUpdate { .. } => NEEDLE_POSITION_UPDATE,
            AppEvent::NeedleResetAnimation => NEEDLE_RESET_ANIMATION,
        }
    }
}

/// Sender half handed to every component that emits display events.
/// A dropped receiver is not an error; the events just go nowhere.
#[derive(Clone)]
pub struct EventSink {
    tx: UnboundedSender<AppEvent>,
}

impl EventSink {
    pub fn channel() -> (EventSink, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = unbounded_channel();
        (EventSink { tx }, rx)
    }

    pub fn emit(&self, event: AppEvent) {
        log::debug!("emit {}", event.name());
        if self.tx.send(event).is_err() {
            log::debug!("event receiver dropped, discarding");
        }
    }
}
