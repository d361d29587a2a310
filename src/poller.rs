use crate::api::models::PlaybackSnapshot;
use crate::api::RemoteApi;
use crate::events::{AppEvent, EventSink, TrackDisplayPayload};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Tonearm travel: outer edge of the vinyl down to the center label.
pub const NEEDLE_ANGLE_START: f64 = 95.0;
pub const NEEDLE_ANGLE_END: f64 = 110.0;

/// Maps playback fraction to a tonearm angle in degrees.
pub fn needle_angle(fraction: f64) -> f64 {
    let fraction = fraction.clamp(0.0, 1.0);
    NEEDLE_ANGLE_START + fraction * (NEEDLE_ANGLE_END - NEEDLE_ANGLE_START)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Coarse track-identity poll.
    pub track_interval: Duration,
    /// Fine progress poll, active only while playing.
    pub progress_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            track_interval: Duration::from_millis(2000),
            progress_interval: Duration::from_millis(500),
        }
    }
}

/// Diffs successive playback snapshots into discrete presentation events.
/// Retains exactly one previous snapshot; only ever acts on the fields of a
/// single atomic snapshot.
pub struct Reconciler {
    events: EventSink,
    previous: Option<PlaybackSnapshot>,
}

impl Reconciler {
    pub fn new(events: EventSink) -> Self {
        Self {
            events,
            previous: None,
        }
    }

    pub fn last_is_playing(&self) -> bool {
        self.previous.as_ref().map(|p| p.is_playing).unwrap_or(false)
    }

    /// Forget the retained snapshot so the next observation seeds afresh.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn reconcile(&mut self, snapshot: PlaybackSnapshot) {
        match self.previous.as_ref() {
            // First observation seeds the state: initial display update and
            // needle position, no change events.
            None => {
                self.emit_display(&snapshot);
                self.emit_needle(&snapshot, snapshot.progress_ms);
            }
            Some(previous) => {
                let track_changed = previous.track_id != snapshot.track_id;
                // On a track change the progress accumulator restarts at zero;
                // the next progress fetch supplies the real position.
                let progress_ms = if track_changed { 0 } else { snapshot.progress_ms };

                if track_changed {
                    self.emit_display(&snapshot);
                    if snapshot.is_playing {
                        self.events.emit(AppEvent::NeedleResetAnimation);
                    }
                }

                if previous.is_playing != snapshot.is_playing {
                    self.events.emit(AppEvent::PlayStateUpdate {
                        is_playing: snapshot.is_playing,
                    });
                }

                self.emit_needle(&snapshot, progress_ms);
            }
        }
        self.previous = Some(snapshot);
    }

    fn emit_display(&self, snapshot: &PlaybackSnapshot) {
        let payload = match snapshot.track.as_ref() {
            Some(track) => TrackDisplayPayload {
                track_id: track.id.clone(),
                title: track.title.clone(),
                artists: track.artists.clone(),
                album: track.album.clone(),
                artwork_url: track.artwork_url.clone(),
                duration_ms: snapshot.duration_ms,
                is_playing: snapshot.is_playing,
            },
            None => TrackDisplayPayload {
                track_id: snapshot.track_id.clone(),
                title: String::new(),
                artists: String::new(),
                album: String::new(),
                artwork_url: None,
                duration_ms: snapshot.duration_ms,
                is_playing: snapshot.is_playing,
            },
        };
        self.events.emit(AppEvent::TrackDisplayUpdate(payload));
    }

    fn emit_needle(&self, snapshot: &PlaybackSnapshot, progress_ms: u64) {
        let fraction = if snapshot.duration_ms > 0 {
            progress_ms as f64 / snapshot.duration_ms as f64
        } else {
            0.0
        };
        self.events.emit(AppEvent::NeedlePositionUpdate {
            angle: needle_angle(fraction),
        });
    }
}

/// Runs the two best-effort poll timers against the remote API. Fetch
/// failures are logged and swallowed; the previous snapshot holds until the
/// next tick succeeds.
pub struct Poller<A: RemoteApi> {
    api: Arc<A>,
    config: PollerConfig,
    reconciler: Arc<Mutex<Reconciler>>,
    stopped: Arc<AtomicBool>,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl<A: RemoteApi> Poller<A> {
    pub fn new(api: Arc<A>, config: PollerConfig, events: EventSink) -> Self {
        Self {
            api,
            config,
            reconciler: Arc::new(Mutex::new(Reconciler::new(events))),
            stopped: Arc::new(AtomicBool::new(true)),
            tasks: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    pub async fn start(&self) {
        {
            let tasks = self.tasks.lock().unwrap();
            if !tasks.is_empty() {
                log::debug!("Poller already running");
                return;
            }
        }
        self.reconciler.lock().await.reset();
        self.stopped.store(false, Ordering::SeqCst);

        let track_task = self.spawn_track_poll();
        let progress_task = self.spawn_progress_poll();
        let mut tasks = self.tasks.lock().unwrap();
        tasks.push(track_task);
        tasks.push(progress_task);
        log::info!("Playback poller started");
    }

    /// Stop both timers. After this returns no further fetch result is
    /// reconciled, even one already in flight.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let mut tasks = self.tasks.lock().unwrap();
        if tasks.is_empty() {
            return;
        }
        for task in tasks.drain(..) {
            task.abort();
        }
        log::info!("Playback poller stopped");
    }

    fn spawn_track_poll(&self) -> JoinHandle<()> {
        let api = Arc::clone(&self.api);
        let reconciler = Arc::clone(&self.reconciler);
        let stopped = Arc::clone(&self.stopped);
        let period = self.config.track_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if stopped.load(Ordering::SeqCst) {
                    break;
                }
                match api.get_current_track().await {
                    Ok(Some(snapshot)) => {
                        if stopped.load(Ordering::SeqCst) {
                            break;
                        }
                        reconciler.lock().await.reconcile(snapshot);
                    }
                    Ok(None) => {}
                    Err(e) => log::debug!("Failed to get current track: {}", e),
                }
            }
        })
    }

    fn spawn_progress_poll(&self) -> JoinHandle<()> {
        let api = Arc::clone(&self.api);
        let reconciler = Arc::clone(&self.reconciler);
        let stopped = Arc::clone(&self.stopped);
        let period = self.config.progress_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if stopped.load(Ordering::SeqCst) {
                    break;
                }
                // Suspended while the last known play state is paused
                if !reconciler.lock().await.last_is_playing() {
                    continue;
                }
                match api.get_playback_state().await {
                    Ok(Some(snapshot)) => {
                        if stopped.load(Ordering::SeqCst) {
                            break;
                        }
                        reconciler.lock().await.reconcile(snapshot);
                    }
                    Ok(None) => {}
                    Err(e) => log::debug!("Failed to get playback progress: {}", e),
                }
            }
        })
    }
}
