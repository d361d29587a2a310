use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// accounts.spotify.com token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Absent on refresh when Spotify keeps the old refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

// Wire shape of /me/player and /me/player/currently-playing (the fields we read)
#[derive(Debug, Deserialize)]
pub struct PlayerStateResponse {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    pub item: Option<TrackItem>,
}

#[derive(Debug, Deserialize)]
pub struct TrackItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    pub album: Option<AlbumRef>,
}

#[derive(Debug, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AlbumRef {
    pub name: String,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

#[derive(Debug, Deserialize)]
pub struct ImageRef {
    pub url: String,
}

// Spotify error envelope, used to spot PREMIUM_REQUIRED on 403s
#[derive(Debug, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Track metadata carried alongside a snapshot for display purposes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub id: String,
    pub title: String,
    pub artists: String,
    pub album: String,
    pub artwork_url: Option<String>,
}

/// One atomic observation of remote playback state. Immutable; the reconciler
/// retains exactly one previous snapshot for diffing.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub track_id: String,
    pub is_playing: bool,
    pub progress_ms: u64,
    pub duration_ms: u64,
    pub fetched_at: DateTime<Utc>,
    pub track: Option<TrackInfo>,
}

impl PlaybackSnapshot {
    /// Maps a player-state response to a snapshot, or `None` when nothing is
    /// loaded in the remote player.
    pub fn from_response(resp: PlayerStateResponse, fetched_at: DateTime<Utc>) -> Option<Self> {
        let item = resp.item?;
        let artists = item
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let (album, artwork_url) = match item.album {
            Some(album) => {
                let artwork = album.images.first().map(|i| i.url.clone());
                (album.name, artwork)
            }
            None => (String::new(), None),
        };
        Some(Self {
            track_id: item.id.clone(),
            is_playing: resp.is_playing,
            progress_ms: resp.progress_ms.unwrap_or(0),
            duration_ms: item.duration_ms,
            fetched_at,
            track: Some(TrackInfo {
                id: item.id,
                title: item.name,
                artists,
                album,
                artwork_url,
            }),
        })
    }
}

/// Whether the account can control playback, learned from command outcomes.
/// Informs user messaging only; never drives polling or auth state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackCapability {
    Unknown,
    Premium,
    Restricted,
}
