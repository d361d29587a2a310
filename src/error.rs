use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid callback URL: {0}")]
    InvalidCallback(String),

    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Spotify Premium is required to control playback")]
    PremiumRequired,

    #[error("Playback error: {status} - {message}")]
    Playback { status: u16, message: String },

    #[error("Failed to read credential store: {0}")]
    StoreRead(String),

    #[error("Failed to write credential store: {0}")]
    StoreWrite(String),

    #[error("Invalid state for {operation}: {from}")]
    InvalidTransition {
        from: &'static str,
        operation: &'static str,
    },

    #[error("Config error: {0}")]
    Config(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("AppError", 2)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl AppError {
    pub fn kind(&self) -> &str {
        match self {
            AppError::Http(_) => "http",
            AppError::Json(_) => "json",
            AppError::Io(_) => "io",
            AppError::InvalidCallback(_) => "invalid_callback",
            AppError::ExchangeFailed(_) => "exchange_failed",
            AppError::RefreshFailed(_) => "refresh_failed",
            AppError::PremiumRequired => "premium_required",
            AppError::Playback { .. } => "playback",
            AppError::StoreRead(_) => "store_read",
            AppError::StoreWrite(_) => "store_write",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::Config(_) => "config",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
