pub mod api;
pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod poller;
pub mod protocol;
pub mod session;
pub mod store;

pub use api::client::SpotifyClient;
pub use api::RemoteApi;
pub use app::{BrowserOpener, Controller, UrlOpener};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use events::{AppEvent, EventSink};
pub use poller::PollerConfig;
pub use session::AuthState;
pub use store::{TokenRecord, TokenStore};
