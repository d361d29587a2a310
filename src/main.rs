//! Console harness for the companion core: prints every emitted event as a
//! JSON line and reads commands from stdin. A graphical shell consumes the
//! same event stream and command surface.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use vinyl_companion::{
    clock, AppConfig, BrowserOpener, Controller, EventSink, PollerConfig, SpotifyClient,
    TokenStore,
};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("vinyl_companion=info"),
    )
    .init();

    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config: {}. Using defaults.", e);
        let default_config = AppConfig::default();
        // Save defaults so the config file exists for next launch
        if let Err(save_err) = default_config.save() {
            log::error!("Failed to save default config: {}", save_err);
        }
        default_config
    });

    if !config.has_credentials() {
        let path = AppConfig::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        eprintln!("Missing Spotify credentials. Fill in clientId/clientSecret in {}", path);
        std::process::exit(1);
    }

    let api = match SpotifyClient::new(config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("Failed to create Spotify client: {}", e);
            std::process::exit(1);
        }
    };

    let store = match TokenStore::default_location() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to locate token store: {}", e);
            std::process::exit(1);
        }
    };

    let (events, mut rx) = EventSink::channel();
    let controller = Arc::new(Controller::new(
        api,
        store,
        clock::system_clock(),
        events,
        Box::new(BrowserOpener),
        PollerConfig::default(),
    ));

    // Event bridge: one JSON line per event
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => log::error!("Failed to serialize event: {}", e),
            }
        }
    });

    controller.startup().await;

    println!("Commands: login | logout | play [uri] | pause | url <redirect-url> | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("login") => {
                if let Err(e) = controller.login().await {
                    eprintln!("login failed: {}", e);
                }
            }
            Some("logout") => controller.logout().await,
            Some("play") => {
                if let Err(e) = controller.play(parts.next()).await {
                    eprintln!("play failed: {}", e);
                }
            }
            Some("pause") => {
                if let Err(e) = controller.pause().await {
                    eprintln!("pause failed: {}", e);
                }
            }
            Some("url") => match parts.next() {
                Some(raw) => controller.handle_protocol_url(raw).await,
                None => eprintln!("usage: url <redirect-url>"),
            },
            Some("quit") => break,
            Some(other) => eprintln!("unknown command: {}", other),
            None => {}
        }
    }

    controller.shutdown();
}
