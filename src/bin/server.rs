use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

use drop_relay::config::RelayConfig;
use drop_relay::core::{create_hub, Relay, SeenCodes};
use drop_relay::error::Result;
use drop_relay::extract::Extractor;
use drop_relay::handlers::routes;
use drop_relay::sinks::{BackendSink, TelegramSink};
use drop_relay::telegram::{ChannelWatcher, TelegramClient};

#[tokio::main]
async fn main() {
    // Initialize env
    let dotenv_result = dotenvy::dotenv();

    // Initialize logging
    env_logger::init();

    match dotenv_result {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => warn!("Failed to load .env file: {}", e),
    }

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration: host={}, port={}", config.host, config.port);

    let hub = create_hub();
    let relay = match build_relay(&config, hub.clone()) {
        Ok(relay) => Arc::new(relay),
        Err(e) => {
            error!("Failed to build relay: {}", e);
            std::process::exit(1);
        }
    };
    info!("Relay ready with {} sink(s)", relay.sink_count());

    let _keepalive = hub.clone().spawn_keepalive(config.keepalive_interval);

    if config.source_enabled() {
        match start_watcher(&config, relay.clone()).await {
            Ok(()) => info!("Telegram source started"),
            Err(e) => {
                error!("Failed to start Telegram source: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        warn!("No Telegram token or watched chats configured, only manual broadcasts will be relayed");
    }

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
    };
    let (bound, server) = match warp::serve(routes(relay, config.broadcast_token.clone()))
        .try_bind_with_graceful_shutdown(addr, shutdown)
    {
        Ok(bound) => bound,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Starting Drop Relay server on {}", bound);
    server.await;
    info!("Server stopped");
}

fn build_relay(config: &RelayConfig, hub: drop_relay::core::SharedHub) -> Result<Relay> {
    let mut relay = Relay::new(hub);

    if config.dedup.enabled {
        let seen = match &config.dedup.log_path {
            Some(path) => SeenCodes::with_log(config.dedup.capacity, path)?,
            None => SeenCodes::new(config.dedup.capacity)?,
        };
        relay = relay.with_dedup(seen);
    }

    if let Some(backend) = &config.backend {
        info!("Forwarding codes to backend {}", backend.url);
        relay = relay.with_sink(Box::new(BackendSink::new(backend, config.http_timeout)));
    }

    if let Some(token) = &config.telegram.bot_token {
        if !config.telegram.notify_chats.is_empty() {
            let client = TelegramClient::new(token.clone(), config.http_timeout);
            relay = relay.with_sink(Box::new(TelegramSink::new(
                client,
                config.telegram.notify_chats.clone(),
            )));
        }
    }

    Ok(relay)
}

async fn start_watcher(config: &RelayConfig, relay: Arc<Relay>) -> Result<()> {
    let Some(token) = config.telegram.bot_token.clone() else {
        return Ok(());
    };

    let extractor = Arc::new(Extractor::from_config(config)?);
    let client = TelegramClient::new(token, config.http_timeout);
    let bot = client.get_me().await?;
    info!(
        "Authenticated as @{} ({})",
        bot.username.as_deref().unwrap_or("unknown"),
        bot.id
    );

    let watcher = ChannelWatcher::new(
        client,
        &config.telegram,
        extractor,
        relay,
        config.ocr.timeout,
    );

    tokio::spawn(async move {
        if let Err(e) = watcher.run().await {
            error!("Telegram source stopped: {}", e);
            std::process::exit(1);
        }
    });
    Ok(())
}
