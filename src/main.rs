use std::sync::Arc;

use routinely::chat::ChatEngine;
use routinely::config::Config;
use routinely::gateway::{CachedProfiles, HttpGateway, ProfileLookup, PushGateway};
use routinely::http::{AppState, routes};
use routinely::reminder::Scanner;
use routinely::store::{LibSqlStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    eprintln!("🍞 Routinely v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Timezone: {}", config.timezone);
    eprintln!("   Free plan quota: {} events", config.free_plan_max_events);
    eprintln!("   Webhook: http://{}/webhook", config.bind_addr);
    eprintln!("   Reminder trigger: http://{}/reminder/send", config.bind_addr);

    let store: Arc<dyn Store> = Arc::new(
        LibSqlStore::open(std::path::Path::new(&config.database_path))
            .await
            .unwrap_or_else(|e| {
                eprintln!(
                    "Error: failed to open database at {}: {e}",
                    config.database_path
                );
                std::process::exit(1);
            }),
    );
    eprintln!("   Database: {}", config.database_path);

    let gateway = Arc::new(HttpGateway::new(
        config.platform_base_url.clone(),
        config.platform_token.clone(),
    ));
    let push: Arc<dyn PushGateway> = gateway.clone();
    let profiles: Arc<dyn ProfileLookup> = Arc::new(CachedProfiles::new(
        gateway,
        CachedProfiles::DEFAULT_TTL,
    ));

    let engine = Arc::new(ChatEngine::new(
        Arc::clone(&store),
        Arc::clone(&profiles),
        config.timezone,
        config.free_plan_max_events,
    ));
    let scanner = Arc::new(Scanner::new(
        store,
        push,
        profiles,
        config.timezone,
        config.free_plan_max_events,
    ));

    let app = routes(AppState {
        engine,
        scanner,
        reminder_token: config.reminder_token.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "Server started");
    axum::serve(listener, app).await?;

    Ok(())
}
