use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use killerdash::api::ApiClient;
use killerdash::session::AdminSession;

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "killerdash=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_url =
        std::env::var("KILLERDASH_API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    tracing::info!(%base_url, "Starting killerdash...");

    let api = match ApiClient::new(&base_url) {
        Ok(api) => api,
        Err(e) => {
            tracing::error!("could not build API client: {}", e);
            std::process::exit(1);
        }
    };
    let session = AdminSession::new(api);

    // Delivery config comes from the server; without it the session still
    // works, but dispatch operations will refuse to run
    match session.init_delivery().await {
        Ok(()) => tracing::info!("delivery service configured"),
        Err(e) => tracing::warn!(
            "Failed to configure delivery: {}. Notifications will not be sent.",
            e
        ),
    }

    session.prime().await;
    let stats = session.stats(false).await;
    tracing::info!(
        players = stats.total_players,
        active = stats.active_matches,
        finished = stats.finished_matches,
        "session ready"
    );
}
