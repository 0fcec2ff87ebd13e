use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use study_abroad_crm::config::Config;
use study_abroad_crm::db::Database;
use study_abroad_crm::handlers::AppState;
use study_abroad_crm::llm::OllamaClient;
use study_abroad_crm::notify::WhatsAppNotifier;
use study_abroad_crm::routes::build_router;
use study_abroad_crm::storage::LeadStorage;

/// Main entry point for the application.
///
/// Initializes tracing, configuration, the database (with migrations), the
/// model and messaging clients, then serves the router behind a per-IP rate
/// limiter.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "study_abroad_crm=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");
    db.migrate().await?;

    let llm = OllamaClient::new(&config.llm)?;
    tracing::info!("✓ LLM client initialized: {}", config.llm.endpoint);

    let notifier = match config.notifier.as_ref().map(WhatsAppNotifier::new) {
        Some(Ok(notifier)) => Some(notifier),
        Some(Err(e)) => {
            tracing::error!("Failed to initialize WhatsApp notifier: {}", e);
            None
        }
        None => None,
    };

    let app_state = Arc::new(AppState {
        storage: LeadStorage::new(db.pool.clone()),
        config: config.clone(),
        llm,
        notifier,
    });

    // 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let app = build_router(app_state).layer(GovernorLayer {
        config: governor_conf,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
