use anyhow::Context;
use fd_engine::{ArtifactStore, Scorer};
use fd_service::{create_router, AppState};
use fd_types::FraudDetectConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fd_engine=info,fd_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = FraudDetectConfig::from_env()?;

    // Startup fails outright when the model cannot be loaded.
    let store = ArtifactStore::new(&config.artifact_path);
    let scorer = Scorer::load(&store)
        .with_context(|| format!("loading model from {}", config.artifact_path.display()))?;

    let app = create_router(AppState::new(scorer));

    let listener = tokio::net::TcpListener::bind(&config.service_addr)
        .await
        .with_context(|| format!("binding {}", config.service_addr))?;
    tracing::info!("FraudDetect scoring service listening on {}", config.service_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
