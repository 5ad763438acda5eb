use anyhow::Context;
use fd_data::DatasetLoader;
use fd_engine::{ArtifactStore, Trainer};
use fd_types::FraudDetectConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fd_engine=info,fd_data=info,fd_optimizer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = FraudDetectConfig::from_env()?;
    tracing::info!(
        dataset = %config.dataset_path.display(),
        artifact = %config.artifact_path.display(),
        "Loading training data"
    );

    let dataset = DatasetLoader::new()
        .load_csv_file(&config.dataset_path)
        .with_context(|| format!("loading {}", config.dataset_path.display()))?;

    let store = ArtifactStore::new(&config.artifact_path);
    let report = Trainer::new(config.search.clone())
        .train_and_save(&dataset, &store)
        .context("training run failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
