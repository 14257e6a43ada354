use altis_store::{Config, DbClient};
use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "altis_store=debug,altis_order=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;

    db.migrate().await.context("Migration failed")?;

    if std::env::args().any(|arg| arg == "--clear") {
        db.clear_tables().await.context("Failed to clear reservation tables")?;
    }

    Ok(())
}
