use teamdraw_engine::{Config, Engine};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "teamdraw exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let engine = Engine::bootstrap(config).await?;
    let quota = engine.store().get_quota().await?;
    tracing::info!(quota, "engine ready");

    let scheduler = engine.spawn_scheduler();
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    scheduler.shutdown().await;
    Ok(())
}
