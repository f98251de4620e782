use macrochat::config::AppConfig;
use macrochat::server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    if let Err(err) = server::serve(config).await {
        tracing::error!(error = %err, "backend failed");
        std::process::exit(1);
    }
}
