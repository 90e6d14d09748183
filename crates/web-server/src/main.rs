use tracing_subscriber::EnvFilter;

// Entry point for `cargo run -p web-server`; the `tradeledger serve` command
// does the same with file logging.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = configuration::load_config()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();
    web_server::run_server(config).await
}
