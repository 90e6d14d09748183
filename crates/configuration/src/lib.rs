// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{Config, LedgerSettings, LoggingSettings, WebSettings};

/// Prefix of environment overrides, e.g. `TRADELEDGER__LEDGER__LIST_TAKE=40`.
const ENV_PREFIX: &str = "TRADELEDGER";

/// Loads the application configuration.
///
/// Sources, later ones winning: built-in defaults, an optional `config.toml`
/// in the working directory, then `TRADELEDGER__SECTION__KEY` environment
/// variables. The result is validated before it is returned.
pub fn load_config() -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name("config.toml").required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );
    finish(builder)
}

fn finish(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Config, ConfigError> {
    let config = builder.build()?.try_deserialize::<Config>()?;
    config.validate()?;
    tracing::debug!(?config, "Configuration loaded");
    Ok(config)
}
