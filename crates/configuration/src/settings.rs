use crate::error::ConfigError;
use core_types::GrossReturnMode;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section has defaults, so an absent `config.toml` yields a working setup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ledger: LedgerSettings,
    pub web: WebSettings,
    pub logging: LoggingSettings,
}

/// Defaults for the ledger commands.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Broker assumed when a command does not pass `--broker`.
    pub default_broker: String,
    /// GrossReturn formula used by the regular matching passes.
    pub gross_return: GrossReturnMode,
    /// Rows shown by `list-groups` without `--take`.
    pub list_take: i64,
    /// Rows shown by `list-exec` without `--take`.
    pub exec_take: i64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            default_broker: "Schwab".to_string(),
            gross_return: GrossReturnMode::EntryExit,
            list_take: 25,
            exec_take: 50,
        }
    }
}

/// Parameters for the dashboard server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebSettings {
    pub bind_addr: String,
    /// Groups loaded by the dashboard when the request has no `take`.
    pub dashboard_take: i64,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            dashboard_take: 200,
        }
    }
}

/// Where and how verbosely to log. `RUST_LOG` overrides `level`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file_prefix: String,
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_prefix: "tradeledger.log".to_string(),
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Rejects settings no command could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.default_broker.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "ledger.default_broker must not be empty".to_string(),
            ));
        }
        if self.ledger.list_take <= 0 || self.ledger.exec_take <= 0 {
            return Err(ConfigError::ValidationError(
                "ledger.list_take and ledger.exec_take must be positive".to_string(),
            ));
        }
        if self.web.dashboard_take <= 0 {
            return Err(ConfigError::ValidationError(
                "web.dashboard_take must be positive".to_string(),
            ));
        }
        if self.logging.file_prefix.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "logging.file_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
