use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use configuration::Config;
use core_types::{AccountScope, StrategyKind};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod logging;
mod render;

/// The main entry point for the TradeLedger command-line tool.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let config = match configuration::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(1);
        }
    };

    let _guard = match logging::init(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {e:#}");
            return ExitCode::from(1);
        }
    };

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::from(commands::exit_code(&e))
        }
    }
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    if let Commands::Serve = cli.command {
        return web_server::run_server(config).await;
    }

    let pool = database::connect().await.context("connecting to the database")?;
    database::run_migrations(&pool).await.context("running migrations")?;
    let ctx = commands::Context {
        repo: database::DbRepository::new(pool),
        config,
    };

    match cli.command {
        Commands::Import { scope, file } => ctx.import(&ctx.scope(scope), &file).await,
        Commands::Reset { scope, file, force } => ctx.reset(&ctx.scope(scope), &file, force).await,
        Commands::ListExec { scope, take } => ctx.list_exec(&ctx.scope(scope), take).await,
        Commands::ScanOptions { scope, take } => ctx.scan_options(&ctx.scope(scope), take).await,
        Commands::GroupSpreads { scope } => ctx.group(&ctx.scope(scope), StrategyKind::CreditSpread).await,
        Commands::GroupBwb { scope } => ctx.group(&ctx.scope(scope), StrategyKind::Bwb).await,
        Commands::ListGroups {
            scope,
            strategy,
            open_only,
            take,
        } => ctx.list_groups(ctx.scope(scope), strategy, open_only, take).await,
        Commands::ListGroupExec { group } => ctx.list_group_exec(group).await,
        Commands::ClearGroups { account, broker } => {
            let scope = account.map(|account| ctx.scope(ScopeArgs { account, broker }));
            ctx.clear_groups(scope.as_ref()).await
        }
        Commands::RefreshMetrics { scope, net_plus_fees } => {
            ctx.refresh_metrics(&ctx.scope(scope), net_plus_fees).await
        }
        Commands::StatsDte { scope } => ctx.stats_dte(&ctx.scope(scope)).await,
        Commands::StatsDaily { scope } => ctx.stats_daily(&ctx.scope(scope)).await,
        Commands::Serve => Ok(()),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Reconstructs multi-leg option trades from broker exports and reports their P&L.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ScopeArgs {
    /// Account label the executions were imported under.
    #[arg(long)]
    account: String,

    /// Broker name; defaults to `ledger.default_broker`.
    #[arg(long)]
    broker: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a Schwab transactions CSV. Rows already imported are skipped.
    Import {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        file: PathBuf,
    },
    /// Delete every execution and group of the account, re-import and regroup spreads.
    Reset {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        file: PathBuf,
        /// Required; the reset deletes data.
        #[arg(long)]
        force: bool,
    },
    /// Show the most recent executions.
    ListExec {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        take: Option<i64>,
    },
    /// Show how recent execution symbols parse as option contracts.
    ScanOptions {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        take: Option<i64>,
    },
    /// Group vertical credit spreads.
    GroupSpreads {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Group broken-wing butterflies.
    GroupBwb {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// List trade groups with risk and return figures, newest first.
    ListGroups {
        #[command(flatten)]
        scope: ScopeArgs,
        /// CreditSpread or BWB.
        #[arg(long)]
        strategy: Option<StrategyKind>,
        #[arg(long)]
        open_only: bool,
        #[arg(long)]
        take: Option<i64>,
    },
    /// Show the executions linked to one group.
    ListGroupExec {
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..))]
        group: i64,
    },
    /// Delete trade groups (all of them, or one account's). Executions are kept.
    ClearGroups {
        #[arg(long)]
        account: Option<String>,
        #[arg(long)]
        broker: Option<String>,
    },
    /// Recompute NetPL, GrossReturn and CloseDate of every group from its links.
    RefreshMetrics {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Use NetPL + fees for GrossReturn instead of the configured formula.
        #[arg(long)]
        net_plus_fees: bool,
    },
    /// Closed-trade statistics by days-to-expiration bucket.
    StatsDte {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Closed-trade statistics by weekday of the close date.
    StatsDaily {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Serve the dashboard API.
    Serve,
}

impl commands::Context {
    fn scope(&self, args: ScopeArgs) -> AccountScope {
        AccountScope::new(
            args.broker.unwrap_or_else(|| self.config.ledger.default_broker.clone()),
            args.account,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn list_groups_parses_strategy_and_flags() {
        let cli = Cli::try_parse_from([
            "tradeledger", "list-groups", "--account", "A1", "--strategy", "BWB", "--open-only", "--take", "5",
        ])
        .unwrap();
        match cli.command {
            Commands::ListGroups {
                scope,
                strategy,
                open_only,
                take,
            } => {
                assert_eq!(scope.account, "A1");
                assert_eq!(scope.broker, None);
                assert_eq!(strategy, Some(StrategyKind::Bwb));
                assert!(open_only);
                assert_eq!(take, Some(5));
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn group_id_must_be_positive() {
        assert!(Cli::try_parse_from(["tradeledger", "list-group-exec", "--group", "0"]).is_err());
        assert!(Cli::try_parse_from(["tradeledger", "list-group-exec", "--group", "7"]).is_ok());
    }
}
