use crate::render;
use analytics::RiskProfile;
use anyhow::Context as _;
use configuration::Config;
use core_types::{AccountScope, GrossReturnMode, StrategyKind};
use database::{DbError, DbRepository, GroupFilter};
use engine::{EngineError, GroupingPass, IngestSummary, PassSummary};
use importer::{ImportError, SchwabCsvImporter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures that map to a dedicated process exit code.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("CSV file not found: {0}")]
    MissingFile(PathBuf),
}

/// 2 for usage errors, 4 for a missing CSV file, 1 for everything else.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(cli) = cause.downcast_ref::<CliError>() {
            return match cli {
                CliError::Usage(_) => 2,
                CliError::MissingFile(_) => 4,
            };
        }
        if let Some(ImportError::FileNotFound(_)) = cause.downcast_ref::<ImportError>() {
            return 4;
        }
        if let Some(EngineError::Import(ImportError::FileNotFound(_))) = cause.downcast_ref::<EngineError>() {
            return 4;
        }
    }
    1
}

/// What every command runs against.
pub struct Context {
    pub repo: DbRepository,
    pub config: Config,
}

impl Context {
    fn importer(&self, scope: &AccountScope) -> SchwabCsvImporter {
        SchwabCsvImporter::new(scope.broker.clone())
    }

    pub async fn import(&self, scope: &AccountScope, file: &Path) -> anyhow::Result<()> {
        let summary = engine::import_file(&self.repo, &self.importer(scope), &scope.account, file).await?;
        print_ingest(&summary);
        Ok(())
    }

    /// Clears the scope, re-imports `file` and regroups spreads with the
    /// NetPL + fees gross return.
    pub async fn reset(&self, scope: &AccountScope, file: &Path, force: bool) -> anyhow::Result<()> {
        if !force {
            return Err(CliError::Usage(
                "refusing to run without --force; reset deletes every execution and group of the account".to_string(),
            )
            .into());
        }
        if !file.is_file() {
            return Err(CliError::MissingFile(file.to_path_buf()).into());
        }

        println!("RESET: clearing data for {scope}...");
        let cleared = self.repo.clear_scope(scope).await.context("clearing the account")?;
        println!(
            "Deleted {} links, {} legs, {} groups, {} executions.",
            cleared.links, cleared.legs, cleared.groups, cleared.executions
        );

        self.import(scope, file).await?;

        let pass = GroupingPass::new(StrategyKind::CreditSpread, GrossReturnMode::NetPlusFees);
        print_pass(&pass.run(&self.repo, scope).await?);
        Ok(())
    }

    pub async fn list_exec(&self, scope: &AccountScope, take: Option<i64>) -> anyhow::Result<()> {
        let rows = self
            .repo
            .recent_executions(scope, take_or(take, self.config.ledger.exec_take)?)
            .await?;
        println!("{}", render::executions(&rows));
        Ok(())
    }

    pub async fn scan_options(&self, scope: &AccountScope, take: Option<i64>) -> anyhow::Result<()> {
        let rows = self
            .repo
            .recent_executions(scope, take_or(take, self.config.ledger.exec_take)?)
            .await?;
        println!("{}", render::option_scan(&rows));
        Ok(())
    }

    pub async fn group(&self, scope: &AccountScope, kind: StrategyKind) -> anyhow::Result<()> {
        let pass = GroupingPass::new(kind, self.config.ledger.gross_return);
        print_pass(&pass.run(&self.repo, scope).await?);
        Ok(())
    }

    pub async fn list_groups(
        &self,
        scope: AccountScope,
        kind: Option<StrategyKind>,
        open_only: bool,
        take: Option<i64>,
    ) -> anyhow::Result<()> {
        let filter = GroupFilter {
            scope,
            kind,
            open_only,
            take: take_or(take, self.config.ledger.list_take)?,
        };
        let groups = self.repo.list_groups(&filter).await?;
        if groups.is_empty() {
            println!("No trade groups found.");
            return Ok(());
        }

        let ids: Vec<i64> = groups.iter().map(|g| g.id).collect();
        let mut executions = self.repo.executions_for_groups(&ids).await?;

        let rows: Vec<_> = groups
            .into_iter()
            .map(|g| {
                let linked = executions.remove(&g.id).unwrap_or_default();
                let risk = RiskProfile::evaluate(&g, &linked);
                if risk.has_suspect_credit(&g) {
                    tracing::warn!(group_id = g.id, "Group closed with zero entry credit (check import/signs)");
                }
                (g, risk)
            })
            .collect();

        println!("{}", render::groups(&rows));
        println!("Rows: {}", rows.len());
        Ok(())
    }

    pub async fn list_group_exec(&self, group_id: i64) -> anyhow::Result<()> {
        let group = match self.repo.get_group(group_id).await {
            Ok(group) => group,
            Err(DbError::NotFound) => {
                println!("TradeGroup not found: {group_id}");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let rows = self.repo.group_executions(group_id).await?;

        println!(
            "TradeGroup {} | {} {} | {} | Open={} Close={} | NetPL={:.2}",
            group.id,
            group.kind(),
            group.family,
            group.strikes_label(),
            group.open_date,
            group.close_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
            group.net_pl,
        );
        println!("{}", render::group_executions(&rows));
        println!("Rows: {}", rows.len());
        Ok(())
    }

    pub async fn clear_groups(&self, scope: Option<&AccountScope>) -> anyhow::Result<()> {
        let cleared = self.repo.clear_groups(scope).await?;
        match scope {
            Some(scope) => println!("Cleared {} trade groups for {scope}.", cleared.groups),
            None => println!("Cleared ALL {} trade groups + links + legs.", cleared.groups),
        }
        Ok(())
    }

    pub async fn refresh_metrics(&self, scope: &AccountScope, net_plus_fees: bool) -> anyhow::Result<()> {
        let mode = if net_plus_fees {
            GrossReturnMode::NetPlusFees
        } else {
            self.config.ledger.gross_return
        };
        let updated = engine::refresh_metrics(&self.repo, scope, mode).await?;
        println!("Groups refreshed: {updated}");
        Ok(())
    }

    pub async fn stats_dte(&self, scope: &AccountScope) -> anyhow::Result<()> {
        let groups = self.repo.scope_groups(scope).await?;
        let buckets = analytics::by_dte_bucket(&groups);
        if buckets.is_empty() {
            println!("No CLOSED trade groups found.");
            return Ok(());
        }
        println!("DTE Bucket Stats (closed trades)");
        println!("{}", render::dte_buckets(&buckets));
        Ok(())
    }

    pub async fn stats_daily(&self, scope: &AccountScope) -> anyhow::Result<()> {
        let groups = self.repo.scope_groups(scope).await?;
        let days = analytics::by_close_weekday(&groups);
        if days.is_empty() {
            println!("No CLOSED trade groups found.");
            return Ok(());
        }
        println!("Weekday Stats (closed trades)");
        println!("{}", render::weekdays(&days));
        Ok(())
    }
}

fn take_or(take: Option<i64>, default: i64) -> Result<i64, CliError> {
    match take {
        Some(t) if t <= 0 => Err(CliError::Usage(format!("--take must be positive, got {t}"))),
        Some(t) => Ok(t),
        None => Ok(default),
    }
}

fn print_ingest(summary: &IngestSummary) {
    println!("Import: {}", summary.source_file);
    println!("Rows read: {}", summary.rows_read);
    println!("Executions parsed: {}", summary.executions_parsed);
    println!("Executions inserted: {}", summary.inserted);
    println!("Already imported: {}", summary.already_present);
    if summary.blank_fingerprints > 0 {
        println!("Dropped without fingerprint: {}", summary.blank_fingerprints);
    }
    for warning in &summary.warnings {
        println!("WARNING: {warning}");
    }
}

fn print_pass(summary: &PassSummary) {
    println!("Candidates found: {}", summary.candidates);
    println!("TradeGroups created: {}", summary.groups_created);
    println!("Execution links created: {}", summary.links_created);
    println!("Duplicates skipped: {}", summary.duplicates_skipped);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_the_failure_kind() {
        assert_eq!(exit_code(&CliError::Usage("x".into()).into()), 2);
        assert_eq!(exit_code(&CliError::MissingFile("a.csv".into()).into()), 4);

        let engine_err = EngineError::Import(ImportError::FileNotFound("a.csv".into()));
        assert_eq!(exit_code(&anyhow::Error::from(engine_err)), 4);

        assert_eq!(exit_code(&anyhow::anyhow!("boom")), 1);
    }

    #[test]
    fn wrapped_errors_keep_their_code() {
        let err = anyhow::Error::from(CliError::Usage("x".into())).context("while resetting");
        assert_eq!(exit_code(&err), 2);
    }

    #[test]
    fn take_defaults_and_rejects_non_positive() {
        assert_eq!(take_or(None, 25).unwrap(), 25);
        assert_eq!(take_or(Some(3), 25).unwrap(), 3);
        assert!(matches!(take_or(Some(0), 25), Err(CliError::Usage(_))));
    }
}
