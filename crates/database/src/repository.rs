use crate::DbError;
use chrono::NaiveDate;
use core_types::{
    AccountScope, ButterflyStrikes, ContractFamily, Execution, GroupLeg, GroupMetrics, GroupShape, LegRole,
    NewExecution, OptionRight, SpreadKey, StrategyKind, TradeGroup,
};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{FromRow, Transaction};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

const EXECUTION_COLUMNS: &str = "e.id, e.fingerprint, e.broker, e.account, e.executed_at, e.symbol, e.description, \
     e.action, e.quantity, e.price, e.fees, e.net_amount, e.currency, e.source_file, e.source_row";

const GROUP_COLUMNS: &str = "g.id, g.broker, g.account, g.strategy_kind, g.underlying, g.expiration, g.option_right, \
     g.short_strike, g.long_strike, g.open_date, g.close_date, g.net_pl, g.gross_return";

/// A row from the `trade_groups` table, before legs are attached.
#[derive(Debug, Clone, FromRow)]
pub struct DbTradeGroup {
    pub id: i64,
    pub broker: String,
    pub account: String,
    pub strategy_kind: String,
    pub underlying: String,
    pub expiration: NaiveDate,
    pub option_right: String,
    pub short_strike: Option<Decimal>,
    pub long_strike: Option<Decimal>,
    pub open_date: NaiveDate,
    pub close_date: Option<NaiveDate>,
    pub net_pl: Decimal,
    pub gross_return: Decimal,
}

/// A row from the `trade_group_legs` table.
#[derive(Debug, Clone, FromRow)]
pub struct DbGroupLeg {
    pub trade_group_id: i64,
    pub strike: Decimal,
    pub quantity: Decimal,
    pub role: String,
}

/// An execution joined with the group it is linked to.
#[derive(Debug, Clone, FromRow)]
struct DbLinkedExecution {
    trade_group_id: i64,
    #[sqlx(flatten)]
    execution: Execution,
}

impl DbTradeGroup {
    /// Rebuilds the domain group. Butterfly rows need their legs, spreads ignore them.
    pub fn into_trade_group(self, legs: Vec<DbGroupLeg>) -> Result<TradeGroup, DbError> {
        let kind = StrategyKind::from_str(&self.strategy_kind)
            .map_err(|e| DbError::InvalidData(format!("trade group {}: {e}", self.id)))?;
        let right = OptionRight::from_str(&self.option_right)
            .map_err(|e| DbError::InvalidData(format!("trade group {}: {e}", self.id)))?;

        let shape = match kind {
            StrategyKind::CreditSpread => match (self.short_strike, self.long_strike) {
                (Some(short_strike), Some(long_strike)) => GroupShape::CreditSpread {
                    short_strike,
                    long_strike,
                },
                _ => {
                    return Err(DbError::InvalidData(format!(
                        "credit spread {} is missing a strike",
                        self.id
                    )));
                }
            },
            StrategyKind::Bwb => {
                let mut group_legs = Vec::with_capacity(legs.len());
                for leg in legs {
                    let role = LegRole::from_str(&leg.role)
                        .map_err(|e| DbError::InvalidData(format!("trade group {}: {e}", self.id)))?;
                    group_legs.push(GroupLeg {
                        strike: leg.strike,
                        quantity: leg.quantity,
                        role,
                    });
                }
                group_legs.sort_by_key(|l| l.strike);
                GroupShape::Butterfly { legs: group_legs }
            }
        };

        Ok(TradeGroup {
            id: self.id,
            broker: self.broker,
            account: self.account,
            family: ContractFamily {
                underlying: self.underlying,
                expiration: self.expiration,
                right,
            },
            open_date: self.open_date,
            close_date: self.close_date,
            net_pl: self.net_pl,
            gross_return: self.gross_return,
            shape,
        })
    }
}

/// Which groups `list_groups` returns.
#[derive(Debug, Clone)]
pub struct GroupFilter {
    pub scope: AccountScope,
    pub kind: Option<StrategyKind>,
    pub open_only: bool,
    pub take: i64,
}

/// Row counts removed by a clear operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearedRows {
    pub links: u64,
    pub legs: u64,
    pub groups: u64,
    pub executions: u64,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==========================================================================
    // Executions
    // ==========================================================================

    /// Inserts a batch of executions within a single transaction.
    ///
    /// Rows whose fingerprint already exists for the same (broker, account) are
    /// skipped. Returns how many rows were actually inserted.
    pub async fn insert_executions(&self, executions: &[NewExecution]) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for execution in executions {
            let result = sqlx::query(
                r#"
                INSERT INTO executions (
                    fingerprint, broker, account, executed_at, symbol, description, action,
                    quantity, price, fees, net_amount, currency, source_file, source_row, raw_row
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                ON CONFLICT (broker, account, fingerprint) DO NOTHING
                "#,
            )
            .bind(&execution.fingerprint)
            .bind(&execution.broker)
            .bind(&execution.account)
            .bind(execution.executed_at)
            .bind(&execution.symbol)
            .bind(&execution.description)
            .bind(&execution.action)
            .bind(execution.quantity)
            .bind(execution.price)
            .bind(execution.fees)
            .bind(execution.net_amount)
            .bind(&execution.currency)
            .bind(&execution.source_file)
            .bind(execution.source_row)
            .bind(&execution.raw_row)
            .execute(&mut *tx) // Note: must use the transaction object `tx` here
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Every execution of a scope, oldest first.
    pub async fn scope_executions(&self, scope: &AccountScope) -> Result<Vec<Execution>, DbError> {
        let sql = format!(
            "SELECT {EXECUTION_COLUMNS} FROM executions AS e \
             WHERE e.broker = $1 AND e.account = $2 ORDER BY e.executed_at ASC, e.id ASC"
        );
        let executions = sqlx::query_as::<_, Execution>(&sql)
            .bind(&scope.broker)
            .bind(&scope.account)
            .fetch_all(&self.pool)
            .await?;
        Ok(executions)
    }

    /// The most recent executions of a scope, newest first.
    pub async fn recent_executions(&self, scope: &AccountScope, take: i64) -> Result<Vec<Execution>, DbError> {
        let sql = format!(
            "SELECT {EXECUTION_COLUMNS} FROM executions AS e \
             WHERE e.broker = $1 AND e.account = $2 ORDER BY e.executed_at DESC, e.id DESC LIMIT $3"
        );
        let executions = sqlx::query_as::<_, Execution>(&sql)
            .bind(&scope.broker)
            .bind(&scope.account)
            .bind(take)
            .fetch_all(&self.pool)
            .await?;
        Ok(executions)
    }

    // ==========================================================================
    // Natural keys of existing groups
    // ==========================================================================

    /// (family, short, long) of every credit spread in a scope, open date ignored.
    pub async fn spread_keys(&self, scope: &AccountScope) -> Result<BTreeSet<SpreadKey>, DbError> {
        let groups = self.scope_groups_of_kind(scope, Some(StrategyKind::CreditSpread)).await?;
        Ok(groups
            .into_iter()
            .filter_map(|g| match g.shape {
                GroupShape::CreditSpread {
                    short_strike,
                    long_strike,
                } => Some(SpreadKey {
                    family: g.family,
                    short_strike,
                    long_strike,
                }),
                GroupShape::Butterfly { .. } => None,
            })
            .collect())
    }

    /// Leg strike sets of every butterfly in a scope.
    pub async fn butterfly_strikes(&self, scope: &AccountScope) -> Result<Vec<ButterflyStrikes>, DbError> {
        let groups = self.scope_groups_of_kind(scope, Some(StrategyKind::Bwb)).await?;
        Ok(groups
            .into_iter()
            .map(|g| ButterflyStrikes {
                strikes: g.shape.strikes().into_iter().collect(),
                family: g.family,
                open_date: g.open_date,
            })
            .collect())
    }

    // ==========================================================================
    // Groups and links
    // ==========================================================================

    /// Inserts a group and, for butterflies, its legs in one transaction.
    pub async fn create_group(
        &self,
        scope: &AccountScope,
        family: &ContractFamily,
        open_date: NaiveDate,
        shape: &GroupShape,
    ) -> Result<i64, DbError> {
        let (short_strike, long_strike) = match shape {
            GroupShape::CreditSpread {
                short_strike,
                long_strike,
            } => (Some(*short_strike), Some(*long_strike)),
            GroupShape::Butterfly { .. } => (None, None),
        };

        let mut tx: Transaction<Postgres> = self.pool.begin().await?;

        let group_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO trade_groups (
                broker, account, strategy_kind, underlying, expiration, option_right,
                short_strike, long_strike, open_date
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&scope.broker)
        .bind(&scope.account)
        .bind(shape.kind().as_str())
        .bind(&family.underlying)
        .bind(family.expiration)
        .bind(family.right.as_str())
        .bind(short_strike)
        .bind(long_strike)
        .bind(open_date)
        .fetch_one(&mut *tx)
        .await?;

        if let GroupShape::Butterfly { legs } = shape {
            for leg in legs {
                sqlx::query(
                    r#"
                    INSERT INTO trade_group_legs (
                        trade_group_id, underlying, expiration, option_right, strike, quantity, role
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(group_id)
                .bind(&family.underlying)
                .bind(family.expiration)
                .bind(family.right.as_str())
                .bind(leg.strike)
                .bind(leg.quantity)
                .bind(leg.role.as_str())
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(group_id)
    }

    /// Links executions to a group in one transaction. Existing links are kept.
    ///
    /// Returns how many links were new.
    pub async fn link_executions(&self, group_id: i64, execution_ids: &[i64]) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for execution_id in execution_ids {
            let result = sqlx::query(
                "INSERT INTO trade_group_executions (trade_group_id, execution_id) VALUES ($1, $2) \
                 ON CONFLICT (trade_group_id, execution_id) DO NOTHING",
            )
            .bind(group_id)
            .bind(execution_id)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Executions linked to a group, oldest first.
    pub async fn group_executions(&self, group_id: i64) -> Result<Vec<Execution>, DbError> {
        let sql = format!(
            "SELECT {EXECUTION_COLUMNS} FROM trade_group_executions AS l \
             JOIN executions AS e ON e.id = l.execution_id \
             WHERE l.trade_group_id = $1 ORDER BY e.executed_at ASC, e.id ASC"
        );
        let executions = sqlx::query_as::<_, Execution>(&sql)
            .bind(group_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(executions)
    }

    /// Linked executions of many groups at once, keyed by group id.
    pub async fn executions_for_groups(&self, group_ids: &[i64]) -> Result<BTreeMap<i64, Vec<Execution>>, DbError> {
        let sql = format!(
            "SELECT l.trade_group_id, {EXECUTION_COLUMNS} FROM trade_group_executions AS l \
             JOIN executions AS e ON e.id = l.execution_id \
             WHERE l.trade_group_id = ANY($1) ORDER BY e.executed_at ASC, e.id ASC"
        );
        let rows = sqlx::query_as::<_, DbLinkedExecution>(&sql)
            .bind(group_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut by_group: BTreeMap<i64, Vec<Execution>> = BTreeMap::new();
        for row in rows {
            by_group.entry(row.trade_group_id).or_default().push(row.execution);
        }
        Ok(by_group)
    }

    /// Overwrites the derived fields of a group.
    pub async fn update_metrics(&self, group_id: i64, metrics: &GroupMetrics) -> Result<(), DbError> {
        let result = sqlx::query("UPDATE trade_groups SET net_pl = $1, gross_return = $2, close_date = $3 WHERE id = $4")
            .bind(metrics.net_pl)
            .bind(metrics.gross_return)
            .bind(metrics.close_date)
            .bind(group_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    // ==========================================================================
    // Group reads
    // ==========================================================================

    /// Every group of a scope, oldest open date first.
    pub async fn scope_groups(&self, scope: &AccountScope) -> Result<Vec<TradeGroup>, DbError> {
        self.scope_groups_of_kind(scope, None).await
    }

    async fn scope_groups_of_kind(
        &self,
        scope: &AccountScope,
        kind: Option<StrategyKind>,
    ) -> Result<Vec<TradeGroup>, DbError> {
        let sql = format!(
            "SELECT {GROUP_COLUMNS} FROM trade_groups AS g \
             WHERE g.broker = $1 AND g.account = $2 AND ($3::TEXT IS NULL OR g.strategy_kind = $3) \
             ORDER BY g.open_date ASC, g.id ASC"
        );
        let rows = sqlx::query_as::<_, DbTradeGroup>(&sql)
            .bind(&scope.broker)
            .bind(&scope.account)
            .bind(kind.map(|k| k.as_str()))
            .fetch_all(&self.pool)
            .await?;
        self.attach_legs(rows).await
    }

    /// Groups matching `filter`, newest open date first.
    pub async fn list_groups(&self, filter: &GroupFilter) -> Result<Vec<TradeGroup>, DbError> {
        let sql = format!(
            "SELECT {GROUP_COLUMNS} FROM trade_groups AS g \
             WHERE g.broker = $1 AND g.account = $2 \
               AND ($3::TEXT IS NULL OR g.strategy_kind = $3) \
               AND (NOT $4 OR g.close_date IS NULL) \
             ORDER BY g.open_date DESC, g.id DESC LIMIT $5"
        );
        let rows = sqlx::query_as::<_, DbTradeGroup>(&sql)
            .bind(&filter.scope.broker)
            .bind(&filter.scope.account)
            .bind(filter.kind.map(|k| k.as_str()))
            .bind(filter.open_only)
            .bind(filter.take)
            .fetch_all(&self.pool)
            .await?;
        self.attach_legs(rows).await
    }

    /// Fetches a single group by id.
    pub async fn get_group(&self, group_id: i64) -> Result<TradeGroup, DbError> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM trade_groups AS g WHERE g.id = $1");
        let row = sqlx::query_as::<_, DbTradeGroup>(&sql)
            .bind(group_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| if let sqlx::Error::RowNotFound = e { DbError::NotFound } else { e.into() })?;

        self.attach_legs(vec![row]).await?.pop().ok_or(DbError::NotFound)
    }

    async fn attach_legs(&self, rows: Vec<DbTradeGroup>) -> Result<Vec<TradeGroup>, DbError> {
        let butterfly_ids: Vec<i64> = rows
            .iter()
            .filter(|r| r.strategy_kind == StrategyKind::Bwb.as_str())
            .map(|r| r.id)
            .collect();

        let mut legs_by_group: BTreeMap<i64, Vec<DbGroupLeg>> = BTreeMap::new();
        if !butterfly_ids.is_empty() {
            let legs = sqlx::query_as::<_, DbGroupLeg>(
                "SELECT trade_group_id, strike, quantity, role FROM trade_group_legs \
                 WHERE trade_group_id = ANY($1) ORDER BY trade_group_id, strike",
            )
            .bind(&butterfly_ids)
            .fetch_all(&self.pool)
            .await?;
            for leg in legs {
                legs_by_group.entry(leg.trade_group_id).or_default().push(leg);
            }
        }

        rows.into_iter()
            .map(|row| {
                let legs = legs_by_group.remove(&row.id).unwrap_or_default();
                row.into_trade_group(legs)
            })
            .collect()
    }

    // ==========================================================================
    // Clearing
    // ==========================================================================

    /// Deletes links, legs and groups of one scope, or of every scope when `scope` is `None`.
    pub async fn clear_groups(&self, scope: Option<&AccountScope>) -> Result<ClearedRows, DbError> {
        let (broker, account) = match scope {
            Some(s) => (Some(s.broker.as_str()), Some(s.account.as_str())),
            None => (None, None),
        };
        const IN_SCOPE: &str = "SELECT id FROM trade_groups \
             WHERE ($1::TEXT IS NULL OR broker = $1) AND ($2::TEXT IS NULL OR account = $2)";

        let mut tx = self.pool.begin().await?;

        let links = sqlx::query(&format!(
            "DELETE FROM trade_group_executions WHERE trade_group_id IN ({IN_SCOPE})"
        ))
        .bind(broker)
        .bind(account)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let legs = sqlx::query(&format!("DELETE FROM trade_group_legs WHERE trade_group_id IN ({IN_SCOPE})"))
            .bind(broker)
            .bind(account)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let groups = sqlx::query(
            "DELETE FROM trade_groups WHERE ($1::TEXT IS NULL OR broker = $1) AND ($2::TEXT IS NULL OR account = $2)",
        )
        .bind(broker)
        .bind(account)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        tracing::info!(links, legs, groups, "Cleared trade groups");

        Ok(ClearedRows {
            links,
            legs,
            groups,
            executions: 0,
        })
    }

    /// Deletes every group and every execution of a scope.
    pub async fn clear_scope(&self, scope: &AccountScope) -> Result<ClearedRows, DbError> {
        let mut cleared = self.clear_groups(Some(scope)).await?;

        cleared.executions = sqlx::query("DELETE FROM executions WHERE broker = $1 AND account = $2")
            .bind(&scope.broker)
            .bind(&scope.account)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(scope = %scope, executions = cleared.executions, "Cleared executions");
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(kind: &str, short: Option<Decimal>, long: Option<Decimal>) -> DbTradeGroup {
        DbTradeGroup {
            id: 42,
            broker: "Schwab".to_string(),
            account: "A1".to_string(),
            strategy_kind: kind.to_string(),
            underlying: "SPX".to_string(),
            expiration: NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
            option_right: "Put".to_string(),
            short_strike: short,
            long_strike: long,
            open_date: NaiveDate::from_ymd_opt(2026, 3, 13).unwrap(),
            close_date: None,
            net_pl: dec!(12.5),
            gross_return: dec!(20),
        }
    }

    fn leg(strike: Decimal, quantity: Decimal, role: &str) -> DbGroupLeg {
        DbGroupLeg {
            trade_group_id: 42,
            strike,
            quantity,
            role: role.to_string(),
        }
    }

    #[test]
    fn credit_spread_row_becomes_spread_shape() {
        let group = row("CreditSpread", Some(dec!(5000)), Some(dec!(4950)))
            .into_trade_group(vec![])
            .unwrap();
        assert_eq!(group.family.right, OptionRight::Put);
        assert_eq!(
            group.shape,
            GroupShape::CreditSpread {
                short_strike: dec!(5000),
                long_strike: dec!(4950)
            }
        );
        assert_eq!(group.net_pl, dec!(12.5));
    }

    #[test]
    fn butterfly_row_takes_sorted_legs() {
        let legs = vec![
            leg(dec!(100), dec!(1), "Wing"),
            leg(dec!(85), dec!(1), "Wing"),
            leg(dec!(90), dec!(-2), "Body"),
        ];
        let group = row("BWB", None, None).into_trade_group(legs).unwrap();
        assert_eq!(group.kind(), StrategyKind::Bwb);
        assert_eq!(group.shape.strikes(), vec![dec!(85), dec!(90), dec!(100)]);
    }

    #[test]
    fn corrupt_rows_are_rejected() {
        assert!(matches!(
            row("CreditSpread", Some(dec!(5000)), None).into_trade_group(vec![]),
            Err(DbError::InvalidData(_))
        ));
        assert!(matches!(
            row("IronCondor", None, None).into_trade_group(vec![]),
            Err(DbError::InvalidData(_))
        ));
        assert!(matches!(
            row("BWB", None, None).into_trade_group(vec![leg(dec!(85), dec!(1), "Tail")]),
            Err(DbError::InvalidData(_))
        ));
    }

    #[test]
    fn filter_carries_listing_options() {
        let filter = GroupFilter {
            scope: AccountScope::new("Schwab", "A1"),
            kind: Some(StrategyKind::CreditSpread),
            open_only: true,
            take: 25,
        };
        assert_eq!(filter.kind.map(|k| k.as_str()), Some("CreditSpread"));
        assert_eq!(ClearedRows::default().groups, 0);
    }
}
