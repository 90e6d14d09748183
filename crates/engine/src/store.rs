use crate::error::StoreError;
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{
    AccountScope, ButterflyStrikes, ContractFamily, Execution, GroupMetrics, GroupShape,
    NewExecution, SpreadKey, TradeGroup,
};
use database::{DbError, DbRepository};
use std::collections::BTreeSet;

/// Everything a grouping pass needs from persistence.
///
/// `DbRepository` is the production implementation. Each method is its own
/// unit of work; a pass never holds a transaction across calls.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Inserts executions, skipping fingerprints already stored for their
    /// (broker, account). Returns how many rows were new.
    async fn insert_executions(&self, executions: &[NewExecution]) -> Result<u64, StoreError>;

    /// Every execution of a scope, ordered by time then id.
    async fn scope_executions(&self, scope: &AccountScope) -> Result<Vec<Execution>, StoreError>;

    async fn spread_keys(&self, scope: &AccountScope) -> Result<BTreeSet<SpreadKey>, StoreError>;

    async fn butterfly_strikes(&self, scope: &AccountScope) -> Result<Vec<ButterflyStrikes>, StoreError>;

    /// Persists a group (and its legs) and returns the new id.
    async fn create_group(
        &self,
        scope: &AccountScope,
        family: &ContractFamily,
        open_date: NaiveDate,
        shape: &GroupShape,
    ) -> Result<i64, StoreError>;

    /// Links executions to a group; existing links are left alone. Returns how
    /// many links were new.
    async fn link_executions(&self, group_id: i64, execution_ids: &[i64]) -> Result<u64, StoreError>;

    async fn group_executions(&self, group_id: i64) -> Result<Vec<Execution>, StoreError>;

    async fn update_metrics(&self, group_id: i64, metrics: &GroupMetrics) -> Result<(), StoreError>;

    async fn scope_groups(&self, scope: &AccountScope) -> Result<Vec<TradeGroup>, StoreError>;
}

#[async_trait]
impl LedgerStore for DbRepository {
    async fn insert_executions(&self, executions: &[NewExecution]) -> Result<u64, StoreError> {
        Ok(DbRepository::insert_executions(self, executions).await?)
    }

    async fn scope_executions(&self, scope: &AccountScope) -> Result<Vec<Execution>, StoreError> {
        Ok(DbRepository::scope_executions(self, scope).await?)
    }

    async fn spread_keys(&self, scope: &AccountScope) -> Result<BTreeSet<SpreadKey>, StoreError> {
        Ok(DbRepository::spread_keys(self, scope).await?)
    }

    async fn butterfly_strikes(&self, scope: &AccountScope) -> Result<Vec<ButterflyStrikes>, StoreError> {
        Ok(DbRepository::butterfly_strikes(self, scope).await?)
    }

    async fn create_group(
        &self,
        scope: &AccountScope,
        family: &ContractFamily,
        open_date: NaiveDate,
        shape: &GroupShape,
    ) -> Result<i64, StoreError> {
        Ok(DbRepository::create_group(self, scope, family, open_date, shape).await?)
    }

    async fn link_executions(&self, group_id: i64, execution_ids: &[i64]) -> Result<u64, StoreError> {
        Ok(DbRepository::link_executions(self, group_id, execution_ids).await?)
    }

    async fn group_executions(&self, group_id: i64) -> Result<Vec<Execution>, StoreError> {
        Ok(DbRepository::group_executions(self, group_id).await?)
    }

    async fn update_metrics(&self, group_id: i64, metrics: &GroupMetrics) -> Result<(), StoreError> {
        match DbRepository::update_metrics(self, group_id, metrics).await {
            Err(DbError::NotFound) => Err(StoreError::GroupNotFound(group_id)),
            other => Ok(other?),
        }
    }

    async fn scope_groups(&self, scope: &AccountScope) -> Result<Vec<TradeGroup>, StoreError> {
        Ok(DbRepository::scope_groups(self, scope).await?)
    }
}
