//! In-memory `LedgerStore` for pass tests.

use crate::error::StoreError;
use crate::store::LedgerStore;
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{
    AccountScope, ButterflyStrikes, ContractFamily, Execution, GroupMetrics, GroupShape,
    NewExecution, SpreadKey, TradeGroup,
};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use tokio::sync::Mutex;

#[derive(Default)]
struct State {
    executions: Vec<Execution>,
    groups: Vec<TradeGroup>,
    links: BTreeSet<(i64, i64)>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub async fn groups(&self) -> Vec<TradeGroup> {
        self.state.lock().await.groups.clone()
    }

    pub async fn link_count(&self) -> usize {
        self.state.lock().await.links.len()
    }
}

fn in_scope(broker: &str, account: &str, scope: &AccountScope) -> bool {
    broker == scope.broker && account == scope.account
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert_executions(&self, executions: &[NewExecution]) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let mut inserted = 0;
        for new in executions {
            let exists = state.executions.iter().any(|e| {
                e.broker == new.broker && e.account == new.account && e.fingerprint == new.fingerprint
            });
            if !exists {
                let id = state.executions.len() as i64 + 1;
                state.executions.push(new.clone().into_execution(id));
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn scope_executions(&self, scope: &AccountScope) -> Result<Vec<Execution>, StoreError> {
        let state = self.state.lock().await;
        let mut executions: Vec<_> = state
            .executions
            .iter()
            .filter(|e| in_scope(&e.broker, &e.account, scope))
            .cloned()
            .collect();
        executions.sort_by_key(|e| (e.executed_at, e.id));
        Ok(executions)
    }

    async fn spread_keys(&self, scope: &AccountScope) -> Result<BTreeSet<SpreadKey>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .groups
            .iter()
            .filter(|g| in_scope(&g.broker, &g.account, scope))
            .filter_map(|g| match g.shape {
                GroupShape::CreditSpread {
                    short_strike,
                    long_strike,
                } => Some(SpreadKey {
                    family: g.family.clone(),
                    short_strike,
                    long_strike,
                }),
                GroupShape::Butterfly { .. } => None,
            })
            .collect())
    }

    async fn butterfly_strikes(&self, scope: &AccountScope) -> Result<Vec<ButterflyStrikes>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .groups
            .iter()
            .filter(|g| in_scope(&g.broker, &g.account, scope))
            .filter_map(|g| match &g.shape {
                GroupShape::Butterfly { legs } => Some(ButterflyStrikes {
                    family: g.family.clone(),
                    open_date: g.open_date,
                    strikes: legs.iter().map(|l| l.strike).collect(),
                }),
                GroupShape::CreditSpread { .. } => None,
            })
            .collect())
    }

    async fn create_group(
        &self,
        scope: &AccountScope,
        family: &ContractFamily,
        open_date: NaiveDate,
        shape: &GroupShape,
    ) -> Result<i64, StoreError> {
        let mut state = self.state.lock().await;
        let id = state.groups.len() as i64 + 1;
        state.groups.push(TradeGroup {
            id,
            broker: scope.broker.clone(),
            account: scope.account.clone(),
            family: family.clone(),
            open_date,
            close_date: None,
            net_pl: Decimal::ZERO,
            gross_return: Decimal::ZERO,
            shape: shape.clone(),
        });
        Ok(id)
    }

    async fn link_executions(&self, group_id: i64, execution_ids: &[i64]) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let mut inserted = 0;
        for id in execution_ids {
            if state.links.insert((group_id, *id)) {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn group_executions(&self, group_id: i64) -> Result<Vec<Execution>, StoreError> {
        let state = self.state.lock().await;
        let mut linked: Vec<_> = state
            .executions
            .iter()
            .filter(|e| state.links.contains(&(group_id, e.id)))
            .cloned()
            .collect();
        linked.sort_by_key(|e| (e.executed_at, e.id));
        Ok(linked)
    }

    async fn update_metrics(&self, group_id: i64, metrics: &GroupMetrics) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let group = state
            .groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or(StoreError::GroupNotFound(group_id))?;
        group.net_pl = metrics.net_pl;
        group.gross_return = metrics.gross_return;
        group.close_date = metrics.close_date;
        Ok(())
    }

    async fn scope_groups(&self, scope: &AccountScope) -> Result<Vec<TradeGroup>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .groups
            .iter()
            .filter(|g| in_scope(&g.broker, &g.account, scope))
            .cloned()
            .collect())
    }
}

/// An imported fill on a March 2026 day at 10:`minute`.
#[allow(clippy::too_many_arguments)]
pub fn fill(
    day: u32,
    minute: u32,
    action: &str,
    symbol: &str,
    quantity: Decimal,
    price: Decimal,
    net_amount: Decimal,
    fees: Decimal,
) -> NewExecution {
    NewExecution {
        fingerprint: format!("{day}|{minute}|{action}|{symbol}|{quantity}|{net_amount}"),
        broker: "Schwab".to_string(),
        account: "A1".to_string(),
        executed_at: NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(10, minute, 0)
            .unwrap(),
        symbol: symbol.to_string(),
        description: String::new(),
        action: action.to_string(),
        quantity: Some(quantity),
        price: Some(price),
        fees,
        net_amount,
        currency: "USD".to_string(),
        source_file: "test.csv".to_string(),
        source_row: 0,
        raw_row: Default::default(),
    }
}

pub fn scope() -> AccountScope {
    AccountScope::new("Schwab", "A1")
}
