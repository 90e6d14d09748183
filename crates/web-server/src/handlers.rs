use crate::{error::AppError, AppState};
use analytics::Dashboard;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use core_types::{AccountScope, Execution, StrategyKind, TradeGroup};
use database::GroupFilter;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct GroupsQuery {
    pub broker: Option<String>,
    pub account: String,
    pub strategy: Option<String>,
    #[serde(default)]
    pub open_only: bool,
    pub take: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub broker: Option<String>,
    pub account: String,
    pub take: Option<i64>,
}

/// `strategy=CreditSpread|BWB`, absent or empty meaning every kind.
fn parse_strategy(raw: Option<&str>) -> Result<Option<StrategyKind>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<StrategyKind>()
            .map(Some)
            .map_err(|e| AppError::BadRequest(e.to_string())),
    }
}

fn positive_take(take: Option<i64>, default: i64) -> Result<i64, AppError> {
    match take {
        Some(t) if t <= 0 => Err(AppError::BadRequest(format!("take must be positive, got {t}"))),
        Some(t) => Ok(t),
        None => Ok(default),
    }
}

fn scope(state: &AppState, broker: Option<String>, account: String) -> AccountScope {
    AccountScope::new(broker.unwrap_or_else(|| state.config.ledger.default_broker.clone()), account)
}

/// # GET /api/groups
/// Trade groups of one account, newest open date first.
pub async fn get_groups(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GroupsQuery>,
) -> Result<Json<Vec<TradeGroup>>, AppError> {
    let filter = GroupFilter {
        kind: parse_strategy(query.strategy.as_deref())?,
        open_only: query.open_only,
        take: positive_take(query.take, state.config.ledger.list_take)?,
        scope: scope(&state, query.broker, query.account),
    };
    let groups = state.db_repo.list_groups(&filter).await?;
    Ok(Json(groups))
}

/// # GET /api/groups/:id/executions
pub async fn get_group_executions(
    Path(group_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Execution>>, AppError> {
    // 404 for an unknown id rather than an empty list.
    state.db_repo.get_group(group_id).await?;
    let executions = state.db_repo.group_executions(group_id).await?;
    Ok(Json(executions))
}

/// # GET /api/dashboard
/// KPIs, year/month/DTE buckets and per-trade rows over the most recent groups.
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Dashboard>, AppError> {
    let filter = GroupFilter {
        kind: None,
        open_only: false,
        take: positive_take(query.take, state.config.web.dashboard_take)?,
        scope: scope(&state, query.broker, query.account),
    };
    let groups = state.db_repo.list_groups(&filter).await?;
    let ids: Vec<i64> = groups.iter().map(|g| g.id).collect();
    let mut executions = state.db_repo.executions_for_groups(&ids).await?;

    let paired = groups
        .into_iter()
        .map(|g| {
            let linked = executions.remove(&g.id).unwrap_or_default();
            (g, linked)
        })
        .collect();

    Ok(Json(analytics::build_dashboard(
        &filter.scope.broker,
        &filter.scope.account,
        paired,
    )))
}
