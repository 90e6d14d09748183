use crate::error::EngineError;
use crate::store::LedgerStore;
use core_types::{AccountScope, GrossReturnMode, StrategyKind};
use grouping::{annotate, create_matcher, ExistingGroups, GroupCandidate, Matcher};
use tracing::{debug, info};

/// Counters reported by one grouping pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub candidates: usize,
    pub groups_created: usize,
    pub links_created: u64,
    pub duplicates_skipped: usize,
}

/// One matcher run over one scope, applied to the store.
///
/// Each candidate is committed on its own: group first, then links, then
/// metrics computed from the links as the store now holds them. An error
/// stops the pass but leaves groups already written intact, and a rerun
/// skips them as duplicates.
pub struct GroupingPass {
    matcher: Box<dyn Matcher>,
    mode: GrossReturnMode,
}

impl GroupingPass {
    pub fn new(kind: StrategyKind, mode: GrossReturnMode) -> Self {
        Self {
            matcher: create_matcher(kind),
            mode,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        self.matcher.kind()
    }

    pub async fn run<S>(&self, store: &S, scope: &AccountScope) -> Result<PassSummary, EngineError>
    where
        S: LedgerStore + ?Sized,
    {
        let executions = store.scope_executions(scope).await?;
        let fills = annotate(&executions);
        let existing = self.existing_groups(store, scope).await?;

        let outcome = self.matcher.find_candidates(&fills, &existing);
        let mut summary = PassSummary {
            candidates: outcome.qualifying,
            duplicates_skipped: outcome.duplicates_skipped,
            ..Default::default()
        };

        for candidate in &outcome.candidates {
            summary.links_created += self.apply(store, scope, candidate).await?;
            summary.groups_created += 1;
        }

        info!(
            scope = %scope,
            kind = self.kind().as_str(),
            candidates = summary.candidates,
            created = summary.groups_created,
            links = summary.links_created,
            duplicates = summary.duplicates_skipped,
            "Grouping pass complete"
        );
        Ok(summary)
    }

    async fn existing_groups<S>(&self, store: &S, scope: &AccountScope) -> Result<ExistingGroups, EngineError>
    where
        S: LedgerStore + ?Sized,
    {
        let mut existing = ExistingGroups::default();
        match self.kind() {
            StrategyKind::CreditSpread => existing.spreads = store.spread_keys(scope).await?,
            StrategyKind::Bwb => existing.butterflies = store.butterfly_strikes(scope).await?,
        }
        Ok(existing)
    }

    /// Writes one candidate. Returns the number of new links.
    async fn apply<S>(&self, store: &S, scope: &AccountScope, candidate: &GroupCandidate) -> Result<u64, EngineError>
    where
        S: LedgerStore + ?Sized,
    {
        let shape = candidate.shape();
        let group_id = store
            .create_group(scope, candidate.family(), candidate.open_date(), &shape)
            .await?;
        let links = store.link_executions(group_id, &candidate.execution_ids()).await?;

        let linked = store.group_executions(group_id).await?;
        let metrics = analytics::compute(&linked, self.mode);
        store.update_metrics(group_id, &metrics).await?;

        debug!(
            group_id,
            family = %candidate.family(),
            open_date = %candidate.open_date(),
            links,
            net_pl = %metrics.net_pl,
            "Created trade group"
        );
        Ok(links)
    }
}

/// Recomputes net P/L, gross return and close date of every group in a scope
/// from its current links. Returns how many groups were updated.
pub async fn refresh_metrics<S>(store: &S, scope: &AccountScope, mode: GrossReturnMode) -> Result<usize, EngineError>
where
    S: LedgerStore + ?Sized,
{
    let groups = store.scope_groups(scope).await?;
    for group in &groups {
        let linked = store.group_executions(group.id).await?;
        store.update_metrics(group.id, &analytics::compute(&linked, mode)).await?;
    }
    info!(scope = %scope, groups = groups.len(), "Refreshed group metrics");
    Ok(groups.len())
}
