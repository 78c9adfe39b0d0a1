//! The tier list as one reactive unit: loader + query parameters + memo.
//!
//! [`TierList`] is what presentation code talks to. It forwards analysis
//! selection and refreshes to its [`SnapshotLoader`], holds the current
//! [`ViewQuery`], and derives a [`TierListState`] on demand through a
//! [`ViewCache`]. Changing the analysis resets the query so a filter chosen
//! for one analysis never applies to the next.
//!
//! `TierList` is `Send + Sync` whenever its source is, so an
//! `Arc<TierList<_>>` can be shared between tasks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::loader::{LoadOutcome, Selection, SnapshotLoader};
use crate::models::{Stats, Tier, TierGroup, TierSummary};
use crate::source::FunctionSource;
use crate::view::{empty_groups, SortKey, SortOrder, ViewCache, ViewQuery};

/// Read-only view object handed to presentation.
///
/// `stats` and `tier_summary` are `None` exactly when no snapshot is held.
#[derive(Debug, Clone, Serialize)]
pub struct TierListState {
    pub analysis_id: Option<String>,
    pub query: ViewQuery,
    pub tier_groups: Arc<[TierGroup]>,
    pub stats: Option<Stats>,
    pub tier_summary: Option<TierSummary>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl TierListState {
    /// Number of records visible under the current query.
    pub fn visible_count(&self) -> usize {
        self.tier_groups.iter().map(|g| g.functions.len()).sum()
    }

    pub fn group(&self, tier: Tier) -> &TierGroup {
        &self.tier_groups[tier.rank() as usize]
    }
}

pub struct TierList<S: ?Sized> {
    loader: SnapshotLoader<S>,
    query: Mutex<ViewQuery>,
    cache: Mutex<ViewCache>,
}

impl<S: FunctionSource + ?Sized> TierList<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            loader: SnapshotLoader::new(source),
            query: Mutex::new(ViewQuery::default()),
            cache: Mutex::new(ViewCache::new()),
        }
    }

    /// Switch to another analysis (or to none) and load it.
    ///
    /// Any actual change resets the query to its defaults before the fetch
    /// is issued. Selecting the active analysis again does nothing; use
    /// [`refresh`](Self::refresh) to reload it.
    pub async fn set_analysis_id(&self, analysis_id: Option<String>) -> LoadOutcome {
        match self.loader.select(analysis_id) {
            Selection::Unchanged => LoadOutcome::Skipped,
            Selection::Idle => {
                self.reset_query();
                self.cache.lock().clear();
                LoadOutcome::Skipped
            }
            Selection::Load(ticket) => {
                self.reset_query();
                self.loader.run(ticket).await
            }
        }
    }

    /// Enable or disable fetching. Re-enabling reloads the active analysis.
    pub async fn set_enabled(&self, enabled: bool) -> LoadOutcome {
        match self.loader.set_enabled(enabled) {
            Some(ticket) => self.loader.run(ticket).await,
            None => {
                if !enabled {
                    self.cache.lock().clear();
                }
                LoadOutcome::Skipped
            }
        }
    }

    pub async fn refresh(&self) -> LoadOutcome {
        self.loader.refresh().await
    }

    pub fn set_search_query(&self, search: impl Into<String>) {
        self.query.lock().search = search.into();
    }

    pub fn set_tier_filter(&self, tier: Option<Tier>) {
        self.query.lock().tier_filter = tier;
    }

    pub fn set_sort_by(&self, sort_by: SortKey) {
        self.query.lock().sort_by = sort_by;
    }

    pub fn set_sort_order(&self, sort_order: SortOrder) {
        self.query.lock().sort_order = sort_order;
    }

    pub fn reset_query(&self) {
        *self.query.lock() = ViewQuery::default();
    }

    pub fn query(&self) -> ViewQuery {
        self.query.lock().clone()
    }

    /// Number of derivations the memo has performed.
    pub fn derivations(&self) -> usize {
        self.cache.lock().derivations()
    }

    /// Derive the current view.
    pub fn state(&self) -> TierListState {
        let loader = self.loader.state();
        let query = self.query();

        let (tier_groups, stats, tier_summary, fetched_at) = match &loader.snapshot {
            Some(snapshot) => {
                let view = self.cache.lock().get(snapshot, &query);
                (
                    Arc::clone(&view.tier_groups),
                    Some(view.stats),
                    Some(view.tier_summary.clone()),
                    Some(snapshot.fetched_at),
                )
            }
            None => {
                // Release the discarded snapshot and its derived view.
                self.cache.lock().clear();
                (empty_groups().into(), None, None, None)
            }
        };

        TierListState {
            analysis_id: loader.analysis_id,
            query,
            tier_groups,
            stats,
            tier_summary,
            is_loading: loader.is_loading,
            error: loader.error,
            fetched_at,
        }
    }
}
