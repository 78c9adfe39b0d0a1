//! Race-safe snapshot loading.
//!
//! [`SnapshotLoader`] owns the raw [`Snapshot`] for the active analysis and
//! the loading/error state around it. Every fetch is identified by a
//! [`LoadTicket`] carrying a monotonically increasing sequence number; a
//! result is applied only if its ticket is still the latest one issued.
//! Superseded results, successful or not, are dropped when they arrive.
//!
//! A fetch is split into two halves so hosts can run it on any executor:
//!
//! 1. [`begin_load`](SnapshotLoader::begin_load) issues a ticket and marks
//!    the loader as loading (synchronous).
//! 2. [`complete`](SnapshotLoader::complete) applies the fetch result for a
//!    ticket (synchronous).
//!
//! [`run`](SnapshotLoader::run) performs the fetch between the two against
//! the configured [`FunctionSource`]; [`load`](SnapshotLoader::load) and
//! [`refresh`](SnapshotLoader::refresh) compose all three.
//!
//! The internal mutex is never held across an `.await`.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::{validate_functions, FunctionRecord, Snapshot};
use crate::source::{FetchError, FunctionSource};

/// Handle for one issued fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    seq: u64,
    analysis_id: String,
}

impl LoadTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn analysis_id(&self) -> &str {
        &self.analysis_id
    }
}

/// What happened to a load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The fetch succeeded and its records replaced the snapshot.
    Applied,
    /// The fetch failed; the error was recorded and the previous snapshot kept.
    Failed,
    /// A newer request was issued before this one resolved; result dropped.
    Superseded,
    /// No fetch was issued (no analysis id, loader disabled, or nothing changed).
    Skipped,
}

/// Result of pointing the loader at a (possibly) different analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Same analysis id as before; nothing was touched.
    Unchanged,
    /// State was cleared and no fetch is needed (id is `None` or loader disabled).
    Idle,
    /// State was cleared and a fetch must be run for this ticket.
    Load(LoadTicket),
}

/// Point-in-time copy of the loader's observable state.
#[derive(Debug, Clone)]
pub struct LoaderState {
    pub analysis_id: Option<String>,
    pub enabled: bool,
    pub snapshot: Option<Arc<Snapshot>>,
    pub is_loading: bool,
    pub error: Option<String>,
}

struct Inner {
    analysis_id: Option<String>,
    enabled: bool,
    snapshot: Option<Arc<Snapshot>>,
    error: Option<String>,
    /// Sequence number of the most recently issued ticket.
    latest: u64,
    /// Sequence number of the latest ticket while it is unresolved.
    pending: Option<u64>,
}

impl Inner {
    fn clear(&mut self) {
        self.snapshot = None;
        self.error = None;
        // Invalidate anything in flight.
        self.latest += 1;
        self.pending = None;
    }

    fn issue(&mut self, analysis_id: String) -> LoadTicket {
        self.latest += 1;
        self.pending = Some(self.latest);
        self.analysis_id = Some(analysis_id.clone());
        LoadTicket {
            seq: self.latest,
            analysis_id,
        }
    }
}

/// Owns the raw snapshot for one consumer and fetches it from `S`.
pub struct SnapshotLoader<S: ?Sized> {
    source: Arc<S>,
    inner: Mutex<Inner>,
}

impl<S: FunctionSource + ?Sized> SnapshotLoader<S> {
    /// Create an enabled loader with no active analysis.
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            inner: Mutex::new(Inner {
                analysis_id: None,
                enabled: true,
                snapshot: None,
                error: None,
                latest: 0,
                pending: None,
            }),
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn state(&self) -> LoaderState {
        let inner = self.inner.lock();
        LoaderState {
            analysis_id: inner.analysis_id.clone(),
            enabled: inner.enabled,
            snapshot: inner.snapshot.clone(),
            is_loading: inner.pending.is_some(),
            error: inner.error.clone(),
        }
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.lock().snapshot.clone()
    }

    pub fn analysis_id(&self) -> Option<String> {
        self.inner.lock().analysis_id.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().pending.is_some()
    }

    /// Make `analysis_id` the active analysis.
    ///
    /// Selecting the current id again is a no-op. Any other change clears
    /// the snapshot and error and invalidates in-flight fetches; a ticket is
    /// returned when the new id is set and the loader is enabled.
    pub fn select(&self, analysis_id: Option<String>) -> Selection {
        let mut inner = self.inner.lock();
        if inner.analysis_id == analysis_id {
            return Selection::Unchanged;
        }
        tracing::debug!(
            from = ?inner.analysis_id,
            to = ?analysis_id,
            "analysis selection changed"
        );
        inner.clear();
        match analysis_id {
            Some(id) if inner.enabled => Selection::Load(inner.issue(id)),
            other => {
                inner.analysis_id = other;
                Selection::Idle
            }
        }
    }

    /// Enable or disable fetching.
    ///
    /// Disabling clears the snapshot and error and invalidates in-flight
    /// fetches. Re-enabling with an active analysis issues a ticket.
    pub fn set_enabled(&self, enabled: bool) -> Option<LoadTicket> {
        let mut inner = self.inner.lock();
        if inner.enabled == enabled {
            return None;
        }
        inner.enabled = enabled;
        if !enabled {
            tracing::debug!("loader disabled");
            inner.clear();
            return None;
        }
        inner.analysis_id.clone().map(|id| inner.issue(id))
    }

    /// Issue a ticket for `analysis_id`.
    ///
    /// Reloading the active analysis keeps its snapshot visible until the
    /// result arrives. A different id clears the snapshot and error first and
    /// invalidates in-flight fetches, so rows never show under the wrong id.
    /// Returns `None` while the loader is disabled.
    pub fn begin_load(&self, analysis_id: impl Into<String>) -> Option<LoadTicket> {
        let analysis_id = analysis_id.into();
        let mut inner = self.inner.lock();
        if !inner.enabled {
            return None;
        }
        if inner.analysis_id.as_deref() != Some(analysis_id.as_str()) {
            inner.clear();
        }
        let ticket = inner.issue(analysis_id);
        tracing::debug!(
            analysis_id = %ticket.analysis_id,
            seq = ticket.seq,
            "fetch issued"
        );
        Some(ticket)
    }

    /// Apply the result of the fetch identified by `ticket`.
    ///
    /// Records are validated before they replace the snapshot; a validation
    /// failure is treated like a fetch failure.
    pub fn complete(
        &self,
        ticket: &LoadTicket,
        result: Result<Vec<FunctionRecord>, FetchError>,
    ) -> LoadOutcome {
        let result = result.and_then(|functions| {
            validate_functions(&functions)?;
            Ok(functions)
        });

        let mut inner = self.inner.lock();
        if ticket.seq != inner.latest {
            tracing::debug!(
                analysis_id = %ticket.analysis_id,
                seq = ticket.seq,
                latest = inner.latest,
                "discarding superseded fetch result"
            );
            return LoadOutcome::Superseded;
        }
        inner.pending = None;

        match result {
            Ok(functions) => {
                tracing::info!(
                    analysis_id = %ticket.analysis_id,
                    functions = functions.len(),
                    "snapshot loaded"
                );
                inner.snapshot = Some(Arc::new(Snapshot::new(
                    ticket.analysis_id.clone(),
                    functions,
                )));
                inner.error = None;
                LoadOutcome::Applied
            }
            Err(err) => {
                tracing::warn!(
                    analysis_id = %ticket.analysis_id,
                    error = %err,
                    "fetch failed"
                );
                inner.error = Some(err.to_string());
                LoadOutcome::Failed
            }
        }
    }

    /// Fetch from the source and apply the result for `ticket`.
    pub async fn run(&self, ticket: LoadTicket) -> LoadOutcome {
        let result = self.source.fetch_functions(&ticket.analysis_id).await;
        self.complete(&ticket, result)
    }

    /// Load `analysis_id`. See [`begin_load`](Self::begin_load) for what is kept meanwhile.
    pub async fn load(&self, analysis_id: impl Into<String>) -> LoadOutcome {
        match self.begin_load(analysis_id) {
            Some(ticket) => self.run(ticket).await,
            None => LoadOutcome::Skipped,
        }
    }

    /// Re-issue a load for the active analysis.
    pub async fn refresh(&self) -> LoadOutcome {
        let ticket = {
            let mut inner = self.inner.lock();
            match inner.analysis_id.clone() {
                Some(id) if inner.enabled => inner.issue(id),
                _ => return LoadOutcome::Skipped,
            }
        };
        tracing::debug!(analysis_id = %ticket.analysis_id, seq = ticket.seq, "refresh issued");
        self.run(ticket).await
    }
}
