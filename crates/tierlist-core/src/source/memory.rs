//! In-memory [`FunctionSource`] for testing and embedding.
//!
//! Analyses live in a `HashMap` behind a `parking_lot::RwLock`. A fetch for
//! an unknown id fails with [`FetchError::NotFound`]; a per-id failure can be
//! injected with [`InMemorySource::fail_with`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::models::FunctionRecord;

use super::{FetchError, FunctionSource};

enum Entry {
    Ready(Vec<FunctionRecord>),
    Failing(FetchError),
}

/// In-memory analysis backend.
pub struct InMemorySource {
    analyses: RwLock<HashMap<String, Entry>>,
    fetches: AtomicUsize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self {
            analyses: RwLock::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Insert or replace the records for `analysis_id`.
    pub fn insert(&self, analysis_id: impl Into<String>, functions: Vec<FunctionRecord>) {
        self.analyses
            .write()
            .insert(analysis_id.into(), Entry::Ready(functions));
    }

    /// Make every fetch of `analysis_id` fail with `error` until replaced.
    pub fn fail_with(&self, analysis_id: impl Into<String>, error: FetchError) {
        self.analyses
            .write()
            .insert(analysis_id.into(), Entry::Failing(error));
    }

    pub fn remove(&self, analysis_id: &str) {
        self.analyses.write().remove(analysis_id);
    }

    /// Number of fetches served so far, including failed ones.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FunctionSource for InMemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_functions(&self, analysis_id: &str) -> Result<Vec<FunctionRecord>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let analyses = self.analyses.read();
        match analyses.get(analysis_id) {
            Some(Entry::Ready(functions)) => Ok(functions.clone()),
            Some(Entry::Failing(err)) => Err(err.clone()),
            None => Err(FetchError::NotFound(analysis_id.to_string())),
        }
    }
}
