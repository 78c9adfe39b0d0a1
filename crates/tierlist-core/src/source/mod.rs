//! Source abstraction for analysis snapshots.
//!
//! The [`FunctionSource`] trait is the single inbound boundary of the core:
//! given an analysis identifier it returns every [`FunctionRecord`] that the
//! analysis produced. Backends (HTTP, local files, in-memory) implement it
//! and the [`SnapshotLoader`](crate::loader::SnapshotLoader) drives it.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::FunctionRecord;

/// Failure of a single fetch. The `Display` output is the user-facing
/// error string surfaced by the loader.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The backend has no analysis with this identifier.
    #[error("analysis not found: {0}")]
    NotFound(String),
    /// Network or I/O failure before a response was obtained.
    #[error("request failed: {0}")]
    Transport(String),
    /// The backend answered with a non-success status.
    #[error("backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    /// The response could not be decoded or violates record integrity.
    #[error("malformed analysis data: {0}")]
    Malformed(String),
}

/// Fetch-by-id contract with the analysis backend.
///
/// All operations are async (via `async-trait`). In-memory implementations
/// return immediately-ready futures.
#[async_trait]
pub trait FunctionSource: Send + Sync {
    /// Short backend name used in log output (e.g. `"http"`, `"file"`).
    fn name(&self) -> &str;

    /// Fetch all function records belonging to `analysis_id`.
    async fn fetch_functions(&self, analysis_id: &str) -> Result<Vec<FunctionRecord>, FetchError>;
}
