//! Source selection from configuration.
//!
//! | `source.provider` | Backend |
//! |-------------------|---------|
//! | `"http"` | [`HttpSource`] |
//! | `"file"` | [`FileSource`] |

use std::sync::Arc;

use anyhow::{bail, Result};
use tierlist_core::source::FunctionSource;

use crate::config::SourceConfig;
use crate::source_file::FileSource;
use crate::source_http::HttpSource;

/// Create the configured [`FunctionSource`].
pub fn create_source(config: &SourceConfig) -> Result<Arc<dyn FunctionSource>> {
    match config.provider.as_str() {
        "http" => Ok(Arc::new(HttpSource::new(config)?)),
        "file" => Ok(Arc::new(FileSource::new(config)?)),
        other => bail!("Unknown source provider: {}", other),
    }
}

/// Analyses available without knowing an id up front.
///
/// Only the file provider can enumerate; the HTTP contract is fetch-by-id.
pub fn list_analyses(config: &SourceConfig) -> Result<Vec<String>> {
    match config.provider.as_str() {
        "file" => FileSource::new(config)?.list_analyses(),
        other => bail!("Source provider '{}' cannot list analyses", other),
    }
}
