//! Local-file analysis backend.
//!
//! Reads `{dir}/{analysis_id}.json`, where the file holds the same body the
//! HTTP backend serves (a record array or `{"functions": [...]}`). Useful
//! for offline inspection of exported analysis runs.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use tierlist_core::models::{parse_function_list, FunctionRecord};
use tierlist_core::source::{FetchError, FunctionSource};

use crate::config::SourceConfig;

pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let dir = config
            .dir
            .clone()
            .ok_or_else(|| anyhow::anyhow!("source.dir required for file provider"))?;
        Ok(Self::from_dir(dir))
    }

    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for `analysis_id`, or `None` if the id is not a plain file stem.
    pub fn analysis_path(&self, analysis_id: &str) -> Option<PathBuf> {
        let plain = !analysis_id.is_empty()
            && analysis_id != "."
            && analysis_id != ".."
            && !analysis_id.contains(|c: char| c == '/' || c == '\\');
        plain.then(|| self.dir.join(format!("{}.json", analysis_id)))
    }

    /// Ids of every `*.json` file in the directory, sorted.
    pub fn list_analyses(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl FunctionSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch_functions(&self, analysis_id: &str) -> Result<Vec<FunctionRecord>, FetchError> {
        let path = self
            .analysis_path(analysis_id)
            .ok_or_else(|| FetchError::NotFound(analysis_id.to_string()))?;

        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::NotFound(analysis_id.to_string()))
            }
            Err(e) => {
                return Err(FetchError::Transport(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        };

        tracing::debug!(path = %path.display(), bytes = body.len(), "read analysis file");
        parse_function_list(&body)
    }
}
