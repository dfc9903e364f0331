//! Event sources: local GDELT export files.
//!
//! Sources provide a unified interface over the export formats the
//! pipeline ingests: delimited exports with a header row, and the
//! JSON shapes BigQuery produces.

pub mod csv;
pub mod jsonl;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::domain::EventRow;

pub use self::csv::CsvSource;
pub use self::jsonl::JsonlSource;

/// Errors that can occur while reading event files.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unsupported source format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("invalid input pattern '{pattern}'")]
    BadPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("no input files match '{0}'")]
    NoMatches(String),

    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid record in {} (record {record})", .path.display())]
    InvalidRecord {
        path: PathBuf,
        record: u64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A reader for one export file format.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Short format name for logs.
    fn name(&self) -> &str;

    /// Read every event row in `path`.
    async fn read(&self, path: &Path) -> Result<Vec<EventRow>, SourceError>;
}

/// Pick a source for a path by its extension.
pub fn for_path(path: &Path) -> Option<Box<dyn EventSource>> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "csv" => Some(Box::new(CsvSource::comma())),
        "tsv" => Some(Box::new(CsvSource::tab())),
        "json" | "jsonl" | "ndjson" => Some(Box::new(JsonlSource)),
        _ => None,
    }
}

/// Expand input patterns into a sorted, deduplicated file list.
///
/// Each pattern may be a literal path or a glob. A pattern that
/// matches nothing is an error, not a silent no-op.
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>, SourceError> {
    let mut files = Vec::new();
    for pattern in patterns {
        let before = files.len();
        let matches = glob::glob(pattern).map_err(|source| SourceError::BadPattern {
            pattern: pattern.clone(),
            source,
        })?;
        for entry in matches {
            let path = entry.map_err(|e| SourceError::Read {
                path: e.path().to_path_buf(),
                source: e.into_error(),
            })?;
            if path.is_file() {
                files.push(path);
            }
        }
        if files.len() == before {
            return Err(SourceError::NoMatches(pattern.clone()));
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Read and concatenate the rows of every input file.
pub async fn load_events(paths: &[PathBuf]) -> Result<Vec<EventRow>, SourceError> {
    let mut rows = Vec::new();
    for path in paths {
        let source =
            for_path(path).ok_or_else(|| SourceError::UnsupportedFormat(path.clone()))?;
        let read = source.read(path).await?;
        debug!(
            source = source.name(),
            path = %path.display(),
            rows = read.len(),
            "loaded events"
        );
        rows.extend(read);
    }
    Ok(rows)
}
