//! Delimited export reading (CSV and TSV).

use std::path::Path;

use async_trait::async_trait;

use super::{EventSource, SourceError};
use crate::domain::EventRow;

/// Reader for delimited exports with a GDELT header row.
#[derive(Debug, Clone, Copy)]
pub struct CsvSource {
    delimiter: u8,
}

impl CsvSource {
    /// Comma-delimited, the BigQuery CSV export shape.
    pub fn comma() -> Self {
        Self { delimiter: b',' }
    }

    /// Tab-delimited.
    pub fn tab() -> Self {
        Self { delimiter: b'\t' }
    }
}

#[async_trait]
impl EventSource for CsvSource {
    fn name(&self) -> &str {
        if self.delimiter == b'\t' {
            "tsv"
        } else {
            "csv"
        }
    }

    async fn read(&self, path: &Path) -> Result<Vec<EventRow>, SourceError> {
        let content = tokio::fs::read(path).await.map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(::csv::Trim::All)
            .from_reader(content.as_slice());

        let mut rows = Vec::new();
        for (i, result) in reader.deserialize::<EventRow>().enumerate() {
            let row = result.map_err(|err| {
                // Header is line 1, so data records start at line 2
                let record = err.position().map(|p| p.line()).unwrap_or(i as u64 + 2);
                SourceError::InvalidRecord {
                    path: path.to_path_buf(),
                    record,
                    source: Box::new(err),
                }
            })?;
            rows.push(row);
        }

        Ok(rows)
    }
}
