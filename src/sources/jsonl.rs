//! JSON export reading: newline-delimited objects or one array.

use std::path::Path;

use async_trait::async_trait;

use super::{EventSource, SourceError};
use crate::domain::EventRow;

/// Reader for BigQuery JSON exports.
///
/// Handles newline-delimited objects (`.jsonl`, `.ndjson`) as well as
/// whole-file arrays, which some export tools write for `.json`.
/// Integer columns arrive as strings in BigQuery exports; the row type
/// decodes both.
#[derive(Debug, Clone, Copy)]
pub struct JsonlSource;

#[async_trait]
impl EventSource for JsonlSource {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn read(&self, path: &Path) -> Result<Vec<EventRow>, SourceError> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| SourceError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

        if content.trim_start().starts_with('[') {
            return serde_json::from_str(&content).map_err(|err| {
                SourceError::InvalidRecord {
                    path: path.to_path_buf(),
                    record: err.line() as u64,
                    source: Box::new(err),
                }
            });
        }

        let mut rows = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row: EventRow =
                serde_json::from_str(line).map_err(|err| SourceError::InvalidRecord {
                    path: path.to_path_buf(),
                    record: i as u64 + 1,
                    source: Box::new(err),
                })?;
            rows.push(row);
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_reads_ndjson_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"SQLDATE":"20240115","Actor1CountryCode":"USA","Actor2CountryCode":"CHN","GoldsteinScale":-3.0,"QuadClass":"3","NumMentions":"5","AvgTone":-1.2}"#,
                "\n\n",
                r#"{"SQLDATE":20240116,"Actor1CountryCode":"RUS","Actor2CountryCode":"UKR","GoldsteinScale":-8.5,"QuadClass":4,"NumMentions":12,"AvgTone":-6.0}"#,
                "\n",
            ),
        )
        .unwrap();

        let rows = JsonlSource.read(&path).await.unwrap();
        assert_eq!(rows.len(), 2);
        // String and numeric encodings land in the same shape
        assert_eq!(rows[0].sqldate, 20240115);
        assert_eq!(rows[0].quad_class, Some(3));
        assert_eq!(rows[1].sqldate, 20240116);
        assert_eq!(rows[1].mentions, Some(12));
    }

    #[tokio::test]
    async fn test_reads_top_level_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.json");
        std::fs::write(
            &path,
            r#"[
                {"SQLDATE":20240115,"Actor1CountryCode":"USA","Actor2CountryCode":"CHN","GoldsteinScale":1.0,"QuadClass":1,"NumMentions":2,"AvgTone":0.5}
            ]"#,
        )
        .unwrap();

        let rows = JsonlSource.read(&path).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].actor1.as_deref(), Some("USA"));
    }

    #[tokio::test]
    async fn test_bad_line_reports_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"SQLDATE":20240115,"Actor1CountryCode":"USA","Actor2CountryCode":"CHN"}"#,
                "\n",
                "{broken\n",
            ),
        )
        .unwrap();

        let err = JsonlSource.read(&path).await.unwrap_err();
        match err {
            SourceError::InvalidRecord { record, .. } => assert_eq!(record, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_date_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(
            &path,
            r#"{"Actor1CountryCode":"USA","Actor2CountryCode":"CHN"}"#,
        )
        .unwrap();

        assert!(JsonlSource.read(&path).await.is_err());
    }
}
