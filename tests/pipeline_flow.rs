//! Pipeline Integration Tests
//!
//! End-to-end builds: event exports on disk through source loading,
//! aggregation, ranking, and the published payload.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, Utc};
use tempfile::TempDir;

use geopulse::pipeline::{self, aggregate::week_start, BuildMode, BuildOptions};
use geopulse::sources::{expand_inputs, load_events};
use geopulse::{PairKey, PulseData};

/// Monday of the week `weeks_back` weeks before the current one.
fn monday(weeks_back: i64) -> NaiveDate {
    week_start(Utc::now().date_naive()) - chrono::Duration::weeks(weeks_back)
}

fn sqldate(date: NaiveDate) -> u32 {
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// A CSV export with two usable USA/CHN events in `week` and one row
/// that is missing its second actor.
fn csv_export(dir: &Path, name: &str, week: NaiveDate) -> PathBuf {
    let d = sqldate(week);
    let d2 = sqldate(week + chrono::Duration::days(2));
    let content = format!(
        "SQLDATE,Actor1CountryCode,Actor2CountryCode,GoldsteinScale,QuadClass,NumMentions,AvgTone\n\
         {d},USA,CHN,-5.0,4,10,-3.2\n\
         {d2},CHN,USA,2.0,1,5,1.0\n\
         {d},USA,,7.0,1,3,2.0\n"
    );
    write_file(dir, name, &content)
}

/// A JSONL export with two usable RUS/UKR events in `week` and one
/// domestic row. INT64 columns come out of BigQuery as strings.
fn jsonl_export(dir: &Path, name: &str, week: NaiveDate) -> PathBuf {
    let d = sqldate(week);
    let content = format!(
        "{{\"SQLDATE\":\"{d}\",\"Actor1CountryCode\":\"RUS\",\"Actor2CountryCode\":\"UKR\",\"GoldsteinScale\":-8.0,\"QuadClass\":\"4\",\"NumMentions\":\"20\",\"AvgTone\":-8.5}}\n\
         {{\"SQLDATE\":\"{d}\",\"Actor1CountryCode\":\"UKR\",\"Actor2CountryCode\":\"RUS\",\"GoldsteinScale\":-6.0,\"QuadClass\":\"3\",\"NumMentions\":\"12\",\"AvgTone\":-5.0}}\n\
         {{\"SQLDATE\":\"{d}\",\"Actor1CountryCode\":\"RUS\",\"Actor2CountryCode\":\"RUS\",\"GoldsteinScale\":1.0,\"QuadClass\":\"1\"}}\n"
    );
    write_file(dir, name, &content)
}

#[tokio::test]
async fn test_full_build_from_mixed_exports() {
    let temp = TempDir::new().unwrap();
    let week = monday(1);
    csv_export(temp.path(), "events_a.csv", week);
    jsonl_export(temp.path(), "events_b.jsonl", week);
    write_file(
        temp.path(),
        "countries.json",
        r#"{"USA":"United States","CHN":"China","RUS":"Russia","UKR":"Ukraine"}"#,
    );

    let pattern = format!("{}/events_*", temp.path().display());
    let paths = expand_inputs(&[pattern]).unwrap();
    assert_eq!(paths.len(), 2);

    let rows = load_events(&paths).await.unwrap();
    assert_eq!(rows.len(), 6);

    let output = temp.path().join("data").join("pulse_data.json");
    let opts = BuildOptions::new(&output)
        .with_mode(BuildMode::Full)
        .with_countries_file(temp.path().join("countries.json"));
    let report = pipeline::run(&rows, &opts).await.unwrap();

    assert_eq!(report.rows_read, 6);
    assert_eq!(report.rows_skipped, 2);
    assert_eq!(report.pairs_published, 2);
    assert!(!report.merged_existing);

    let data = PulseData::load(&output).await.unwrap();
    assert_eq!(data.weeks.len(), 260);
    assert_eq!(*data.weeks.last().unwrap(), monday(0));
    assert_eq!(data.countries.len(), 4);
    assert!(!data.is_stale(Utc::now()));

    // RUS-UKR is the more conflictual pair, CHN-USA the more cooperative
    assert_eq!(data.rankings.most_conflictual[0], PairKey::new("RUS", "UKR"));
    assert_eq!(data.rankings.most_cooperative[0], PairKey::new("CHN", "USA"));
    // No prior window yet, so nothing has a trend
    assert!(data.rankings.biggest_shifts.is_empty());

    // Lookup works in either actor order and labels come from the table
    let pair = data.find_pair(&PairKey::new("USA", "CHN")).unwrap();
    assert_eq!(pair.label, "China — United States");
    assert_eq!(pair.total_events, 2);

    let stats = pair.data.iter().find(|w| w.week == week).unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.coop, 1);
    assert_eq!(stats.conf, 1);
    assert_eq!(stats.avg_goldstein, Some(-1.5));
    assert_eq!(stats.mentions, 15);

    // Every other grid week is zero-filled
    let quiet = pair.data.iter().filter(|w| w.total == 0).count();
    assert_eq!(quiet, 259);
}

#[tokio::test]
async fn test_incremental_build_overlays_existing() {
    let temp = TempDir::new().unwrap();
    let old_week = monday(3);
    let new_week = monday(1);
    let output = temp.path().join("pulse_data.json");

    // Seed with an older export
    let first = csv_export(temp.path(), "day1.csv", old_week);
    let rows = load_events(&[first]).await.unwrap();
    let opts = BuildOptions::new(&output).with_mode(BuildMode::Full);
    pipeline::run(&rows, &opts).await.unwrap();

    // Merge a newer export for the same pair plus a new pair
    let second = csv_export(temp.path(), "day2.csv", new_week);
    let third = jsonl_export(temp.path(), "day2.jsonl", new_week);
    let rows = load_events(&[second, third]).await.unwrap();
    let opts = BuildOptions::new(&output).with_mode(BuildMode::Incremental);
    let report = pipeline::run(&rows, &opts).await.unwrap();

    assert!(report.merged_existing);
    assert_eq!(report.pairs_published, 2);

    let data = PulseData::load(&output).await.unwrap();
    let pair = data.find_pair(&PairKey::new("CHN", "USA")).unwrap();

    // Both the old and the new week carry stats
    let old = pair.data.iter().find(|w| w.week == old_week).unwrap();
    let new = pair.data.iter().find(|w| w.week == new_week).unwrap();
    assert_eq!(old.total, 2);
    assert_eq!(new.total, 2);
    assert_eq!(pair.total_events, 4);

    // The new pair arrived through the merge
    assert!(data.find_pair(&PairKey::new("RUS", "UKR")).is_some());
}

#[tokio::test]
async fn test_incremental_rerun_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let week = monday(2);
    let output = temp.path().join("pulse_data.json");
    let export = csv_export(temp.path(), "day.csv", week);
    let rows = load_events(&[export]).await.unwrap();

    let opts = BuildOptions::new(&output);
    pipeline::run(&rows, &opts).await.unwrap();
    let first = PulseData::load(&output).await.unwrap();

    pipeline::run(&rows, &opts).await.unwrap();
    let second = PulseData::load(&output).await.unwrap();

    let key = PairKey::new("CHN", "USA");
    let a = first.find_pair(&key).unwrap();
    let b = second.find_pair(&key).unwrap();
    assert_eq!(a.total_events, b.total_events);
    assert_eq!(a.data, b.data);
    assert_eq!(first.weeks, second.weeks);
}

#[tokio::test]
async fn test_full_rebuild_discards_previous_payload() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("pulse_data.json");

    let first = jsonl_export(temp.path(), "day1.jsonl", monday(4));
    let rows = load_events(&[first]).await.unwrap();
    pipeline::run(&rows, &BuildOptions::new(&output))
        .await
        .unwrap();

    // Rebuild from a single newer export only
    let second = csv_export(temp.path(), "day2.csv", monday(1));
    let rows = load_events(&[second]).await.unwrap();
    let report = pipeline::run(
        &rows,
        &BuildOptions::new(&output).with_mode(BuildMode::Full),
    )
    .await
    .unwrap();

    assert!(!report.merged_existing);
    let data = PulseData::load(&output).await.unwrap();
    assert!(data.find_pair(&PairKey::new("RUS", "UKR")).is_none());
    assert!(data.find_pair(&PairKey::new("CHN", "USA")).is_some());
}

#[tokio::test]
async fn test_volume_cut_keeps_only_the_busiest_pairs() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("pulse_data.json");
    let d = sqldate(monday(1));

    let mut lines = vec![
        "SQLDATE,Actor1CountryCode,Actor2CountryCode,GoldsteinScale,QuadClass,NumMentions,AvgTone"
            .to_string(),
    ];
    for _ in 0..3 {
        lines.push(format!("{d},USA,CHN,1.0,1,1,0.0"));
    }
    for _ in 0..2 {
        lines.push(format!("{d},RUS,UKR,-2.0,3,1,0.0"));
    }
    lines.push(format!("{d},DEU,FRA,3.0,2,1,0.0"));
    write_file(temp.path(), "day.csv", &(lines.join("\n") + "\n"));

    let rows = load_events(&[temp.path().join("day.csv")]).await.unwrap();
    let opts = BuildOptions::new(&output)
        .with_mode(BuildMode::Full)
        .with_top_pairs(2);
    let report = pipeline::run(&rows, &opts).await.unwrap();

    assert_eq!(report.pairs_published, 2);
    let data = PulseData::load(&output).await.unwrap();
    assert!(data.find_pair(&PairKey::new("DEU", "FRA")).is_none());

    // Without a country table, codes stand in for names
    let pair = data.find_pair(&PairKey::new("CHN", "USA")).unwrap();
    assert_eq!(pair.label, "CHN — USA");
    assert_eq!(data.countries.get("USA"), Some(&"USA".to_string()));
    assert_eq!(data.countries.len(), 4);
}
