//! Payload build orchestration: aggregate, rank, publish.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use fs2::FileExt;
use tracing::{debug, info, instrument};

use crate::dataset::PulseData;
use crate::domain::EventRow;
use crate::pipeline::aggregate::{bucket_rows, pair_summary, rebuild_buckets, week_grid};
use crate::pipeline::rank::{rank_pairs, top_pairs_by_volume};
use crate::pipeline::{TOP_PAIRS, WEEKS_HISTORY};

/// Whether a build starts fresh or merges into the published payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Ignore any existing payload and rebuild from the given rows.
    Full,
    /// Overlay new weekly stats onto the existing payload.
    #[default]
    Incremental,
}

impl std::fmt::Display for BuildMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BuildMode::Full => "full",
            BuildMode::Incremental => "incremental",
        })
    }
}

/// Options for one payload build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub mode: BuildMode,
    /// Where the payload lands.
    pub output: PathBuf,
    /// Country code to name JSON file for labels, if available.
    pub countries_file: Option<PathBuf>,
    /// Pairs kept in the payload.
    pub top_pairs: usize,
    /// Weeks in the history grid.
    pub weeks_history: usize,
}

impl BuildOptions {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            mode: BuildMode::default(),
            output: output.into(),
            countries_file: None,
            top_pairs: TOP_PAIRS,
            weeks_history: WEEKS_HISTORY,
        }
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_countries_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.countries_file = Some(path.into());
        self
    }

    pub fn with_top_pairs(mut self, top_pairs: usize) -> Self {
        self.top_pairs = top_pairs;
        self
    }

    pub fn with_weeks_history(mut self, weeks_history: usize) -> Self {
        self.weeks_history = weeks_history;
        self
    }
}

/// What a build did, for status output.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub mode: BuildMode,
    pub rows_read: usize,
    pub rows_skipped: usize,
    /// Whether an existing payload was merged in.
    pub merged_existing: bool,
    pub pairs_published: usize,
    pub weeks: usize,
    pub payload_bytes: u64,
    pub output: PathBuf,
    pub elapsed: Duration,
}

/// Run a payload build over already-loaded event rows.
///
/// The whole read-merge-write cycle runs under an exclusive advisory
/// lock next to the output file, so two builds cannot interleave.
/// Re-running an incremental build over the same rows is idempotent:
/// each (pair, week) bucket is recomputed from the rows, not added to
/// the stored stats.
#[instrument(skip_all, fields(mode = %opts.mode, rows = rows.len()))]
pub async fn run(rows: &[EventRow], opts: &BuildOptions) -> Result<BuildReport> {
    let started = Instant::now();

    if let Some(parent) = opts.output.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create output dir: {}", parent.display()))?;
        }
    }

    let countries = match &opts.countries_file {
        Some(path) => load_countries(path).await?,
        None => BTreeMap::new(),
    };
    if countries.is_empty() {
        debug!("no country names loaded, labels fall back to codes");
    }

    let _lock = BuildLock::acquire(&opts.output)?;

    let existing = match opts.mode {
        BuildMode::Incremental if opts.output.exists() => {
            Some(PulseData::load(&opts.output).await?)
        }
        BuildMode::Incremental => {
            info!("no existing payload, building from scratch");
            None
        }
        BuildMode::Full => None,
    };
    let merged_existing = existing.is_some();

    let (new_buckets, rows_skipped) = bucket_rows(rows);
    let buckets = match &existing {
        Some(data) => {
            let mut merged = rebuild_buckets(data);
            for (pair, weeks) in new_buckets {
                merged.entry(pair).or_default().extend(weeks);
            }
            merged
        }
        None => new_buckets,
    };

    let grid = week_grid(Utc::now().date_naive(), opts.weeks_history);
    let top = top_pairs_by_volume(&buckets, opts.top_pairs);
    info!(pairs = buckets.len(), published = top.len(), "ranked pairs by volume");

    let pairs: Vec<_> = top
        .iter()
        .filter_map(|key| {
            buckets
                .get(key)
                .map(|weekly| pair_summary(key, weekly, &grid, &countries))
        })
        .collect();
    let rankings = rank_pairs(&pairs);

    // Only codes that actually appear in the published pairs
    let mut used = BTreeMap::new();
    for pair in &pairs {
        for code in [pair.actor1.as_str(), pair.actor2.as_str()] {
            used.entry(code.to_string()).or_insert_with(|| {
                countries
                    .get(code)
                    .cloned()
                    .unwrap_or_else(|| code.to_string())
            });
        }
    }

    let data = PulseData {
        generated_at: Utc::now(),
        weeks: grid,
        pairs,
        rankings,
        countries: used,
    };
    data.save(&opts.output).await?;

    let payload_bytes = tokio::fs::metadata(&opts.output)
        .await
        .with_context(|| format!("Failed to stat payload: {}", opts.output.display()))?
        .len();

    let report = BuildReport {
        mode: opts.mode,
        rows_read: rows.len(),
        rows_skipped,
        merged_existing,
        pairs_published: data.pairs.len(),
        weeks: data.weeks.len(),
        payload_bytes,
        output: opts.output.clone(),
        elapsed: started.elapsed(),
    };
    info!(
        pairs = report.pairs_published,
        weeks = report.weeks,
        bytes = report.payload_bytes,
        "payload written"
    );

    Ok(report)
}

/// Load the country code to display name map from a JSON file.
pub async fn load_countries(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read countries file: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse countries file: {}", path.display()))
}

/// Advisory lock guarding the read-merge-write cycle.
///
/// Held for the lifetime of the value; dropping the file releases it.
struct BuildLock {
    _file: std::fs::File,
}

impl BuildLock {
    fn acquire(output: &Path) -> Result<Self> {
        let path = output.with_extension("lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { _file: file }),
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                bail!("another build holds the lock: {}", path.display())
            }
            Err(err) => {
                Err(err).with_context(|| format!("Failed to lock: {}", path.display()))
            }
        }
    }
}
