//! Command-line interface for geopulse.
//!
//! Provides commands for building the pulse payload from event
//! exports, inspecting rankings and country pairs, and exporting
//! dashboard-ready views.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, SecondsFormat, Utc};
use clap::{Parser, Subcommand, ValueEnum};

use crate::config;
use crate::dataset::{
    filter_pairs, PulseData, PulseView, RankCategory, ViewOptions, WindowSummary,
    STALE_AFTER_HOURS,
};
use crate::domain::PairKey;
use crate::format::{
    format_count, format_goldstein, format_trend, format_week, time_ago, trend_direction,
};
use crate::pipeline::{self, BuildMode, BuildOptions, RECENT_WEEKS};
use crate::sources;

/// geopulse - Conflict/cooperation pulse over GDELT event exports
#[derive(Parser, Debug)]
#[command(name = "geopulse")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the pulse payload from event exports
    Build {
        /// Input files or glob patterns (CSV, TSV, or JSONL exports)
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Build mode
        #[arg(short, long, value_enum, default_value = "incremental")]
        mode: RunMode,

        /// Output payload path (defaults to the configured data directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Country code to name JSON table used for labels
        #[arg(long)]
        countries: Option<PathBuf>,

        /// How many pairs to keep, by total event volume
        #[arg(long)]
        top_pairs: Option<usize>,

        /// How many weeks of history to keep
        #[arg(long)]
        weeks: Option<usize>,
    },

    /// Show ranked pairs from the payload
    Top {
        /// Ranking category (all three if not specified)
        #[arg(short, long, value_enum)]
        category: Option<RankKind>,

        /// Maximum number of pairs to show per category
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Payload file (defaults to $GEOPULSE_DATA/pulse_data.json)
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// List pairs in the payload, most active first
    Pairs {
        /// Case-insensitive filter on country code or name
        query: Option<String>,

        /// Maximum number of pairs to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Payload file (defaults to $GEOPULSE_DATA/pulse_data.json)
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Show details of one country pair
    Show {
        /// Pair key, e.g. "USA-CHN" (order does not matter)
        pair: String,

        /// Start of the visible window (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// End of the visible window (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Weekly rows to print at the end of the window
        #[arg(short, long, default_value = "12")]
        weeks: usize,

        /// Payload file (defaults to $GEOPULSE_DATA/pulse_data.json)
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Show payload metadata and freshness
    Info {
        /// Payload file (defaults to $GEOPULSE_DATA/pulse_data.json)
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Export a dashboard view of the payload as JSON
    Export {
        /// Case-insensitive filter on country code or name
        #[arg(short, long)]
        query: Option<String>,

        /// Start of the visible window (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// End of the visible window (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Payload file (defaults to $GEOPULSE_DATA/pulse_data.json)
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Build mode for CLI (maps to BuildMode)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RunMode {
    /// Rebuild the payload from the given rows only
    Full,

    /// Overlay the given rows onto the existing payload
    Incremental,
}

impl From<RunMode> for BuildMode {
    fn from(m: RunMode) -> Self {
        match m {
            RunMode::Full => BuildMode::Full,
            RunMode::Incremental => BuildMode::Incremental,
        }
    }
}

/// Ranking category for CLI (maps to RankCategory)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RankKind {
    /// Lowest recent Goldstein average first
    Conflict,

    /// Highest recent Goldstein average first
    Cooperation,

    /// Largest swings in either direction first
    Shifts,
}

impl From<RankKind> for RankCategory {
    fn from(k: RankKind) -> Self {
        match k {
            RankKind::Conflict => RankCategory::MostConflictual,
            RankKind::Cooperation => RankCategory::MostCooperative,
            RankKind::Shifts => RankCategory::BiggestShifts,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Build {
                inputs,
                mode,
                output,
                countries,
                top_pairs,
                weeks,
            } => run_build(inputs, mode, output, countries, top_pairs, weeks).await,
            Commands::Top {
                category,
                limit,
                data,
            } => show_top(category, limit, data).await,
            Commands::Pairs { query, limit, data } => list_pairs(query, limit, data).await,
            Commands::Show {
                pair,
                from,
                to,
                weeks,
                data,
            } => show_pair(&pair, from, to, weeks, data).await,
            Commands::Info { data } => show_info(data).await,
            Commands::Export {
                query,
                from,
                to,
                pretty,
                output,
                data,
            } => export_view(query, from, to, pretty, output, data).await,
            Commands::Config => show_config().await,
        }
    }
}

/// Payload path from the flag, or the configured default
fn resolve_payload(data: Option<PathBuf>) -> Result<PathBuf> {
    match data {
        Some(path) => Ok(path),
        None => config::payload_path(),
    }
}

/// Load the payload for a read command, pointing at the build command
/// when there is nothing usable to read
async fn load_payload(path: &Path) -> Result<PulseData> {
    PulseData::load(path).await.with_context(|| {
        format!(
            "No usable payload at {} (run 'geopulse build' first)",
            path.display()
        )
    })
}

/// Inclusive week range from the flags, filled in from the grid bounds
fn resolve_range(
    weeks: &[NaiveDate],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Option<(NaiveDate, NaiveDate)>> {
    if from.is_none() && to.is_none() {
        return Ok(None);
    }

    match (weeks.first(), weeks.last()) {
        (Some(&first), Some(&last)) => Ok(Some((from.unwrap_or(first), to.unwrap_or(last)))),
        _ => anyhow::bail!("Payload has no weeks to slice"),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn category_title(category: RankCategory) -> &'static str {
    match category {
        RankCategory::MostConflictual => "Most Conflictual",
        RankCategory::MostCooperative => "Most Cooperative",
        RankCategory::BiggestShifts => "Biggest Shifts",
    }
}

/// Build the payload from event exports
async fn run_build(
    inputs: Vec<String>,
    mode: RunMode,
    output: Option<PathBuf>,
    countries: Option<PathBuf>,
    top_pairs: Option<usize>,
    weeks: Option<usize>,
) -> Result<()> {
    let output = match output {
        Some(path) => path,
        None => config::payload_path()?,
    };
    let countries = match countries {
        Some(path) => Some(path),
        None => config::countries_path()?,
    };
    let settings = &config::config()?.pipeline;

    let mut opts = BuildOptions::new(output)
        .with_mode(mode.into())
        .with_top_pairs(top_pairs.unwrap_or(settings.top_pairs))
        .with_weeks_history(weeks.unwrap_or(settings.weeks_history));
    if let Some(path) = countries {
        opts = opts.with_countries_file(path);
    }

    eprintln!("📊 Building pulse payload ({} mode)", opts.mode);

    let paths = sources::expand_inputs(&inputs)?;
    let rows = sources::load_events(&paths).await?;
    eprintln!(
        "   {} rows from {} file(s)",
        format_count(rows.len() as u64),
        paths.len()
    );

    let report = pipeline::run(&rows, &opts).await?;

    println!(
        "Mode: {}{}",
        report.mode,
        if report.merged_existing {
            " (merged existing payload)"
        } else {
            ""
        }
    );
    println!(
        "Rows: {} read, {} skipped",
        format_count(report.rows_read as u64),
        format_count(report.rows_skipped as u64)
    );
    println!("Pairs: {}", report.pairs_published);
    println!("Weeks: {}", report.weeks);
    println!(
        "Payload: {} ({} bytes)",
        report.output.display(),
        format_count(report.payload_bytes)
    );

    eprintln!("\n✅ Build completed in {:.1}s", report.elapsed.as_secs_f64());

    Ok(())
}

/// Show ranked pairs for one or all categories
async fn show_top(category: Option<RankKind>, limit: usize, data: Option<PathBuf>) -> Result<()> {
    let path = resolve_payload(data)?;
    let data = load_payload(&path).await?;

    match category {
        Some(kind) => print_ranking(&data, kind.into(), limit),
        None => {
            for (i, category) in RankCategory::ALL.into_iter().enumerate() {
                if i > 0 {
                    println!();
                }
                println!("{}", category_title(category));
                print_ranking(&data, category, limit);
            }
        }
    }

    Ok(())
}

fn print_ranking(data: &PulseData, category: RankCategory, limit: usize) {
    let ranked = data.ranked_pairs(category);

    if ranked.is_empty() {
        println!("  (no ranked pairs)");
        return;
    }

    println!(
        "{:<4} {:<9} {:<32} {:>10} {:>7} {:>8}",
        "#", "PAIR", "COUNTRIES", "EVENTS", "SCORE", "TREND"
    );
    println!("{}", "-".repeat(75));

    for (i, pair) in ranked.iter().take(limit).enumerate() {
        let key = pair.key();
        println!(
            "{:<4} {:<9} {:<32} {:>10} {:>7} {:>8}",
            i + 1,
            key.as_str(),
            truncate(&pair.label, 32),
            format_count(pair.total_events),
            format_goldstein(pair.recent_avg_goldstein),
            format_trend(pair.trend),
        );
    }
}

/// List pairs, optionally filtered by country
async fn list_pairs(query: Option<String>, limit: usize, data: Option<PathBuf>) -> Result<()> {
    let path = resolve_payload(data)?;
    let data = load_payload(&path).await?;

    let needle = query.unwrap_or_default();
    let matches = filter_pairs(&data.pairs, &needle);

    if matches.is_empty() {
        if needle.is_empty() {
            println!("Payload has no pairs. Use 'geopulse build' to create it.");
        } else {
            println!("No pairs match: {}", needle);
        }
        return Ok(());
    }

    println!(
        "{:<9} {:<32} {:>10} {:>7} {:>8}",
        "PAIR", "COUNTRIES", "EVENTS", "SCORE", "TREND"
    );
    println!("{}", "-".repeat(70));

    for pair in matches.iter().take(limit) {
        let key = pair.key();
        println!(
            "{:<9} {:<32} {:>10} {:>7} {:>8}",
            key.as_str(),
            truncate(&pair.label, 32),
            format_count(pair.total_events),
            format_goldstein(pair.recent_avg_goldstein),
            format_trend(pair.trend),
        );
    }

    println!("\nTotal: {} pair(s)", matches.len());

    Ok(())
}

/// Show details of one pair
async fn show_pair(
    pair_str: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    weeks: usize,
    data: Option<PathBuf>,
) -> Result<()> {
    let key: PairKey = pair_str
        .parse()
        .with_context(|| format!("Invalid pair key: {}", pair_str))?;

    let path = resolve_payload(data)?;
    let data = load_payload(&path).await?;

    let pair = data
        .find_pair(&key)
        .ok_or_else(|| anyhow::anyhow!("Pair not found in payload: {}", key))?;

    let pair = match resolve_range(&data.weeks, from, to)? {
        Some((start, end)) => pair.slice(start, end),
        None => pair.clone(),
    };

    // Window stats over the visible slice, not the stored grid totals
    let window = WindowSummary::compute(&pair.data);

    println!("╔{}╗", "═".repeat(62));
    println!("  Pair: {}", key.as_str());
    println!("  Countries: {}", pair.label);
    println!("  Events: {}", format_count(window.total));
    println!(
        "  Recent score: {} ({}-week Goldstein average)",
        format_goldstein(window.recent_avg_goldstein),
        RECENT_WEEKS
    );
    let direction = trend_direction(window.trend);
    if direction.is_empty() {
        println!("  Trend: {}", format_trend(window.trend));
    } else {
        println!("  Trend: {} ({})", format_trend(window.trend), direction);
    }
    if let Some(peak) = &window.peak_conflict {
        println!(
            "  Peak conflict: {} ({} conflictual events)",
            format_week(peak.week),
            format_count(peak.conf)
        );
    }
    if let Some(peak) = &window.peak_cooperation {
        println!(
            "  Peak cooperation: {} ({} cooperative events)",
            format_week(peak.week),
            format_count(peak.coop)
        );
    }
    println!("╚{}╝", "═".repeat(62));

    let tail = &pair.data[pair.data.len().saturating_sub(weeks)..];
    if tail.is_empty() {
        println!("\nNo weeks in the selected window");
        return Ok(());
    }

    println!(
        "\n{:<14} {:>8} {:>7} {:>7} {:>7}",
        "WEEK", "EVENTS", "COOP", "CONF", "SCORE"
    );
    println!("{}", "-".repeat(47));

    for week in tail {
        println!(
            "{:<14} {:>8} {:>7} {:>7} {:>7}",
            format_week(week.week),
            format_count(week.total),
            format_count(week.coop),
            format_count(week.conf),
            format_goldstein(week.avg_goldstein),
        );
    }

    Ok(())
}

/// Show payload metadata and freshness
async fn show_info(data: Option<PathBuf>) -> Result<()> {
    let path = resolve_payload(data)?;
    let data = load_payload(&path).await?;
    let now = Utc::now();

    println!("Payload: {}", path.display());
    println!(
        "Generated: {} ({})",
        data.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        time_ago(data.generated_at, now)
    );
    match (data.weeks.first(), data.weeks.last()) {
        (Some(&first), Some(&last)) => println!(
            "Weeks: {} ({} to {})",
            data.weeks.len(),
            format_week(first),
            format_week(last)
        ),
        _ => println!("Weeks: 0"),
    }
    println!("Pairs: {}", data.pairs.len());
    println!("Countries: {}", data.countries.len());

    if data.is_stale(now) {
        eprintln!(
            "\n⚠️  Payload is older than {} hours. Re-run 'geopulse build' to refresh it.",
            STALE_AFTER_HOURS
        );
    }

    Ok(())
}

/// Export a dashboard view as JSON
async fn export_view(
    query: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    pretty: bool,
    output: Option<PathBuf>,
    data: Option<PathBuf>,
) -> Result<()> {
    let path = resolve_payload(data)?;
    let data = load_payload(&path).await?;

    let mut opts = ViewOptions::default();
    if let Some(q) = query {
        opts = opts.with_query(q);
    }
    if let Some((start, end)) = resolve_range(&data.weeks, from, to)? {
        opts = opts.with_range(start, end);
    }

    let view = PulseView::build(&data, &opts, Utc::now());
    let json = if pretty {
        serde_json::to_string_pretty(&view).context("Failed to serialize view")?
    } else {
        serde_json::to_string(&view).context("Failed to serialize view")?
    };

    match output {
        Some(out) => {
            tokio::fs::write(&out, &json)
                .await
                .with_context(|| format!("Failed to write view to {}", out.display()))?;
            eprintln!("Wrote {} bytes to {}", json.len(), out.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Show the resolved configuration (for debugging)
async fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("╔{}╗", "═".repeat(62));
    println!("  GeoPulse Configuration");
    println!("╚{}╝", "═".repeat(62));
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home (state):  {}", cfg.home.display());
    println!("  Data:          {}", cfg.data.display());
    println!("  Payload:       {}", cfg.payload_path().display());
    match &cfg.countries {
        Some(path) => println!("  Countries:     {}", path.display()),
        None => println!("  Countries:     (none - codes used as labels)"),
    }
    println!();
    println!("Pipeline:");
    println!("  Top pairs:     {}", cfg.pipeline.top_pairs);
    println!("  Weeks history: {}", cfg.pipeline.weeks_history);

    Ok(())
}
