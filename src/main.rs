use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Parser;
use colored::*;
use tracing::error;

use dmp_import::bad_data::{BadDataMode, ReportWriter};
use dmp_import::config::load_config;
use dmp_import::dedup::DuplicatePolicy;
use dmp_import::export::CleanedWriter;
use dmp_import::logging::init_logging;
use dmp_import::pipeline::{run_import, run_pre_analysis, AnalysisReport, ImportOptions, ImportSummary};
use dmp_import::source::fetch_source;
use dmp_import::store::{CatalogStore, PgStore};
use dmp_import::ImportError;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "dmp-import", about = "Import song plays from a CSV into the DMP database")]
struct Args {
    /// URL (or local path) of the CSV to import
    #[arg(long)]
    url: String,

    /// Path to the database configuration YAML file
    #[arg(long)]
    config: PathBuf,

    /// Remove duplicate UNIQUE_IDs instead of just reporting them
    #[arg(long, alias = "remove-duplicates")]
    no_duplicate: bool,

    /// Only analyse the data and write the bad data report
    #[arg(long)]
    pre_analysis: bool,

    /// How to handle bad rows (dropped with a log entry when omitted)
    #[arg(long, value_enum)]
    handle_bad_data: Option<BadDataMode>,

    /// Directory for bad data reports
    #[arg(long, default_value = ".")]
    report_dir: PathBuf,

    /// Where to save the rows that passed validation
    #[arg(long, default_value = "cleaned_data.csv")]
    cleaned_output: PathBuf,

    /// Append-only action/error log
    #[arg(long, default_value = "app.log")]
    log_file: PathBuf,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn count(n: u64) -> ColoredString {
    if n > 0 {
        n.to_string().yellow()
    } else {
        "0".normal()
    }
}

fn print_summary(summary: &ImportSummary, report: Option<&Path>, elapsed: Duration) {
    println!();
    println!("Summary:");
    println!("  Rows       : {}", summary.total_rows.to_string().bright_white());
    println!("  Valid      : {}", summary.valid_rows.to_string().green());
    println!("  Malformed  : {}", count(summary.malformed_rows));
    println!(
        "  Duplicates : {} removed, {} kept",
        count(summary.duplicates_dropped),
        count(summary.duplicates_kept)
    );
    println!(
        "  Bad rows   : {} reported, {} inserted, {} dropped",
        summary.bad_rows_reported, summary.bad_rows_inserted, summary.bad_rows_dropped
    );
    println!("  Songs      : {} inserted", summary.songs_inserted.to_string().green());
    println!("  Artists    : {} created", summary.artists_created.to_string().green());
    if summary.constraint_violations > 0 {
        println!(
            "  Skipped    : {} (UNIQUE_ID already stored)",
            summary.constraint_violations.to_string().red()
        );
    }
    if let Some(path) = report {
        println!("  Report     : {}", path.display().to_string().bright_white());
    }
    println!("  Time       : {:.2}s", elapsed.as_secs_f64());
}

fn print_analysis(analysis: &AnalysisReport, report: &Path, elapsed: Duration) {
    println!();
    println!("Pre-analysis:");
    println!("  Rows       : {}", analysis.total_rows.to_string().bright_white());
    println!("  Malformed  : {}", count(analysis.malformed.len() as u64));
    for (line, reason) in analysis.malformed.iter().take(10) {
        println!("    {} line {}: {}", "→".bright_black(), line, reason);
    }
    if analysis.malformed.len() > 10 {
        println!("    {} ... {} more", "→".bright_black(), analysis.malformed.len() - 10);
    }
    println!("  Duplicates : {}", count(analysis.duplicate_rows));
    println!("  Report     : {}", report.display().to_string().bright_white());
    println!("  Time       : {:.2}s", elapsed.as_secs_f64());
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

async fn run(args: &Args) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(&args.config)?;
    println!("Database   : {}", config.display_target().bright_white());

    let text = fetch_source(&args.url, Duration::from_secs(args.timeout)).await?;
    println!("  {} Fetched {} bytes", "✓".green(), text.len());

    if args.pre_analysis {
        let mut report = ReportWriter::create_in(&args.report_dir)?;
        let analysis = run_pre_analysis(&text, Some(&mut report))?;
        let path = report.finish()?;
        print_analysis(&analysis, &path, start.elapsed());
        return Ok(());
    }

    let options = ImportOptions {
        duplicates: if args.no_duplicate {
            DuplicatePolicy::Remove
        } else {
            DuplicatePolicy::Keep
        },
        bad_data: args.handle_bad_data.unwrap_or_default(),
    };

    let mut store = PgStore::connect(&config).await?;
    println!("  {} Connected", "✓".green());

    let mut report = match options.bad_data {
        BadDataMode::Report => Some(ReportWriter::create_in(&args.report_dir)?),
        _ => None,
    };
    let mut cleaned = CleanedWriter::create(&args.cleaned_output)?;

    let result = async {
        let summary =
            run_import(&mut store, &text, options, report.as_mut(), Some(&mut cleaned)).await?;
        let artists = store.count_artists().await?;
        let songs = store.count_songs().await?;
        Ok::<_, ImportError>((summary, artists, songs))
    }
    .await;
    store.close().await;
    let (summary, artists, songs) = result?;

    cleaned.finish()?;
    let report_path = report.map(ReportWriter::finish).transpose()?;
    print_summary(&summary, report_path.as_deref(), start.elapsed());
    println!(
        "  Stored     : {} artists, {} songs in total",
        artists.to_string().bright_white(),
        songs.to_string().bright_white()
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_file) {
        eprintln!("Cannot open {}: {}", args.log_file.display(), e);
        std::process::exit(1);
    }

    println!("{}", "DMP CSV Import".bright_cyan().bold());
    println!("{}", "==============".bright_black());
    println!("Source     : {}", args.url.bright_white());
    if args.pre_analysis {
        println!("Mode       : {}", "pre-analysis (no database writes)".yellow());
    }
    if args.no_duplicate {
        println!("Duplicates : {}", "remove".yellow());
    }
    if let Some(mode) = args.handle_bad_data {
        println!("Bad data   : {}", format!("{:?}", mode).to_lowercase().yellow());
    }

    if let Err(e) = run(&args).await {
        error!("{:#}", e);
        eprintln!("{} {:#}", "✗".red(), e);
        std::process::exit(1);
    }

    println!();
    println!("{} Done", "✓".green());
}
