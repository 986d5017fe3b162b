//! Playmart CLI - build a star-schema analytics mart from raw CSV extracts
//!
//! # Main Commands
//!
//! ```bash
//! playmart run                      # Full pipeline: load -> check -> build -> report
//! playmart check                    # Load raw sources and run quality checks only
//! playmart build                    # Stop after building and persisting the star schema
//! playmart report                   # Recompute insights from persisted artifacts
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! playmart sources                  # List configured sources and whether they exist
//! playmart parse user               # Parse one raw source and dump it as JSON
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use playmart::{parse_csv_file_auto, pipeline, OutputFormat, PipelineConfig, SourceName};

#[derive(Parser)]
#[command(name = "playmart")]
#[command(about = "Build a star-schema analytics mart from game platform CSV extracts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ConfigArgs {
    /// Directory holding the raw CSV extracts
    #[arg(long)]
    raw_dir: Option<PathBuf>,

    /// Root directory for processed dimension/fact artifacts
    #[arg(long)]
    processed_dir: Option<PathBuf>,

    /// Output path for the Markdown analysis report
    #[arg(long)]
    report: Option<PathBuf>,

    /// Artifact serialization format: jsonl or csv
    #[arg(long)]
    format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: load, check, build, report
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        /// Activity cutoff as RFC 3339 (default: now). Pins is_active.
        #[arg(long)]
        as_of: Option<String>,
    },

    /// Load raw sources and run quality checks only
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Load, check, and build the star schema without the report
    Build {
        #[command(flatten)]
        config: ConfigArgs,

        /// Activity cutoff as RFC 3339 (default: now). Pins is_active.
        #[arg(long)]
        as_of: Option<String>,
    },

    /// Recompute the insight report from persisted artifacts
    Report {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// List configured sources and whether their files exist
    Sources {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Parse one raw source and dump it as JSON
    Parse {
        /// Source name (e.g. user, plan, play_session)
        source: String,

        #[command(flatten)]
        config: ConfigArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, as_of } => cmd_run(config, as_of),
        Commands::Check { config } => cmd_check(config),
        Commands::Build { config, as_of } => cmd_build(config, as_of),
        Commands::Report { config } => cmd_report(config),
        Commands::Sources { config } => cmd_sources(config),
        Commands::Parse { source, config, output } => cmd_parse(&source, config, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Apply CLI overrides on top of env-derived configuration.
fn resolve_config(args: ConfigArgs) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = PipelineConfig::from_env();
    if let Some(raw_dir) = args.raw_dir {
        config.raw_dir = raw_dir;
    }
    if let Some(processed_dir) = args.processed_dir {
        config.processed_dir = processed_dir;
    }
    if let Some(report) = args.report {
        config.report_path = report;
    }
    if let Some(format) = args.format {
        config.output_format = OutputFormat::from_str(&format)?;
    }
    Ok(config)
}

fn resolve_as_of(as_of: Option<String>) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    match as_of {
        Some(raw) => {
            let parsed = DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| format!("invalid --as-of '{}': {}", raw, e))?;
            Ok(parsed.with_timezone(&Utc))
        }
        None => Ok(Utc::now()),
    }
}

fn cmd_run(args: ConfigArgs, as_of: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    let as_of = resolve_as_of(as_of)?;

    let summary = pipeline::run(&config, as_of)?;
    eprintln!(
        "Done: {} sources loaded, {} checks passed, report at {}",
        summary.sources_loaded,
        summary.quality.total_passed,
        summary.report_path.display()
    );
    Ok(())
}

fn cmd_check(args: ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;

    let summary = pipeline::check(&config)?;
    eprintln!("All {} quality checks passed", summary.total_passed);
    Ok(())
}

fn cmd_build(args: ConfigArgs, as_of: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    let as_of = resolve_as_of(as_of)?;

    pipeline::build(&config, as_of)?;
    eprintln!("Star schema built under {}", config.processed_dir.display());
    Ok(())
}

fn cmd_report(args: ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;

    pipeline::report(&config)?;
    eprintln!("Report written to {}", config.report_path.display());
    Ok(())
}

fn cmd_sources(args: ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;

    eprintln!("Raw directory: {}", config.raw_dir.display());
    for source in SourceName::ALL {
        let path = config.source_path(source);
        let marker = if path.exists() { "found" } else { "MISSING" };
        eprintln!("  {:<18} {:<28} {}", source.as_str(), source.file_name(), marker);
    }
    Ok(())
}

fn cmd_parse(
    source: &str,
    args: ConfigArgs,
    output: Option<&std::path::Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    let source = SourceName::from_str(source)?;
    let path = config.source_path(source);

    eprintln!("Parsing {}", path.display());
    let parsed = parse_csv_file_auto(&path)?;
    eprintln!("   Encoding: {}", parsed.encoding);
    eprintln!(
        "   Delimiter: '{}'",
        match parsed.delimiter {
            '\t' => "\\t".to_string(),
            c => c.to_string(),
        }
    );
    eprintln!("   Columns: {}", parsed.table.columns().join(", "));
    eprintln!("Parsed {} records", parsed.table.len());

    let json = serde_json::to_string_pretty(parsed.table.rows())?;
    match output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{}", json),
    }
    Ok(())
}
