use etl_recon::config::ReconConfig;
use etl_recon::observability::init_logging;
use etl_recon::orchestrator::{QueryMode, ValidationOrchestrator};
use etl_recon::report::ValidationReport;
use etl_recon::synthesizer::TableRef;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "etl-recon")]
#[command(about = "Compile ETL column mappings into source/target reconciliation SQL")]
#[command(version)]
struct Args {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate reconciliation queries for a mapping document
    Generate {
        /// Mapping document (csv, tsv, psv, ssv, xlsx, xls, ods, parquet, json, jsonl)
        mapping: PathBuf,

        /// Target table name
        #[arg(short, long)]
        target_table: String,

        /// Source table name (default: first table detected in the transformations)
        #[arg(short, long)]
        source_table: Option<String>,

        /// Schema of the source table (or set ETL_RECON_SOURCE_SCHEMA)
        #[arg(long)]
        source_schema: Option<String>,

        /// Schema of the target table (or set ETL_RECON_TARGET_SCHEMA)
        #[arg(long)]
        target_schema: Option<String>,

        /// both, source_minus_target or target_minus_source (or set ETL_RECON_MODE)
        #[arg(short, long)]
        mode: Option<QueryMode>,

        /// Write <query>.sql files and report.json here (or set ETL_RECON_OUTPUT_DIR)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Print the JSON report instead of raw SQL
        #[arg(long)]
        json: bool,
    },
    /// Print summary statistics of a mapping document as JSON
    Summary {
        /// Mapping document
        mapping: PathBuf,
    },
    /// Validate a mapping document without generating SQL
    Check {
        /// Mapping document
        mapping: PathBuf,
    },
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let args = Args::parse();
    let config = ReconConfig::from_env().context("Invalid ETL_RECON_* configuration")?;

    let level = if args.verbose { "debug" } else { config.log_level.as_str() };
    init_logging(level);

    match args.command {
        Commands::Generate {
            mapping,
            target_table,
            source_table,
            source_schema,
            target_schema,
            mode,
            output_dir,
            json,
        } => {
            let options = GenerateOptions {
                source_table,
                target_table,
                source_schema: source_schema.or(config.source_schema.clone()),
                target_schema: target_schema.or(config.target_schema.clone()),
                mode: mode.unwrap_or(config.mode),
                output_dir: output_dir.or(config.output_dir.clone()),
                json,
            };
            generate(mapping, options)
        }
        Commands::Summary { mapping } => summary(mapping),
        Commands::Check { mapping } => check(mapping),
    }
}

struct GenerateOptions {
    source_table: Option<String>,
    target_table: String,
    source_schema: Option<String>,
    target_schema: Option<String>,
    mode: QueryMode,
    output_dir: Option<PathBuf>,
    json: bool,
}

fn load(mapping: &Path) -> Result<ValidationOrchestrator> {
    let mut orchestrator = ValidationOrchestrator::new();
    orchestrator
        .load(mapping)
        .with_context(|| format!("Failed to load mapping document {}", mapping.display()))?;
    Ok(orchestrator)
}

fn generate(mapping: PathBuf, options: GenerateOptions) -> Result<()> {
    let orchestrator = load(&mapping)?;
    let summary = orchestrator.get_summary();

    let source_name = options
        .source_table
        .unwrap_or_else(|| orchestrator.default_source_table());
    let source = TableRef::qualified(source_name, options.source_schema.as_deref());
    let target = TableRef::qualified(options.target_table, options.target_schema.as_deref());

    info!("Source table: {}", source);
    info!("Target table: {}", target);
    info!("Total mappings: {}", summary.total_mappings);

    let queries = orchestrator.generate_validation_queries(&source, &target, options.mode)?;
    let report = ValidationReport::new(Some(mapping), source, target, options.mode, summary, queries);

    if let Some(dir) = &options.output_dir {
        for path in report.write_to_dir(dir)? {
            info!("Wrote {}", path.display());
        }
    }

    if options.json {
        println!("{}", report.to_json()?);
    } else if options.output_dir.is_none() {
        // `complete` already holds both directions
        match report.queries.complete() {
            Some(complete) => println!("{}", complete),
            None => {
                for sql in report.queries.queries.values() {
                    println!("{}", sql);
                }
            }
        }
    }

    Ok(())
}

fn summary(mapping: PathBuf) -> Result<()> {
    let orchestrator = load(&mapping)?;
    println!("{}", serde_json::to_string_pretty(&orchestrator.get_summary())?);
    Ok(())
}

fn check(mapping: PathBuf) -> Result<()> {
    let orchestrator = load(&mapping)?;
    let summary = orchestrator.get_summary();
    println!(
        "[OK] {}: {} mapping(s), {} target column(s), source tables: {}",
        mapping.display(),
        summary.total_mappings,
        summary.target_columns.len(),
        if summary.detected_source_tables.is_empty() {
            "none".to_string()
        } else {
            summary.detected_source_tables.join(", ")
        }
    );
    Ok(())
}
