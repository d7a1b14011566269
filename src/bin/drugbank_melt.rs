//! drugbank-melt: Flatten a DrugBank XML export into relational tables
//!
//! Usage:
//!   # Read from file, write one CSV per table
//!   drugbank-melt full_database.xml --output-dir ./drugbank_csvs
//!
//!   # Only the tables the SQLite loader needs, as JSON Lines
//!   drugbank-melt full_database.xml -o ./out --ruleset restricted --format jsonl
//!
//!   # Read from stdin, output to stdout as a single tagged JSON Lines stream
//!   cat full_database.xml | drugbank-melt

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use drugbank_melt::melt::{
    DrugBankMelter, MeltConfig, MeltSummary, OutputFormat, RuleSet, SingleWriter, TableWriter, Tables,
    WrittenTable,
};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Jsonl,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => OutputFormat::Csv,
            Format::Jsonl => OutputFormat::JsonLines,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Rules {
    /// Every table the export can be flattened into
    Full,
    /// Core info, references, synonyms, mixtures and interactions
    Restricted,
}

impl From<Rules> for RuleSet {
    fn from(rules: Rules) -> Self {
        match rules {
            Rules::Full => RuleSet::Full,
            Rules::Restricted => RuleSet::Restricted,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "drugbank-melt")]
#[command(about = "Flatten a DrugBank XML export into relational tables", long_about = None)]
struct Args {
    /// Input XML file (use stdin if omitted)
    #[arg(value_name = "FILE", env = "DRUGBANK_XML")]
    input: Option<PathBuf>,

    /// Output directory for one file per table
    /// If omitted, writes to stdout as a single stream tagged with `_table`
    #[arg(long, short = 'o', env = "DRUGBANK_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Table file format
    #[arg(long, value_enum, default_value = "csv")]
    format: Format,

    /// Which extraction rules to apply
    #[arg(long, value_enum, default_value = "full")]
    ruleset: Rules,

    /// Namespace record elements must be bound to (default: http://www.drugbank.ca)
    #[arg(long, conflicts_with = "no_namespace")]
    namespace: Option<String>,

    /// Accept records in any namespace
    #[arg(long)]
    no_namespace: bool,

    /// Local name of the record element (default: "drug")
    #[arg(long)]
    record_tag: Option<String>,

    /// Log progress every N records, 0 to disable (default: 1000)
    #[arg(long)]
    progress_interval: Option<usize>,

    /// Write a JSON run report (counters and written tables) to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report<'a> {
    input: Option<&'a Path>,
    summary: &'a MeltSummary,
    tables: &'a [WrittenTable],
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();

    // Build config
    let mut config = MeltConfig {
        ruleset: args.ruleset.into(),
        ..MeltConfig::default()
    };
    if let Some(namespace) = args.namespace {
        config.namespace = Some(namespace);
    }
    if args.no_namespace {
        config.namespace = None;
    }
    if let Some(tag) = args.record_tag {
        config.record_tag = tag;
    }
    if let Some(interval) = args.progress_interval {
        config.progress_interval = interval;
    }

    let (tables, summary) = melt(args.input.as_deref(), config)?;
    info!(
        records = summary.records,
        melted = summary.melted,
        skipped = summary.skipped,
        failures = summary.failures,
        tables = tables.table_names().len(),
        "melt finished"
    );

    // Process based on output mode
    let written = if let Some(output_dir) = &args.output_dir {
        let writer = TableWriter::new(output_dir, args.format.into())?;
        let written = writer.write_tables(&tables)?;
        info!(tables = written.len(), dir = %output_dir.display(), "output complete");
        written
    } else {
        let stdout = std::io::stdout();
        let mut writer = SingleWriter::new(stdout.lock());
        writer.write_tables(&tables)?;
        writer.flush()?;
        Vec::new()
    };

    if let Some(report_path) = &args.report {
        let report = Report {
            input: args.input.as_deref(),
            summary: &summary,
            tables: &written,
        };
        let file = File::create(report_path)
            .with_context(|| format!("Failed to create report {}", report_path.display()))?;
        serde_json::to_writer_pretty(file, &report).context("Failed to write report")?;
        info!(report = %report_path.display(), "report written");
    }

    Ok(())
}

fn melt(input: Option<&Path>, config: MeltConfig) -> Result<(Tables, MeltSummary)> {
    let melter = DrugBankMelter::new(config);

    match input {
        Some(path) => {
            info!(input = %path.display(), "reading drugbank xml");
            melter
                .melt_file(path)
                .with_context(|| format!("Failed to melt {}", path.display()))
        }
        None => {
            info!("reading drugbank xml from stdin");
            let mut tables = Tables::new();
            let summary = melter
                .melt_reader(std::io::stdin().lock(), &mut tables)
                .context("Failed to melt stdin")?;
            Ok((tables, summary))
        }
    }
}
