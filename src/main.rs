use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use wikiload::csv_sink::CsvSink;
use wikiload::import::{import_dump, ImportOptions};
use wikiload::jsonl_sink::JsonlSink;
use wikiload::progress::{NoProgress, ProgressReporter, SpinnerProgress};
use wikiload::sink::{NullSink, Sink};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "wikiload")]
#[command(about = "Load MediaWiki XML dumps into relational or document stores")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a dump, storing namespaces, pages, contributors and revisions
    Import(ImportArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum SinkKind {
    /// One CSV table per record type (output is a directory)
    Csv,
    /// Tagged JSON lines (output is a file)
    Jsonl,
    /// Discard records; with -vv each record is logged
    Null,
}

#[derive(Args)]
struct ImportArgs {
    /// Path to the dump file (.xml or .xml.bz2)
    #[arg(short, long)]
    input: PathBuf,

    /// Storage backend
    #[arg(long, value_enum, default_value_t = SinkKind::Csv)]
    sink: SinkKind,

    /// Output directory (csv) or file (jsonl)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Limit number of pages to process (for testing)
    #[arg(long)]
    limit: Option<u64>,

    /// Disable the progress spinner
    #[arg(long)]
    no_progress: bool,
}

fn build_sink(args: &ImportArgs, verbose: u8) -> Result<Box<dyn Sink>> {
    let sink: Box<dyn Sink> = match args.sink {
        SinkKind::Csv => {
            let Some(dir) = &args.output else {
                bail!("--output <DIR> is required for the csv sink");
            };
            Box::new(
                CsvSink::create(dir)
                    .with_context(|| format!("Failed to create CSV tables in {}", dir.display()))?,
            )
        }
        SinkKind::Jsonl => {
            let Some(path) = &args.output else {
                bail!("--output <FILE> is required for the jsonl sink");
            };
            Box::new(
                JsonlSink::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?,
            )
        }
        SinkKind::Null => Box::new(NullSink::new(verbose >= 2)),
    };
    Ok(sink)
}

fn run_import(args: ImportArgs, verbose: u8) -> Result<()> {
    if !args.input.is_file() {
        bail!("Data file is missing or not readable: {}", args.input.display());
    }

    let mut sink = build_sink(&args, verbose)?;
    let mut progress: Box<dyn ProgressReporter> = if args.no_progress {
        Box::new(NoProgress)
    } else {
        Box::new(SpinnerProgress::new())
    };
    let options = ImportOptions {
        limit: args.limit,
        ..Default::default()
    };

    let start = Instant::now();
    let stats = import_dump(&args.input, &mut sink, progress.as_mut(), &options)
        .with_context(|| format!("Import of {} aborted", args.input.display()))?;
    let duration = start.elapsed();

    println!();
    println!("=== Summary ===");
    println!("Total time:         {:.2}s", duration.as_secs_f64());
    println!();
    println!("Namespaces saved:   {}", stats.namespaces_saved);
    println!("Pages processed:    {}", stats.pages_processed);
    println!("Pages saved:        {}", stats.pages_saved);
    println!("Revisions saved:    {}", stats.revisions_saved);
    println!("Pages skipped:      {}", stats.pages_skipped);
    println!("Sink failures:      {}", stats.sink_failures);
    println!("Stray close tags:   {}", stats.stray_close_markers);
    println!("Lines read:         {}", stats.lines_read);
    if stats.cancelled {
        println!("Run was cancelled before the end of the dump.");
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
    }

    let result = match cli.command {
        Commands::Import(args) => run_import(args, cli.verbose),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
