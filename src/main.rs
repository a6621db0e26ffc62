use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use diff_exporter::models::available_workers;
use diff_exporter::{AppConfig, ExportOutcome, ExportRequest, ExportSession, ProgressCallback};
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::runtime::Handle;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

const TAG_ENV_VAR: &str = "DIFF_EXPORT_TAG";

#[derive(Debug)]
struct CliOptions {
    app: AppConfig,
    request: ExportRequest,
    show_process_time: bool,
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Diff Exporter")
        .version("1.0")
        .about("Copies hand-edited source files out of a large tree, preserving their layout")
        .arg(
            Arg::new("input-dir")
                .long("input-dir")
                .value_name("DIR")
                .help("Source tree to scan")
                .required(true),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .value_name("DIR")
                .help("Existing directory that receives the exported files")
                .required(true),
        )
        .arg(
            Arg::new("tag")
                .long("tag")
                .value_name("TAG")
                .help("Marker string identifying edited files (falls back to DIFF_EXPORT_TAG)"),
        )
        .arg(
            Arg::new("workers")
                .long("workers")
                .value_name("N")
                .help("Number of concurrent workers (defaults to available parallelism)")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Set the log level (trace, debug, info, warn, error)")
                .default_value("info"),
        )
        .arg(
            Arg::new("show-process-time")
                .long("show-process-time")
                .help("Print the wall-clock time of the export")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the export outcome as JSON")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    load_environment_variables();

    let options = create_cli_options(&matches)?;

    initialize_logging(&options.app.log_level)?;

    run_application(options).await
}

/// Build the options from CLI arguments and the environment
fn create_cli_options(matches: &clap::ArgMatches) -> Result<CliOptions> {
    let input_dir = matches
        .get_one::<String>("input-dir")
        .context("Missing --input-dir")?;

    let output_dir = matches
        .get_one::<String>("output-dir")
        .context("Missing --output-dir")?;

    let tag = match matches.get_one::<String>("tag") {
        Some(tag) => tag.clone(),
        None => env::var(TAG_ENV_VAR)
            .ok()
            .filter(|tag| !tag.is_empty())
            .with_context(|| format!("Provide --tag or set {}", TAG_ENV_VAR))?,
    };

    let workers = matches
        .get_one::<usize>("workers")
        .copied()
        .unwrap_or_else(available_workers);

    let log_level = matches
        .get_one::<String>("log-level")
        .cloned()
        .unwrap_or_else(|| AppConfig::default().log_level);

    Ok(CliOptions {
        app: AppConfig {
            log_level,
            ..AppConfig::default()
        },
        request: ExportRequest::new(input_dir, output_dir, tag, workers),
        show_process_time: matches.get_flag("show-process-time"),
        json: matches.get_flag("json"),
    })
}

/// Initialize structured logging with tracing
fn initialize_logging(log_level: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("walkdir=warn".parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}

/// Load a .env file if it exists
fn load_environment_variables() {
    let _ = dotenvy::dotenv();
}

async fn run_application(options: CliOptions) -> Result<()> {
    info!("Starting diff export");
    info!("Configuration: {:#?}", options.app);

    let started = Instant::now();
    let session = ExportSession::with_config(Handle::current(), options.app.export.clone());

    let last_remaining = AtomicUsize::new(usize::MAX);
    let quiet = options.json;
    let on_progress: ProgressCallback = Box::new(move |total: usize, remaining: usize| {
        if !quiet && last_remaining.swap(remaining, Ordering::Relaxed) != remaining {
            println!("{}/{}", remaining, total);
        }
    });

    let handle = session
        .try_start(options.request, Some(on_progress), None)
        .context("Export did not start")?;

    let outcome = handle.wait().await?;
    print_outcome(&outcome);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    if options.show_process_time {
        println!("{:.3}", started.elapsed().as_secs_f64());
    }

    Ok(())
}

fn print_outcome(outcome: &ExportOutcome) {
    info!("=== EXPORT REPORT ===");
    info!("Run: {}", outcome.run_id);
    info!("Entries discovered: {}", outcome.total_discovered);
    info!("Candidates inspected: {}", outcome.candidates);
    info!("Files exported: {}", outcome.copied);
    info!("Untagged candidates: {}", outcome.untagged);
    info!("Elapsed: {} ms", outcome.elapsed().num_milliseconds());

    if !outcome.failures.is_empty() {
        error!("Export errors encountered:");
        for failure in &outcome.failures {
            error!("  {}: {}", failure.source, failure.error);
        }
    }
}
