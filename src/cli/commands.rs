//! Command handlers for the shmupfetch CLI
//!
//! This module implements the command handlers that turn CLI arguments and
//! configuration into a running pipeline.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::batch::{cancellation_channel, format_bytes};
use crate::app::records::emit_all;
use crate::app::{
    BatchRunner, CatalogClient, CatalogEntry, CatalogStore, DeveloperRun, DownloadOrchestrator,
    EntryOutcome, GameRecord, HttpHandler, InventoryScanner, JsonFileStore, Pipeline,
    SignalHandler, SurveyReport,
};
use crate::cli::args::{FetchArgs, GenerateArgs, OutputFormat, ScanArgs};
use crate::cli::output::sink_for;
use crate::cli::progress;
use crate::config::{AppConfig, RuntimeConfig};
use crate::errors::{AppError, Result};

/// Handle the developers command
pub async fn handle_developers(config: &AppConfig) -> Result<()> {
    let runtime = config.to_runtime_config()?;
    for (name, paths) in &runtime.catalog.developers {
        println!("{:<16} {} manufacturer path(s)", name, paths.len());
    }
    Ok(())
}

/// Handle the fetch command
///
/// Refreshes the catalog for one or all developers, reconciles against the
/// destination, downloads the selection and emits records for new artifacts.
pub async fn handle_fetch(args: FetchArgs, mut config: AppConfig) -> Result<()> {
    args.validate().map_err(AppError::generic)?;
    if let Some(output) = &args.output {
        config.paths.destination = output.clone();
    }
    if let Some(workers) = args.workers {
        config.download.workers = workers;
    }
    let runtime = config.to_runtime_config()?;
    let options = args.options();

    let (cancel_tx, cancel_rx) = cancellation_channel();
    let signals = SignalHandler::new(cancel_tx).spawn();

    let bar = progress::entry_bar();
    let client = build_client(&runtime).await?;
    let orchestrator = Arc::new(DownloadOrchestrator::new(
        client.clone(),
        runtime.download.clone(),
    ));
    let runner = BatchRunner::new(
        orchestrator,
        &runtime.destination,
        runtime.workers,
        cancel_rx,
    )
    .with_progress(bar.clone());
    let pipeline = build_pipeline(client, runner, &runtime);

    let survey = if args.all {
        pipeline.run_all(&options).await
    } else {
        let developer = args.developer.as_deref().unwrap_or_default();
        let run = pipeline.run_developer(developer, &options).await;
        match run {
            Ok(run) => SurveyReport {
                runs: vec![run],
                failures: Vec::new(),
            },
            Err(e) => {
                bar.finish_and_clear();
                signals.abort();
                return Err(e);
            }
        }
    };
    bar.finish_and_clear();
    signals.abort();

    let stdout = io::stdout();
    if options.dry_run {
        print_selection(&survey, args.format, stdout.lock())?;
    } else {
        let records: Vec<GameRecord> = survey
            .runs
            .iter()
            .flat_map(|run| pipeline.records(run))
            .collect();
        let mut sink = sink_for(args.format, stdout.lock());
        emit_all(sink.as_mut(), &records)?;
    }

    print_survey(&survey);

    let failed: usize = survey
        .runs
        .iter()
        .filter_map(|run| run.summary.as_ref())
        .map(|summary| summary.failed())
        .sum();
    if !survey.failures.is_empty() && survey.runs.is_empty() {
        return Err(AppError::generic("No developer could be listed"));
    }
    if failed > 0 {
        warn!("{} game(s) failed to download", failed);
    }
    Ok(())
}

/// Handle the scan command
pub async fn handle_scan(args: ScanArgs, mut config: AppConfig) -> Result<()> {
    if let Some(output) = &args.output {
        config.paths.destination = output.clone();
    }
    let runtime = config.to_runtime_config()?;

    let spinner = progress::spinner(format!("Scanning {}", runtime.destination.display()));
    let scanner = InventoryScanner::new(runtime.download.archive_extension.clone());
    let report = scanner.scan(&runtime.destination).await;
    spinner.finish_and_clear();
    let report = report?;

    let store = open_store(&runtime.catalog_file).await;
    let cached = store.list().await?;
    let known = cached
        .iter()
        .filter(|entry| report.contains(&entry.identifier))
        .count();

    println!("Inventory: {}", runtime.destination.display());
    println!("  ROM sets:        {}", report.records.len());
    println!("  Total size:      {}", format_bytes(report.total_size()));
    if report.unparsed > 0 {
        println!("  Unrecognized:    {}", report.unparsed);
    }
    println!("Catalog store: {}", store.path().display());
    println!("  Cached entries:  {}", cached.len());
    println!("  Owned & cached:  {}", known);
    Ok(())
}

/// Handle the generate command
pub async fn handle_generate(args: GenerateArgs, mut config: AppConfig) -> Result<()> {
    if let Some(output) = &args.output {
        config.paths.destination = output.clone();
    }
    let runtime = config.to_runtime_config()?;

    let (_cancel_tx, cancel_rx) = cancellation_channel();
    let client = build_client(&runtime).await?;
    let orchestrator = Arc::new(DownloadOrchestrator::new(
        client.clone(),
        runtime.download.clone(),
    ));
    let runner = BatchRunner::new(orchestrator, &runtime.destination, 1, cancel_rx);
    let pipeline = build_pipeline(client, runner, &runtime);

    let records = pipeline.owned_records().await?;
    info!("{} owned game(s) known to the catalog store", records.len());

    let stdout = io::stdout();
    let mut sink = sink_for(args.format, stdout.lock());
    emit_all(sink.as_mut(), &records)?;
    Ok(())
}

/// Open the catalog store, starting empty if the file is unreadable
async fn open_store(path: &Path) -> JsonFileStore {
    match JsonFileStore::open(path).await {
        Ok(store) => store,
        Err(e) => {
            warn!("{}; starting with an empty catalog store", e);
            JsonFileStore::empty(path)
        }
    }
}

async fn build_client(runtime: &RuntimeConfig) -> Result<Arc<CatalogClient>> {
    let transport = Arc::new(HttpHandler::from_config(&runtime.client)?);
    let store = Arc::new(open_store(&runtime.catalog_file).await);
    Ok(Arc::new(CatalogClient::new(
        transport,
        store,
        runtime.catalog.clone(),
        runtime.retry.clone(),
    )))
}

fn build_pipeline(
    client: Arc<CatalogClient>,
    runner: BatchRunner,
    runtime: &RuntimeConfig,
) -> Pipeline {
    Pipeline::new(
        client,
        InventoryScanner::new(runtime.download.archive_extension.clone()),
        runner,
        PathBuf::from(&runtime.destination),
        runtime.orientation.clone(),
    )
}

fn print_selection(
    survey: &SurveyReport,
    format: OutputFormat,
    mut out: impl Write,
) -> Result<()> {
    let selected = survey.runs.iter().flat_map(|run| run.selected.iter());
    match format {
        OutputFormat::Json => {
            for entry in selected {
                serde_json::to_writer(&mut out, entry).map_err(io::Error::from)?;
                writeln!(out)?;
            }
        }
        OutputFormat::Text => {
            for entry in selected {
                writeln!(out, "{}", describe(entry))?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn describe(entry: &CatalogEntry) -> String {
    let size = match entry.known_size() {
        0 => "size unknown".to_string(),
        bytes => format_bytes(bytes),
    };
    format!(
        "{:<12} {} ({}, {})",
        entry.identifier, entry.display_name, entry.developer, size
    )
}

/// Per-developer totals on stderr, keeping stdout for records
fn print_survey(survey: &SurveyReport) {
    for run in &survey.runs {
        eprintln!("{}", describe_run(run));
        if let Some(summary) = &run.summary {
            for report in &summary.reports {
                if let EntryOutcome::Failed { reason } = &report.outcome {
                    eprintln!("  ✗ {}: {}", report.identifier, reason);
                }
            }
        }
    }
    for (developer, reason) in &survey.failures {
        eprintln!("{}: unavailable ({})", developer, reason);
    }
}

fn describe_run(run: &DeveloperRun) -> String {
    let mut line = format!(
        "{}: {} listed, {} owned, {} selected",
        run.developer,
        run.listed,
        run.present,
        run.selected.len()
    );
    if run.skipped > 0 {
        line.push_str(&format!(", {} unreadable", run.skipped));
    }
    if let Some(summary) = &run.summary {
        line.push_str(&format!(
            " | {} ({})",
            summary.summary(),
            format_bytes(summary.bytes_fetched())
        ));
    }
    line
}
