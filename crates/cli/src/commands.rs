use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{error, info};

use invoice_dedup_core::InboxScanner;
use invoice_dedup_pipeline::{
    similarity_label, BatchReport, DedupEngine, PipelineCoordinator, Poller,
};

use crate::config::AppConfig;

pub fn run(config: &AppConfig) -> Result<()> {
    let coordinator = coordinator(config)?;
    let scanner = scanner(config)?;
    let poller = Poller::new(scanner, &coordinator, config.poll_interval());
    let Some(report) = poller.poll_once()? else {
        println!("inbox {} is empty", config.storage.inbox.display());
        return Ok(());
    };
    print_report(&report);
    if report.failed_count() > 0 {
        bail!(
            "{} of {} invoices failed",
            report.failed_count(),
            report.len()
        );
    }
    Ok(())
}

pub fn watch(config: &AppConfig, interval: Option<u64>, max_polls: Option<usize>) -> Result<()> {
    let interval = match interval {
        Some(0) => bail!("--interval must be positive"),
        Some(secs) => Duration::from_secs(secs),
        None => config.poll_interval(),
    };
    let coordinator = coordinator(config)?;
    let poller = Poller::new(scanner(config)?, &coordinator, interval);
    info!(
        interval_secs = interval.as_secs(),
        max_polls = ?max_polls,
        "watching inbox"
    );
    let polls = poller.run(max_polls);
    info!(polls, "watch finished");
    Ok(())
}

pub fn init_index(config: &AppConfig) -> Result<()> {
    let engine = dedup_engine(config)?;
    engine.ensure_index().context("failed to initialise index")?;
    let schema = engine.schema();
    println!(
        "index {} ready (dimension {}, metric {}, algorithm {})",
        schema.name,
        schema.dimension,
        schema.metric.as_str(),
        schema.algorithm.as_str()
    );
    Ok(())
}

pub fn scan(config: &AppConfig) -> Result<()> {
    let items = scanner(config)?.scan()?;
    for item in &items {
        println!("{}", item.path().display());
    }
    info!(files = items.len(), "scan complete");
    Ok(())
}

pub fn stats(config: &AppConfig) -> Result<()> {
    let index = config.index.open()?;
    let name = &config.index.settings.name;
    let Some(schema) = index.schema(name)? else {
        println!("index {name} does not exist; run `invoice-dedup init-index`");
        return Ok(());
    };
    println!("index:      {}", schema.name);
    println!("prefix:     {}", schema.prefix);
    println!("dimension:  {}", schema.dimension);
    println!("datatype:   {}", schema.datatype.as_str());
    println!("metric:     {}", schema.metric.as_str());
    println!("algorithm:  {}", schema.algorithm.as_str());
    println!("entries:    {}", index.len(name)?);
    Ok(())
}

fn coordinator(config: &AppConfig) -> Result<PipelineCoordinator> {
    let recognizer = config
        .ocr
        .service
        .build()
        .context("failed to configure recognition service")?;
    let embedder = config
        .embedding
        .service
        .build(config.index.settings.dimension)
        .context("failed to configure embedding service")?;
    let index = config.index.open()?;
    let coordinator =
        PipelineCoordinator::new(&config.pipeline_config(), recognizer, embedder, index)?;
    Ok(coordinator)
}

fn dedup_engine(config: &AppConfig) -> Result<DedupEngine> {
    let settings = &config.index.settings;
    Ok(DedupEngine::new(
        config.index.open()?,
        settings.schema(),
        settings.similarity_bound,
        &config.storage.processed,
        &config.storage.duplicates,
    ))
}

fn scanner(config: &AppConfig) -> Result<InboxScanner> {
    Ok(InboxScanner::new(
        &config.storage.inbox,
        &config.storage.pattern,
    )?)
}

fn print_report(report: &BatchReport) {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(dedup) => println!(
                "{:<9} {:>5}  {} -> {}",
                dedup.disposition.as_str(),
                similarity_label(dedup.similarity),
                outcome.path.display(),
                dedup.destination.display()
            ),
            Err(err) => {
                error!(file = %outcome.path.display(), error = %err, "invoice failed");
                println!("{:<9} {:>5}  {}", "failed", "-", outcome.path.display());
            }
        }
    }
    println!(
        "new={} duplicate={} failed={}",
        report.new_count(),
        report.duplicate_count(),
        report.failed_count()
    );
}
