use crate::{ExtractArgs, open_cache};
use indicatif::{ProgressBar, ProgressStyle};
use rscache::{BatchReport, Cache, CacheConfig, ExtractProgress, LocalCache, ProgressEvent};
use std::future::Future;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

pub async fn handle(args: ExtractArgs, mut config: CacheConfig) -> anyhow::Result<()> {
    if let Some(output) = &args.output {
        config = config.with_output_directory(output);
    }
    if let Some(jobs) = args.jobs {
        config = config.with_max_concurrent_extractions(jobs);
    }
    if !args.files.is_empty() && args.categories.len() != 1 {
        anyhow::bail!("--file needs exactly one --category");
    }

    let source = open_cache(args.cache_dir.as_deref(), &config)?;
    let cache = Cache::new(source, config);
    let output = cache.config().require_output_directory()?.to_path_buf();
    info!("Extracting into {}", output.display());

    let (progress, events) = ExtractProgress::with_events();
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)?
            .progress_chars("#>-"),
    );

    let report = with_progress_bar(run(&cache, &args, &progress), events, &bar, &progress).await;
    bar.finish_and_clear();
    let report = report?;

    println!(
        "Extracted {} files ({} entries), {} already extracted, {} not found",
        report.extracted.len(),
        report.entries_written,
        report.already_extracted.len(),
        report.skipped.len()
    );
    if !report.skipped_categories.is_empty() {
        println!("Skipped categories: {:?}", report.skipped_categories);
    }
    Ok(())
}

async fn run(
    cache: &Cache<LocalCache>,
    args: &ExtractArgs,
    progress: &ExtractProgress,
) -> rscache::Result<BatchReport> {
    match (args.categories.as_slice(), args.files.is_empty()) {
        ([], _) => cache.extract_all(args.overwrite, Some(progress)).await,
        (&[category], false) => {
            cache
                .extract_files(category, &args.files, args.overwrite, Some(progress))
                .await
        }
        (categories, _) => {
            cache
                .extract_categories(categories, args.overwrite, Some(progress))
                .await
        }
    }
}

/// Drive `extraction` while moving the bar forward on every event.
async fn with_progress_bar<F, T>(
    extraction: F,
    mut events: UnboundedReceiver<ProgressEvent>,
    bar: &ProgressBar,
    progress: &ExtractProgress,
) -> T
where
    F: Future<Output = T>,
{
    let mut extraction = std::pin::pin!(extraction);
    let result = loop {
        tokio::select! {
            result = &mut extraction => break result,
            Some(event) = events.recv() => show(bar, progress, &event),
        }
    };
    while let Ok(event) = events.try_recv() {
        show(bar, progress, &event);
    }
    result
}

fn show(bar: &ProgressBar, progress: &ExtractProgress, event: &ProgressEvent) {
    debug!("{}", event);
    bar.set_length(progress.total());
    bar.set_position(progress.processed());
    bar.set_message(event.to_string());
}
