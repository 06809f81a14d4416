//! Command-line front end: open an archive, import its images as WebP and
//! print progress and a summary.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use zipwebp::{
    CancelFlag, Cli, EntryOutcome, EntryStatus, HttpRangeReader, ImportObserver, ImportPipeline,
    ImportReport, LocalFileReader, Progress, ReadAt, ZipArchive, build_sink,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose_logs());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "zipwebp=debug" } else { "zipwebp=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    if cli.is_http_url() {
        let reader = Arc::new(HttpRangeReader::new(cli.archive.clone()).await?);
        process_archive(reader.clone(), &cli).await?;

        if !cli.is_quiet() {
            eprintln!(
                "Total bytes transferred: {}",
                format_size(reader.transferred_bytes())
            );
        }
        Ok(())
    } else {
        let reader = Arc::new(
            LocalFileReader::new(Path::new(&cli.archive))
                .with_context(|| format!("Cannot open {}", cli.archive))?,
        );
        process_archive(reader, &cli).await
    }
}

async fn process_archive<R: ReadAt + 'static>(reader: Arc<R>, cli: &Cli) -> Result<()> {
    let archive = ZipArchive::open(reader)
        .await
        .with_context(|| format!("Cannot open archive {}", cli.archive))?;

    if cli.list {
        list_entries(&archive);
        return Ok(());
    }

    let config = cli.import_config()?;
    let sink = build_sink(&config.sink)?;

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, stopping after the current image...");
            on_interrupt.cancel();
        }
    });

    let pipeline = ImportPipeline::new(sink, &config)
        .with_observer(Arc::new(ConsoleObserver { quiet: cli.is_quiet() }))
        .with_cancel_flag(cancel);

    let selections = cli.selections(archive.entries());
    let report = pipeline
        .run_archive(&archive, &selections, &config.destination_folder)
        .await;

    if let Some(path) = &cli.log_file {
        tokio::fs::write(path, report.diagnostics.join("\n"))
            .await
            .with_context(|| format!("Cannot write log file {}", path.display()))?;
    }

    Ok(())
}

/// Prints one line per entry and the final summary.
struct ConsoleObserver {
    quiet: bool,
}

impl ImportObserver for ConsoleObserver {
    fn on_progress(&self, outcome: &EntryOutcome, progress: Progress) {
        if self.quiet {
            return;
        }
        let percent = progress.percent();
        match outcome.status {
            EntryStatus::Uploaded => println!(
                "[{:>3}%]  converted: {} -> {}",
                percent,
                outcome.source,
                outcome.uploaded_as.as_deref().unwrap_or(&outcome.destination)
            ),
            EntryStatus::SkippedDuplicate => println!(
                "[{:>3}%]   skipping: {} ({} already imported)",
                percent, outcome.source, outcome.destination
            ),
            EntryStatus::Ignored => {}
            EntryStatus::Failed => println!(
                "[{:>3}%]     failed: {} ({})",
                percent,
                outcome.source,
                outcome.error_message.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    fn on_finished(&self, report: &ImportReport) {
        if report.cancelled {
            eprintln!("Import cancelled.");
        }
        if !self.quiet || report.has_failures() {
            println!("Images imported: {}", report.summary());
        }
    }
}

/// Print a table of the archive's entries.
fn list_entries<R: ReadAt>(archive: &ZipArchive<R>) {
    println!(
        "{:>10}  {:>10}  {:>10}  {:>5}  Name",
        "Length", "Size", "Date", "Time"
    );
    println!("{}", "-".repeat(60));

    let mut total = 0u64;
    let mut files = 0usize;
    for entry in archive.entries() {
        let (year, month, day) = entry.mod_date();
        let (hour, minute, _) = entry.mod_time();
        println!(
            "{:>10}  {:>10}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name
        );
        if !entry.is_directory {
            total += entry.uncompressed_size;
            files += 1;
        }
    }

    println!("{}", "-".repeat(60));
    println!(
        "{:>10}  {} files, archive {}",
        total,
        files,
        format_size(archive.archive_size())
    );
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
