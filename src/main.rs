// Demo driver: removes the background of every image given on the command
// line and writes the resulting archive to the current directory.
//
//   chroma-batch photo1.jpg photo2.png ...
//
// Set CHROMA_BATCH_CONFIG to a JSON file to override the defaults.

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chroma_batch_lib::core::{Pipeline, PipelineConfig};
use chroma_batch_lib::utils::{read_source, write_artifact};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_file(false)         // Remove file path
        .with_line_number(false)  // Remove line numbers
        .with_thread_ids(false)   // Remove thread IDs
        .with_thread_names(false) // Remove thread names
        .with_target(false)       // Remove module path
        .with_ansi(true)          // Keep colored output
        .with_writer(std::io::stdout)
        .compact()                // Use compact formatter instead of pretty
        .init();

    info!("=== chroma-batch starting ===");

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        bail!("usage: chroma-batch <image>...");
    }

    let config = match std::env::var("CHROMA_BATCH_CONFIG") {
        Ok(path) => PipelineConfig::from_json_file(&path)
            .await
            .with_context(|| format!("loading config from {path}"))?,
        Err(_) => PipelineConfig::default(),
    };

    let mut pipeline = Pipeline::new(config);
    pipeline.initialize().await.context("initializing engine")?;

    let mut sources = Vec::with_capacity(paths.len());
    for path in &paths {
        match read_source(path).await {
            Ok(source) => sources.push(source),
            Err(e) => warn!("{}", e),
        }
    }

    let ingest = pipeline.ingest_files(sources).await;
    if ingest.added == 0 {
        bail!("no images could be loaded");
    }

    let report = pipeline
        .process_all(|progress| {
            info!(
                "[{:>3}%] {}/{} {}{}",
                progress.percent,
                progress.completed,
                progress.total,
                progress.current_name,
                progress
                    .error
                    .as_deref()
                    .map(|e| format!(" (failed: {e})"))
                    .unwrap_or_default()
            );
        })
        .await
        .context("batch processing")?;

    match report.archive {
        Some(archive) => {
            let path = write_artifact(".", &archive.file_name, &archive.bytes).await?;
            info!("Wrote {} ({} images)", path.display(), archive.entries.len());
        }
        None => match report.export_error {
            Some(e) => bail!("export failed: {e}"),
            None => warn!("No images were processed, nothing exported"),
        },
    }

    Ok(())
}
