pub mod config;
pub mod doctor;
pub mod extract;
pub mod session;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use vidaudio_core::{
    config::UploadConfig,
    pipeline::{PipelineStage, ProgressSink},
    session::{CachedResult, DownloadOffer},
    ConversionRequest, SessionController,
};

/// Read a local video as an upload, enforcing the configured type and size
/// limits before any bytes are loaded.
pub(crate) async fn read_upload(path: &Path, limits: &UploadConfig) -> Result<ConversionRequest> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} is not a file path", path.display()))?;

    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if !metadata.is_file() {
        anyhow::bail!("{} is not a file", path.display());
    }
    limits.check(&name, metadata.len()).map_err(anyhow::Error::msg)?;

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(ConversionRequest::upload(name, bytes))
}

/// Run a prepare action while a spinner reports pipeline stages.
pub(crate) async fn prepare_with_spinner(
    controller: &mut SessionController,
    request: ConversionRequest,
) -> Result<&CachedResult> {
    let (tx, mut rx) = mpsc::channel(32);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template(
        "{spinner:.cyan} [{elapsed_precise}] {msg}",
    )?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(match &request {
        ConversionRequest::YouTubeUrl { .. } => "Processing YouTube link...",
        ConversionRequest::UploadedFile { .. } => "Extracting audio from file...",
    });

    let progress_handle = tokio::spawn(async move {
        while let Some(stage) = rx.recv().await {
            match stage {
                PipelineStage::Retrieving { url } => {
                    pb.set_message(format!("Downloading: {}", truncate(&url, 50)));
                }
                PipelineStage::Persisting { name } => {
                    pb.set_message(format!("Saving upload: {}", truncate(&name, 40)));
                }
                PipelineStage::Probing => pb.set_message("Inspecting container..."),
                PipelineStage::Extracting { codec } => {
                    pb.set_message(format!("Encoding to {}...", codec));
                }
                PipelineStage::Reading => pb.set_message("Reading audio..."),
                PipelineStage::Complete { filename, duration, .. } => {
                    pb.finish_with_message(format!(
                        "Done: {} ({:.1}s)",
                        filename,
                        duration.as_secs_f32()
                    ));
                }
                PipelineStage::Failed { .. } => pb.abandon_with_message("Failed"),
            }
        }
        // Cached results emit nothing
        if !pb.is_finished() {
            pb.finish_and_clear();
        }
    });

    let sink = ProgressSink::new(tx);
    let cached = controller.prepare(request, &sink).await;
    drop(sink);
    progress_handle.await?;

    Ok(cached)
}

/// Save a download offer into `dir` under the offered filename.
pub(crate) async fn save_offer(offer: DownloadOffer<'_>, dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(offer.filename);
    tokio::fs::write(&path, offer.bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
