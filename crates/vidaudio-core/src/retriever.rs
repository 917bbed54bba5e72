//! Video retrieval and audio post-processing using yt-dlp

use crate::encoder::EncodingPolicy;
use crate::error::{BlockCause, RetrievalError};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Host markers accepted as YouTube links.
const SUPPORTED_HOST_MARKERS: &[&str] = &["youtube.com", "youtu.be"];

/// How the retrieval collaborator should fetch and post-process a video.
#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    /// yt-dlp format selector
    pub format_selector: String,
    /// Encoding the downloaded stream is converted into
    pub encoding: EncodingPolicy,
    /// yt-dlp output template, rooted in the scratch workspace
    pub output_template: PathBuf,
    /// Never expand playlists
    pub single_item_only: bool,
}

impl RetrievalOptions {
    pub fn for_workspace(workspace: &Path, encoding: EncodingPolicy) -> Self {
        Self {
            format_selector: "bestaudio/best".to_string(),
            encoding,
            output_template: workspace.join("%(title)s.%(ext)s"),
            single_item_only: true,
        }
    }
}

/// What the collaborator reports after a successful run.
#[derive(Debug, Clone, Default)]
pub struct Retrieved {
    pub title: Option<String>,
    /// Final file path after post-processing, when the tool reports it
    pub output_path: Option<PathBuf>,
}

/// Downloads a video's audio into a directory as a side effect.
#[async_trait]
pub trait MediaRetriever: Send + Sync {
    async fn retrieve(
        &self,
        url: &str,
        options: &RetrievalOptions,
    ) -> Result<Retrieved, RetrievalError>;
}

#[derive(Debug)]
pub struct YtDlp {
    yt_dlp_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct AfterMoveReport {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    filepath: Option<PathBuf>,
}

impl YtDlp {
    pub fn new(yt_dlp_path: PathBuf) -> Self {
        Self { yt_dlp_path }
    }

    fn build_args(url: &str, options: &RetrievalOptions) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            options.format_selector.clone(),
        ];
        args.extend(options.encoding.ytdlp_args());
        args.extend([
            "-o".to_string(),
            options.output_template.to_string_lossy().into_owned(),
            "--no-progress".to_string(),
            // Report title and final path once post-processing has moved the file
            "--no-simulate".to_string(),
            "--print".to_string(),
            "after_move:%(.{title,filepath})j".to_string(),
        ]);
        if options.single_item_only {
            args.push("--no-playlist".to_string());
        }
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl MediaRetriever for YtDlp {
    async fn retrieve(
        &self,
        url: &str,
        options: &RetrievalOptions,
    ) -> Result<Retrieved, RetrievalError> {
        info!("Retrieving audio from: {}", url);

        let args = Self::build_args(url, options);
        debug!("yt-dlp args: {:?}", args);

        let output = Command::new(&self.yt_dlp_path)
            .args(&args)
            .output()
            .await
            .map_err(RetrievalError::Spawn)?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            debug!("yt-dlp stderr: {}", stderr);
            let err = classify_failure(&stderr, output.status.code());
            warn!("yt-dlp failed: {}", err);
            return Err(err);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let retrieved = parse_report(&stdout);
        debug!(
            "yt-dlp reported title={:?} path={:?}",
            retrieved.title, retrieved.output_path
        );
        Ok(retrieved)
    }
}

/// Parse the last JSON report line printed by yt-dlp. Missing or malformed
/// reports yield an empty [`Retrieved`] so the caller falls back to scanning.
fn parse_report(stdout: &str) -> Retrieved {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str::<AfterMoveReport>(line).ok())
        .map(|report| Retrieved {
            title: report.title,
            output_path: report.filepath,
        })
        .unwrap_or_default()
}

fn http_status_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"HTTP Error (\d{3})")
                .map_err(|e| warn!("HTTP status pattern failed to compile: {}", e))
                .ok()
        })
        .as_ref()
}

fn http_status(stderr: &str) -> Option<u16> {
    http_status_pattern()?
        .captures(stderr)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Why the host blocked the request, if the stderr says so.
fn block_cause(stderr: &str) -> Option<BlockCause> {
    // Private-video errors also ask the user to sign in
    if stderr.contains("Private video") {
        return Some(BlockCause::PrivateVideo);
    }
    if stderr.contains("Sign in to confirm") {
        return Some(BlockCause::SignInRequired);
    }
    match http_status(stderr) {
        Some(403) => Some(BlockCause::Forbidden),
        Some(429) => Some(BlockCause::RateLimited),
        _ => None,
    }
}

/// Map yt-dlp stderr onto a retrieval failure category.
pub fn classify_failure(stderr: &str, code: Option<i32>) -> RetrievalError {
    let diagnostic = error_line(stderr);

    if let Some(cause) = block_cause(stderr) {
        return RetrievalError::AccessBlocked { cause, diagnostic };
    }
    if stderr.contains("Unsupported URL") {
        return RetrievalError::UnsupportedSource(diagnostic);
    }

    RetrievalError::Failed {
        code,
        stderr: diagnostic,
    }
}

/// The most relevant line of yt-dlp stderr: the last `ERROR:` line if any.
fn error_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|line| line.starts_with("ERROR:"))
        .unwrap_or_else(|| stderr.trim())
        .trim()
        .to_string()
}

/// Superficial check that a string looks like a supported video-hosting URL
pub fn is_supported_url(url: &str) -> bool {
    SUPPORTED_HOST_MARKERS.iter().any(|marker| url.contains(marker))
}
