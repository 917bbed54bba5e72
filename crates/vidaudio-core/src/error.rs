//! Error types for vidaudio-core

use crate::request::SourceKind;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConvertError>;

/// Diagnostic budget for generic and access-blocked failures.
const DIAGNOSTIC_CHARS: usize = 200;
/// Diagnostic budget for unsupported-source failures.
const SHORT_DIAGNOSTIC_CHARS: usize = 100;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("The uploaded video has no audio track")]
    NoAudioTrack,

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Transcode failed: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why the video host refused to serve a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCause {
    /// HTTP 403
    Forbidden,
    /// HTTP 429
    RateLimited,
    /// "Sign in to confirm ..." (age gate or bot check)
    SignInRequired,
    PrivateVideo,
}

impl fmt::Display for BlockCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockCause::Forbidden => write!(f, "HTTP 403 Forbidden"),
            BlockCause::RateLimited => write!(f, "HTTP 429 Too Many Requests"),
            BlockCause::SignInRequired => write!(f, "sign-in required"),
            BlockCause::PrivateVideo => write!(f, "private video"),
        }
    }
}

impl BlockCause {
    fn explanation(&self) -> &'static str {
        match self {
            BlockCause::Forbidden => {
                "Error: Received HTTP 403 Forbidden from YouTube. \
                 This commonly means YouTube is blocking the request. Potential reasons:\n\
                 - The video might require login (age restriction, private).\n\
                 - High request volume from this machine.\n\
                 - An outdated yt-dlp installation.\n\
                 - Regional restrictions on the video."
            }
            BlockCause::RateLimited => {
                "Error: Received HTTP 429 Too Many Requests from YouTube. \
                 YouTube is rate-limiting requests from this machine.\n\
                 - Wait a while before trying again.\n\
                 - Updating yt-dlp can also help."
            }
            BlockCause::SignInRequired => {
                "Error: YouTube requires signing in to access this video.\n\
                 - The video may be age-restricted.\n\
                 - YouTube may suspect automated access from this machine; try again later."
            }
            BlockCause::PrivateVideo => {
                "Error: This video is private and cannot be downloaded.\n\
                 - Only the uploader and accounts they invite can watch it."
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("access blocked by the video host ({cause}): {diagnostic}")]
    AccessBlocked {
        cause: BlockCause,
        diagnostic: String,
    },

    #[error("unsupported URL: {0}")]
    UnsupportedSource(String),

    #[error("yt-dlp failed with exit code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("failed to run yt-dlp: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("ffprobe failed with exit code {code:?}: {stderr}")]
    ProbeFailed { code: Option<i32>, stderr: String },

    #[error("could not parse ffprobe output: {0}")]
    ProbeParse(String),

    #[error("ffmpeg failed with exit code {code:?}: {stderr}")]
    FfmpegFailed { code: Option<i32>, stderr: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadError(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    #[error("{0} not found in PATH")]
    ToolNotFound(&'static str),
}

impl ConvertError {
    /// Render the message shown to the user for a failed conversion of `kind`.
    pub fn user_message(&self, kind: SourceKind) -> String {
        match self {
            ConvertError::InvalidInput(message) => message.clone(),
            ConvertError::Retrieval(RetrievalError::AccessBlocked { cause, diagnostic }) => {
                format!(
                    "{}\nOriginal error snippet: {}",
                    cause.explanation(),
                    snippet(diagnostic, DIAGNOSTIC_CHARS)
                )
            }
            ConvertError::Retrieval(RetrievalError::UnsupportedSource(diagnostic)) => format!(
                "Error: The provided URL is not supported by yt-dlp. Please check the URL. ({})",
                snippet(diagnostic, SHORT_DIAGNOSTIC_CHARS)
            ),
            ConvertError::Retrieval(RetrievalError::Failed { stderr, .. }) => {
                format!("yt-dlp download error: {}", snippet(stderr, DIAGNOSTIC_CHARS))
            }
            ConvertError::NoAudioTrack => {
                "Error: The uploaded video has no audio track.".to_string()
            }
            ConvertError::Extraction(detail) => {
                format!("Error: Audio extraction failed: {}.", detail)
            }
            other => match kind {
                SourceKind::YouTube => format!(
                    "An unexpected error occurred: {}",
                    snippet(&other.to_string(), DIAGNOSTIC_CHARS)
                ),
                SourceKind::Upload => format!(
                    "Error processing video file: {}",
                    snippet(&other.to_string(), DIAGNOSTIC_CHARS)
                ),
            },
        }
    }
}

/// Cut a diagnostic down to `max_chars` characters, marking the cut with "...".
pub fn snippet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    let mut chars = text.char_indices();
    match chars.nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
