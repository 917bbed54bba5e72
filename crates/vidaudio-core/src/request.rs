//! Conversion requests and their outcomes

use sha2::{Digest, Sha256};
use std::fmt;

/// MIME type attached to every produced audio blob.
pub const AUDIO_MIME: &str = "audio/mpeg";

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Which pipeline (and which session slot) a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    YouTube,
    Upload,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::YouTube => write!(f, "youtube"),
            SourceKind::Upload => write!(f, "upload"),
        }
    }
}

/// A single user action asking for audio.
#[derive(Clone)]
pub enum ConversionRequest {
    YouTubeUrl { url: String },
    UploadedFile { name: String, bytes: Vec<u8> },
}

impl ConversionRequest {
    pub fn youtube(url: impl Into<String>) -> Self {
        ConversionRequest::YouTubeUrl { url: url.into() }
    }

    pub fn upload(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        ConversionRequest::UploadedFile {
            name: name.into(),
            bytes,
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            ConversionRequest::YouTubeUrl { .. } => SourceKind::YouTube,
            ConversionRequest::UploadedFile { .. } => SourceKind::Upload,
        }
    }

    /// The input identity used for session caching: the URL text or the
    /// uploaded file name.
    pub fn identity(&self) -> &str {
        match self {
            ConversionRequest::YouTubeUrl { url } => url,
            ConversionRequest::UploadedFile { name, .. } => name,
        }
    }

    /// Content fingerprint (`<len>:<sha256>`) of an upload. Two uploads with
    /// the same name but different bytes never share a cached result.
    pub fn fingerprint(&self) -> Option<String> {
        match self {
            ConversionRequest::YouTubeUrl { .. } => None,
            ConversionRequest::UploadedFile { bytes, .. } => {
                let digest = Sha256::digest(bytes);
                Some(format!("{}:{:x}", bytes.len(), digest))
            }
        }
    }
}

// Uploads can be hundreds of megabytes; never dump them into logs.
impl fmt::Debug for ConversionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionRequest::YouTubeUrl { url } => {
                f.debug_struct("YouTubeUrl").field("url", url).finish()
            }
            ConversionRequest::UploadedFile { name, bytes } => f
                .debug_struct("UploadedFile")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

/// Audio produced by a successful pipeline run.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioOutput {
    pub audio_bytes: Vec<u8>,
    pub filename: String,
}

impl fmt::Debug for AudioOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioOutput")
            .field("filename", &self.filename)
            .field("len", &self.audio_bytes.len())
            .finish()
    }
}

impl AudioOutput {
    /// Size in MiB (bytes / 1,048,576).
    pub fn size_mib(&self) -> f64 {
        self.audio_bytes.len() as f64 / BYTES_PER_MIB
    }

    pub fn mime_type(&self) -> &'static str {
        AUDIO_MIME
    }
}

/// Outcome of one pipeline call. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionResult {
    Success(AudioOutput),
    Failure { message: String },
}

impl ConversionResult {
    pub fn failure(message: impl Into<String>) -> Self {
        ConversionResult::Failure {
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ConversionResult::Success(_))
    }

    pub fn output(&self) -> Option<&AudioOutput> {
        match self {
            ConversionResult::Success(output) => Some(output),
            ConversionResult::Failure { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ConversionResult::Success(_) => None,
            ConversionResult::Failure { message } => Some(message),
        }
    }
}
