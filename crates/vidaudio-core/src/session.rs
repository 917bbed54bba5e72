//! Session state: per-source result caching and presentation

use crate::pipeline::{Converter, ProgressSink};
use crate::request::{ConversionRequest, ConversionResult, SourceKind, AUDIO_MIME};
use chrono::{DateTime, Local};
use tracing::debug;

/// The last outcome for one source, and the input that produced it.
#[derive(Debug, Clone)]
pub struct CachedResult {
    pub identity: String,
    /// Content fingerprint for uploads; `None` for URLs
    pub fingerprint: Option<String>,
    pub result: ConversionResult,
    pub produced_at: DateTime<Local>,
}

/// One slot per source kind. Slots are overwritten, never merged, and a
/// failure in one slot leaves the other untouched.
#[derive(Debug, Default)]
pub struct SessionCache {
    youtube: Option<CachedResult>,
    upload: Option<CachedResult>,
}

impl SessionCache {
    fn slot_mut(&mut self, kind: SourceKind) -> &mut Option<CachedResult> {
        match kind {
            SourceKind::YouTube => &mut self.youtube,
            SourceKind::Upload => &mut self.upload,
        }
    }

    pub fn get(&self, kind: SourceKind) -> Option<&CachedResult> {
        match kind {
            SourceKind::YouTube => self.youtube.as_ref(),
            SourceKind::Upload => self.upload.as_ref(),
        }
    }

    pub fn invalidate(&mut self, kind: SourceKind) {
        if self.slot_mut(kind).take().is_some() {
            debug!("Invalidated cached {} result", kind);
        }
    }

    fn take(&mut self, kind: SourceKind) -> Option<CachedResult> {
        self.slot_mut(kind).take()
    }

    fn put(&mut self, kind: SourceKind, entry: CachedResult) -> &CachedResult {
        self.slot_mut(kind).insert(entry)
    }
}

/// A save offer for produced audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOffer<'a> {
    pub filename: &'a str,
    pub mime: &'static str,
    pub bytes: &'a [u8],
}

/// What the front end should display for a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation<'a> {
    Success {
        summary: String,
        offer: DownloadOffer<'a>,
    },
    Error {
        message: &'a str,
    },
}

/// Wires user actions to the pipelines and owns the session cache.
pub struct SessionController {
    converter: Converter,
    cache: SessionCache,
}

impl SessionController {
    pub fn new(converter: Converter) -> Self {
        Self {
            converter,
            cache: SessionCache::default(),
        }
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Handle a "prepare audio" action.
    ///
    /// A successful result for the same input (same identity and, for
    /// uploads, same content) is redisplayed as-is. A new input, or a repeat
    /// of an input that failed, clears the slot and runs the pipeline again.
    pub async fn prepare(
        &mut self,
        request: ConversionRequest,
        progress: &ProgressSink,
    ) -> &CachedResult {
        let kind = request.kind();
        let fingerprint = request.fingerprint();
        let reusable = self.cache.take(kind).filter(|cached| {
            cached.identity == request.identity()
                && cached.fingerprint == fingerprint
                && cached.result.is_ok()
        });

        let entry = match reusable {
            Some(cached) => {
                debug!("Reusing cached {} result for {}", kind, cached.identity);
                cached
            }
            None => {
                let identity = request.identity().to_string();
                let result = self.converter.convert(request, progress).await;
                CachedResult {
                    identity,
                    fingerprint,
                    result,
                    produced_at: Local::now(),
                }
            }
        };

        self.cache.put(kind, entry)
    }

    pub fn invalidate(&mut self, kind: SourceKind) {
        self.cache.invalidate(kind);
    }

    /// Presentation for the cached result of `kind`, if any.
    pub fn render(&self, kind: SourceKind) -> Option<Presentation<'_>> {
        self.cache.get(kind).map(|cached| present(&cached.result))
    }
}

pub fn present(result: &ConversionResult) -> Presentation<'_> {
    match result {
        ConversionResult::Success(output) => Presentation::Success {
            summary: format!(
                "Audio ready! Filename: '{}', Size: {:.2} MB",
                output.filename,
                output.size_mib()
            ),
            offer: DownloadOffer {
                filename: &output.filename,
                mime: AUDIO_MIME,
                bytes: &output.audio_bytes,
            },
        },
        ConversionResult::Failure { message } => Presentation::Error { message },
    }
}
