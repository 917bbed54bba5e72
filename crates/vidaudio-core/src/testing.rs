//! In-process collaborator fakes for pipeline and session tests

use crate::encoder::EncodingPolicy;
use crate::error::{RetrievalError, TranscodeError};
use crate::retriever::{MediaRetriever, RetrievalOptions, Retrieved};
use crate::transcoder::{AudioTrack, MediaInfo, MediaTranscoder};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Writes a canned file into the workspace the way yt-dlp would.
pub(crate) struct FakeRetriever {
    title: Option<String>,
    produce: Option<Vec<u8>>,
    report_path: bool,
    error: Option<fn() -> RetrievalError>,
    pub calls: AtomicUsize,
}

impl FakeRetriever {
    pub fn producing(title: &str, bytes: Vec<u8>) -> Self {
        Self {
            title: Some(title.to_string()),
            produce: Some(bytes),
            report_path: true,
            error: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn producing_nothing(title: &str) -> Self {
        Self {
            produce: None,
            ..Self::producing(title, Vec::new())
        }
    }

    pub fn failing(error: fn() -> RetrievalError) -> Self {
        Self {
            error: Some(error),
            ..Self::producing_nothing("")
        }
    }

    pub fn untitled(mut self) -> Self {
        self.title = None;
        self
    }

    pub fn without_reported_path(mut self) -> Self {
        self.report_path = false;
        self
    }
}

#[async_trait]
impl MediaRetriever for FakeRetriever {
    async fn retrieve(
        &self,
        _url: &str,
        options: &RetrievalOptions,
    ) -> Result<Retrieved, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.error {
            return Err(error());
        }

        let dir = options
            .output_template
            .parent()
            .expect("template is rooted in the workspace");
        // Leave the pre-conversion stream behind like yt-dlp with -k would.
        std::fs::write(dir.join("partial.webm"), b"stream").map_err(RetrievalError::Spawn)?;

        let mut output_path = None;
        if let Some(bytes) = &self.produce {
            let stem = self
                .title
                .as_deref()
                .filter(|t| !t.is_empty())
                .unwrap_or("NA");
            let path = dir.join(format!("{}.{}", stem, options.encoding.extension()));
            std::fs::write(&path, bytes).map_err(RetrievalError::Spawn)?;
            output_path = Some(path);
        }

        Ok(Retrieved {
            title: self.title.clone(),
            output_path: if self.report_path { output_path } else { None },
        })
    }
}

/// Pretends to probe and transcode, recording what it was handed.
pub(crate) struct FakeTranscoder {
    has_audio: bool,
    output: Option<Vec<u8>>,
    fail_probe: bool,
    pub probes: AtomicUsize,
    pub writes: AtomicUsize,
    pub persisted_inputs: Mutex<Vec<(String, Vec<u8>)>>,
}

impl FakeTranscoder {
    pub fn with_audio(output: Vec<u8>) -> Self {
        Self {
            has_audio: true,
            output: Some(output),
            fail_probe: false,
            probes: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            persisted_inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn without_audio() -> Self {
        Self {
            has_audio: false,
            ..Self::with_audio(Vec::new())
        }
    }

    pub fn failing_probe() -> Self {
        Self {
            fail_probe: true,
            ..Self::with_audio(Vec::new())
        }
    }

    pub fn writing_nothing(mut self) -> Self {
        self.output = None;
        self
    }
}

#[async_trait]
impl MediaTranscoder for FakeTranscoder {
    async fn probe(&self, input: &Path) -> Result<MediaInfo, TranscodeError> {
        self.probes.fetch_add(1, Ordering::SeqCst);

        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = std::fs::read(input).unwrap_or_default();
        self.persisted_inputs.lock().unwrap().push((name, bytes));

        if self.fail_probe {
            return Err(TranscodeError::ProbeFailed {
                code: Some(1),
                stderr: "Invalid data found when processing input".to_string(),
            });
        }

        Ok(MediaInfo {
            audio_track: self.has_audio.then(|| AudioTrack {
                index: 1,
                codec: Some("aac".to_string()),
                sample_rate: Some(48000),
                channels: Some(2),
            }),
            duration: Some(180.0),
        })
    }

    async fn write_audio(
        &self,
        _input: &Path,
        _track: &AudioTrack,
        output: &Path,
        _policy: &EncodingPolicy,
    ) -> Result<PathBuf, TranscodeError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(bytes) = &self.output {
            std::fs::write(output, bytes).map_err(|source| TranscodeError::Spawn {
                tool: "ffmpeg",
                source,
            })?;
        }
        Ok(output.to_path_buf())
    }
}
