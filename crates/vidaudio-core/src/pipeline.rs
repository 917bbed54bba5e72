//! The YouTube and file-upload conversion pipelines

use crate::config::Config;
use crate::encoder::EncodingPolicy;
use crate::error::ConvertError;
use crate::filename::{title_output_name, upload_input_name, upload_output_name};
use crate::request::{AudioOutput, ConversionRequest, ConversionResult};
use crate::retriever::{is_supported_url, MediaRetriever, RetrievalOptions, YtDlp};
use crate::transcoder::{Ffmpeg, MediaTranscoder};
use crate::workspace::ScratchWorkspace;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Pipeline progress stages
#[derive(Debug, Clone)]
pub enum PipelineStage {
    Retrieving { url: String },
    Persisting { name: String },
    Probing,
    Extracting { codec: String },
    Reading,
    Complete { filename: String, bytes: usize, duration: Duration },
    Failed { error: String },
}

/// Optional receiver side for [`PipelineStage`] updates.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<mpsc::Sender<PipelineStage>>,
}

impl ProgressSink {
    pub fn new(tx: mpsc::Sender<PipelineStage>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn silent() -> Self {
        Self { tx: None }
    }

    async fn emit(&self, stage: PipelineStage) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(stage).await;
        }
    }
}

/// Runs conversion requests against the two collaborators.
pub struct Converter {
    retriever: Arc<dyn MediaRetriever>,
    transcoder: Arc<dyn MediaTranscoder>,
    policy: EncodingPolicy,
    scratch_base: PathBuf,
}

impl Converter {
    pub fn new(
        retriever: Arc<dyn MediaRetriever>,
        transcoder: Arc<dyn MediaTranscoder>,
        policy: EncodingPolicy,
        scratch_base: PathBuf,
    ) -> Self {
        Self {
            retriever,
            transcoder,
            policy,
            scratch_base,
        }
    }

    /// Build a converter backed by yt-dlp and FFmpeg.
    ///
    /// Tools missing from PATH are not fatal here: the affected pipeline
    /// reports the spawn failure when it is actually used.
    pub fn from_config(config: &Config) -> Self {
        let yt_dlp = config.yt_dlp_path().unwrap_or_else(|e| {
            warn!("{}", e);
            PathBuf::from("yt-dlp")
        });
        let ffmpeg = config.ffmpeg_path().unwrap_or_else(|e| {
            warn!("{}", e);
            PathBuf::from("ffmpeg")
        });
        let ffprobe = config.ffprobe_path().unwrap_or_else(|e| {
            warn!("{}", e);
            PathBuf::from("ffprobe")
        });

        Self::new(
            Arc::new(YtDlp::new(yt_dlp)),
            Arc::new(Ffmpeg::new(ffmpeg, ffprobe)),
            config.encoding_policy(),
            config.temp_dir(),
        )
    }

    pub fn policy(&self) -> &EncodingPolicy {
        &self.policy
    }

    /// Run one request to completion. Every failure is folded into the
    /// returned [`ConversionResult`]; nothing escapes as an error.
    pub async fn convert(
        &self,
        request: ConversionRequest,
        progress: &ProgressSink,
    ) -> ConversionResult {
        let kind = request.kind();
        let request_id = Uuid::new_v4();
        let span = info_span!("convert", %request_id, %kind);

        async move {
            let start = Instant::now();
            let outcome = match &request {
                ConversionRequest::YouTubeUrl { url } => self.try_convert_url(url, progress).await,
                ConversionRequest::UploadedFile { name, bytes } => {
                    self.try_convert_upload(name, bytes, progress).await
                }
            };

            match outcome {
                Ok(output) => {
                    let duration = start.elapsed();
                    info!(
                        "Conversion complete: {} ({} bytes, {:.1}s)",
                        output.filename,
                        output.audio_bytes.len(),
                        duration.as_secs_f32()
                    );
                    progress
                        .emit(PipelineStage::Complete {
                            filename: output.filename.clone(),
                            bytes: output.audio_bytes.len(),
                            duration,
                        })
                        .await;
                    ConversionResult::Success(output)
                }
                Err(e) => {
                    warn!("Conversion failed: {}", e);
                    let message = e.user_message(kind);
                    progress
                        .emit(PipelineStage::Failed {
                            error: message.clone(),
                        })
                        .await;
                    ConversionResult::failure(message)
                }
            }
        }
        .instrument(span)
        .await
    }

    pub async fn convert_url(&self, url: &str, progress: &ProgressSink) -> ConversionResult {
        self.convert(ConversionRequest::youtube(url), progress).await
    }

    pub async fn convert_upload(
        &self,
        name: &str,
        bytes: Vec<u8>,
        progress: &ProgressSink,
    ) -> ConversionResult {
        self.convert(ConversionRequest::upload(name, bytes), progress)
            .await
    }

    async fn try_convert_url(
        &self,
        url: &str,
        progress: &ProgressSink,
    ) -> Result<AudioOutput, ConvertError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ConvertError::InvalidInput(
                "Please enter a valid YouTube URL.".to_string(),
            ));
        }
        if !is_supported_url(url) {
            return Err(ConvertError::InvalidInput(
                "Please enter a valid YouTube URL (must contain youtube.com or youtu.be).".to_string(),
            ));
        }

        let workspace = ScratchWorkspace::create_in(&self.scratch_base)?;
        let extension = self.policy.extension();

        progress
            .emit(PipelineStage::Retrieving {
                url: url.to_string(),
            })
            .await;
        let options = RetrievalOptions::for_workspace(workspace.path(), self.policy);
        let retrieved = self.retriever.retrieve(url, &options).await?;

        let audio_path = match retrieved.output_path {
            Some(path) if workspace.contains_file(&path) && has_extension(&path, extension) => path,
            reported => {
                debug!("Reported output {:?} not usable, scanning workspace", reported);
                workspace.find_single_with_extension(extension)?
            }
        };

        progress.emit(PipelineStage::Reading).await;
        let audio_bytes = tokio::fs::read(&audio_path).await?;
        if audio_bytes.is_empty() {
            return Err(ConvertError::Extraction(format!(
                "the produced {} file is empty",
                extension
            )));
        }

        Ok(AudioOutput {
            audio_bytes,
            filename: title_output_name(retrieved.title.as_deref(), extension),
        })
    }

    async fn try_convert_upload(
        &self,
        name: &str,
        bytes: &[u8],
        progress: &ProgressSink,
    ) -> Result<AudioOutput, ConvertError> {
        if bytes.is_empty() {
            return Err(ConvertError::InvalidInput(
                "Please upload a video file.".to_string(),
            ));
        }

        let extension = self.policy.extension();
        let filename = upload_output_name(name, extension);
        let mut input_name = upload_input_name(name);
        if input_name == filename {
            input_name = format!("source-{}", input_name);
        }

        let workspace = ScratchWorkspace::create_in(&self.scratch_base)?;
        let input_path = workspace.join(&input_name);

        progress
            .emit(PipelineStage::Persisting {
                name: input_name.clone(),
            })
            .await;
        tokio::fs::write(&input_path, bytes).await?;

        progress.emit(PipelineStage::Probing).await;
        let info = self.transcoder.probe(&input_path).await?;
        let track = match info.audio_track {
            Some(track) => track,
            None => {
                warn!("Upload '{}' has no audio track", name);
                return Err(ConvertError::NoAudioTrack);
            }
        };
        debug!("Audio track: {:?}, duration: {:?}", track, info.duration);

        progress
            .emit(PipelineStage::Extracting {
                codec: self.policy.codec.to_string(),
            })
            .await;
        let target = workspace.join(&filename);
        let written = self
            .transcoder
            .write_audio(&input_path, &track, &target, &self.policy)
            .await?;

        if !written.is_file() {
            return Err(ConvertError::Extraction(
                "the audio file was not created".to_string(),
            ));
        }

        progress.emit(PipelineStage::Reading).await;
        let audio_bytes = tokio::fs::read(&written).await?;

        Ok(AudioOutput {
            audio_bytes,
            filename,
        })
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BlockCause, RetrievalError};
    use crate::testing::{FakeRetriever, FakeTranscoder};
    use std::sync::atomic::Ordering;

    fn converter(
        retriever: Arc<FakeRetriever>,
        transcoder: Arc<FakeTranscoder>,
        base: &Path,
    ) -> Converter {
        Converter::new(
            retriever,
            transcoder,
            EncodingPolicy::default(),
            base.to_path_buf(),
        )
    }

    fn leftover_dirs(base: &Path) -> usize {
        std::fs::read_dir(base).unwrap().count()
    }

    #[tokio::test]
    async fn test_youtube_success_returns_collaborator_bytes() {
        let base = tempfile::tempdir().unwrap();
        let retriever = Arc::new(FakeRetriever::producing("Never Gonna", b"ID3-audio".to_vec()));
        let transcoder = Arc::new(FakeTranscoder::with_audio(b"unused".to_vec()));
        let converter = converter(retriever.clone(), transcoder, base.path());

        let result = converter
            .convert_url("https://youtu.be/abc123", &ProgressSink::silent())
            .await;

        let output = result.output().expect("success");
        assert_eq!(output.filename, "Never Gonna.mp3");
        assert_eq!(output.audio_bytes, b"ID3-audio");
        assert_eq!(retriever.calls.load(Ordering::SeqCst), 1);
        assert_eq!(leftover_dirs(base.path()), 0);
    }

    #[tokio::test]
    async fn test_youtube_falls_back_to_scan_when_path_unreported() {
        let base = tempfile::tempdir().unwrap();
        let retriever = Arc::new(
            FakeRetriever::producing("Title", b"bytes".to_vec()).without_reported_path(),
        );
        let converter = converter(
            retriever,
            Arc::new(FakeTranscoder::without_audio()),
            base.path(),
        );

        let result = converter
            .convert_url("https://www.youtube.com/watch?v=abc", &ProgressSink::silent())
            .await;
        assert_eq!(result.output().map(|o| o.audio_bytes.as_slice()), Some(&b"bytes"[..]));
    }

    #[tokio::test]
    async fn test_youtube_missing_title_uses_generic_name() {
        let base = tempfile::tempdir().unwrap();
        let retriever = Arc::new(FakeRetriever::producing("", b"bytes".to_vec()).untitled());
        let converter = converter(
            retriever,
            Arc::new(FakeTranscoder::without_audio()),
            base.path(),
        );

        let result = converter
            .convert_url("https://youtu.be/abc123", &ProgressSink::silent())
            .await;
        assert_eq!(
            result.output().map(|o| o.filename.as_str()),
            Some("downloaded_audio.mp3")
        );
    }

    #[tokio::test]
    async fn test_empty_url_rejected_before_collaborator() {
        let base = tempfile::tempdir().unwrap();
        let retriever = Arc::new(FakeRetriever::producing("x", b"x".to_vec()));
        let converter = converter(
            retriever.clone(),
            Arc::new(FakeTranscoder::without_audio()),
            base.path(),
        );

        for url in ["", "   "] {
            let result = converter.convert_url(url, &ProgressSink::silent()).await;
            assert_eq!(result.message(), Some("Please enter a valid YouTube URL."));
        }
        let result = converter
            .convert_url("https://vimeo.com/123", &ProgressSink::silent())
            .await;
        assert!(result.message().unwrap().contains("must contain youtube.com"));

        assert_eq!(retriever.calls.load(Ordering::SeqCst), 0);
        assert_eq!(leftover_dirs(base.path()), 0);
    }

    #[tokio::test]
    async fn test_youtube_no_output_is_extraction_failure() {
        let base = tempfile::tempdir().unwrap();
        let retriever = Arc::new(FakeRetriever::producing_nothing("Title"));
        let converter = converter(
            retriever,
            Arc::new(FakeTranscoder::without_audio()),
            base.path(),
        );

        let result = converter
            .convert_url("https://youtu.be/abc123", &ProgressSink::silent())
            .await;
        assert!(result.message().unwrap().contains("no mp3 file was produced"));
        assert_eq!(leftover_dirs(base.path()), 0);
    }

    #[tokio::test]
    async fn test_youtube_retrieval_errors_are_categorized() {
        let base = tempfile::tempdir().unwrap();
        let retriever = Arc::new(FakeRetriever::failing(|| {
            RetrievalError::AccessBlocked {
                cause: BlockCause::Forbidden,
                diagnostic: "ERROR: HTTP Error 403: Forbidden".into(),
            }
        }));
        let converter = converter(
            retriever,
            Arc::new(FakeTranscoder::without_audio()),
            base.path(),
        );

        let result = converter
            .convert_url("https://youtu.be/abc123", &ProgressSink::silent())
            .await;
        assert!(result.message().unwrap().contains("403 Forbidden"));
        assert_eq!(leftover_dirs(base.path()), 0);
    }

    #[tokio::test]
    async fn test_upload_success_round_trip() {
        let base = tempfile::tempdir().unwrap();
        let transcoder = Arc::new(FakeTranscoder::with_audio(b"mp3-frames".to_vec()));
        let converter = converter(
            Arc::new(FakeRetriever::producing_nothing("unused")),
            transcoder.clone(),
            base.path(),
        );

        let result = converter
            .convert_upload("My Clip!!.mp4", b"video-bytes".to_vec(), &ProgressSink::silent())
            .await;

        let output = result.output().expect("success");
        assert_eq!(output.filename, "My Clip.mp3");
        assert_eq!(output.audio_bytes, b"mp3-frames");

        let inputs = transcoder.persisted_inputs.lock().unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].0, "My Clip!!.mp4");
        assert_eq!(inputs[0].1, b"video-bytes");
        assert_eq!(leftover_dirs(base.path()), 0);
    }

    #[tokio::test]
    async fn test_upload_without_audio_never_writes() {
        let base = tempfile::tempdir().unwrap();
        let transcoder = Arc::new(FakeTranscoder::without_audio());
        let converter = converter(
            Arc::new(FakeRetriever::producing_nothing("unused")),
            transcoder.clone(),
            base.path(),
        );

        let result = converter
            .convert_upload("My Clip!!.mp4", b"video".to_vec(), &ProgressSink::silent())
            .await;

        assert!(result.message().unwrap().contains("no audio track"));
        assert_eq!(transcoder.probes.load(Ordering::SeqCst), 1);
        assert_eq!(transcoder.writes.load(Ordering::SeqCst), 0);
        assert_eq!(leftover_dirs(base.path()), 0);
    }

    #[tokio::test]
    async fn test_upload_missing_output_is_distinct_failure() {
        let base = tempfile::tempdir().unwrap();
        let transcoder = Arc::new(FakeTranscoder::with_audio(b"x".to_vec()).writing_nothing());
        let converter = converter(
            Arc::new(FakeRetriever::producing_nothing("unused")),
            transcoder,
            base.path(),
        );

        let result = converter
            .convert_upload("clip.mov", b"video".to_vec(), &ProgressSink::silent())
            .await;
        let message = result.message().unwrap();
        assert!(message.contains("was not created"));
        assert!(!message.contains("no audio track"));
    }

    #[tokio::test]
    async fn test_upload_probe_failure_is_generic() {
        let base = tempfile::tempdir().unwrap();
        let transcoder = Arc::new(FakeTranscoder::failing_probe());
        let converter = converter(
            Arc::new(FakeRetriever::producing_nothing("unused")),
            transcoder,
            base.path(),
        );

        let result = converter
            .convert_upload("clip.avi", b"garbage".to_vec(), &ProgressSink::silent())
            .await;
        assert!(result
            .message()
            .unwrap()
            .starts_with("Error processing video file:"));
        assert_eq!(leftover_dirs(base.path()), 0);
    }

    #[tokio::test]
    async fn test_upload_empty_bytes_is_invalid_input() {
        let base = tempfile::tempdir().unwrap();
        let transcoder = Arc::new(FakeTranscoder::with_audio(b"x".to_vec()));
        let converter = converter(
            Arc::new(FakeRetriever::producing_nothing("unused")),
            transcoder.clone(),
            base.path(),
        );

        let result = converter
            .convert_upload("clip.mp4", Vec::new(), &ProgressSink::silent())
            .await;
        assert_eq!(result.message(), Some("Please upload a video file."));
        assert_eq!(transcoder.probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_progress_stages_are_reported() {
        let base = tempfile::tempdir().unwrap();
        let converter = converter(
            Arc::new(FakeRetriever::producing("Song", b"a".to_vec())),
            Arc::new(FakeTranscoder::without_audio()),
            base.path(),
        );
        let (tx, mut rx) = mpsc::channel(16);

        let result = converter
            .convert_url("https://youtu.be/abc123", &ProgressSink::new(tx))
            .await;
        assert!(result.is_ok());

        let mut stages = Vec::new();
        while let Ok(stage) = rx.try_recv() {
            stages.push(stage);
        }
        assert!(matches!(stages.first(), Some(PipelineStage::Retrieving { .. })));
        assert!(matches!(
            stages.last(),
            Some(PipelineStage::Complete { bytes: 1, .. })
        ));
    }
}
