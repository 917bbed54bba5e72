//! Container probing and audio extraction using ffprobe/FFmpeg

use crate::encoder::EncodingPolicy;
use crate::error::TranscodeError;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// An audio stream inside a video container.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    /// Absolute stream index within the container
    pub index: u32,
    pub codec: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaInfo {
    /// First audio stream, if the container has one
    pub audio_track: Option<AudioTrack>,
    pub duration: Option<f64>,
}

/// Opens video containers and writes their audio track out.
#[async_trait]
pub trait MediaTranscoder: Send + Sync {
    async fn probe(&self, input: &Path) -> Result<MediaInfo, TranscodeError>;

    /// Encode `track` of `input` to `output`, returning the exact path written.
    async fn write_audio(
        &self,
        input: &Path,
        track: &AudioTrack,
        output: &Path,
        policy: &EncodingPolicy,
    ) -> Result<PathBuf, TranscodeError>;
}

#[derive(Debug)]
pub struct Ffmpeg {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl Ffmpeg {
    pub fn new(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
        }
    }

    fn write_args(
        input: &Path,
        track: &AudioTrack,
        output: &Path,
        policy: &EncodingPolicy,
    ) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-map".to_string(),
            format!("0:{}", track.index),
            "-vn".to_string(),
        ];
        args.extend(policy.ffmpeg_args());
        args.push("-y".to_string());
        args.push(output.to_string_lossy().into_owned());
        args
    }
}

#[async_trait]
impl MediaTranscoder for Ffmpeg {
    async fn probe(&self, input: &Path) -> Result<MediaInfo, TranscodeError> {
        debug!("Probing {}", input.display());

        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(input)
            .output()
            .await
            .map_err(|source| TranscodeError::Spawn {
                tool: "ffprobe",
                source,
            })?;

        if !output.status.success() {
            return Err(TranscodeError::ProbeFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_probe(&output.stdout)
    }

    async fn write_audio(
        &self,
        input: &Path,
        track: &AudioTrack,
        output: &Path,
        policy: &EncodingPolicy,
    ) -> Result<PathBuf, TranscodeError> {
        info!(
            "Writing audio stream {} as {} {}k",
            track.index, policy.codec, policy.bitrate_kbps
        );

        let result = Command::new(&self.ffmpeg_path)
            .args(Self::write_args(input, track, output, policy))
            .output()
            .await
            .map_err(|source| TranscodeError::Spawn {
                tool: "ffmpeg",
                source,
            })?;

        if !result.status.success() {
            return Err(TranscodeError::FfmpegFailed {
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        debug!("Wrote: {}", output.display());
        Ok(output.to_path_buf())
    }
}

fn parse_probe(stdout: &[u8]) -> Result<MediaInfo, TranscodeError> {
    let parsed: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| TranscodeError::ProbeParse(e.to_string()))?;

    let audio_track = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .map(|s| AudioTrack {
            index: s.index,
            codec: s.codec_name.clone(),
            sample_rate: s.sample_rate.as_deref().and_then(|r| r.trim().parse().ok()),
            channels: s.channels,
        });

    let duration = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok());

    Ok(MediaInfo {
        audio_track,
        duration,
    })
}
