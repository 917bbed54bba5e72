//! Target audio encoding shared by both pipelines

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Mp3,
}

impl AudioCodec {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioCodec::Mp3 => "mp3",
        }
    }

    /// Codec name as understood by yt-dlp's `--audio-format`.
    pub fn ytdlp_name(&self) -> &'static str {
        match self {
            AudioCodec::Mp3 => "mp3",
        }
    }

    /// Encoder name as understood by ffmpeg's `-c:a`.
    pub fn ffmpeg_encoder(&self) -> &'static str {
        match self {
            AudioCodec::Mp3 => "libmp3lame",
        }
    }
}

impl std::fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioCodec::Mp3 => write!(f, "MP3"),
        }
    }
}

/// Codec and bitrate applied to every produced file, so both pipelines yield
/// the same output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingPolicy {
    pub codec: AudioCodec,
    pub bitrate_kbps: u32,
}

impl Default for EncodingPolicy {
    fn default() -> Self {
        Self {
            codec: AudioCodec::Mp3,
            bitrate_kbps: 192,
        }
    }
}

impl EncodingPolicy {
    pub fn extension(&self) -> &'static str {
        self.codec.extension()
    }

    /// ffmpeg arguments selecting the encoder and bitrate.
    pub fn ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-c:a".to_string(),
            self.codec.ffmpeg_encoder().to_string(),
            "-b:a".to_string(),
            format!("{}k", self.bitrate_kbps),
        ]
    }

    /// yt-dlp post-processing arguments extracting audio into this encoding.
    pub fn ytdlp_args(&self) -> Vec<String> {
        vec![
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            self.codec.ytdlp_name().to_string(),
            "--audio-quality".to_string(),
            format!("{}K", self.bitrate_kbps),
        ]
    }
}
