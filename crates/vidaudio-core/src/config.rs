//! Configuration management for vidaudio

use crate::encoder::{AudioCodec, EncodingPolicy};
use crate::error::ConfigError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,
    pub encoding: EncodingConfig,
    pub upload: UploadConfig,
    pub output: OutputConfig,
    pub temp: TempConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Path to yt-dlp binary (auto-detected if not set)
    pub yt_dlp: Option<PathBuf>,
    /// Path to FFmpeg binary (auto-detected if not set)
    pub ffmpeg: Option<PathBuf>,
    /// Path to ffprobe binary (auto-detected if not set)
    pub ffprobe: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Output codec
    pub codec: AudioCodec,
    /// Target bitrate in kbps (default: 192)
    pub bitrate_kbps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Largest accepted upload, in megabytes
    pub max_size_mb: u64,
    /// Accepted video container extensions
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory produced audio is saved into
    pub default_directory: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TempConfig {
    /// Base for scratch workspaces (uses system temp if not set)
    pub directory: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            encoding: EncodingConfig {
                codec: AudioCodec::Mp3,
                bitrate_kbps: 192,
            },
            upload: UploadConfig {
                max_size_mb: 200,
                allowed_extensions: ["mp4", "mkv", "avi", "mov", "webm", "flv"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
            output: OutputConfig {
                default_directory: PathBuf::from("."),
            },
            temp: TempConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Self::defaults_figment();

        // Load from default config directory
        if let Some(default_config) = Self::default_config_file() {
            if default_config.exists() {
                figment = figment.merge(Toml::file(&default_config));
            }
        }

        // Load from specified config file
        if let Some(path) = config_file {
            figment = merge_config_file(figment, path)?;
        }

        // Nested keys use a double underscore: VIDAUDIO_UPLOAD__MAX_SIZE_MB
        figment = figment.merge(Env::prefixed("VIDAUDIO_").split("__"));

        Self::from_figment(figment)
    }

    fn defaults_figment() -> Figment {
        Figment::new().merge(Serialized::defaults(Config::default()))
    }

    /// Extract and validate a configuration from already-layered providers.
    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config_file() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("vidaudio/config.toml"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.encoding.bitrate_kbps == 0 {
            return Err(ConfigError::InvalidValue(
                "encoding.bitrate_kbps must be positive".to_string(),
            ));
        }
        if self.upload.allowed_extensions.is_empty() {
            return Err(ConfigError::InvalidValue(
                "upload.allowed_extensions must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn encoding_policy(&self) -> EncodingPolicy {
        EncodingPolicy {
            codec: self.encoding.codec,
            bitrate_kbps: self.encoding.bitrate_kbps,
        }
    }

    /// Get yt-dlp path, auto-detecting if not configured
    pub fn yt_dlp_path(&self) -> Result<PathBuf, ConfigError> {
        resolve_tool(self.paths.yt_dlp.as_ref(), "yt-dlp")
    }

    /// Get FFmpeg path, auto-detecting if not configured
    pub fn ffmpeg_path(&self) -> Result<PathBuf, ConfigError> {
        resolve_tool(self.paths.ffmpeg.as_ref(), "ffmpeg")
    }

    /// Get ffprobe path, auto-detecting if not configured
    pub fn ffprobe_path(&self) -> Result<PathBuf, ConfigError> {
        resolve_tool(self.paths.ffprobe.as_ref(), "ffprobe")
    }

    /// Get temp directory
    pub fn temp_dir(&self) -> PathBuf {
        self.temp.directory.clone().unwrap_or_else(std::env::temp_dir)
    }
}

fn merge_config_file(figment: Figment, path: &Path) -> Result<Figment, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::LoadError(format!(
            "config file {} does not exist",
            path.display()
        )));
    }
    Ok(figment.merge(Toml::file(path)))
}

fn resolve_tool(configured: Option<&PathBuf>, name: &'static str) -> Result<PathBuf, ConfigError> {
    match configured {
        Some(path) => Ok(path.clone()),
        None => which::which(name).map_err(|_| ConfigError::ToolNotFound(name)),
    }
}

impl UploadConfig {
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(BYTES_PER_MB)
    }

    /// Check an upload against the extension allow-list and size cap.
    ///
    /// This is the hosting layer's gate; the pipelines themselves accept any
    /// bytes they are handed.
    pub fn check(&self, name: &str, size: u64) -> Result<(), String> {
        let extension = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if !self
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
        {
            return Err(format!(
                "Unsupported file type '{}'. Accepted: {}",
                name,
                self.allowed_extensions.join(", ")
            ));
        }

        if size > self.max_size_bytes() {
            return Err(format!(
                "File is too large ({:.1} MB); the limit is {} MB",
                size as f64 / BYTES_PER_MB as f64,
                self.max_size_mb
            ));
        }

        Ok(())
    }
}
