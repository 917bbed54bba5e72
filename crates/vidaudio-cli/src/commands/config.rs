use anyhow::{Context, Result};
use std::path::Path;
use vidaudio_core::config::Config;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("vidaudio configuration\n");
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("{}", rendered.trim_end());

    if config.paths.yt_dlp.is_none() || config.paths.ffmpeg.is_none() || config.paths.ffprobe.is_none() {
        println!("\n# Unset [paths] entries are auto-detected from PATH");
    }
    if config.temp.directory.is_none() {
        println!("# Scratch workspaces go to the system temp directory");
    }

    // Show config file locations
    println!("\nConfig file locations (in priority order):");
    if let Some(p) = config_path {
        println!("  1. {} (specified)", p.display());
    }
    if let Some(default_config) = Config::default_config_file() {
        println!("  2. {}", default_config.display());
    }
    println!("  3. Environment variables (VIDAUDIO_*, nested keys joined with __)");

    Ok(())
}
