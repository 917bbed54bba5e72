use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Command;
use vidaudio_core::{config::Config, error::ConfigError};

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("vidaudio dependency check\n");

    let mut all_ok = true;

    // yt-dlp prints a bare version string
    all_ok &= report(
        "yt-dlp:  ",
        config.yt_dlp_path(),
        &["--version"],
        |out| out.trim().to_string(),
        "Install with: pip install -U yt-dlp (needed for YouTube links)",
    );

    // ffmpeg/ffprobe print "ffmpeg version X ..." on the first line
    all_ok &= report(
        "ffmpeg:  ",
        config.ffmpeg_path(),
        &["-version"],
        third_word_of_first_line,
        "Install with: brew install ffmpeg (or your package manager)",
    );
    all_ok &= report(
        "ffprobe: ",
        config.ffprobe_path(),
        &["-version"],
        third_word_of_first_line,
        "Ships with ffmpeg",
    );

    println!("\nScratch directory: {}", config.temp_dir().display());
    println!(
        "Output encoding:   {} @ {} kbps",
        config.encoding.codec, config.encoding.bitrate_kbps
    );

    println!();
    if all_ok {
        println!("All dependencies OK!");
    } else {
        println!("Some dependencies are missing. See above for installation instructions.");
    }

    Ok(())
}

fn report(
    label: &str,
    path: Result<PathBuf, ConfigError>,
    version_args: &[&str],
    parse_version: fn(&str) -> String,
    install_hint: &str,
) -> bool {
    print!("{}", label);
    match path {
        Ok(path) => match Command::new(&path).args(version_args).output() {
            Ok(out) if out.status.success() => {
                let version = parse_version(&String::from_utf8_lossy(&out.stdout));
                println!("OK ({}, {})", version, path.display());
                true
            }
            _ => {
                println!("FOUND at {} but failed to get version", path.display());
                false
            }
        },
        Err(e) => {
            println!("NOT FOUND ({})", e);
            println!("          {}", install_hint);
            false
        }
    }
}

fn third_word_of_first_line(out: &str) -> String {
    out.lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(2))
        .unwrap_or("unknown")
        .to_string()
}
