use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use vidaudio_core::{
    Config, ConversionRequest, Converter, Presentation, SessionController, SourceKind,
};

const HELP: &str = "\
Commands:
  url <URL>              Prepare audio from a YouTube URL
  file <PATH>            Prepare audio from a local video file
  show [youtube|file]    Show the current result(s)
  save <youtube|file> [DIR]
                         Save the prepared audio (default: output directory)
  clear [youtube|file]   Forget the current result(s)
  help                   Show this help
  quit                   Leave the session";

#[derive(Debug, PartialEq)]
enum SessionCommand {
    Url(String),
    File(PathBuf),
    Show(Option<SourceKind>),
    Save(SourceKind, Option<PathBuf>),
    Clear(Option<SourceKind>),
    Help,
    Quit,
}

pub async fn run(output: Option<&Path>, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let output_dir = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.output.default_directory.clone());
    let mut controller = SessionController::new(Converter::from_config(&config));

    println!("vidaudio session. Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match parse_command(line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        debug!("Session command: {:?}", command);

        match command {
            SessionCommand::Url(url) => {
                super::prepare_with_spinner(&mut controller, ConversionRequest::youtube(url))
                    .await?;
                show(&controller, SourceKind::YouTube);
            }
            SessionCommand::File(path) => match super::read_upload(&path, &config.upload).await {
                Ok(request) => {
                    super::prepare_with_spinner(&mut controller, request).await?;
                    show(&controller, SourceKind::Upload);
                }
                Err(e) => eprintln!("{:#}", e),
            },
            SessionCommand::Show(Some(kind)) => show(&controller, kind),
            SessionCommand::Show(None) => {
                show(&controller, SourceKind::YouTube);
                show(&controller, SourceKind::Upload);
            }
            SessionCommand::Save(kind, dir) => {
                let dir = dir.unwrap_or_else(|| output_dir.clone());
                if let Err(e) = save(&controller, kind, &dir).await {
                    eprintln!("{:#}", e);
                }
            }
            SessionCommand::Clear(Some(kind)) => controller.invalidate(kind),
            SessionCommand::Clear(None) => {
                controller.invalidate(SourceKind::YouTube);
                controller.invalidate(SourceKind::Upload);
            }
            SessionCommand::Help => println!("{}", HELP),
            SessionCommand::Quit => break,
        }
    }

    Ok(())
}

fn show(controller: &SessionController, kind: SourceKind) {
    let label = source_label(kind);
    let Some(cached) = controller.cache().get(kind) else {
        println!("[{}] nothing prepared yet", label);
        return;
    };

    let when = cached.produced_at.format("%H:%M:%S");
    match controller.render(kind) {
        Some(Presentation::Success { summary, offer }) => {
            println!("[{}] {} ({}, prepared {})", label, summary, offer.mime, when);
            println!("[{}] source: {}", label, cached.identity);
        }
        Some(Presentation::Error { message }) => {
            eprintln!("[{}] {}", label, message);
        }
        None => {}
    }
}

async fn save(controller: &SessionController, kind: SourceKind, dir: &Path) -> Result<()> {
    match controller.render(kind) {
        Some(Presentation::Success { offer, .. }) => {
            let path = super::save_offer(offer, dir).await?;
            println!("Saved: {}", path.display());
            Ok(())
        }
        Some(Presentation::Error { .. }) => {
            anyhow::bail!("The last {} action failed; nothing to save", source_label(kind))
        }
        None => anyhow::bail!("Nothing prepared for {} yet", source_label(kind)),
    }
}

fn source_label(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::YouTube => "youtube",
        SourceKind::Upload => "file",
    }
}

fn parse_kind(word: &str) -> Result<SourceKind> {
    match word {
        "youtube" | "yt" | "url" => Ok(SourceKind::YouTube),
        "file" | "upload" => Ok(SourceKind::Upload),
        other => anyhow::bail!("Unknown source '{}': use youtube or file", other),
    }
}

fn parse_command(line: &str) -> Result<SessionCommand> {
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb {
        "url" | "youtube" => {
            // An empty URL is passed through so the pipeline reports it.
            SessionCommand::Url(rest.to_string())
        }
        "file" => {
            if rest.is_empty() {
                anyhow::bail!("Please choose a video file: file <PATH>");
            }
            SessionCommand::File(PathBuf::from(rest))
        }
        "show" => SessionCommand::Show(optional_kind(rest)?),
        "clear" => SessionCommand::Clear(optional_kind(rest)?),
        "save" => {
            let (kind, dir) = match rest.split_once(char::is_whitespace) {
                Some((kind, dir)) => (kind, Some(PathBuf::from(dir.trim()))),
                None => (rest, None),
            };
            let kind = parse_kind(kind).context("usage: save <youtube|file> [DIR]")?;
            SessionCommand::Save(kind, dir)
        }
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        other => anyhow::bail!("Unknown command '{}'. Type `help` for commands.", other),
    };
    Ok(command)
}

fn optional_kind(word: &str) -> Result<Option<SourceKind>> {
    if word.is_empty() {
        Ok(None)
    } else {
        parse_kind(word).map(Some)
    }
}
