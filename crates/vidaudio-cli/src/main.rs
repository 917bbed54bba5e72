mod args;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let filter = match cli.verbose {
        0 => "vidaudio=warn,vidaudio_core=warn",
        1 => "vidaudio=info,vidaudio_core=info",
        2 => "vidaudio=debug,vidaudio_core=debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let output = cli.output.as_deref();
    let config = cli.config.as_deref();

    match cli.command {
        Some(Commands::Youtube { url }) => commands::extract::run_url(&url, output, config).await,
        Some(Commands::File { path }) => commands::extract::run_file(&path, output, config).await,
        Some(Commands::Session) => commands::session::run(output, config).await,
        Some(Commands::Doctor) => commands::doctor::run(config).await,
        Some(Commands::Config) => commands::config::run(config).await,
        None => {
            // If URL provided directly, treat as youtube command
            if let Some(url) = cli.url {
                commands::extract::run_url(&url, output, config).await
            } else {
                use clap::CommandFactory;
                Cli::command().print_help()?;
                println!();
                Ok(())
            }
        }
    }
}
