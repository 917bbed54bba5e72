use anyhow::Result;
use std::path::Path;

use vidaudio_core::{
    session::present, Config, ConversionRequest, Converter, Presentation, SessionController,
};

pub async fn run_url(url: &str, output: Option<&Path>, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    run(ConversionRequest::youtube(url), output, &config).await
}

pub async fn run_file(path: &Path, output: Option<&Path>, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let request = super::read_upload(path, &config.upload).await?;
    run(request, output, &config).await
}

async fn run(request: ConversionRequest, output: Option<&Path>, config: &Config) -> Result<()> {
    let output_dir = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.output.default_directory.clone());

    let mut controller = SessionController::new(Converter::from_config(config));
    let cached = super::prepare_with_spinner(&mut controller, request).await?;

    match present(&cached.result) {
        Presentation::Success { summary, offer } => {
            println!("{}", summary);
            let saved = super::save_offer(offer, &output_dir).await?;
            println!("Saved: {} ({})", saved.display(), offer.mime);
            Ok(())
        }
        Presentation::Error { message } => anyhow::bail!("{}", message),
    }
}
