//! vidaudio-core: Audio extraction from YouTube links and uploaded videos

pub mod config;
pub mod encoder;
pub mod error;
pub mod filename;
pub mod pipeline;
pub mod request;
pub mod retriever;
pub mod session;
pub mod transcoder;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{ConvertError, Result};
pub use pipeline::{Converter, PipelineStage, ProgressSink};
pub use request::{ConversionRequest, ConversionResult, SourceKind};
pub use session::{Presentation, SessionController};
