use crate::config::ConfigError;
use crate::fetch::FetchError;

/// Why a row ended up without an image. Never fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error("empty URL")]
    EmptyUrl,
    #[error("not an http(s) URL: `{0}`")]
    InvalidUrl(String),
    #[error("download failed: {0}")]
    Fetch(#[source] FetchError),
    #[error("not a decodable image: {0}")]
    Decode(#[source] image::ImageError),
}

/// Failures that abort the run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error(transparent)]
    Load(cellpic_io::Error),
    #[error(transparent)]
    Save(cellpic_io::Error),
}
