//! Run configuration.
//!
//! Every knob has a default, so an empty JSON object (`{}`) is a valid
//! configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;
use crate::scale::BoundingBox;

/// Header names that identify the URL column.
pub const DEFAULT_URL_COLUMN_NAMES: &[&str] = &["商品主图", "商品图片"];
/// Header written into the inserted image column.
pub const DEFAULT_IMAGE_COLUMN_LABEL: &str = "图片预览";
/// Marker inserted before the output file's extension.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "-图片已下载";
pub const DEFAULT_MAX_IMAGE_WIDTH: u32 = 150;
pub const DEFAULT_MAX_IMAGE_HEIGHT: u32 = 150;

/// Empirical pixel -> Excel column width (character units) divisor.
const PIXELS_PER_WIDTH_UNIT: f64 = 7.0;
/// Empirical pixel -> row height (points) factor.
const POINTS_PER_PIXEL: f64 = 0.75;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Spreadsheets to process, in order.
    pub sources: Vec<PathBuf>,
    /// A header cell matches when it equals or contains any of these names.
    pub url_column_names: Vec<String>,
    pub image_column_label: String,
    /// Bounding box width in pixels.
    pub max_image_width: u32,
    /// Bounding box height in pixels.
    pub max_image_height: u32,
    /// Scale images smaller than the bounding box up to fill it.
    pub allow_upscale: bool,
    pub output_suffix: String,
    pub concurrency: ConcurrencyPolicy,
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            url_column_names: DEFAULT_URL_COLUMN_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            image_column_label: DEFAULT_IMAGE_COLUMN_LABEL.to_string(),
            max_image_width: DEFAULT_MAX_IMAGE_WIDTH,
            max_image_height: DEFAULT_MAX_IMAGE_HEIGHT,
            allow_upscale: true,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            concurrency: ConcurrencyPolicy::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load a JSON configuration file; omitted fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid =
            |msg: &str| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg.to_string())) };

        if self.url_column_names.is_empty() {
            return invalid("url_column_names must name at least one header");
        }
        if self.url_column_names.iter().any(|n| n.trim().is_empty()) {
            return invalid("url_column_names must not contain blank names");
        }
        if self.max_image_width == 0 || self.max_image_height == 0 {
            return invalid("max_image_width and max_image_height must be positive");
        }
        if self.output_suffix.is_empty() {
            return invalid("output_suffix must not be empty (the input would be overwritten)");
        }
        if let ConcurrencyPolicy::Concurrent {
            max_in_flight: Some(0),
        } = self.concurrency
        {
            return invalid("concurrency.max_in_flight must be at least 1");
        }
        if self.http.timeout_ms == 0 {
            return invalid("http.timeout_ms must be positive");
        }
        if self.http.max_attempts == 0 {
            return invalid("http.max_attempts must be at least 1");
        }
        Ok(())
    }

    /// Width of the inserted image column, in Excel character units.
    pub fn column_width(&self) -> f64 {
        f64::from(self.max_image_width) / PIXELS_PER_WIDTH_UNIT
    }

    /// Height applied to every data row, in points.
    pub fn row_height(&self) -> f64 {
        f64::from(self.max_image_height) * POINTS_PER_PIXEL
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.max_image_width, self.max_image_height)
    }
}

/// How the rows of one worksheet are fetched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// One row at a time.
    Sequential,
    /// All rows of a worksheet are fetched as one batch; `max_in_flight`
    /// bounds outstanding requests (`None` = unbounded).
    Concurrent {
        #[serde(default)]
        max_in_flight: Option<usize>,
    },
}

impl Default for ConcurrencyPolicy {
    fn default() -> Self {
        ConcurrencyPolicy::Concurrent {
            max_in_flight: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Per-request timeout.
    pub timeout_ms: u64,
    /// Total attempts per URL, including the first.
    pub max_attempts: u32,
    /// First backoff delay; doubles after every failed attempt.
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Hard cap on a downloaded image body.
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_attempts: 5,
            base_delay_ms: 250,
            max_delay_ms: 4_000,
            max_body_bytes: 20 * 1024 * 1024, // 20 MiB
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}
