use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::Error;
use crate::pdf::FOOTER_OFFSET;

pub const DEFAULT_IMAGE_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_FOOTER_RESERVE: f32 = 30.0;

/// TrueType/OpenType files used instead of the standard Helvetica pair.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub regular: Option<PathBuf>,
    pub bold: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub image_timeout_ms: u64,
    /// Vertical space kept free above the bottom margin for the footer line.
    /// Never less than [`FOOTER_OFFSET`].
    pub footer_reserve: f32,
    /// Deflate page content streams.
    pub compress: bool,
    pub fonts: FontConfig,
    /// Footer timestamp. `None` stamps the local time of each generate call.
    pub generated_at: Option<NaiveDateTime>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            image_timeout_ms: DEFAULT_IMAGE_TIMEOUT_MS,
            footer_reserve: DEFAULT_FOOTER_RESERVE,
            compress: true,
            fonts: FontConfig::default(),
            generated_at: None,
        }
    }
}

impl RenderConfig {
    /// Defaults overlaid with `CMVR_FONT_REGULAR`, `CMVR_FONT_BOLD` and
    /// `CMVR_IMAGE_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, Error> {
        Self::default().with_env_overrides()
    }

    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", e, path.display()),
            ))
        })?;
        let config: RenderConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_env_overrides(mut self) -> Result<Self, Error> {
        if let Ok(path) = std::env::var("CMVR_FONT_REGULAR")
            && !path.trim().is_empty()
        {
            self.fonts.regular = Some(PathBuf::from(path.trim()));
        }
        if let Ok(path) = std::env::var("CMVR_FONT_BOLD")
            && !path.trim().is_empty()
        {
            self.fonts.bold = Some(PathBuf::from(path.trim()));
        }
        if let Ok(raw) = std::env::var("CMVR_IMAGE_TIMEOUT_MS") {
            self.image_timeout_ms = raw.trim().parse().map_err(|_| {
                Error::Config(format!("CMVR_IMAGE_TIMEOUT_MS is not a number: {raw:?}"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !self.footer_reserve.is_finite() || self.footer_reserve < FOOTER_OFFSET {
            return Err(Error::Config(format!(
                "footer_reserve must be at least {FOOTER_OFFSET} to clear the footer line, got {}",
                self.footer_reserve
            )));
        }
        if self.image_timeout_ms == 0 {
            return Err(Error::Config("image_timeout_ms must be greater than zero".into()));
        }
        Ok(())
    }
}
