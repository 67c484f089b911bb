//! duocert
//!
//! Renders a user's public Duolingo statistics into an achievement certificate
//! and exports it as a PNG image or a single-page PDF.
//!
//! The pipeline is split in two halves that only meet through a non-owning
//! [`stage::NodeHandle`]:
//!
//! - **Renderer** ([`rendering`]): `UserStats` → laid-out node tree. Pure and
//!   deterministic for a given viewport class and issue date.
//! - **Export engine** ([`export`]): waits for fonts and embedded images to
//!   settle, measures the mounted tree, captures it at a fixed device scale
//!   with a bleed margin, and hands the pixels to a PNG or PDF backend.
//!
//! # Example
//!
//! ```no_run
//! use duocert::{Config, export::ArtifactFormat, platform::DirectorySink};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let sink = DirectorySink::new(&config.output_dir);
//! let mut session = duocert::new_session(config)?;
//! session.submit("ana").await;
//! let saved = session.export(ArtifactFormat::Png, &sink).await?;
//! println!("saved {}", saved.location);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Error, ExportError, LookupError, Result};

pub mod flags;
pub mod stats;
pub use stats::{Course, UserStats};

// Statistics provider seam (HTTP backend behind the `http` feature)
pub mod lookup;

// Layout, paint, SVG scene and rasterization
pub mod rendering;

// Collaborator seams: image fetching, notifications, artifact sinks
pub mod platform;

// Mount lifecycle of the live certificate
pub mod stage;

pub mod export;
pub use export::{ArtifactFormat, ExportArtifact, ExportEngine, ExportOptions};

pub mod session;
pub use session::{Celebration, Session, SessionState};

/// Breakpoint (CSS px) at and above which the wide layout is used.
pub const WIDE_BREAKPOINT: u32 = 768;

/// Top-level configuration.
///
/// Defaults mirror the web front end: the public upstream endpoint, a desktop
/// viewport, 2× capture with a 100px bleed on every side, and a white
/// background so viewers without alpha support never show black.
///
/// ```
/// let cfg = duocert::Config::default();
/// assert_eq!(cfg.export.scale, 2.0);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Where statistics are looked up
    pub endpoint: lookup::LookupEndpoint,
    /// User agent sent with lookup and image requests
    pub user_agent: String,
    /// HTTP timeout in milliseconds
    pub timeout_ms: u64,
    /// Viewport the certificate is laid out for
    pub viewport: Viewport,
    /// Capture and assembly options
    pub export: ExportOptions,
    /// Directory artifacts are saved into
    pub output_dir: PathBuf,
    /// Font sources used during capture
    pub fonts: FontConfig,
    /// Whether to fetch and draw the user's avatar
    pub load_avatar: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: lookup::LookupEndpoint::default(),
            user_agent: format!("duocert/{}", env!("CARGO_PKG_VERSION")),
            timeout_ms: 15000,
            viewport: Viewport::default(),
            export: ExportOptions::default(),
            output_dir: PathBuf::from("."),
            fonts: FontConfig::default(),
            load_avatar: true,
        }
    }
}

impl Config {
    /// Reject values that would make capture or lookup meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.viewport.width == 0 {
            return Err(Error::ConfigError("viewport width must be positive".into()));
        }
        if !self.export.scale.is_finite() || self.export.scale <= 0.0 {
            return Err(Error::ConfigError(format!(
                "scale must be a positive number, got {}",
                self.export.scale
            )));
        }
        if self.export.scale > 8.0 {
            return Err(Error::ConfigError("scale above 8x is not supported".into()));
        }
        self.endpoint.validate()?;
        Ok(())
    }
}

/// Font sources for the capture backend.
#[derive(Debug, Clone)]
pub struct FontConfig {
    /// Load fonts installed on the system
    pub load_system: bool,
    /// Extra directories scanned for font files
    pub dirs: Vec<PathBuf>,
    /// CSS font-family list used for all certificate text
    pub family: String,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            load_system: true,
            dirs: Vec::new(),
            family: "Nunito, Noto Sans, DejaVu Sans, sans-serif".to_string(),
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl Viewport {
    pub fn class(&self) -> ViewportClass {
        ViewportClass::from_width(self.width)
    }
}

/// Responsive layout class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewportClass {
    Compact,
    Wide,
}

impl ViewportClass {
    pub fn from_width(width: u32) -> Self {
        if width >= WIDE_BREAKPOINT {
            ViewportClass::Wide
        } else {
            ViewportClass::Compact
        }
    }
}

/// Create a session wired to the HTTP backends.
#[cfg(feature = "http")]
pub fn new_session(config: Config) -> Result<Session> {
    use std::sync::Arc;

    config.validate()?;
    let provider = lookup::HttpStatsProvider::new(&config)?;
    let images: Arc<dyn platform::ImageFetcher> = if config.load_avatar {
        Arc::new(platform::HttpImageFetcher::new(&config)?)
    } else {
        Arc::new(platform::NoopImageFetcher)
    };
    Ok(Session::new(
        config,
        Arc::new(provider),
        images,
        Arc::new(platform::LogNotifier),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.viewport.width, 1280);
        assert_eq!(config.export.bleed, 100);
        assert!(config.fonts.load_system);
    }

    #[test]
    fn viewport_class_breakpoint() {
        assert_eq!(ViewportClass::from_width(767), ViewportClass::Compact);
        assert_eq!(ViewportClass::from_width(768), ViewportClass::Wide);
        let vp = Viewport { width: 390, height: 844 };
        assert_eq!(vp.class(), ViewportClass::Compact);
    }

    #[test]
    fn validate_rejects_bad_scale() {
        let mut cfg = Config::default();
        cfg.export.scale = 0.0;
        assert!(matches!(cfg.validate(), Err(Error::ConfigError(_))));
        cfg.export.scale = f32::NAN;
        assert!(cfg.validate().is_err());
    }
}
