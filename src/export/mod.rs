//! Export engine: settle, measure, capture, assemble, save.
//!
//! The engine never owns the certificate. It resolves a [`NodeHandle`] at
//! the start of every export, waits for the mounted tree to settle, takes a
//! fresh measurement and captures it with a bleed margin at a fixed device
//! scale. The pixels are handed to an [`ArtifactBackend`] and the result is
//! validated before it reaches a sink. If the certificate was unmounted or
//! replaced at any point, the artifact is discarded with
//! [`ExportError::Detached`].

pub mod filename;
#[cfg(feature = "pdf")]
pub mod pdf;
pub mod png;

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::error::ExportError;
use crate::platform::ArtifactSink;
use crate::rendering::raster::{Capture, CaptureTarget, Rasterizer, ResvgRasterizer};
use crate::rendering::svg::{self, SceneSpec};
use crate::rendering::Rgba;
use crate::stage::NodeHandle;

pub use filename::{filename_for, sanitize_file_stem, FALLBACK_FILE_STEM};
#[cfg(feature = "pdf")]
pub use pdf::PdfBackend;
pub use png::PngBackend;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Output format requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactFormat {
    Png,
    Pdf,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Png => "png",
            ArtifactFormat::Pdf => "pdf",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ArtifactFormat::Png => "image/png",
            ArtifactFormat::Pdf => "application/pdf",
        }
    }
}

impl std::str::FromStr for ArtifactFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ArtifactFormat::Png),
            "pdf" => Ok(ArtifactFormat::Pdf),
            other => Err(format!("unknown format {:?} (expected png or pdf)", other)),
        }
    }
}

/// Capture parameters
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Device pixels per CSS pixel
    pub scale: f32,
    /// Margin added on every side of the measured box, in CSS pixels
    pub bleed: u32,
    /// Canvas fill; forced opaque
    pub background: Rgba,
    /// Upper bound on waiting for fonts and images before capture
    pub settle_timeout_ms: u64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            bleed: 100,
            background: Rgba::WHITE,
            settle_timeout_ms: 10_000,
        }
    }
}

impl ExportOptions {
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
}

/// Encoded PNG plus its pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// Landscape iff strictly wider than tall.
    pub fn for_size(width: f32, height: f32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

/// Single-page PDF. Page dimensions are in points.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub page_width: f32,
    pub page_height: f32,
    pub orientation: Orientation,
}

/// A finished export.
#[derive(Debug, Clone)]
pub enum ExportArtifact {
    Raster(RasterImage),
    Document(Document),
}

impl ExportArtifact {
    pub fn bytes(&self) -> &[u8] {
        match self {
            ExportArtifact::Raster(img) => &img.bytes,
            ExportArtifact::Document(doc) => &doc.bytes,
        }
    }

    pub fn format(&self) -> ArtifactFormat {
        match self {
            ExportArtifact::Raster(_) => ArtifactFormat::Png,
            ExportArtifact::Document(_) => ArtifactFormat::Pdf,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        self.format().mime()
    }

    pub fn extension(&self) -> &'static str {
        self.format().extension()
    }

    /// Hex SHA-256 of the encoded bytes.
    pub fn digest_hex(&self) -> String {
        hex::encode(Sha256::digest(self.bytes()))
    }

    /// Reject bytes that are not a complete file of the declared format.
    pub fn validate(&self) -> Result<(), ExportError> {
        let bytes = self.bytes();
        match self {
            ExportArtifact::Raster(img) => {
                if !bytes.starts_with(PNG_SIGNATURE) {
                    return Err(ExportError::CaptureFailed("output is not a PNG".into()));
                }
                if img.width == 0 || img.height == 0 {
                    return Err(ExportError::CaptureFailed("empty image".into()));
                }
            }
            ExportArtifact::Document(_) => {
                let trimmed = trim_trailing_whitespace(bytes);
                if !bytes.starts_with(b"%PDF-") || !trimmed.ends_with(b"%%EOF") {
                    return Err(ExportError::CaptureFailed("output is not a complete PDF".into()));
                }
            }
        }
        Ok(())
    }
}

fn trim_trailing_whitespace(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &bytes[..end]
}

/// Turns captured pixels into a file format.
pub trait ArtifactBackend: Send + Sync {
    fn format(&self) -> ArtifactFormat;
    fn assemble(&self, capture: &Capture) -> Result<ExportArtifact, ExportError>;
}

/// Backend for `format`.
pub fn backend_for(format: ArtifactFormat) -> Result<Arc<dyn ArtifactBackend>, ExportError> {
    match format {
        ArtifactFormat::Png => Ok(Arc::new(PngBackend)),
        #[cfg(feature = "pdf")]
        ArtifactFormat::Pdf => Ok(Arc::new(PdfBackend)),
        #[cfg(not(feature = "pdf"))]
        ArtifactFormat::Pdf => Err(ExportError::CaptureFailed(
            "PDF support was not compiled in (enable the `pdf` feature)".into(),
        )),
    }
}

/// What a sink received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub file_name: String,
    pub location: String,
    pub format: ArtifactFormat,
    /// Pixel size of the capture the artifact was built from
    pub width: u32,
    pub height: u32,
    pub digest: String,
}

/// Captures mounted certificates and assembles them into artifacts.
#[derive(Clone)]
pub struct ExportEngine {
    options: ExportOptions,
    rasterizer: Arc<dyn Rasterizer>,
}

impl std::fmt::Debug for ExportEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportEngine").field("options", &self.options).finish()
    }
}

impl ExportEngine {
    pub fn new(options: ExportOptions) -> Self {
        Self::with_rasterizer(options, Arc::new(ResvgRasterizer))
    }

    pub fn with_rasterizer(options: ExportOptions, rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self { options, rasterizer }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Settle, measure and rasterize the certificate behind `handle`.
    pub async fn capture(&self, handle: &NodeHandle) -> Result<Capture, ExportError> {
        let node = handle.upgrade().ok_or(ExportError::Detached)?;
        let fonts = node.settle(self.options.settle_timeout()).await?;

        // measured after settling so late layout changes are included
        let target = node.with_certificate(|cert| {
            let spec = SceneSpec {
                content: cert.measure(),
                bleed: self.options.bleed as f32,
                background: self.options.background,
                font_family: node.fonts().family(),
            };
            let svg = svg::scene(&cert.paint(), &spec, &node.scene_images());
            CaptureTarget {
                svg,
                css_width: spec.width() as u32,
                css_height: spec.height() as u32,
                fonts: fonts.clone(),
                font_family: spec.font_family.to_string(),
            }
        });
        drop(node);

        let rasterizer = self.rasterizer.clone();
        let scale = self.options.scale;
        let background = self.options.background;
        let capture = tokio::task::spawn_blocking(move || rasterizer.rasterize(&target, scale, background))
            .await
            .map_err(|e| ExportError::CaptureFailed(format!("capture task failed: {}", e)))??;

        if !handle.is_attached() {
            return Err(ExportError::Detached);
        }
        Ok(capture)
    }

    /// Capture and assemble with an explicit backend.
    pub async fn export_with(
        &self,
        handle: &NodeHandle,
        backend: Arc<dyn ArtifactBackend>,
    ) -> Result<(Capture, ExportArtifact), ExportError> {
        let capture = self.capture(handle).await?;
        let (capture, artifact) = tokio::task::spawn_blocking(move || {
            let artifact = backend.assemble(&capture);
            (capture, artifact)
        })
        .await
        .map_err(|e| ExportError::CaptureFailed(format!("assembly task failed: {}", e)))?;
        let artifact = artifact?;
        artifact.validate()?;

        if !handle.is_attached() {
            log::debug!("discarding {} artifact of a detached certificate", artifact.extension());
            return Err(ExportError::Detached);
        }
        Ok((capture, artifact))
    }

    /// PNG of the certificate.
    pub async fn capture_raster(&self, handle: &NodeHandle) -> Result<RasterImage, ExportError> {
        match self.export_with(handle, Arc::new(PngBackend)).await?.1 {
            ExportArtifact::Raster(img) => Ok(img),
            ExportArtifact::Document(_) => Err(ExportError::CaptureFailed("backend returned a PDF".into())),
        }
    }

    /// Single-page PDF of the certificate.
    #[cfg(feature = "pdf")]
    pub async fn capture_document(&self, handle: &NodeHandle) -> Result<Document, ExportError> {
        match self.export_with(handle, Arc::new(PdfBackend)).await?.1 {
            ExportArtifact::Document(doc) => Ok(doc),
            ExportArtifact::Raster(_) => Err(ExportError::CaptureFailed("backend returned a PNG".into())),
        }
    }

    /// Export in `format` and hand the result to `sink`.
    pub async fn download(
        &self,
        handle: &NodeHandle,
        format: ArtifactFormat,
        sink: &dyn ArtifactSink,
    ) -> Result<SavedArtifact, ExportError> {
        let name = {
            let node = handle.upgrade().ok_or(ExportError::Detached)?;
            node.with_certificate(|c| c.stats().name.clone())
        };
        let backend = backend_for(format)?;
        let (capture, artifact) = self.export_with(handle, backend).await?;

        if !handle.is_attached() {
            return Err(ExportError::Detached);
        }
        let file_name = filename_for(&name, format);
        let location = sink.save(&file_name, &artifact).await?;
        log::info!(
            "exported {} ({}x{} px, sha256 {})",
            file_name,
            capture.width(),
            capture.height(),
            artifact.digest_hex()
        );
        Ok(SavedArtifact {
            file_name,
            location,
            format,
            width: capture.width(),
            height: capture.height(),
            digest: artifact.digest_hex(),
        })
    }
}
