/// PNG assembly

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::{ArtifactBackend, ArtifactFormat, ExportArtifact, RasterImage};
use crate::error::ExportError;
use crate::rendering::raster::Capture;

/// Encodes the capture as an opaque RGB PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngBackend;

impl ArtifactBackend for PngBackend {
    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::Png
    }

    fn assemble(&self, capture: &Capture) -> Result<ExportArtifact, ExportError> {
        let (width, height) = (capture.width(), capture.height());
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes)
            .write_image(&capture.rgb(), width, height, ExtendedColorType::Rgb8)
            .map_err(|e| ExportError::CaptureFailed(format!("PNG encoding failed: {}", e)))?;
        Ok(ExportArtifact::Raster(RasterImage { bytes, width, height }))
    }
}
