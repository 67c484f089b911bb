/// Rasterization of an SVG scene into a pixel buffer

use std::sync::Arc;

use resvg::tiny_skia::{Color, Pixmap, Transform};
use resvg::usvg::{self, fontdb::Database};

use crate::error::ExportError;
use crate::rendering::Rgba;

/// Everything a rasterizer needs for one capture.
#[derive(Debug, Clone)]
pub struct CaptureTarget {
    pub svg: String,
    /// Scene size in CSS pixels (measured box plus bleed)
    pub css_width: u32,
    pub css_height: u32,
    pub fonts: Arc<Database>,
    pub font_family: String,
}

/// Captured pixels at device scale. Always fully opaque.
#[derive(Debug, Clone)]
pub struct Capture {
    pub pixmap: Pixmap,
    pub css_width: u32,
    pub css_height: u32,
    pub scale: f32,
}

impl Capture {
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Straight (non-premultiplied) RGB triples, row-major.
    pub fn rgb(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixmap.pixels().len() * 3);
        for px in self.pixmap.pixels() {
            let c = px.demultiply();
            out.extend_from_slice(&[c.red(), c.green(), c.blue()]);
        }
        out
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        self.pixmap.pixel(x, y).map(|p| {
            let c = p.demultiply();
            Rgba(c.red(), c.green(), c.blue(), c.alpha())
        })
    }
}

/// Turns a capture target into pixels.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, target: &CaptureTarget, scale: f32, background: Rgba) -> Result<Capture, ExportError>;
}

/// usvg + resvg backed rasterizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResvgRasterizer;

pub fn device_size(css: u32, scale: f32) -> u32 {
    ((css as f32) * scale).round().max(1.0) as u32
}

fn primary_font(family: &str) -> String {
    family
        .split(',')
        .map(|s| s.trim().trim_matches('"'))
        .find(|s| !s.is_empty())
        .unwrap_or("sans-serif")
        .to_string()
}

impl Rasterizer for ResvgRasterizer {
    fn rasterize(&self, target: &CaptureTarget, scale: f32, background: Rgba) -> Result<Capture, ExportError> {
        let mut opt = usvg::Options::default();
        opt.fontdb = target.fonts.clone();
        opt.font_family = primary_font(&target.font_family);

        let tree = usvg::Tree::from_str(&target.svg, &opt)
            .map_err(|e| ExportError::CaptureFailed(format!("scene parse failed: {}", e)))?;

        let width = device_size(target.css_width, scale);
        let height = device_size(target.css_height, scale);
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| ExportError::CaptureFailed(format!("cannot allocate {}x{} pixmap", width, height)))?;

        // never transparent: viewers without alpha support would show black
        let bg = background.opaque();
        pixmap.fill(Color::from_rgba8(bg.0, bg.1, bg.2, 255));

        let size = tree.size();
        let transform = Transform::from_scale(width as f32 / size.width(), height as f32 / size.height());
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        log::debug!(
            "rasterized {}x{} css px at {}x into {}x{}",
            target.css_width,
            target.css_height,
            scale,
            width,
            height
        );

        Ok(Capture {
            pixmap,
            css_width: target.css_width,
            css_height: target.css_height,
            scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(svg: &str, w: u32, h: u32) -> CaptureTarget {
        CaptureTarget {
            svg: svg.to_string(),
            css_width: w,
            css_height: h,
            fonts: Arc::new(Database::new()),
            font_family: "Nunito, sans-serif".into(),
        }
    }

    #[test]
    fn rasterize_scales_and_fills_background() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10" viewBox="0 0 20 10"><rect x="0" y="0" width="10" height="10" fill="#ff0000"/></svg>"##;
        let cap = ResvgRasterizer.rasterize(&target(svg, 20, 10), 2.0, Rgba::WHITE).unwrap();
        assert_eq!((cap.width(), cap.height()), (40, 20));
        assert_eq!(cap.pixel(5, 5), Some(Rgba(255, 0, 0, 255)));
        assert_eq!(cap.pixel(35, 15), Some(Rgba::WHITE));
        assert_eq!(cap.rgb().len(), 40 * 20 * 3);
    }

    #[test]
    fn transparent_background_is_forced_opaque() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"></svg>"#;
        let cap = ResvgRasterizer.rasterize(&target(svg, 4, 4), 1.0, Rgba(10, 20, 30, 0)).unwrap();
        assert_eq!(cap.pixel(0, 0), Some(Rgba(10, 20, 30, 255)));
    }

    #[test]
    fn malformed_scene_is_capture_failure() {
        let err = ResvgRasterizer.rasterize(&target("<svg", 4, 4), 1.0, Rgba::WHITE).unwrap_err();
        assert!(matches!(err, ExportError::CaptureFailed(_)));
    }

    #[test]
    fn primary_font_picks_first_family() {
        assert_eq!(primary_font("\"Noto Sans\", serif"), "Noto Sans");
        assert_eq!(primary_font(""), "sans-serif");
    }
}
