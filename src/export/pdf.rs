//! Single-page PDF assembly.
//!
//! The capture is embedded as one Flate-compressed RGB image XObject that
//! fills the page. The page is sized so that one CSS pixel maps to 0.75pt,
//! independent of the capture scale.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, TextStr};

use super::{ArtifactBackend, ArtifactFormat, Document, ExportArtifact, Orientation};
use crate::error::ExportError;
use crate::rendering::raster::Capture;

/// Points per CSS pixel (72 / 96)
pub const PT_PER_CSS_PX: f32 = 0.75;

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfBackend;

impl PdfBackend {
    /// Page size in points for a capture.
    pub fn page_size(capture: &Capture) -> (f32, f32) {
        let css_w = capture.width() as f32 / capture.scale;
        let css_h = capture.height() as f32 / capture.scale;
        (css_w * PT_PER_CSS_PX, css_h * PT_PER_CSS_PX)
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, ExportError> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data)?;
    Ok(enc.finish()?)
}

impl ArtifactBackend for PdfBackend {
    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::Pdf
    }

    fn assemble(&self, capture: &Capture) -> Result<ExportArtifact, ExportError> {
        let (page_w, page_h) = Self::page_size(capture);
        let pixels = deflate(&capture.rgb())?;

        let catalog_id = Ref::new(1);
        let tree_id = Ref::new(2);
        let page_id = Ref::new(3);
        let image_id = Ref::new(4);
        let content_id = Ref::new(5);
        let info_id = Ref::new(6);
        let image_name = Name(b"Im1");

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(tree_id);
        pdf.pages(tree_id).kids([page_id]).count(1);

        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, page_w, page_h));
        page.parent(tree_id);
        page.contents(content_id);
        page.resources().x_objects().pair(image_name, image_id);
        page.finish();

        let mut image = pdf.image_xobject(image_id, &pixels);
        image.filter(Filter::FlateDecode);
        image.width(capture.width() as i32);
        image.height(capture.height() as i32);
        image.color_space().device_rgb();
        image.bits_per_component(8);
        image.finish();

        let mut content = Content::new();
        content.save_state();
        content.transform([page_w, 0.0, 0.0, page_h, 0.0, 0.0]);
        content.x_object(image_name);
        content.restore_state();
        pdf.stream(content_id, &content.finish());

        pdf.document_info(info_id).producer(TextStr("duocert"));

        let bytes = pdf.finish();
        log::debug!(
            "assembled PDF page {:.1}x{:.1}pt from {}x{} px ({} bytes)",
            page_w,
            page_h,
            capture.width(),
            capture.height(),
            bytes.len()
        );

        Ok(ExportArtifact::Document(Document {
            bytes,
            page_width: page_w,
            page_height: page_h,
            orientation: Orientation::for_size(page_w, page_h),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resvg::tiny_skia::{Color, Pixmap};

    fn capture(w: u32, h: u32) -> Capture {
        let mut pixmap = Pixmap::new(w, h).unwrap();
        pixmap.fill(Color::WHITE);
        Capture {
            pixmap,
            css_width: w / 2,
            css_height: h / 2,
            scale: 2.0,
        }
    }

    #[test]
    fn page_maps_css_pixels_to_points() {
        let c = capture(800, 400);
        assert_eq!(PdfBackend::page_size(&c), (300.0, 150.0));
    }

    #[test]
    fn landscape_capture_gives_landscape_page() {
        match PdfBackend.assemble(&capture(800, 400)).unwrap() {
            ExportArtifact::Document(doc) => {
                assert!(doc.bytes.starts_with(b"%PDF-"));
                assert_eq!(doc.orientation, Orientation::Landscape);
            }
            other => panic!("expected a document, got {:?}", other.format()),
        }
    }

    #[test]
    fn portrait_capture_gives_portrait_page() {
        let artifact = PdfBackend.assemble(&capture(400, 800)).unwrap();
        artifact.validate().unwrap();
        match artifact {
            ExportArtifact::Document(doc) => assert_eq!(doc.orientation, Orientation::Portrait),
            other => panic!("expected a document, got {:?}", other.format()),
        }
    }

    #[test]
    fn assembly_is_deterministic() {
        let c = capture(40, 20);
        let a = PdfBackend.assemble(&c).unwrap();
        let b = PdfBackend.assemble(&c).unwrap();
        assert_eq!(a.digest_hex(), b.digest_hex());
    }
}
