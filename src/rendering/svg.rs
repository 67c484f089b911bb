//! SVG scene serialization.
//!
//! The scene is the capture target: content translated by the bleed margin on
//! an opaque background, with embedded images inlined as base64 PNG data URIs.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use base64::Engine as _;

use crate::rendering::layout::{Align, Rect};
use crate::rendering::paint::PaintCommand;
use crate::rendering::{Rgba, SlotId};

/// Neutral fill drawn where an image could not be decoded.
pub const PLACEHOLDER_FILL: Rgba = Rgba(0xe2, 0xe8, 0xf0, 255);

/// Resolved content of an image slot at capture time.
#[derive(Debug, Clone)]
pub enum SceneImage {
    Png(Arc<Vec<u8>>),
    Placeholder,
}

/// Parameters of one scene.
#[derive(Debug, Clone)]
pub struct SceneSpec<'a> {
    /// Measured content box
    pub content: Rect,
    /// Extra space around the content on every side
    pub bleed: f32,
    pub background: Rgba,
    pub font_family: &'a str,
}

impl SceneSpec<'_> {
    pub fn width(&self) -> f32 {
        self.content.width.ceil() + 2.0 * self.bleed
    }

    pub fn height(&self) -> f32 {
        self.content.height.ceil() + 2.0 * self.bleed
    }
}

/// Escape markup characters and drop code points XML 1.0 does not allow.
pub fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if is_xml_char(c) => out.push(c),
            _ => {}
        }
    }
    out
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= '\u{20}' && c != '\u{FFFE}' && c != '\u{FFFF}')
}

fn anchor(align: Align) -> &'static str {
    match align {
        Align::Start => "start",
        Align::Center => "middle",
        Align::End => "end",
    }
}

/// Serialize `commands` into a standalone SVG document.
pub fn scene(commands: &[PaintCommand], spec: &SceneSpec<'_>, images: &HashMap<SlotId, SceneImage>) -> String {
    let (w, h) = (spec.width(), spec.height());
    let mut svg = String::with_capacity(commands.len() * 160);
    let family = escape_xml(spec.font_family);

    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">"#
    );
    let _ = write!(
        svg,
        r#"<rect x="0" y="0" width="{w:.0}" height="{h:.0}" fill="{}"/>"#,
        spec.background.opaque().hex()
    );
    let _ = write!(
        svg,
        r#"<g transform="translate({:.2} {:.2})">"#,
        spec.bleed - spec.content.x,
        spec.bleed - spec.content.y
    );

    for (i, cmd) in commands.iter().enumerate() {
        match cmd {
            PaintCommand::SolidRect { rect, radius, rgba } => {
                let _ = write!(
                    svg,
                    r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}" fill="{}" fill-opacity="{:.3}"/>"#,
                    rect.x, rect.y, rect.width, rect.height, radius, rgba.hex(), rgba.alpha()
                );
            }
            PaintCommand::StrokeRect { rect, radius, width, rgba } => {
                let _ = write!(
                    svg,
                    r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}" fill="none" stroke="{}" stroke-opacity="{:.3}" stroke-width="{:.2}"/>"#,
                    rect.x, rect.y, rect.width, rect.height, radius, rgba.hex(), rgba.alpha(), width
                );
            }
            PaintCommand::Text { x, y, text, font, rgba, anchor: align, opacity } => {
                let _ = write!(
                    svg,
                    r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.1}" font-weight="{}" font-style="{}" text-anchor="{}" fill="{}" opacity="{:.3}" xml:space="preserve">{}</text>"#,
                    x,
                    y,
                    family,
                    font.size,
                    if font.bold { "bold" } else { "normal" },
                    if font.italic { "italic" } else { "normal" },
                    anchor(*align),
                    rgba.hex(),
                    opacity,
                    escape_xml(text)
                );
            }
            PaintCommand::Image { rect, slot, radius } => {
                let clip = format!("clip-{}-{}", slot.0, i);
                let _ = write!(
                    svg,
                    r#"<clipPath id="{clip}"><rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}"/></clipPath>"#,
                    rect.x, rect.y, rect.width, rect.height, radius
                );
                match images.get(slot) {
                    Some(SceneImage::Png(png)) => {
                        let data = base64::engine::general_purpose::STANDARD.encode(png.as_slice());
                        let _ = write!(
                            svg,
                            r#"<image x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" preserveAspectRatio="xMidYMid slice" clip-path="url(#{clip})" xlink:href="data:image/png;base64,{data}"/>"#,
                            rect.x, rect.y, rect.width, rect.height
                        );
                    }
                    Some(SceneImage::Placeholder) | None => {
                        let _ = write!(
                            svg,
                            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}" fill="{}"/>"#,
                            rect.x, rect.y, rect.width, rect.height, radius, PLACEHOLDER_FILL.hex()
                        );
                    }
                }
            }
            PaintCommand::Line { from, to, width, rgba } => {
                let _ = write!(
                    svg,
                    r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="{:.2}"/>"#,
                    from.0, from.1, to.0, to.1, rgba.hex(), width
                );
            }
        }
    }

    svg.push_str("</g></svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::layout::FontSpec;

    fn spec() -> SceneSpec<'static> {
        SceneSpec {
            content: Rect::new(0.0, 0.0, 100.4, 50.0),
            bleed: 100.0,
            background: Rgba::WHITE,
            font_family: "Nunito, \"Noto Sans\"",
        }
    }

    #[test]
    fn scene_size_includes_bleed() {
        let svg = scene(&[], &spec(), &HashMap::new());
        assert!(svg.contains(r#"width="301" height="250""#), "{}", svg);
        assert!(svg.contains(r##"fill="#ffffff""##));
    }

    #[test]
    fn text_is_escaped() {
        let cmd = PaintCommand::Text {
            x: 0.0,
            y: 10.0,
            text: "<Tom & Jerry>".into(),
            font: FontSpec::bold(12.0),
            rgba: Rgba(0, 0, 0, 255),
            anchor: Align::Center,
            opacity: 1.0,
        };
        let svg = scene(&[cmd], &spec(), &HashMap::new());
        assert!(svg.contains("&lt;Tom &amp; Jerry&gt;"));
        assert!(svg.contains("&quot;Noto Sans&quot;"));
        assert!(svg.contains(r#"text-anchor="middle""#));
    }

    #[test]
    fn missing_image_draws_placeholder() {
        let cmd = PaintCommand::Image {
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            slot: SlotId(0),
            radius: 5.0,
        };
        let svg = scene(&[cmd.clone()], &spec(), &HashMap::new());
        assert!(svg.contains(&PLACEHOLDER_FILL.hex()));

        let mut images = HashMap::new();
        images.insert(SlotId(0), SceneImage::Png(Arc::new(vec![1, 2, 3])));
        let svg = scene(&[cmd], &spec(), &images);
        assert!(svg.contains("data:image/png;base64,AQID"));
    }

    #[test]
    fn control_characters_are_dropped() {
        assert_eq!(escape_xml("go\u{1}al\u{1b}"), "goal");
        assert_eq!(escape_xml("a\tb\nc\u{FFFF}"), "a\tb\nc");
        assert_eq!(escape_xml("Jürgen 🔥 & co"), "Jürgen 🔥 &amp; co");
    }
}
