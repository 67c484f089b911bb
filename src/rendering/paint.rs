/// Paint command list produced from the layout tree

use crate::rendering::layout::{Align, FontSpec, Node, NodeKind, Rect};
use crate::rendering::{Rgba, SlotId};

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        rect: Rect,
        radius: f32,
        rgba: Rgba,
    },
    StrokeRect {
        rect: Rect,
        radius: f32,
        width: f32,
        rgba: Rgba,
    },
    Text {
        x: f32,
        /// Baseline
        y: f32,
        text: String,
        font: FontSpec,
        rgba: Rgba,
        anchor: Align,
        opacity: f32,
    },
    Image {
        rect: Rect,
        slot: SlotId,
        radius: f32,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        rgba: Rgba,
    },
}

/// Baseline of line `index` in a block starting at `top`.
fn baseline(top: f32, index: usize, font: &FontSpec) -> f32 {
    let lh = font.line_height();
    top + index as f32 * lh + (lh - font.size) / 2.0 + font.size * 0.8
}

fn anchor_x(frame: &Rect, align: Align) -> f32 {
    match align {
        Align::Start => frame.x,
        Align::Center => frame.x + frame.width / 2.0,
        Align::End => frame.right(),
    }
}

/// Flatten the tree into paint order (parents before children, siblings in
/// document order).
pub fn paint_tree(root: &Node) -> Vec<PaintCommand> {
    let mut out = Vec::new();
    paint_node(root, &mut out);
    out
}

fn paint_node(node: &Node, out: &mut Vec<PaintCommand>) {
    let frame = node.frame;
    match &node.kind {
        NodeKind::Block(style) => {
            if let Some(shadow) = style.shadow {
                out.push(PaintCommand::SolidRect {
                    rect: frame.offset(0.0, shadow.dy),
                    radius: style.radius,
                    rgba: shadow.color,
                });
            }
            if let Some(fill) = style.fill {
                out.push(PaintCommand::SolidRect { rect: frame, radius: style.radius, rgba: fill });
            }
            if let Some((width, rgba)) = style.border {
                // strokes are centered on the path
                out.push(PaintCommand::StrokeRect {
                    rect: frame.inset(width / 2.0),
                    radius: (style.radius - width / 2.0).max(0.0),
                    width,
                    rgba,
                });
            }
        }
        NodeKind::Text(block) => {
            for (i, line) in block.lines.iter().enumerate() {
                out.push(PaintCommand::Text {
                    x: anchor_x(&frame, block.align),
                    y: baseline(frame.y, i, &block.font),
                    text: line.clone(),
                    font: block.font,
                    rgba: block.color,
                    anchor: block.align,
                    opacity: 1.0,
                });
            }
        }
        NodeKind::Glyph { glyph, size, opacity } => {
            let font = FontSpec::regular(*size);
            out.push(PaintCommand::Text {
                x: frame.x,
                y: baseline(frame.y, 0, &font),
                text: glyph.as_str().to_string(),
                font,
                rgba: crate::rendering::layout::INK,
                anchor: Align::Start,
                opacity: *opacity,
            });
        }
        NodeKind::Image { slot, radius } => {
            out.push(PaintCommand::Image { rect: frame, slot: *slot, radius: *radius });
        }
        NodeKind::Rule { color, thickness } => {
            let y = frame.y + thickness / 2.0;
            out.push(PaintCommand::Line {
                from: (frame.x, y),
                to: (frame.right(), y),
                width: *thickness,
                rgba: *color,
            });
        }
    }
    for child in &node.children {
        paint_node(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::render_at;
    use crate::{UserStats, ViewportClass};

    #[test]
    fn paint_command_debug() {
        let cmd = PaintCommand::SolidRect {
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            radius: 0.0,
            rgba: Rgba(255, 0, 0, 255),
        };
        match cmd {
            PaintCommand::SolidRect { rect, .. } => assert_eq!(rect.width, 10.0),
            _ => panic!("unexpected"),
        }
    }

    #[test]
    fn frame_is_painted_first_and_inner_border_last() {
        let issued = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let cert = render_at(&UserStats::named("Ana"), ViewportClass::Wide, issued).unwrap();
        let cmds = cert.paint();
        assert!(matches!(cmds.first(), Some(PaintCommand::SolidRect { rgba: Rgba::WHITE, .. })));
        match cmds.last() {
            Some(PaintCommand::StrokeRect { width, .. }) => assert_eq!(*width, 4.0),
            other => panic!("unexpected last command {:?}", other),
        }
    }

    #[test]
    fn banner_shadow_sits_below_banner() {
        let issued = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let cert = render_at(&UserStats::named("Ana"), ViewportClass::Compact, issued).unwrap();
        let green_shadow = crate::rendering::layout::GREEN_SHADOW;
        let shadow = cert
            .paint()
            .into_iter()
            .find_map(|c| match c {
                PaintCommand::SolidRect { rect, rgba, .. } if rgba == green_shadow => Some(rect),
                _ => None,
            })
            .unwrap();
        let banner = cert.find(crate::rendering::Role::Banner).unwrap().frame;
        assert_eq!(shadow.y, banner.y + 6.0);
    }
}
