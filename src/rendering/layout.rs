/// Block layout for the certificate.
///
/// Text is measured with a per-character advance estimate, so layout is a
/// pure function of the stats, the viewport class and the issue date.

use chrono::NaiveDate;

use crate::flags::{self, Glyph};
use crate::rendering::{ImageSlot, Rgba, SlotId};
use crate::stats::UserStats;
use crate::ViewportClass;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn inset(&self, d: f32) -> Rect {
        Rect {
            x: self.x + d,
            y: self.y + d,
            width: (self.width - 2.0 * d).max(0.0),
            height: (self.height - 2.0 * d).max(0.0),
        }
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Rect {
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxModel {
    pub margin: f32,
    pub border: f32,
    pub padding: f32,
}

impl BoxModel {
    pub fn content_rect(&self, frame: &Rect) -> Rect {
        frame.inset(self.border + self.padding)
    }
}

/// What a node represents on the certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Certificate,
    InnerBorder,
    Watermark,
    Banner,
    Avatar,
    Lead,
    Name,
    Subline,
    StatGrid,
    StreakStat,
    XpStat,
    StatGlyph,
    StatValue,
    StatLabel,
    NativeLanguage,
    CourseRow(usize),
    CourseTitle,
    CourseFlag,
    CourseXp,
    Motivation,
    Divider,
    Footer,
    StreakSince,
    Issued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
}

impl FontSpec {
    pub fn regular(size: f32) -> Self {
        Self { size, bold: false, italic: false }
    }

    pub fn bold(size: f32) -> Self {
        Self { size, bold: true, italic: false }
    }

    pub fn italic(size: f32) -> Self {
        Self { size, bold: false, italic: true }
    }

    pub fn line_height(&self) -> f32 {
        line_height(self.size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub dy: f32,
    pub color: Rgba,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlockStyle {
    pub fill: Option<Rgba>,
    pub border: Option<(f32, Rgba)>,
    pub radius: f32,
    pub shadow: Option<Shadow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub font: FontSpec,
    pub color: Rgba,
    pub align: Align,
}

impl TextBlock {
    pub fn text(&self) -> String {
        self.lines.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Block(BlockStyle),
    Text(TextBlock),
    Glyph { glyph: Glyph, size: f32, opacity: f32 },
    Image { slot: SlotId, radius: f32 },
    Rule { color: Rgba, thickness: f32 },
}

/// A laid-out node. Frames are absolute, in CSS pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub role: Role,
    pub frame: Rect,
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    fn new(role: Role, frame: Rect, kind: NodeKind) -> Self {
        Self { role, frame, kind, children: Vec::new() }
    }

    fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Depth-first, document order.
    pub fn descendants(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(n) = stack.pop() {
            out.push(n);
            for child in n.children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    pub fn find(&self, role: Role) -> Option<&Node> {
        self.descendants().into_iter().find(|n| n.role == role)
    }

    pub fn text(&self) -> Option<String> {
        match &self.kind {
            NodeKind::Text(t) => Some(t.text()),
            NodeKind::Glyph { glyph, .. } => Some(glyph.as_str().to_string()),
            _ => None,
        }
    }

    pub fn glyph(&self) -> Option<Glyph> {
        match self.kind {
            NodeKind::Glyph { glyph, .. } => Some(glyph),
            _ => None,
        }
    }
}

/// Size table for one viewport class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub width: f32,
    pub frame: BoxModel,
    pub banner_font: f32,
    pub name_font: f32,
    pub body_font: f32,
    pub stat_font: f32,
    pub label_font: f32,
    pub section_font: f32,
    pub course_font: f32,
    pub motivation_font: f32,
    pub footer_font: f32,
    pub watermark: f32,
    pub avatar: f32,
    pub streak_label: &'static str,
}

impl Metrics {
    pub fn for_class(class: ViewportClass) -> Self {
        let frame = BoxModel { margin: 0.0, border: 4.0, padding: 32.0 };
        match class {
            ViewportClass::Compact => Metrics {
                width: 358.0,
                frame,
                banner_font: 20.0,
                name_font: 30.0,
                body_font: 16.0,
                stat_font: 18.0,
                label_font: 18.0,
                section_font: 16.0,
                course_font: 18.0,
                motivation_font: 20.0,
                footer_font: 16.0,
                watermark: 120.0,
                avatar: 72.0,
                streak_label: "Streak",
            },
            ViewportClass::Wide => Metrics {
                width: 864.0,
                frame,
                banner_font: 48.0,
                name_font: 36.0,
                body_font: 16.0,
                stat_font: 30.0,
                label_font: 18.0,
                section_font: 24.0,
                course_font: 30.0,
                motivation_font: 20.0,
                footer_font: 20.0,
                watermark: 200.0,
                avatar: 96.0,
                streak_label: "Current Streak",
            },
        }
    }
}

pub const GREEN: Rgba = Rgba(0x57, 0xcc, 0x02, 255);
pub const GREEN_SHADOW: Rgba = Rgba(88, 167, 0, 255);
pub const SLATE: Rgba = Rgba(0x37, 0x45, 0x4e, 255);
pub const INK: Rgba = Rgba(0x1a, 0x20, 0x2c, 255);
pub const ORANGE: Rgba = Rgba(0xff, 0x96, 0x00, 255);
pub const ORANGE_SHADOW: Rgba = Rgba(203, 120, 0, 255);
pub const BLUE: Rgba = Rgba(0x49, 0xc0, 0xf8, 255);
pub const BLUE_SHADOW: Rgba = Rgba(23, 154, 208, 255);
pub const ROW_FILL: Rgba = Rgba(0xef, 0xf1, 0xf3, 255);
pub const ROW_EDGE: Rgba = Rgba(229, 229, 229, 255);
pub const RULE: Rgba = Rgba(226, 232, 240, 255);

const INNER_BORDER_INSET: f32 = 16.0;
const COURSE_ROW_MAX: f32 = 730.0;
const DATE_FORMAT: &str = "%-m/%-d/%Y";

pub fn line_height(size: f32) -> f32 {
    (size * 1.25).ceil()
}

fn is_zero_width(u: u32) -> bool {
    matches!(u, 0x200B..=0x200F | 0xFE00..=0xFE0F | 0xE0000..=0xE007F | 0x0300..=0x036F)
}

fn is_wide(u: u32) -> bool {
    u >= 0x1F300
        || (0x2600..=0x27BF).contains(&u)
        || (0x2B00..=0x2BFF).contains(&u)
        || (0x2E80..=0x9FFF).contains(&u)
        || (0xAC00..=0xD7AF).contains(&u)
        || (0xF900..=0xFAFF).contains(&u)
        || (0xFF00..=0xFFEF).contains(&u)
}

/// Estimated advance of `c` in pixels.
pub fn char_advance(c: char, size: f32) -> f32 {
    let u = c as u32;
    let em = if c == ' ' {
        0.28
    } else if c.is_ascii() {
        0.56
    } else if is_zero_width(u) {
        0.0
    } else if (0x1F1E6..=0x1F1FF).contains(&u) {
        // regional indicators pair up into one flag
        0.5
    } else if is_wide(u) {
        1.0
    } else {
        0.6
    };
    em * size
}

pub fn text_width(text: &str, size: f32) -> f32 {
    text.chars().map(|c| char_advance(c, size)).sum()
}

/// Greedy word wrap. Words wider than `max_width` are broken by character.
pub fn wrap_text(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        let candidate = if cur.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", cur, word)
        };
        if text_width(&candidate, size) <= max_width {
            cur = candidate;
            continue;
        }
        if !cur.is_empty() {
            lines.push(std::mem::take(&mut cur));
        }
        if text_width(word, size) <= max_width {
            cur = word.to_string();
        } else {
            for c in word.chars() {
                if !cur.is_empty() && text_width(&cur, size) + char_advance(c, size) > max_width {
                    lines.push(std::mem::take(&mut cur));
                }
                cur.push(c);
            }
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

fn text_node(role: Role, x: f32, y: f32, width: f32, text: &str, font: FontSpec, color: Rgba, align: Align) -> Node {
    let lines = wrap_text(text, font.size, width);
    let height = lines.len().max(1) as f32 * font.line_height();
    Node::new(
        role,
        Rect::new(x, y, width, height),
        NodeKind::Text(TextBlock { lines, font, color, align }),
    )
}

fn glyph_node(role: Role, x: f32, y: f32, glyph: Glyph, size: f32) -> Node {
    let width = text_width(glyph.as_str(), size);
    Node::new(
        role,
        Rect::new(x, y, width, line_height(size)),
        NodeKind::Glyph { glyph, size, opacity: 1.0 },
    )
}

/// Lay out the whole certificate. Returns the root node and any image slots
/// that must be resolved before capture.
pub fn layout_certificate(stats: &UserStats, class: ViewportClass, issued: NaiveDate) -> (Node, Vec<ImageSlot>) {
    let m = Metrics::for_class(class);
    let frame = Rect::new(0.0, 0.0, m.width, 0.0);
    let content = m.frame.content_rect(&Rect { height: f32::MAX, ..frame });
    let (x0, cw) = (content.x, content.width);
    let mut y = content.y;
    let mut children = Vec::new();
    let mut slots = Vec::new();

    // Banner
    let banner_font = FontSpec::bold(m.banner_font);
    let banner_text = text_node(
        Role::Banner,
        x0 + 16.0,
        y + 16.0,
        cw - 32.0,
        "Duolingo Certificate of Achievement",
        banner_font,
        Rgba::WHITE,
        Align::Center,
    );
    let banner_h = banner_text.frame.height + 32.0;
    let banner_style = BlockStyle {
        fill: Some(GREEN),
        border: None,
        radius: 16.0,
        shadow: Some(Shadow { dy: 6.0, color: GREEN_SHADOW }),
    };
    children.push(
        Node::new(Role::Banner, Rect::new(x0, y, cw, banner_h), NodeKind::Block(banner_style))
            .with_children(vec![banner_text]),
    );
    y += banner_h + 6.0 + 16.0;

    // Avatar
    if let Some(src) = &stats.avatar_url {
        let slot = SlotId(slots.len());
        slots.push(ImageSlot { id: slot, src: src.clone() });
        let size = m.avatar;
        children.push(Node::new(
            Role::Avatar,
            Rect::new(x0 + (cw - size) / 2.0, y + 8.0, size, size),
            NodeKind::Image { slot, radius: size / 2.0 },
        ));
        y += size + 8.0;
    }

    let body = FontSpec::italic(m.body_font);
    y += 8.0;
    let lead = text_node(Role::Lead, x0, y, cw, "This certifies that", body, INK, Align::Center);
    y += lead.frame.height;
    children.push(lead);

    let name = text_node(Role::Name, x0, y, cw, stats.name.trim(), FontSpec::bold(m.name_font), INK, Align::Center);
    y += name.frame.height;
    children.push(name);

    let sub = text_node(
        Role::Subline,
        x0,
        y,
        cw,
        "has scored the following achievements in Duolingo",
        body,
        INK,
        Align::Center,
    );
    y += sub.frame.height;
    children.push(sub);

    // Stat grid
    let grid = stat_grid(stats, &m, x0, y, cw);
    y = grid.frame.bottom();
    children.push(grid);

    // Native language heading
    y += 16.0;
    let native = format!(
        "Languages mastered with their native tongue being: {}",
        flags::flag(Some(stats.from_language.as_str()))
    );
    let native = text_node(Role::NativeLanguage, x0, y, cw, &native, FontSpec::bold(m.section_font), INK, Align::Center);
    y = native.frame.bottom();
    children.push(native);

    // Course rows, in input order
    for (i, course) in stats.courses.iter().enumerate() {
        y += 32.0;
        let row = course_row(i, course, &m, x0, y, cw);
        y = row.frame.bottom() + 4.0;
        children.push(row);
    }

    // Motivation
    y += 16.0;
    if let Some(motivation) = &stats.motivation {
        let text = format!("Motivation: {}", motivation.trim());
        let font = FontSpec { size: m.motivation_font, bold: true, italic: true };
        let node = text_node(Role::Motivation, x0, y, cw, &text, font, INK, Align::Center);
        y = node.frame.bottom();
        children.push(node);
    }
    y += 8.0;

    children.push(Node::new(
        Role::Divider,
        Rect::new(x0, y, cw, 1.0),
        NodeKind::Rule { color: RULE, thickness: 1.0 },
    ));
    y += 1.0;

    let footer = footer(stats, &m, issued, x0 + 16.0, y + 16.0, cw - 32.0);
    y = footer.frame.bottom() + 16.0;
    children.push(footer);

    let height = y + m.frame.padding + m.frame.border;
    let frame = Rect { height, ..frame };

    // Faint globe behind the content
    let wm_size = m.watermark;
    let wm_w = text_width(Glyph::Globe.as_str(), wm_size);
    children.insert(
        0,
        Node::new(
            Role::Watermark,
            Rect::new((frame.width - wm_w) / 2.0, (height - line_height(wm_size)) / 2.0, wm_w, line_height(wm_size)),
            NodeKind::Glyph { glyph: Glyph::Globe, size: wm_size, opacity: 0.05 },
        ),
    );

    // Decorative inner border is drawn above the content
    let inset = m.frame.border + INNER_BORDER_INSET;
    children.push(Node::new(
        Role::InnerBorder,
        frame.inset(inset),
        NodeKind::Block(BlockStyle {
            fill: None,
            border: Some((4.0, SLATE)),
            radius: 16.0,
            shadow: None,
        }),
    ));

    let root = Node::new(
        Role::Certificate,
        frame,
        NodeKind::Block(BlockStyle {
            fill: Some(Rgba::WHITE),
            border: Some((m.frame.border, GREEN)),
            radius: 16.0,
            shadow: None,
        }),
    )
    .with_children(children);

    (root, slots)
}

fn stat_grid(stats: &UserStats, m: &Metrics, x0: f32, y: f32, cw: f32) -> Node {
    let col_w = cw / 2.0;
    let streak = stats.streak.unwrap_or(0).max(0);
    let xp = stats.total_xp.max(0);
    let specs = [
        (Role::StreakStat, flags::streak_glyph(stats.streak), streak, m.streak_label, ORANGE, ORANGE_SHADOW),
        (Role::XpStat, Glyph::Star, xp, "Total XP", BLUE, BLUE_SHADOW),
    ];

    let box_w = col_w - 32.0;
    let label_font = FontSpec::bold(m.label_font);
    let label_h = specs
        .iter()
        .map(|s| wrap_text(s.3, label_font.size, box_w - 8.0).len().max(1) as f32 * label_font.line_height())
        .fold(0.0, f32::max);
    let value_h = line_height(m.stat_font);
    let box_h = 8.0 + value_h + 4.0 + label_h + 4.0 + 8.0;

    let boxes = specs
        .iter()
        .enumerate()
        .map(|(i, (role, glyph, value, label, fill, shadow))| {
            let bx = x0 + i as f32 * col_w + 16.0;
            let by = y + 16.0;
            let value = value.to_string();
            let glyph_w = text_width(glyph.as_str(), m.stat_font);
            let value_w = text_width(&value, m.stat_font);
            let gx = bx + (box_w - (glyph_w + 4.0 + value_w)) / 2.0;
            let row_y = by + 8.0;

            let glyph = glyph_node(Role::StatGlyph, gx, row_y, *glyph, m.stat_font);
            let value = Node::new(
                Role::StatValue,
                Rect::new(gx + glyph_w + 4.0, row_y, value_w, value_h),
                NodeKind::Text(TextBlock {
                    lines: vec![value],
                    font: FontSpec::bold(m.stat_font),
                    color: Rgba::WHITE,
                    align: Align::Start,
                }),
            );
            let label = text_node(Role::StatLabel, bx + 4.0, row_y + value_h + 4.0, box_w - 8.0, label, label_font, INK, Align::Center);

            Node::new(
                *role,
                Rect::new(bx, by, box_w, box_h),
                NodeKind::Block(BlockStyle {
                    fill: Some(*fill),
                    border: None,
                    radius: 24.0,
                    shadow: Some(Shadow { dy: 4.0, color: *shadow }),
                }),
            )
            .with_children(vec![glyph, value, label])
        })
        .collect();

    Node::new(
        Role::StatGrid,
        Rect::new(x0, y, cw, box_h + 32.0),
        NodeKind::Block(BlockStyle::default()),
    )
    .with_children(boxes)
}

fn course_row(index: usize, course: &crate::stats::Course, m: &Metrics, x0: f32, y: f32, cw: f32) -> Node {
    let row_w = cw.min(COURSE_ROW_MAX);
    let rx = x0 + (cw - row_w) / 2.0;
    let pad = 16.0 + 2.0;
    let inner_w = row_w - 2.0 * pad;
    let font = FontSpec::bold(m.course_font);
    let lh = font.line_height();

    let xp_text = format!("{} {} XP", Glyph::Star.as_str(), course.xp.max(0));
    let xp_w = text_width(&xp_text, font.size).min(inner_w / 2.0);
    let flag = Glyph::Flag(flags::flag(course.learning_language_code.as_deref()));
    let flag_w = text_width(flag.as_str(), font.size);
    let title_w = (inner_w - xp_w - flag_w - 24.0).max(40.0);

    let title_lines = wrap_text(&course.title, font.size, title_w);
    let lines_n = title_lines.len().max(1) as f32;
    let inner_y = y + pad;
    let last_w = title_lines.last().map(|l| text_width(l, font.size)).unwrap_or(0.0);

    let title = Node::new(
        Role::CourseTitle,
        Rect::new(rx + pad, inner_y, title_w, lines_n * lh),
        NodeKind::Text(TextBlock { lines: title_lines, font, color: INK, align: Align::Start }),
    );
    let flag = glyph_node(Role::CourseFlag, rx + pad + last_w + 8.0, inner_y + (lines_n - 1.0) * lh, flag, font.size);
    let xp = Node::new(
        Role::CourseXp,
        Rect::new(rx + row_w - pad - xp_w, inner_y + (lines_n - 1.0) * lh / 2.0, xp_w, lh),
        NodeKind::Text(TextBlock { lines: vec![xp_text], font, color: INK, align: Align::End }),
    );

    Node::new(
        Role::CourseRow(index),
        Rect::new(rx, y, row_w, lines_n * lh + 2.0 * pad),
        NodeKind::Block(BlockStyle {
            fill: Some(ROW_FILL),
            border: Some((2.0, ROW_EDGE)),
            radius: 24.0,
            shadow: Some(Shadow { dy: 4.0, color: ROW_EDGE }),
        }),
    )
    .with_children(vec![title, flag, xp])
}

fn footer(stats: &UserStats, m: &Metrics, issued: NaiveDate, x: f32, y: f32, width: f32) -> Node {
    let font = FontSpec::italic(m.footer_font);
    let issued_text = format!("{} issued: {}", Glyph::Pen.as_str(), issued.format(DATE_FORMAT));
    let since_text = stats
        .streak_start_date
        .map(|d| format!("Active streak since: {}", d.format(DATE_FORMAT)));

    let issued_w = text_width(&issued_text, font.size).min(width);
    let mut children = Vec::new();
    let mut bottom = y;

    match since_text {
        Some(since) => {
            let since_w = text_width(&since, font.size);
            if since_w + 16.0 + issued_w <= width {
                let left = text_node(Role::StreakSince, x, y, since_w, &since, font, INK, Align::Start);
                let right = text_node(Role::Issued, x + width - issued_w, y, issued_w, &issued_text, font, INK, Align::End);
                bottom = left.frame.bottom().max(right.frame.bottom());
                children.push(left);
                children.push(right);
            } else {
                let left = text_node(Role::StreakSince, x, y, width, &since, font, INK, Align::Start);
                let right = text_node(Role::Issued, x, left.frame.bottom() + 4.0, width, &issued_text, font, INK, Align::End);
                bottom = right.frame.bottom();
                children.push(left);
                children.push(right);
            }
        }
        None => {
            let right = text_node(Role::Issued, x, y, width, &issued_text, font, INK, Align::End);
            bottom = bottom.max(right.frame.bottom());
            children.push(right);
        }
    }

    Node::new(Role::Footer, Rect::new(x, y, width, bottom - y), NodeKind::Block(BlockStyle::default()))
        .with_children(children)
}
