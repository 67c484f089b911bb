//! Certificate renderer
//!
//! `render` turns a [`UserStats`] record into a laid-out node tree. The tree
//! is painted into a flat command list ([`paint`]), serialized into an SVG
//! scene ([`svg`]) and finally rasterized ([`raster`]) by the export engine.

pub mod fonts;
pub mod layout;
pub mod paint;
pub mod raster;
pub mod svg;

use std::sync::Arc;

use chrono::NaiveDate;

use crate::stats::UserStats;
use crate::ViewportClass;

pub use layout::{Node, NodeKind, Rect, Role};
pub use paint::PaintCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);

impl Rgba {
    pub const WHITE: Rgba = Rgba(255, 255, 255, 255);

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    pub fn alpha(&self) -> f32 {
        f32::from(self.3) / 255.0
    }

    pub fn opaque(self) -> Rgba {
        Rgba(self.0, self.1, self.2, 255)
    }
}

/// Identifier of an embedded image inside one certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

/// An image the certificate embeds; it is fetched and decoded after mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSlot {
    pub id: SlotId,
    pub src: String,
}

/// Output of the renderer.
///
/// The issue date is fixed when the certificate is rendered and survives
/// relayouts, so exports of one certificate always print the same date.
#[derive(Debug, Clone)]
pub struct RenderedCertificate {
    stats: Arc<UserStats>,
    class: ViewportClass,
    issued: NaiveDate,
    root: Node,
    slots: Vec<ImageSlot>,
}

/// Render `stats` for `class`, stamping today's local date as the issue date.
pub fn render(stats: &UserStats, class: ViewportClass) -> crate::Result<RenderedCertificate> {
    render_at(stats, class, chrono::Local::now().date_naive())
}

/// Render with an explicit issue date.
pub fn render_at(stats: &UserStats, class: ViewportClass, issued: NaiveDate) -> crate::Result<RenderedCertificate> {
    stats.validate()?;
    Ok(RenderedCertificate::build(Arc::new(stats.clone()), class, issued))
}

impl RenderedCertificate {
    fn build(stats: Arc<UserStats>, class: ViewportClass, issued: NaiveDate) -> Self {
        let (root, slots) = layout::layout_certificate(&stats, class, issued);
        log::debug!(
            "rendered certificate for {:?} ({:?}, {} nodes, {} image slots)",
            stats.name,
            class,
            root.descendants().len(),
            slots.len()
        );
        Self { stats, class, issued, root, slots }
    }

    /// Lay the same certificate out for another viewport class.
    pub fn relayout(&self, class: ViewportClass) -> Self {
        if class == self.class {
            return self.clone();
        }
        Self::build(self.stats.clone(), class, self.issued)
    }

    pub fn stats(&self) -> &UserStats {
        &self.stats
    }

    pub fn class(&self) -> ViewportClass {
        self.class
    }

    pub fn issued(&self) -> NaiveDate {
        self.issued
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn image_slots(&self) -> &[ImageSlot] {
        &self.slots
    }

    /// Bounding box of the rendered certificate.
    pub fn measure(&self) -> Rect {
        self.root
            .descendants()
            .into_iter()
            .fold(self.root.frame, |acc, n| acc.union(&n.frame))
    }

    pub fn find(&self, role: Role) -> Option<&Node> {
        self.root.find(role)
    }

    /// All visible text (and glyphs) in document order.
    pub fn text_content(&self) -> Vec<String> {
        self.root.descendants().into_iter().filter_map(Node::text).collect()
    }

    pub fn paint(&self) -> Vec<PaintCommand> {
        paint::paint_tree(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Glyph;
    use crate::Course;

    fn issued() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn rejects_blank_name() {
        assert!(render_at(&UserStats::named(""), ViewportClass::Wide, issued()).is_err());
    }

    #[test]
    fn relayout_keeps_issue_date() {
        let cert = render_at(&UserStats::named("Ana"), ViewportClass::Wide, issued()).unwrap();
        let compact = cert.relayout(ViewportClass::Compact);
        assert_eq!(compact.issued(), cert.issued());
        assert!(compact.measure().width < cert.measure().width);
        let label = compact.find(Role::StreakStat).unwrap().children[2].text().unwrap();
        assert_eq!(label, "Streak");
    }

    #[test]
    fn layout_is_deterministic() {
        let mut stats = UserStats::named("Ana");
        stats.courses.push(Course { title: "French".into(), learning_language_code: None, xp: 5 });
        let a = render_at(&stats, ViewportClass::Compact, issued()).unwrap();
        let b = render_at(&stats, ViewportClass::Compact, issued()).unwrap();
        assert_eq!(a.root(), b.root());
        assert_eq!(a.paint(), b.paint());
    }

    #[test]
    fn negative_values_render_as_zero() {
        let mut stats = UserStats::named("Neg");
        stats.streak = Some(-4);
        stats.total_xp = -10;
        let cert = render_at(&stats, ViewportClass::Wide, issued()).unwrap();
        let streak = cert.find(Role::StreakStat).unwrap();
        assert_eq!(streak.children[0].glyph(), Some(Glyph::Snowflake));
        assert_eq!(streak.children[1].text().unwrap(), "0");
        let xp = cert.find(Role::XpStat).unwrap();
        assert_eq!(xp.children[1].text().unwrap(), "0");
    }

    #[test]
    fn avatar_becomes_image_slot() {
        let mut stats = UserStats::named("Ana");
        stats.avatar_url = Some("https://example.invalid/a/xlarge".into());
        let cert = render_at(&stats, ViewportClass::Wide, issued()).unwrap();
        assert_eq!(cert.image_slots().len(), 1);
        assert!(matches!(cert.find(Role::Avatar).unwrap().kind, NodeKind::Image { .. }));
    }
}
