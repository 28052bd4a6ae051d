//! Element model for the board document.
//!
//! Every kind is its own struct with a shared [`ElementStyle`] record; the
//! [`Element`] enum ties them together for the document, the sync layer and
//! the interaction machine. The element id is the sole identity used for
//! merge and deduplication across peers.

mod boxes;
mod laser;
mod linear;
mod pen;
mod style;
mod text;
mod tile;

pub use boxes::{Diamond, Ellipse, Rectangle};
pub use laser::{LASER_TTL_MS, Laser, now_ms};
pub use linear::{Arrow, Line};
pub use pen::Pen;
pub use style::{ElementStyle, FillPattern, Rgba, Roughness, StrokeLine, generate_seed};
pub use text::Text;
pub use tile::{Frame, Tile, TileKind, WebEmbed};

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique element identifier. Globally unique within a board.
pub type ElementId = Uuid;

/// Discriminant of an element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    Rectangle,
    Diamond,
    Ellipse,
    Line,
    Arrow,
    Pen,
    Text,
    Tile,
    Frame,
    WebEmbed,
    Laser,
}

/// A board element, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Element {
    Rectangle(Rectangle),
    Diamond(Diamond),
    Ellipse(Ellipse),
    Line(Line),
    Arrow(Arrow),
    Pen(Pen),
    Text(Text),
    Tile(Tile),
    Frame(Frame),
    WebEmbed(WebEmbed),
    Laser(Laser),
}

/// A partial mutation produced by the geometry kernel and applied back onto
/// an element. Keeps "compute" separate from "write" so the interaction
/// machine can propose changes without touching the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementPatch {
    /// Move the anchor position (top-left for box-like kinds, first line for
    /// text).
    Position(Point),
    /// Move the center (ellipse).
    Center(Point),
    /// Replace the point sequence (linear kinds).
    Points(Vec<Point>),
}

impl Element {
    pub fn id(&self) -> ElementId {
        match self {
            Element::Rectangle(e) => e.id,
            Element::Diamond(e) => e.id,
            Element::Ellipse(e) => e.id,
            Element::Line(e) => e.id,
            Element::Arrow(e) => e.id,
            Element::Pen(e) => e.id,
            Element::Text(e) => e.id,
            Element::Tile(e) => e.id,
            Element::Frame(e) => e.id,
            Element::WebEmbed(e) => e.id,
            Element::Laser(e) => e.id,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Rectangle(_) => ElementKind::Rectangle,
            Element::Diamond(_) => ElementKind::Diamond,
            Element::Ellipse(_) => ElementKind::Ellipse,
            Element::Line(_) => ElementKind::Line,
            Element::Arrow(_) => ElementKind::Arrow,
            Element::Pen(_) => ElementKind::Pen,
            Element::Text(_) => ElementKind::Text,
            Element::Tile(_) => ElementKind::Tile,
            Element::Frame(_) => ElementKind::Frame,
            Element::WebEmbed(_) => ElementKind::WebEmbed,
            Element::Laser(_) => ElementKind::Laser,
        }
    }

    pub fn style(&self) -> &ElementStyle {
        match self {
            Element::Rectangle(e) => &e.style,
            Element::Diamond(e) => &e.style,
            Element::Ellipse(e) => &e.style,
            Element::Line(e) => &e.style,
            Element::Arrow(e) => &e.style,
            Element::Pen(e) => &e.style,
            Element::Text(e) => &e.style,
            Element::Tile(e) => &e.style,
            Element::Frame(e) => &e.style,
            Element::WebEmbed(e) => &e.style,
            Element::Laser(e) => &e.style,
        }
    }

    pub fn style_mut(&mut self) -> &mut ElementStyle {
        match self {
            Element::Rectangle(e) => &mut e.style,
            Element::Diamond(e) => &mut e.style,
            Element::Ellipse(e) => &mut e.style,
            Element::Line(e) => &mut e.style,
            Element::Arrow(e) => &mut e.style,
            Element::Pen(e) => &mut e.style,
            Element::Text(e) => &mut e.style,
            Element::Tile(e) => &mut e.style,
            Element::Frame(e) => &mut e.style,
            Element::WebEmbed(e) => &mut e.style,
            Element::Laser(e) => &mut e.style,
        }
    }

    /// Whether the element is locked against interaction. Laser trails are
    /// never lockable.
    pub fn locked(&self) -> bool {
        match self {
            Element::Rectangle(e) => e.locked,
            Element::Diamond(e) => e.locked,
            Element::Ellipse(e) => e.locked,
            Element::Line(e) => e.locked,
            Element::Arrow(e) => e.locked,
            Element::Pen(e) => e.locked,
            Element::Text(e) => e.locked,
            Element::Tile(e) => e.locked,
            Element::Frame(e) => e.locked,
            Element::WebEmbed(e) => e.locked,
            Element::Laser(_) => false,
        }
    }

    pub fn set_locked(&mut self, locked: bool) {
        match self {
            Element::Rectangle(e) => e.locked = locked,
            Element::Diamond(e) => e.locked = locked,
            Element::Ellipse(e) => e.locked = locked,
            Element::Line(e) => e.locked = locked,
            Element::Arrow(e) => e.locked = locked,
            Element::Pen(e) => e.locked = locked,
            Element::Text(e) => e.locked = locked,
            Element::Tile(e) => e.locked = locked,
            Element::Frame(e) => e.locked = locked,
            Element::WebEmbed(e) => e.locked = locked,
            Element::Laser(_) => {}
        }
    }

    /// Kinds carried by a point sequence rather than a position + size.
    pub fn is_linear(&self) -> bool {
        matches!(
            self,
            Element::Line(_) | Element::Arrow(_) | Element::Pen(_) | Element::Laser(_)
        )
    }

    /// Ephemeral kinds self-expire and never join selection or snapping.
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Element::Laser(_))
    }

    /// The point sequence of a linear kind.
    pub fn points(&self) -> Option<&[Point]> {
        match self {
            Element::Line(e) => Some(&e.points),
            Element::Arrow(e) => Some(&e.points),
            Element::Pen(e) => Some(&e.points),
            Element::Laser(e) => Some(&e.points),
            _ => None,
        }
    }

    /// Rotation in radians (0 for kinds that do not rotate).
    pub fn rotation(&self) -> f64 {
        match self {
            Element::Rectangle(e) => e.rotation,
            Element::Diamond(e) => e.rotation,
            Element::Ellipse(e) => e.rotation,
            Element::Text(e) => e.rotation,
            _ => 0.0,
        }
    }

    pub fn set_rotation(&mut self, rotation: f64) {
        match self {
            Element::Rectangle(e) => e.rotation = rotation,
            Element::Diamond(e) => e.rotation = rotation,
            Element::Ellipse(e) => e.rotation = rotation,
            Element::Text(e) => e.rotation = rotation,
            _ => {}
        }
    }

    pub fn supports_rotation(&self) -> bool {
        matches!(
            self,
            Element::Rectangle(_) | Element::Diamond(_) | Element::Ellipse(_) | Element::Text(_)
        )
    }

    /// Visual bounding box; see [`crate::geometry::bounding_box`].
    pub fn bounds(&self) -> Option<Rect> {
        crate::geometry::bounding_box(self)
    }

    /// Point containment; see [`crate::geometry::hit_test`].
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        crate::geometry::hit_test(self, point, tolerance)
    }

    /// Apply a partial patch. Mismatched patch/kind pairs are ignored: a
    /// patch computed for one kind never corrupts another.
    pub fn apply(&mut self, patch: &ElementPatch) {
        match (self, patch) {
            (Element::Rectangle(e), ElementPatch::Position(p)) => e.position = *p,
            (Element::Diamond(e), ElementPatch::Position(p)) => e.position = *p,
            (Element::Text(e), ElementPatch::Position(p)) => e.position = *p,
            (Element::Tile(e), ElementPatch::Position(p)) => e.position = *p,
            (Element::Frame(e), ElementPatch::Position(p)) => e.position = *p,
            (Element::WebEmbed(e), ElementPatch::Position(p)) => e.position = *p,
            (Element::Ellipse(e), ElementPatch::Center(c)) => e.center = *c,
            (Element::Line(e), ElementPatch::Points(pts)) => e.points = pts.clone(),
            (Element::Arrow(e), ElementPatch::Points(pts)) => e.points = pts.clone(),
            (Element::Pen(e), ElementPatch::Points(pts)) => e.points = pts.clone(),
            (Element::Laser(e), ElementPatch::Points(pts)) => e.points = pts.clone(),
            _ => {}
        }
    }

    /// Translate in place by applying the kernel's translation patch.
    pub fn translate_by(&mut self, dx: f64, dy: f64) {
        if let Some(patch) = crate::geometry::translate(self, dx, dy) {
            self.apply(&patch);
        }
    }

    /// Assign a fresh id, for duplication and paste.
    pub fn regenerate_id(&mut self) {
        let new_id = Uuid::new_v4();
        match self {
            Element::Rectangle(e) => e.id = new_id,
            Element::Diamond(e) => e.id = new_id,
            Element::Ellipse(e) => e.id = new_id,
            Element::Line(e) => e.id = new_id,
            Element::Arrow(e) => e.id = new_id,
            Element::Pen(e) => e.id = new_id,
            Element::Text(e) => e.id = new_id,
            Element::Tile(e) => e.id = new_id,
            Element::Frame(e) => e.id = new_id,
            Element::WebEmbed(e) => e.id = new_id,
            Element::Laser(e) => e.id = new_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tag_serialization() {
        let element = Element::WebEmbed(WebEmbed::new(
            Point::new(0.0, 0.0),
            320.0,
            180.0,
            "https://example.com".to_string(),
        ));
        let json = serde_json::to_string(&element).unwrap();
        assert!(json.contains("\"kind\":\"web-embed\""));
        let back: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), element.id());
    }

    #[test]
    fn test_mismatched_patch_is_ignored() {
        let mut element = Element::Rectangle(Rectangle::new(Point::new(5.0, 5.0), 10.0, 10.0));
        element.apply(&ElementPatch::Points(vec![Point::ZERO]));
        match element {
            Element::Rectangle(ref r) => assert_eq!(r.position, Point::new(5.0, 5.0)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_translate_by_moves_points() {
        let mut element = Element::Line(Line::new(Point::ZERO, Point::new(10.0, 0.0)));
        element.translate_by(5.0, 7.0);
        assert_eq!(
            element.points().unwrap(),
            &[Point::new(5.0, 7.0), Point::new(15.0, 7.0)]
        );
    }

    #[test]
    fn test_laser_never_locked() {
        let mut laser = Element::Laser(Laser::new(vec![Point::ZERO, Point::new(1.0, 0.0)], 0));
        laser.set_locked(true);
        assert!(!laser.locked());
    }

    #[test]
    fn test_regenerate_id_changes_identity() {
        let mut element = Element::Ellipse(Ellipse::new(Point::ZERO, 10.0, 5.0));
        let before = element.id();
        element.regenerate_id();
        assert_ne!(before, element.id());
    }
}
