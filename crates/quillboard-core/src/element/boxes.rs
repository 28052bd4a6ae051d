//! Box-geometry element kinds: rectangle, diamond, ellipse.

use super::{ElementId, ElementStyle};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An axis-aligned rectangle with optional rounded corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub(crate) id: ElementId,
    /// Top-left corner position.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Corner radius (0 = sharp corners).
    #[serde(default)]
    pub corner_radius: f64,
    /// Rotation in radians around the center.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub locked: bool,
    pub style: ElementStyle,
}

impl Rectangle {
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width,
            height,
            corner_radius: 0.0,
            rotation: 0.0,
            locked: false,
            style: ElementStyle::default(),
        }
    }

    /// Build from two drag corners, normalizing to a positive extent.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        Self::new(
            Point::new(p1.x.min(p2.x), p1.y.min(p2.y)),
            (p2.x - p1.x).abs(),
            (p2.y - p1.y).abs(),
        )
    }

    /// Geometric (unpadded) rectangle.
    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }
}

/// A diamond (rhombus inscribed in its bounding box).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diamond {
    pub(crate) id: ElementId,
    /// Top-left corner of the enclosing box.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub locked: bool,
    pub style: ElementStyle,
}

impl Diamond {
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width,
            height,
            rotation: 0.0,
            locked: false,
            style: ElementStyle::default(),
        }
    }

    pub fn from_corners(p1: Point, p2: Point) -> Self {
        Self::new(
            Point::new(p1.x.min(p2.x), p1.y.min(p2.y)),
            (p2.x - p1.x).abs(),
            (p2.y - p1.y).abs(),
        )
    }

    /// Enclosing (unpadded) box.
    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }

    /// The four rhombus vertices: edge midpoints of the enclosing box.
    pub fn vertices(&self) -> [Point; 4] {
        let r = self.as_rect();
        let c = r.center();
        [
            Point::new(c.x, r.y0),
            Point::new(r.x1, c.y),
            Point::new(c.x, r.y1),
            Point::new(r.x0, c.y),
        ]
    }
}

/// An ellipse defined by center and radii.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub(crate) id: ElementId,
    pub center: Point,
    pub radius_x: f64,
    pub radius_y: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub locked: bool,
    pub style: ElementStyle,
}

impl Ellipse {
    pub fn new(center: Point, radius_x: f64, radius_y: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            center,
            radius_x,
            radius_y,
            rotation: 0.0,
            locked: false,
            style: ElementStyle::default(),
        }
    }

    /// Inscribe an ellipse in a drag rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.center(), rect.width() / 2.0, rect.height() / 2.0)
    }

    /// Enclosing (unpadded) box, ignoring rotation.
    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.center.x - self.radius_x,
            self.center.y - self.radius_y,
            self.center.x + self.radius_x,
            self.center.y + self.radius_y,
        )
    }
}
