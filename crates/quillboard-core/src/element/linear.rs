//! Linear element kinds: line and arrow.
//!
//! Linear kinds carry a point sequence. Fewer than two points is a valid
//! transient state while a drawing is in progress; it only means the element
//! is not yet renderable.

use super::{ElementId, ElementStyle};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A straight or multi-segment line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub(crate) id: ElementId,
    /// Point sequence in world coordinates (at least 2 once committed).
    pub points: Vec<Point>,
    #[serde(default)]
    pub locked: bool,
    pub style: ElementStyle,
}

impl Line {
    pub fn new(start: Point, end: Point) -> Self {
        Self::from_points(vec![start, end])
    }

    pub fn from_points(points: Vec<Point>) -> Self {
        Self {
            id: Uuid::new_v4(),
            points,
            locked: false,
            style: ElementStyle::default(),
        }
    }

    /// Whether the line has enough points to render.
    pub fn is_renderable(&self) -> bool {
        self.points.len() >= 2
    }

    pub fn start(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn end(&self) -> Option<Point> {
        self.points.last().copied()
    }
}

/// An arrow: a line with a head at its final point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
    pub(crate) id: ElementId,
    pub points: Vec<Point>,
    /// Arrowhead length in world units.
    #[serde(default = "default_head_size")]
    pub head_size: f64,
    #[serde(default)]
    pub locked: bool,
    pub style: ElementStyle,
}

fn default_head_size() -> f64 {
    16.0
}

impl Arrow {
    pub fn new(start: Point, end: Point) -> Self {
        Self::from_points(vec![start, end])
    }

    pub fn from_points(points: Vec<Point>) -> Self {
        Self {
            id: Uuid::new_v4(),
            points,
            head_size: default_head_size(),
            locked: false,
            style: ElementStyle::default(),
        }
    }

    pub fn is_renderable(&self) -> bool {
        self.points.len() >= 2
    }

    /// The two arrowhead wing segments at the final point, if renderable.
    pub fn head_segments(&self) -> Option<[(Point, Point); 2]> {
        let n = self.points.len();
        if n < 2 {
            return None;
        }
        let tip = self.points[n - 1];
        let back = self.points[n - 2];
        let angle = (tip.y - back.y).atan2(tip.x - back.x);
        let spread = std::f64::consts::PI / 7.0;
        let wing = |a: f64| {
            Point::new(
                tip.x - self.head_size * a.cos(),
                tip.y - self.head_size * a.sin(),
            )
        };
        Some([
            (wing(angle - spread), tip),
            (wing(angle + spread), tip),
        ])
    }
}
