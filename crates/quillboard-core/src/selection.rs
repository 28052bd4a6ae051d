//! Selection set and manipulation handles.

use crate::element::{Element, ElementId};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Distance from the top edge to the rotation handle, in world units.
pub const ROTATE_HANDLE_OFFSET: f64 = 24.0;

/// An ordered set of selected element ids. Order carries no meaning beyond
/// render-layer tie-breaks; membership is what matters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    ids: Vec<ElementId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[ElementId] {
        &self.ids
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Replace the selection with a single element.
    pub fn set(&mut self, id: ElementId) {
        self.ids.clear();
        self.ids.push(id);
    }

    pub fn add(&mut self, id: ElementId) {
        if !self.contains(id) {
            self.ids.push(id);
        }
    }

    pub fn toggle(&mut self, id: ElementId) {
        if self.contains(id) {
            self.ids.retain(|&e| e != id);
        } else {
            self.ids.push(id);
        }
    }

    pub fn remove(&mut self, id: ElementId) {
        self.ids.retain(|&e| e != id);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn replace(&mut self, ids: Vec<ElementId>) {
        self.ids = ids;
        self.ids.dedup();
    }

    /// Drain the selection, returning the ids.
    pub fn take(&mut self) -> Vec<ElementId> {
        std::mem::take(&mut self.ids)
    }
}

/// Corner positions for resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// The fixed anchor corner opposite this handle.
    pub fn opposite(&self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }

    pub fn point_of(&self, rect: Rect) -> Point {
        match self {
            Corner::TopLeft => Point::new(rect.x0, rect.y0),
            Corner::TopRight => Point::new(rect.x1, rect.y0),
            Corner::BottomLeft => Point::new(rect.x0, rect.y1),
            Corner::BottomRight => Point::new(rect.x1, rect.y1),
        }
    }
}

/// Kind of manipulation handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// Corner resize handle.
    Corner(Corner),
    /// Endpoint handle of a linear element (index into its points).
    Endpoint(usize),
    /// Rotation handle above the top center.
    Rotate,
}

/// A handle with its world position.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.position.distance(point) <= tolerance
    }
}

/// Manipulation handles for one element. Line and arrow points get
/// per-point endpoint handles; everything else resizes by its corners. Pen
/// strokes resize as a whole, and ephemeral elements have no handles.
pub fn handles_for(element: &Element) -> Vec<Handle> {
    if element.is_ephemeral() {
        return Vec::new();
    }
    if matches!(element, Element::Line(_) | Element::Arrow(_)) {
        let points = element.points().unwrap_or(&[]);
        return points
            .iter()
            .enumerate()
            .map(|(i, p)| Handle {
                position: *p,
                kind: HandleKind::Endpoint(i),
            })
            .collect();
    }
    let Some(bounds) = element.bounds() else {
        return Vec::new();
    };
    let mut handles = vec![
        Handle {
            position: Corner::TopLeft.point_of(bounds),
            kind: HandleKind::Corner(Corner::TopLeft),
        },
        Handle {
            position: Corner::TopRight.point_of(bounds),
            kind: HandleKind::Corner(Corner::TopRight),
        },
        Handle {
            position: Corner::BottomLeft.point_of(bounds),
            kind: HandleKind::Corner(Corner::BottomLeft),
        },
        Handle {
            position: Corner::BottomRight.point_of(bounds),
            kind: HandleKind::Corner(Corner::BottomRight),
        },
    ];
    if element.supports_rotation() {
        handles.push(Handle {
            position: Point::new(bounds.center().x, bounds.y0 - ROTATE_HANDLE_OFFSET),
            kind: HandleKind::Rotate,
        });
    }
    handles
}

/// First handle hit at a point, if any.
pub fn hit_test_handles(element: &Element, point: Point, tolerance: f64) -> Option<HandleKind> {
    handles_for(element)
        .into_iter()
        .find(|h| h.hit_test(point, tolerance))
        .map(|h| h.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Line, Rectangle};
    use uuid::Uuid;

    #[test]
    fn test_selection_is_ordered_and_unique() {
        let mut selection = Selection::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        selection.add(a);
        selection.add(b);
        selection.add(a);
        assert_eq!(selection.ids(), &[a, b]);
        selection.toggle(a);
        assert_eq!(selection.ids(), &[b]);
        selection.toggle(a);
        assert_eq!(selection.ids(), &[b, a]);
    }

    #[test]
    fn test_box_handles_include_rotate() {
        let mut rect = Rectangle::new(Point::new(0.0, 0.0), 100.0, 50.0);
        rect.style.stroke_width = 0.0;
        let handles = handles_for(&Element::Rectangle(rect));
        assert_eq!(handles.len(), 5);
        assert!(handles.iter().any(|h| h.kind == HandleKind::Rotate));
    }

    #[test]
    fn test_linear_handles_are_endpoints() {
        let line = Line::new(Point::new(0.0, 0.0), Point::new(50.0, 50.0));
        let handles = handles_for(&Element::Line(line));
        assert_eq!(handles.len(), 2);
        assert_eq!(handles[0].kind, HandleKind::Endpoint(0));
        assert_eq!(handles[1].kind, HandleKind::Endpoint(1));
    }

    #[test]
    fn test_handle_hit_test() {
        let mut rect = Rectangle::new(Point::new(0.0, 0.0), 100.0, 50.0);
        rect.style.stroke_width = 0.0;
        let element = Element::Rectangle(rect);
        let hit = hit_test_handles(&element, Point::new(1.0, 1.0), 6.0);
        assert_eq!(hit, Some(HandleKind::Corner(Corner::TopLeft)));
        assert_eq!(hit_test_handles(&element, Point::new(50.0, 25.0), 6.0), None);
    }
}
