//! Tool selection and drawing-state accumulation.

use crate::element::{
    Arrow, Diamond, Element, ElementStyle, Ellipse, Frame, Laser, Line, Pen, Rectangle, Text, Tile,
    TileKind, WebEmbed, generate_seed, now_ms,
};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Default size for kinds placed with a click rather than a drag.
const DEFAULT_TILE_SIZE: (f64, f64) = (260.0, 180.0);
const DEFAULT_EMBED_SIZE: (f64, f64) = (480.0, 270.0);

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ToolKind {
    #[default]
    Select,
    Pan,
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
    Eraser,
    Laser,
}

impl ToolKind {
    /// Tools that create an element from a pointer gesture.
    pub fn creates_elements(&self) -> bool {
        !matches!(self, ToolKind::Select | ToolKind::Pan | ToolKind::Eraser)
    }

    /// Tools that accumulate a freeform point trail.
    pub fn is_freeform(&self) -> bool {
        matches!(self, ToolKind::Pen | ToolKind::Laser)
    }
}

/// State of an in-progress drawing gesture.
#[derive(Debug, Clone, Default)]
pub enum DrawState {
    #[default]
    Idle,
    Drawing {
        start: Point,
        current: Point,
        /// Accumulated trail for freeform tools.
        trail: Vec<Point>,
        /// Seed fixed at gesture start so the preview and the committed
        /// element generate identical rough geometry.
        seed: u32,
    },
}

/// Accumulates pointer input into a draft element for the active tool.
#[derive(Debug, Clone)]
pub struct DraftTool {
    pub tool: ToolKind,
    pub state: DrawState,
    /// Style applied to newly created elements.
    pub style: ElementStyle,
    /// Kind for new tiles.
    pub tile_kind: TileKind,
}

impl Default for DraftTool {
    fn default() -> Self {
        Self {
            tool: ToolKind::default(),
            state: DrawState::default(),
            style: ElementStyle::default(),
            tile_kind: TileKind::default(),
        }
    }
}

impl DraftTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switching tools cancels any in-progress gesture.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
        self.state = DrawState::Idle;
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, DrawState::Drawing { .. })
    }

    pub fn begin(&mut self, point: Point) {
        self.state = DrawState::Drawing {
            start: point,
            current: point,
            trail: vec![point],
            seed: generate_seed(),
        };
    }

    /// Update the gesture. `proportional` constrains box kinds to squares
    /// and circles (shift held).
    pub fn update(&mut self, point: Point, proportional: bool) {
        if let DrawState::Drawing {
            start,
            current,
            trail,
            ..
        } = &mut self.state
        {
            let mut point = point;
            if proportional && !self.tool.is_freeform() {
                let dx = point.x - start.x;
                let dy = point.y - start.y;
                let side = dx.abs().max(dy.abs());
                point = Point::new(start.x + side * dx.signum(), start.y + side * dy.signum());
            }
            *current = point;
            if self.tool.is_freeform() {
                // Skip micro-movements so trails stay compact.
                let far_enough = trail
                    .last()
                    .is_none_or(|last| last.distance(point) > 1.0);
                if far_enough {
                    trail.push(point);
                }
            }
        }
    }

    /// The element the gesture would commit right now, used for previews
    /// and presence broadcast. Degenerate gestures yield `None`.
    pub fn preview(&self) -> Option<Element> {
        let DrawState::Drawing {
            start,
            current,
            trail,
            seed,
        } = &self.state
        else {
            return None;
        };
        self.build_element(*start, *current, trail, *seed)
    }

    /// Commit the gesture, clearing the state.
    pub fn finish(&mut self, point: Point, proportional: bool) -> Option<Element> {
        self.update(point, proportional);
        let element = self.preview();
        self.state = DrawState::Idle;
        element
    }

    /// Abandon the gesture without producing an element.
    pub fn cancel(&mut self) {
        self.state = DrawState::Idle;
    }

    fn build_element(
        &self,
        start: Point,
        current: Point,
        trail: &[Point],
        seed: u32,
    ) -> Option<Element> {
        let mut style = self.style.clone();
        style.seed = seed;
        let drag = Rect::from_points(start, current);
        let too_small = drag.width() < 2.0 && drag.height() < 2.0;
        let mut element = match self.tool {
            ToolKind::Rectangle => {
                if too_small {
                    return None;
                }
                Element::Rectangle(Rectangle::from_corners(start, current))
            }
            ToolKind::Diamond => {
                if too_small {
                    return None;
                }
                Element::Diamond(Diamond::from_corners(start, current))
            }
            ToolKind::Ellipse => {
                if too_small {
                    return None;
                }
                Element::Ellipse(Ellipse::from_rect(drag))
            }
            ToolKind::Line => {
                if start.distance(current) < 2.0 {
                    return None;
                }
                Element::Line(Line::new(start, current))
            }
            ToolKind::Arrow => {
                if start.distance(current) < 2.0 {
                    return None;
                }
                Element::Arrow(Arrow::new(start, current))
            }
            ToolKind::Pen => {
                if trail.len() < 2 {
                    return None;
                }
                Element::Pen(Pen::from_points(trail.to_vec()))
            }
            ToolKind::Laser => {
                if trail.len() < 2 {
                    return None;
                }
                Element::Laser(Laser::new(trail.to_vec(), now_ms()))
            }
            ToolKind::Text => Element::Text(Text::new(start, String::new())),
            ToolKind::Tile => {
                let (w, h) = DEFAULT_TILE_SIZE;
                Element::Tile(Tile::new(start, w, h, self.tile_kind))
            }
            ToolKind::Frame => {
                if too_small {
                    return None;
                }
                let mut frame = Frame::new(
                    Point::new(drag.x0, drag.y0),
                    drag.width(),
                    drag.height(),
                );
                frame.label = "Frame".to_string();
                Element::Frame(frame)
            }
            ToolKind::WebEmbed => {
                let (w, h) = DEFAULT_EMBED_SIZE;
                Element::WebEmbed(WebEmbed::new(start, w, h, String::new()))
            }
            ToolKind::Select | ToolKind::Pan | ToolKind::Eraser => return None,
        };
        *element.style_mut() = style;
        Some(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementKind;

    #[test]
    fn test_drag_gesture_creates_rectangle() {
        let mut draft = DraftTool::new();
        draft.set_tool(ToolKind::Rectangle);
        draft.begin(Point::new(10.0, 10.0));
        draft.update(Point::new(60.0, 40.0), false);
        let element = draft.finish(Point::new(60.0, 40.0), false).unwrap();
        assert_eq!(element.kind(), ElementKind::Rectangle);
        assert!(!draft.is_active());
    }

    #[test]
    fn test_preview_and_commit_share_seed() {
        let mut draft = DraftTool::new();
        draft.set_tool(ToolKind::Ellipse);
        draft.begin(Point::new(0.0, 0.0));
        draft.update(Point::new(100.0, 60.0), false);
        let preview_seed = draft.preview().unwrap().style().seed;
        let committed = draft.finish(Point::new(100.0, 60.0), false).unwrap();
        assert_eq!(committed.style().seed, preview_seed);
    }

    #[test]
    fn test_proportional_constrains_to_square() {
        let mut draft = DraftTool::new();
        draft.set_tool(ToolKind::Rectangle);
        draft.begin(Point::new(0.0, 0.0));
        let element = draft.finish(Point::new(80.0, 30.0), true).unwrap();
        let bounds = element.bounds().unwrap();
        assert!((bounds.width() - bounds.height()).abs() < 1e-9);
    }

    #[test]
    fn test_tiny_drag_is_discarded() {
        let mut draft = DraftTool::new();
        draft.set_tool(ToolKind::Rectangle);
        draft.begin(Point::new(10.0, 10.0));
        assert!(draft.finish(Point::new(10.5, 10.5), false).is_none());
    }

    #[test]
    fn test_cancel_produces_nothing() {
        let mut draft = DraftTool::new();
        draft.set_tool(ToolKind::Pen);
        draft.begin(Point::new(0.0, 0.0));
        draft.update(Point::new(50.0, 50.0), false);
        draft.cancel();
        assert!(!draft.is_active());
        assert!(draft.preview().is_none());
    }

    #[test]
    fn test_pen_accumulates_trail() {
        let mut draft = DraftTool::new();
        draft.set_tool(ToolKind::Pen);
        draft.begin(Point::new(0.0, 0.0));
        for i in 1..=10 {
            draft.update(Point::new(i as f64 * 5.0, 0.0), false);
        }
        let element = draft.finish(Point::new(55.0, 0.0), false).unwrap();
        assert_eq!(element.kind(), ElementKind::Pen);
        assert!(element.points().unwrap().len() > 5);
    }

    #[test]
    fn test_micro_movements_are_coalesced() {
        let mut draft = DraftTool::new();
        draft.set_tool(ToolKind::Pen);
        draft.begin(Point::new(0.0, 0.0));
        for _ in 0..20 {
            draft.update(Point::new(0.1, 0.1), false);
        }
        if let DrawState::Drawing { trail, .. } = &draft.state {
            assert_eq!(trail.len(), 1);
        } else {
            unreachable!();
        }
    }

    #[test]
    fn test_tool_switch_cancels_gesture() {
        let mut draft = DraftTool::new();
        draft.set_tool(ToolKind::Line);
        draft.begin(Point::new(0.0, 0.0));
        draft.set_tool(ToolKind::Select);
        assert!(!draft.is_active());
    }
}
