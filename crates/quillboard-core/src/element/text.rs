//! Auto-sizing text elements.

use super::{ElementId, ElementStyle};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Approximate glyph advance as a fraction of the font size. Real metrics
/// come from the renderer; layout only needs a stable estimate.
const CHAR_WIDTH_FACTOR: f64 = 0.6;
/// Line height as a fraction of the font size.
const LINE_HEIGHT_FACTOR: f64 = 1.3;

/// A text element whose size follows its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub(crate) id: ElementId,
    /// Top-left of the first line.
    pub position: Point,
    pub content: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub locked: bool,
    pub style: ElementStyle,
}

fn default_font_size() -> f64 {
    20.0
}

impl Text {
    pub fn new(position: Point, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            content,
            font_size: default_font_size(),
            rotation: 0.0,
            locked: false,
            style: ElementStyle::default(),
        }
    }

    /// Measured size of the content. Empty text keeps a one-line caret box.
    pub fn measured_size(&self) -> Size {
        let mut max_chars = 0usize;
        let mut lines = 0usize;
        for line in self.content.split('\n') {
            lines += 1;
            max_chars = max_chars.max(line.chars().count());
        }
        lines = lines.max(1);
        let width = (max_chars.max(1) as f64) * self.font_size * CHAR_WIDTH_FACTOR;
        let height = (lines as f64) * self.font_size * LINE_HEIGHT_FACTOR;
        Size::new(width, height)
    }
}
