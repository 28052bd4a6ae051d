//! Content-carrying kinds with intrinsic bounds: tiles, frames, web embeds.

use super::{ElementId, ElementStyle};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sub-type of a content tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    /// Rich-text note.
    #[default]
    Note,
    /// Source code with an optional language tag.
    Code,
    /// Text-defined diagram (rendered elsewhere).
    Diagram,
}

/// A tile: a sized card holding rich content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub(crate) id: ElementId,
    pub position: Point,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub kind: TileKind,
    /// Kind-specific content: note markup, code, or diagram source.
    pub content: String,
    /// Language tag for code tiles.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub locked: bool,
    pub style: ElementStyle,
}

impl Tile {
    pub fn new(position: Point, width: f64, height: f64, kind: TileKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width,
            height,
            kind,
            content: String::new(),
            language: None,
            locked: false,
            style: ElementStyle::default(),
        }
    }

    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }
}

/// A labelled frame grouping a canvas region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub(crate) id: ElementId,
    pub position: Point,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub locked: bool,
    pub style: ElementStyle,
}

impl Frame {
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width,
            height,
            label: String::new(),
            locked: false,
            style: ElementStyle::default(),
        }
    }

    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }
}

/// An embedded web page shown in a sized viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebEmbed {
    pub(crate) id: ElementId,
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub url: String,
    #[serde(default)]
    pub locked: bool,
    pub style: ElementStyle,
}

impl WebEmbed {
    pub fn new(position: Point, width: f64, height: f64, url: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width,
            height,
            url,
            locked: false,
            style: ElementStyle::default(),
        }
    }

    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_rect_is_intrinsic() {
        let tile = Tile::new(Point::new(10.0, 20.0), 200.0, 120.0, TileKind::Code);
        let rect = tile.as_rect();
        assert_eq!(rect, Rect::new(10.0, 20.0, 210.0, 140.0));
    }

    #[test]
    fn test_tile_kind_serializes_snake_case() {
        let json = serde_json::to_string(&TileKind::Code).unwrap();
        assert_eq!(json, "\"code\"");
    }
}
