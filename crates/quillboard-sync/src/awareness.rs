//! Ephemeral per-participant presence.
//!
//! Presence is broadcast but never persisted: it is created on join,
//! updated while connected, and dropped when the transport reports the
//! peer gone.

use kurbo::{Point, Vec2};
use quillboard_core::{Element, ElementId};
use serde::{Deserialize, Serialize};

/// Identity of a connected participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    /// Display color, as a CSS-style hex string.
    pub color: String,
}

/// A participant's viewport (pan offset + zoom).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub pan: Vec2,
    pub zoom: f64,
}

/// The full ephemeral state of one participant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PresenceState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Participant>,
    /// Live cursor position in world coordinates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Point>,
    /// In-progress drawing, not yet committed to the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<Element>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    /// Element this participant is text-editing, if any. Other peers reject
    /// edits against it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editing: Option<ElementId>,
}
