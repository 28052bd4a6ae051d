//! Pointer and keyboard state shared by the interaction machine.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Pointer button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Modifier key state attached to every input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    /// The platform-aware primary shortcut modifier: command on macOS,
    /// control elsewhere. Zoom/pan shortcuts key off this.
    pub fn primary(&self) -> bool {
        if cfg!(target_os = "macos") {
            self.meta
        } else {
            self.ctrl
        }
    }

    /// Modifiers carrying only the primary shortcut key for this platform.
    pub fn with_primary() -> Self {
        if cfg!(target_os = "macos") {
            Self {
                meta: true,
                ..Self::NONE
            }
        } else {
            Self {
                ctrl: true,
                ..Self::NONE
            }
        }
    }
}

/// A pointer event in world coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: PointerButton,
    },
    Move {
        position: Point,
    },
    Up {
        position: Point,
        button: PointerButton,
    },
    Scroll {
        position: Point,
        delta: Vec2,
    },
}
