//! Quillboard core
//!
//! Element model, geometry kernel, shape cache, alignment/snap engine and
//! the canvas interaction state machine for the Quillboard collaborative
//! whiteboard. Platform-agnostic; the sync layer lives in
//! `quillboard-sync`.

pub mod board;
pub mod camera;
pub mod editor;
pub mod element;
pub mod geometry;
pub mod input;
pub mod selection;
pub mod shape_cache;
pub mod snap;
pub mod tools;

pub use board::Board;
pub use camera::Camera;
pub use editor::{Editor, MutationIntent, PresenceIntent, apply_intent};
pub use element::{Element, ElementId, ElementKind, ElementPatch, ElementStyle};
pub use input::{Modifiers, PointerButton, PointerEvent};
pub use selection::{Handle, HandleKind, Selection};
pub use shape_cache::{RoughShape, ShapeCache};
pub use snap::{DEFAULT_SNAP_THRESHOLD, GuideLine, SnapOutcome, find_guides};
pub use tools::{DraftTool, ToolKind};
