//! Canvas interaction state machine.
//!
//! Turns raw pointer and keyboard input into element-mutation intents and
//! presence updates. The editor never writes to the document itself: it
//! proposes [`MutationIntent`]s that the embedding application routes
//! through the sync layer, and emits [`PresenceIntent`]s for everything
//! transient. Escape and tool switches cancel in-progress work without
//! emitting a document mutation.

use crate::board::Board;
use crate::camera::Camera;
use crate::element::{Element, ElementId, ElementKind, ElementPatch};
use crate::input::{Modifiers, PointerButton, PointerEvent};
use crate::selection::{HandleKind, Selection, hit_test_handles};
use crate::snap::{DEFAULT_SNAP_THRESHOLD, SnapOutcome, find_guides};
use crate::tools::{DraftTool, ToolKind};
use kurbo::{Point, Rect, Vec2};
use std::collections::HashSet;

/// Hit tolerance for element selection, in world units.
const HIT_TOLERANCE: f64 = 4.0;
/// Hit tolerance for manipulation handles.
const HANDLE_TOLERANCE: f64 = 8.0;
/// Rotation snap increment with shift held, in radians.
const ROTATION_SNAP: f64 = 15.0 * std::f64::consts::PI / 180.0;
/// Minimum element extent after a resize.
const MIN_RESIZE: f64 = 1.0;

/// A proposed document mutation, consumed by the sync layer.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationIntent {
    Create(Element),
    Update(Element),
    UpdateMany(Vec<Element>),
    /// Atomic removal of a set of elements.
    Delete(Vec<ElementId>),
}

/// A transient presence update; never part of the durable document.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceIntent {
    Cursor(Point),
    /// The in-progress drawing, or `None` when it ends.
    Draft(Option<Element>),
    Viewport { pan: Vec2, zoom: f64 },
}

/// Apply an intent to a board. Used by the embedding application for the
/// optimistic local copy; the sync layer applies its own merged writes.
pub fn apply_intent(board: &mut Board, intent: &MutationIntent) {
    match intent {
        MutationIntent::Create(element) | MutationIntent::Update(element) => {
            board.upsert(element.clone());
        }
        MutationIntent::UpdateMany(elements) => {
            for element in elements {
                board.upsert(element.clone());
            }
        }
        MutationIntent::Delete(ids) => {
            for &id in ids {
                board.remove(id);
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
enum DragState {
    #[default]
    Idle,
    /// Moving the selected elements.
    Moving {
        start: Point,
        current: Point,
        originals: Vec<Element>,
    },
    /// Resizing a single element by a corner handle.
    Resizing {
        original: Element,
        anchor: Point,
        current: Point,
    },
    /// Dragging one point of a linear element.
    EndpointDrag {
        original: Element,
        index: usize,
        current: Point,
    },
    /// Rotating a single element around its center.
    Rotating {
        original: Element,
        center: Point,
        current: Point,
    },
    /// Rubber-band selection.
    Marquee { start: Point, current: Point },
    /// Panning the camera.
    Panning { last: Point },
}

#[derive(Debug, Clone)]
struct TextEdit {
    original: Element,
}

/// The interaction state machine.
#[derive(Debug, Default)]
pub struct Editor {
    draft: DraftTool,
    drag: DragState,
    text_edit: Option<TextEdit>,
    /// Elements marked by the eraser; deleted in one intent on release.
    eraser_marked: Vec<ElementId>,
    erasing: bool,
    pub selection: Selection,
    pub camera: Camera,
    /// Dropping a dragged selection in this region deletes it atomically.
    removal_region: Option<Rect>,
    /// Elements currently text-edited by remote peers (from awareness).
    remote_editing: HashSet<ElementId>,
    snap_enabled: bool,
    snap_threshold: f64,
    last_snap: SnapOutcome,
    intents: Vec<MutationIntent>,
    presence: Vec<PresenceIntent>,
}

impl Editor {
    pub fn new() -> Self {
        Self {
            snap_enabled: true,
            snap_threshold: DEFAULT_SNAP_THRESHOLD,
            ..Default::default()
        }
    }

    pub fn tool(&self) -> ToolKind {
        self.draft.tool
    }

    /// Switch tools, cancelling any in-progress gesture without a mutation.
    pub fn set_tool(&mut self, tool: ToolKind) {
        if self.draft.is_active() {
            self.draft.cancel();
            self.presence.push(PresenceIntent::Draft(None));
        }
        self.drag = DragState::Idle;
        self.draft.set_tool(tool);
    }

    pub fn set_snap_enabled(&mut self, enabled: bool) {
        self.snap_enabled = enabled;
    }

    pub fn set_removal_region(&mut self, region: Option<Rect>) {
        self.removal_region = region;
    }

    /// Update the set of elements remote peers are editing, from awareness.
    pub fn set_remote_editing(&mut self, ids: HashSet<ElementId>) {
        self.remote_editing = ids;
    }

    /// Guides from the most recent drag movement, for rendering.
    pub fn last_snap(&self) -> &SnapOutcome {
        &self.last_snap
    }

    /// Take the mutation intents accumulated since the last drain.
    pub fn drain_intents(&mut self) -> Vec<MutationIntent> {
        std::mem::take(&mut self.intents)
    }

    /// Take the presence updates accumulated since the last drain.
    pub fn drain_presence(&mut self) -> Vec<PresenceIntent> {
        std::mem::take(&mut self.presence)
    }

    pub fn is_text_editing(&self) -> bool {
        self.text_edit.is_some()
    }

    // --- Pointer input ---

    /// Dispatch a pointer event. Secondary/middle buttons are ignored;
    /// scroll pans the canvas, or zooms with the platform primary modifier
    /// held.
    pub fn handle_pointer(&mut self, board: &Board, event: PointerEvent, modifiers: Modifiers) {
        match event {
            PointerEvent::Down { position, button } => {
                if button == PointerButton::Primary {
                    self.pointer_down(board, position, modifiers);
                }
            }
            PointerEvent::Move { position } => self.pointer_move(board, position, modifiers),
            PointerEvent::Up { position, button } => {
                if button == PointerButton::Primary {
                    self.pointer_up(board, position, modifiers);
                }
            }
            PointerEvent::Scroll { delta, .. } => {
                if modifiers.primary() {
                    let factor = if delta.y < 0.0 { 1.1 } else { 1.0 / 1.1 };
                    self.camera.zoom = (self.camera.zoom * factor)
                        .clamp(self.camera.min_zoom, self.camera.max_zoom);
                } else {
                    self.camera.pan_by(-delta);
                }
                self.broadcast_viewport();
            }
        }
    }

    pub fn pointer_down(&mut self, board: &Board, point: Point, modifiers: Modifiers) {
        match self.draft.tool {
            ToolKind::Select => self.select_down(board, point, modifiers),
            ToolKind::Pan => self.drag = DragState::Panning { last: point },
            ToolKind::Eraser => {
                self.erasing = true;
                self.mark_for_erase(board, point);
            }
            _ => {
                self.draft.begin(point);
                if let Some(preview) = self.draft.preview() {
                    self.presence.push(PresenceIntent::Draft(Some(preview)));
                }
            }
        }
    }

    pub fn pointer_move(&mut self, board: &Board, point: Point, modifiers: Modifiers) {
        self.presence.push(PresenceIntent::Cursor(point));

        if self.draft.is_active() {
            self.draft.update(point, modifiers.shift);
            if let Some(preview) = self.draft.preview() {
                self.presence.push(PresenceIntent::Draft(Some(preview)));
            }
            return;
        }
        if self.erasing {
            self.mark_for_erase(board, point);
            return;
        }
        match &mut self.drag {
            DragState::Moving {
                start,
                current,
                originals,
            } => {
                *current = point;
                let raw = point - *start;
                let moved = moved_bounds(originals, raw);
                self.last_snap = match (self.snap_enabled, moved) {
                    (true, Some(bounds)) => {
                        let exclude: Vec<ElementId> = originals.iter().map(|e| e.id()).collect();
                        let candidates: Vec<Element> =
                            board.elements_ordered().cloned().collect();
                        find_guides(bounds, &candidates, &exclude, self.snap_threshold)
                    }
                    _ => SnapOutcome::default(),
                };
            }
            DragState::Resizing { current, .. }
            | DragState::EndpointDrag { current, .. }
            | DragState::Rotating { current, .. }
            | DragState::Marquee { current, .. } => *current = point,
            DragState::Panning { last } => {
                let delta = point - *last;
                self.camera.pan_by(delta * self.camera.zoom);
                *last = point;
                self.presence.push(PresenceIntent::Viewport {
                    pan: self.camera.pan,
                    zoom: self.camera.zoom,
                });
            }
            DragState::Idle => {}
        }
    }

    pub fn pointer_up(&mut self, board: &Board, point: Point, modifiers: Modifiers) {
        if self.draft.is_active() {
            if let Some(element) = self.draft.finish(point, modifiers.shift) {
                self.intents.push(MutationIntent::Create(element));
            }
            self.presence.push(PresenceIntent::Draft(None));
            return;
        }
        if self.erasing {
            self.erasing = false;
            let marked = std::mem::take(&mut self.eraser_marked);
            if !marked.is_empty() {
                self.intents.push(MutationIntent::Delete(marked));
            }
            return;
        }
        let drag = std::mem::take(&mut self.drag);
        match drag {
            DragState::Moving {
                start, originals, ..
            } => self.finish_move(point, start, originals),
            DragState::Resizing {
                original, anchor, ..
            } => {
                let resized = resize_to(&original, anchor, point, modifiers.shift);
                if let Some(element) = resized {
                    self.intents.push(MutationIntent::Update(element));
                }
            }
            DragState::EndpointDrag {
                original, index, ..
            } => {
                if let Some(points) = original.points() {
                    let mut points = points.to_vec();
                    if index < points.len() {
                        points[index] = point;
                        let mut element = original;
                        element.apply(&ElementPatch::Points(points));
                        self.intents.push(MutationIntent::Update(element));
                    }
                }
            }
            DragState::Rotating {
                original, center, ..
            } => {
                let mut element = original;
                let angle = rotation_angle(center, point, modifiers.shift);
                element.set_rotation(angle);
                self.intents.push(MutationIntent::Update(element));
            }
            DragState::Marquee { start, .. } => {
                let rect = Rect::from_points(start, point);
                self.selection.replace(board.elements_in_rect(rect));
            }
            DragState::Panning { .. } | DragState::Idle => {}
        }
        self.last_snap = SnapOutcome::default();
    }

    // --- Keyboard input ---

    /// Handle a key press. Returns true when the key was consumed.
    pub fn key_down(&mut self, key: &str, modifiers: Modifiers) -> bool {
        match key {
            "Escape" => {
                self.cancel();
                true
            }
            "Delete" | "Backspace" => {
                if self.text_edit.is_some() {
                    return false;
                }
                let ids = self.selection.take();
                if !ids.is_empty() {
                    self.intents.push(MutationIntent::Delete(ids));
                }
                true
            }
            "=" | "+" if modifiers.primary() => {
                self.camera.zoom = (self.camera.zoom * 1.1).clamp(
                    self.camera.min_zoom,
                    self.camera.max_zoom,
                );
                self.broadcast_viewport();
                true
            }
            "-" if modifiers.primary() => {
                self.camera.zoom = (self.camera.zoom / 1.1).clamp(
                    self.camera.min_zoom,
                    self.camera.max_zoom,
                );
                self.broadcast_viewport();
                true
            }
            "0" if modifiers.primary() => {
                self.camera.reset_zoom();
                self.broadcast_viewport();
                true
            }
            _ => false,
        }
    }

    /// Cancel whatever is in progress. Never emits a document mutation.
    pub fn cancel(&mut self) {
        if self.draft.is_active() {
            self.draft.cancel();
            self.presence.push(PresenceIntent::Draft(None));
        }
        self.drag = DragState::Idle;
        self.text_edit = None;
        self.erasing = false;
        self.eraser_marked.clear();
        self.last_snap = SnapOutcome::default();
    }

    // --- Text editing sub-state ---

    /// Enter text editing for an element. Rejected (no-op, `false`) for
    /// locked elements, elements a remote peer is editing, and non-text
    /// kinds.
    pub fn begin_text_edit(&mut self, board: &Board, id: ElementId) -> bool {
        let Some(element) = board.get(id) else {
            return false;
        };
        if element.kind() != ElementKind::Text
            || element.locked()
            || self.remote_editing.contains(&id)
        {
            return false;
        }
        self.text_edit = Some(TextEdit {
            original: element.clone(),
        });
        true
    }

    /// Commit the edited content as an update intent.
    pub fn commit_text_edit(&mut self, content: String) {
        if let Some(edit) = self.text_edit.take() {
            let mut element = edit.original;
            if let Element::Text(ref mut text) = element {
                text.content = content;
            }
            self.intents.push(MutationIntent::Update(element));
        }
    }

    pub fn cancel_text_edit(&mut self) {
        self.text_edit = None;
    }

    // --- Internals ---

    fn select_down(&mut self, board: &Board, point: Point, modifiers: Modifiers) {
        // A handle on a single selected element wins over re-selection.
        if self.selection.len() == 1 {
            let id = self.selection.ids()[0];
            if let Some(element) = board.get(id) {
                if let Some(kind) = hit_test_handles(element, point, HANDLE_TOLERANCE) {
                    self.drag = match kind {
                        HandleKind::Corner(corner) => {
                            let bounds = element.bounds().unwrap_or_default();
                            DragState::Resizing {
                                original: element.clone(),
                                anchor: corner.opposite().point_of(bounds),
                                current: point,
                            }
                        }
                        HandleKind::Endpoint(index) => DragState::EndpointDrag {
                            original: element.clone(),
                            index,
                            current: point,
                        },
                        HandleKind::Rotate => {
                            let center = element
                                .bounds()
                                .map(|b| b.center())
                                .unwrap_or(point);
                            DragState::Rotating {
                                original: element.clone(),
                                center,
                                current: point,
                            }
                        }
                    };
                    return;
                }
            }
        }

        match board.topmost_at(point, HIT_TOLERANCE) {
            Some(id) => {
                if modifiers.shift {
                    self.selection.toggle(id);
                } else if !self.selection.contains(id) {
                    self.selection.set(id);
                }
                let originals: Vec<Element> = self
                    .selection
                    .ids()
                    .iter()
                    .filter_map(|&sid| board.get(sid).cloned())
                    .collect();
                if !originals.is_empty() {
                    self.drag = DragState::Moving {
                        start: point,
                        current: point,
                        originals,
                    };
                }
            }
            None => {
                if !modifiers.shift {
                    self.selection.clear();
                }
                self.drag = DragState::Marquee {
                    start: point,
                    current: point,
                };
            }
        }
    }

    fn finish_move(&mut self, point: Point, start: Point, originals: Vec<Element>) {
        let raw = point - start;
        let (snap_dx, snap_dy) = self.last_snap.delta();
        let delta = Vec2::new(raw.x + snap_dx, raw.y + snap_dy);

        // Dropping on the removal region deletes the whole selection in a
        // single intent.
        if let Some(region) = self.removal_region {
            if region.contains(point) {
                let ids: Vec<ElementId> = originals.iter().map(|e| e.id()).collect();
                self.selection.clear();
                self.intents.push(MutationIntent::Delete(ids));
                return;
            }
        }

        if delta.hypot() < f64::EPSILON {
            return;
        }
        let moved: Vec<Element> = originals
            .into_iter()
            .map(|mut element| {
                element.translate_by(delta.x, delta.y);
                element
            })
            .collect();
        self.intents.push(MutationIntent::UpdateMany(moved));
    }

    fn mark_for_erase(&mut self, board: &Board, point: Point) {
        if let Some(id) = board.topmost_at(point, HIT_TOLERANCE) {
            if !self.eraser_marked.contains(&id) {
                self.eraser_marked.push(id);
            }
        }
    }

    /// Elements currently marked by the eraser, for dimmed rendering.
    pub fn eraser_marked(&self) -> &[ElementId] {
        &self.eraser_marked
    }

    fn broadcast_viewport(&mut self) {
        self.presence.push(PresenceIntent::Viewport {
            pan: self.camera.pan,
            zoom: self.camera.zoom,
        });
    }
}

/// Combined bounds of a set of elements translated by a raw drag delta.
fn moved_bounds(originals: &[Element], delta: Vec2) -> Option<Rect> {
    let mut result: Option<Rect> = None;
    for element in originals {
        if let Some(bounds) = element.bounds() {
            let moved = bounds + delta;
            result = Some(match result {
                Some(r) => r.union(moved),
                None => moved,
            });
        }
    }
    result
}

/// Resize an element so its bounds match the rect spanned by the fixed
/// anchor and the dragged corner. Shift preserves the original aspect.
fn resize_to(original: &Element, anchor: Point, dragged: Point, proportional: bool) -> Option<Element> {
    let old = original.bounds()?;
    if old.width() <= 0.0 || old.height() <= 0.0 {
        return None;
    }
    let mut dragged = dragged;
    if proportional {
        let aspect = old.width() / old.height();
        let dx = dragged.x - anchor.x;
        let dy = dragged.y - anchor.y;
        let w = dx.abs().max(dy.abs() * aspect);
        dragged = Point::new(
            anchor.x + w * dx.signum(),
            anchor.y + (w / aspect) * dy.signum(),
        );
    }
    let new = Rect::from_points(anchor, dragged);
    if new.width() < MIN_RESIZE || new.height() < MIN_RESIZE {
        return None;
    }
    let scale_x = new.width() / old.width();
    let scale_y = new.height() / old.height();
    let map = |p: Point| {
        Point::new(
            new.x0 + (p.x - old.x0) * scale_x,
            new.y0 + (p.y - old.y0) * scale_y,
        )
    };

    let mut element = original.clone();
    match &mut element {
        Element::Rectangle(e) => {
            e.position = map(e.position);
            e.width *= scale_x;
            e.height *= scale_y;
        }
        Element::Diamond(e) => {
            e.position = map(e.position);
            e.width *= scale_x;
            e.height *= scale_y;
        }
        Element::Ellipse(e) => {
            e.center = map(e.center);
            e.radius_x *= scale_x;
            e.radius_y *= scale_y;
        }
        Element::Text(e) => {
            e.position = map(e.position);
            e.font_size = (e.font_size * scale_y).max(4.0);
        }
        Element::Tile(e) => {
            e.position = map(e.position);
            e.width *= scale_x;
            e.height *= scale_y;
        }
        Element::Frame(e) => {
            e.position = map(e.position);
            e.width *= scale_x;
            e.height *= scale_y;
        }
        Element::WebEmbed(e) => {
            e.position = map(e.position);
            e.width *= scale_x;
            e.height *= scale_y;
        }
        Element::Line(e) => e.points = e.points.iter().map(|p| map(*p)).collect(),
        Element::Arrow(e) => e.points = e.points.iter().map(|p| map(*p)).collect(),
        Element::Pen(e) => e.points = e.points.iter().map(|p| map(*p)).collect(),
        Element::Laser(_) => return None,
    }
    Some(element)
}

/// Angle of the rotation handle drag, with the handle sitting above the
/// center at zero rotation. Shift snaps to 15 degree steps.
fn rotation_angle(center: Point, pointer: Point, snapped: bool) -> f64 {
    let angle = (pointer.y - center.y).atan2(pointer.x - center.x) + std::f64::consts::FRAC_PI_2;
    if snapped {
        (angle / ROTATION_SNAP).round() * ROTATION_SNAP
    } else {
        angle
    }
}
