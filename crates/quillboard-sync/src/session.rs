//! The collaboration session: shared document plus ephemeral awareness.
//!
//! `BoardSession` owns the merge-resolved document; everything else
//! proposes. Local writes go through [`BoardSession::set_elements`] or
//! [`BoardSession::apply_intents`], are applied optimistically, diffed so
//! only actual deltas reach the wire, and reported to consumers tagged
//! [`ChangeOrigin::Local`]. Remote packets arrive via
//! [`BoardSession::handle_packet`] and are reported as
//! [`ChangeOrigin::Remote`] so consumers can break feedback loops.

use crate::BoxFuture;
use crate::awareness::{Participant, PresenceState, Viewport};
use crate::crdt::BoardDoc;
use crate::protocol::{ClientPacket, ServerPacket, decode_payload, encode_payload};
use crate::scheduler::FrameSlot;
use kurbo::{Point, Vec2};
use loro::VersionVector;
use quillboard_core::{Element, ElementId, MutationIntent, PresenceIntent};
use std::collections::BTreeMap;

/// Minimum interval between expiry sweeps, so the check stays off the
/// per-frame path.
pub const SWEEP_INTERVAL_MS: u64 = 1_000;

/// Origin of a document change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    Local,
    Remote,
}

type ElementsCallback = Box<dyn FnMut(&[Element], ChangeOrigin)>;
type AwarenessCallback = Box<dyn FnMut(&BTreeMap<String, PresenceState>)>;

/// A participant's live connection to one shared board.
pub struct BoardSession {
    doc: BoardDoc,
    board_id: String,
    user: Participant,
    local_presence: PresenceState,
    peers: BTreeMap<String, PresenceState>,
    cursor_slot: FrameSlot<Point>,
    draft_slot: FrameSlot<Option<Element>>,
    viewport_slot: FrameSlot<Viewport>,
    outgoing: Vec<ClientPacket>,
    pending_catchup: Vec<Vec<u8>>,
    element_callbacks: Vec<ElementsCallback>,
    awareness_callbacks: Vec<AwarenessCallback>,
    broadcast_from: VersionVector,
    last_sweep_ms: Option<u64>,
}

impl BoardSession {
    pub fn new(board_id: impl Into<String>, user: Participant) -> Self {
        let local_presence = PresenceState {
            user: Some(user.clone()),
            ..Default::default()
        };
        Self {
            doc: BoardDoc::new(),
            board_id: board_id.into(),
            user,
            local_presence,
            peers: BTreeMap::new(),
            cursor_slot: FrameSlot::new(),
            draft_slot: FrameSlot::new(),
            viewport_slot: FrameSlot::new(),
            outgoing: Vec::new(),
            pending_catchup: Vec::new(),
            element_callbacks: Vec::new(),
            awareness_callbacks: Vec::new(),
            broadcast_from: VersionVector::default(),
            last_sweep_ms: None,
        }
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    /// Identity of the local participant.
    pub fn user_info(&self) -> &Participant {
        &self.user
    }

    /// Queue the join handshake.
    pub fn connect(&mut self) {
        self.outgoing.push(ClientPacket::Join {
            board: self.board_id.clone(),
        });
    }

    pub fn disconnect(&mut self) {
        self.outgoing.push(ClientPacket::Leave);
    }

    // --- Document reads ---

    /// The merged document in z-order, deduplicated by id.
    pub fn elements(&self) -> Vec<Element> {
        self.doc.elements_ordered()
    }

    /// Like [`Self::elements`], but applies any queued catch-up packets
    /// first. Late joiners await this instead of reading a possibly-empty
    /// document.
    pub fn elements_async(&mut self) -> BoxFuture<'_, Vec<Element>> {
        Box::pin(async move {
            self.apply_catchup();
            self.elements()
        })
    }

    /// Queue catch-up bytes handed over out-of-band (e.g. with the join
    /// response) for the next async read.
    pub fn queue_catchup(&mut self, bytes: Vec<u8>) {
        self.pending_catchup.push(bytes);
    }

    fn apply_catchup(&mut self) {
        if self.pending_catchup.is_empty() {
            return;
        }
        let packets = std::mem::take(&mut self.pending_catchup);
        let mut applied = false;
        for bytes in packets {
            match self.doc.import(&bytes) {
                Ok(()) => applied = true,
                Err(err) => log::warn!("catch-up import failed: {err}"),
            }
        }
        if applied {
            self.absorb_remote();
            self.notify_elements(ChangeOrigin::Remote);
        }
    }

    /// After a remote import, move the broadcast cursor past the imported
    /// ops. Local changes broadcast synchronously, so nothing unsent can be
    /// skipped; without this, remote history would be echoed back out with
    /// the next local change.
    fn absorb_remote(&mut self) {
        self.broadcast_from = self.doc.version();
    }

    // --- Document writes ---

    /// Replace the full document. The input is deduplicated by id (last
    /// entry wins) and diffed against the shared document so unchanged
    /// elements produce no traffic; a keystroke-level micro-update must not
    /// amplify to a full-document broadcast.
    pub fn set_elements(&mut self, next: Vec<Element>) {
        let mut target_order: Vec<String> = Vec::with_capacity(next.len());
        let mut deduped: BTreeMap<String, Element> = BTreeMap::new();
        for element in next {
            let id = element.id().to_string();
            if deduped.insert(id.clone(), element).is_none() {
                target_order.push(id);
            } else {
                target_order.retain(|e| e != &id);
                target_order.push(id);
            }
        }

        let current = self.doc.element_jsons();
        let mut changed = false;
        for (id, element) in &deduped {
            let json = serde_json::to_string(element).unwrap_or_default();
            if current.get(id) != Some(&json) {
                if let Err(err) = self.doc.upsert(element) {
                    log::warn!("element write failed for {id}: {err}");
                } else {
                    changed = true;
                }
            }
        }
        for id in current.keys() {
            if !deduped.contains_key(id) {
                if let Err(err) = self.doc.remove(id) {
                    log::warn!("element remove failed for {id}: {err}");
                } else {
                    changed = true;
                }
            }
        }
        if self.doc.order() != target_order {
            if let Err(err) = self.doc.set_order(&target_order) {
                log::warn!("order write failed: {err}");
            } else {
                changed = true;
            }
        }

        if changed {
            self.broadcast_updates();
            self.notify_elements(ChangeOrigin::Local);
        }
    }

    /// Apply interaction intents to the shared document. This is the only
    /// write path the interaction machine reaches.
    pub fn apply_intents(&mut self, intents: &[MutationIntent]) {
        if intents.is_empty() {
            return;
        }
        let mut changed = false;
        for intent in intents {
            match intent {
                MutationIntent::Create(element) | MutationIntent::Update(element) => {
                    if self.doc.upsert(element).is_ok() {
                        changed = true;
                    }
                }
                MutationIntent::UpdateMany(elements) => {
                    for element in elements {
                        if self.doc.upsert(element).is_ok() {
                            changed = true;
                        }
                    }
                }
                MutationIntent::Delete(ids) => {
                    for id in ids {
                        if self.doc.remove(&id.to_string()).is_ok() {
                            changed = true;
                        }
                    }
                }
            }
        }
        if changed {
            self.broadcast_updates();
            self.notify_elements(ChangeOrigin::Local);
        }
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.doc.undo();
        if undone {
            self.broadcast_updates();
            self.notify_elements(ChangeOrigin::Local);
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.doc.redo();
        if redone {
            self.broadcast_updates();
            self.notify_elements(ChangeOrigin::Local);
        }
        redone
    }

    // --- Change notification ---

    /// Register a callback fired whenever the merged document changes,
    /// tagged with whether the change originated locally or remotely.
    pub fn on_elements_change(&mut self, callback: ElementsCallback) {
        self.element_callbacks.push(callback);
    }

    /// Register a callback fired on any participant's presence update.
    pub fn on_awareness_change(&mut self, callback: AwarenessCallback) {
        self.awareness_callbacks.push(callback);
    }

    fn notify_elements(&mut self, origin: ChangeOrigin) {
        if self.element_callbacks.is_empty() {
            return;
        }
        let elements = self.elements();
        let mut callbacks = std::mem::take(&mut self.element_callbacks);
        for callback in callbacks.iter_mut() {
            callback(&elements, origin);
        }
        callbacks.append(&mut self.element_callbacks);
        self.element_callbacks = callbacks;
    }

    fn notify_awareness(&mut self) {
        if self.awareness_callbacks.is_empty() {
            return;
        }
        let mut callbacks = std::mem::take(&mut self.awareness_callbacks);
        for callback in callbacks.iter_mut() {
            callback(&self.peers);
        }
        callbacks.append(&mut self.awareness_callbacks);
        self.awareness_callbacks = callbacks;
    }

    // --- Ephemeral presence (write-only, coalesced per frame) ---

    pub fn update_cursor(&mut self, position: Point) {
        self.cursor_slot.set(position);
    }

    /// Stage the in-progress drawing (`None` clears it).
    pub fn update_drawing_element(&mut self, draft: Option<Element>) {
        self.draft_slot.set(draft);
    }

    pub fn update_viewport(&mut self, pan: Vec2, zoom: f64) {
        self.viewport_slot.set(Viewport { pan, zoom });
    }

    /// Route a presence intent from the interaction machine.
    pub fn apply_presence(&mut self, intent: PresenceIntent) {
        match intent {
            PresenceIntent::Cursor(position) => self.update_cursor(position),
            PresenceIntent::Draft(draft) => self.update_drawing_element(draft),
            PresenceIntent::Viewport { pan, zoom } => self.update_viewport(pan, zoom),
        }
    }

    /// Flush staged presence, at most one broadcast per rendering frame.
    /// Rapid updates within a frame coalesce into the latest value.
    pub fn frame_tick(&mut self) {
        let mut dirty = false;
        if let Some(cursor) = self.cursor_slot.take() {
            self.local_presence.cursor = Some(cursor);
            dirty = true;
        }
        if self.draft_slot.is_scheduled() {
            self.local_presence.draft = self.draft_slot.take().flatten();
            dirty = true;
        }
        if let Some(viewport) = self.viewport_slot.take() {
            self.local_presence.viewport = Some(viewport);
            dirty = true;
        }
        if dirty {
            self.outgoing.push(ClientPacket::Awareness {
                peer: self.user.id.clone(),
                state: self.local_presence.clone(),
            });
        }
    }

    /// Mark which element the local participant is text-editing; broadcast
    /// with the next frame's awareness flush.
    pub fn set_editing(&mut self, editing: Option<ElementId>) {
        self.local_presence.editing = editing;
        // Reuse the cursor slot's schedule by staging the current cursor so
        // the next tick broadcasts the new editing state.
        if let Some(cursor) = self.local_presence.cursor {
            self.cursor_slot.set(cursor);
        } else {
            self.cursor_slot.set(Point::ZERO);
        }
    }

    /// Presence of every known remote participant.
    pub fn peers(&self) -> &BTreeMap<String, PresenceState> {
        &self.peers
    }

    // --- Wire ---

    /// Drain packets queued for the transport.
    pub fn take_outgoing(&mut self) -> Vec<ClientPacket> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Apply a packet from the transport. Transport-level errors drop
    /// silently; presence is best-effort.
    pub fn handle_packet(&mut self, packet: ServerPacket) {
        match packet {
            ServerPacket::Joined { initial, .. } => {
                if let Some(data) = initial.as_deref().and_then(decode_payload) {
                    match self.doc.import(&data) {
                        Ok(()) => {
                            self.absorb_remote();
                            self.notify_elements(ChangeOrigin::Remote);
                        }
                        Err(err) => log::warn!("join catch-up import failed: {err}"),
                    }
                }
            }
            ServerPacket::PeerJoined { peer } => {
                self.peers.entry(peer).or_default();
                self.notify_awareness();
            }
            ServerPacket::PeerLeft { peer } => {
                // Presence expires on disconnect detection by the transport.
                if self.peers.remove(&peer).is_some() {
                    self.notify_awareness();
                }
            }
            ServerPacket::DocUpdate { data, .. } => {
                let Some(bytes) = decode_payload(&data) else {
                    log::warn!("undecodable document update dropped");
                    return;
                };
                match self.doc.import(&bytes) {
                    Ok(()) => {
                        self.absorb_remote();
                        self.notify_elements(ChangeOrigin::Remote);
                    }
                    Err(err) => log::warn!("remote update import failed: {err}"),
                }
            }
            ServerPacket::Awareness { from, state } => {
                self.peers.insert(from, state);
                self.notify_awareness();
            }
            ServerPacket::Error { message } => {
                log::warn!("sync transport error: {message}");
            }
        }
    }

    /// Export a full snapshot, for seeding a late joiner.
    pub fn export_snapshot(&self) -> Vec<u8> {
        self.doc.export_snapshot()
    }

    fn broadcast_updates(&mut self) {
        let bytes = self.doc.export_updates(&self.broadcast_from);
        self.broadcast_from = self.doc.version();
        if !bytes.is_empty() {
            self.outgoing.push(ClientPacket::DocUpdate {
                data: encode_payload(&bytes),
            });
        }
    }

    // --- Expiry sweep ---

    /// Remove expired laser trails. Runs at most once per
    /// [`SWEEP_INTERVAL_MS`]; each expired element is deleted exactly once
    /// and the removed ids are returned.
    pub fn sweep_expired(&mut self, now_ms: u64) -> Vec<ElementId> {
        if let Some(last) = self.last_sweep_ms {
            if now_ms.saturating_sub(last) < SWEEP_INTERVAL_MS {
                return Vec::new();
            }
        }
        self.last_sweep_ms = Some(now_ms);

        let expired: Vec<ElementId> = self
            .elements()
            .iter()
            .filter_map(|element| match element {
                Element::Laser(laser) if laser.is_expired(now_ms) => Some(element.id()),
                _ => None,
            })
            .collect();
        if expired.is_empty() {
            return Vec::new();
        }
        for id in &expired {
            if let Err(err) = self.doc.remove(&id.to_string()) {
                log::warn!("expiry removal failed for {id}: {err}");
            }
        }
        self.broadcast_updates();
        self.notify_elements(ChangeOrigin::Local);
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;
    use quillboard_core::element::{LASER_TTL_MS, Laser, Rectangle};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn participant(id: &str) -> Participant {
        Participant {
            id: id.to_string(),
            name: format!("user-{id}"),
            color: "#3366cc".to_string(),
        }
    }

    fn rect_element(x: f64) -> Element {
        Element::Rectangle(Rectangle::new(Point::new(x, 0.0), 100.0, 50.0))
    }

    /// Deliver every queued packet from one session to another, as a relay
    /// would.
    fn pump(from: &mut BoardSession, to: &mut BoardSession) {
        for packet in from.take_outgoing() {
            let server_packet = match packet {
                ClientPacket::DocUpdate { data } => ServerPacket::DocUpdate {
                    from: from.user_info().id.clone(),
                    data,
                },
                ClientPacket::Awareness { peer, state } => {
                    ServerPacket::Awareness { from: peer, state }
                }
                ClientPacket::Join { .. } | ClientPacket::Leave => continue,
            };
            to.handle_packet(server_packet);
        }
    }

    #[test]
    fn test_set_elements_then_read_dedups_by_id() {
        let mut session = BoardSession::new("b1", participant("a"));
        let element = rect_element(0.0);
        let mut moved = element.clone();
        moved.translate_by(40.0, 0.0);
        // Input containing a duplicate id: last entry wins, no duplicates
        // survive the read.
        session.set_elements(vec![element, moved.clone()]);
        let elements = session.elements();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0], moved);
    }

    #[test]
    fn test_documents_converge_across_sessions() {
        let mut a = BoardSession::new("b1", participant("a"));
        let mut b = BoardSession::new("b1", participant("b"));
        let element = rect_element(0.0);
        a.set_elements(vec![element.clone()]);
        pump(&mut a, &mut b);
        assert_eq!(b.elements(), vec![element.clone()]);

        // Concurrent non-conflicting edits merge from both sides.
        let from_b = rect_element(300.0);
        b.set_elements(vec![element.clone(), from_b.clone()]);
        let from_a = rect_element(600.0);
        a.set_elements(vec![element, from_a]);
        pump(&mut a, &mut b);
        pump(&mut b, &mut a);
        assert_eq!(a.elements().len(), 3);
        assert_eq!(b.elements().len(), 3);
    }

    #[test]
    fn test_unchanged_set_elements_emits_no_traffic() {
        let mut session = BoardSession::new("b1", participant("a"));
        let element = rect_element(0.0);
        session.set_elements(vec![element.clone()]);
        session.take_outgoing();
        // Same document again: the diff is empty, so nothing goes out and
        // no change notification fires.
        let fired = Rc::new(RefCell::new(0u32));
        let fired_in_cb = fired.clone();
        session.on_elements_change(Box::new(move |_, _| {
            *fired_in_cb.borrow_mut() += 1;
        }));
        session.set_elements(vec![element]);
        assert!(!session.has_outgoing());
        assert_eq!(*fired.borrow(), 0);
    }

    #[test]
    fn test_change_origin_tagging() {
        let mut a = BoardSession::new("b1", participant("a"));
        let mut b = BoardSession::new("b1", participant("b"));
        let origins = Rc::new(RefCell::new(Vec::new()));
        let origins_in_cb = origins.clone();
        b.on_elements_change(Box::new(move |_, origin| {
            origins_in_cb.borrow_mut().push(origin);
        }));
        // Remote change.
        a.set_elements(vec![rect_element(0.0)]);
        pump(&mut a, &mut b);
        // Local change.
        let mut next = b.elements();
        next.push(rect_element(200.0));
        b.set_elements(next);
        assert_eq!(
            origins.borrow().as_slice(),
            &[ChangeOrigin::Remote, ChangeOrigin::Local]
        );
    }

    #[test]
    fn test_remote_change_does_not_echo_flush() {
        // The consumer pattern from the persistence bridge: schedule a
        // flush only for locally-originated changes. A remote update must
        // not re-enter the remote authority.
        let mut a = BoardSession::new("b1", participant("a"));
        let mut b = BoardSession::new("b1", participant("b"));
        let flushes = Rc::new(RefCell::new(0u32));
        let flushes_in_cb = flushes.clone();
        b.on_elements_change(Box::new(move |_, origin| {
            if origin == ChangeOrigin::Local {
                *flushes_in_cb.borrow_mut() += 1;
            }
        }));
        a.set_elements(vec![rect_element(0.0)]);
        pump(&mut a, &mut b);
        assert_eq!(*flushes.borrow(), 0);
        let elements = b.elements();
        b.set_elements(elements.into_iter().chain([rect_element(1.0)]).collect());
        assert_eq!(*flushes.borrow(), 1);
    }

    #[test]
    fn test_presence_coalesces_to_one_packet_per_frame() {
        let mut session = BoardSession::new("b1", participant("a"));
        for i in 0..60 {
            session.update_cursor(Point::new(i as f64, 0.0));
            session.update_viewport(Vec2::ZERO, 1.0 + i as f64 * 0.01);
        }
        session.frame_tick();
        let packets = session.take_outgoing();
        assert_eq!(packets.len(), 1);
        match &packets[0] {
            ClientPacket::Awareness { state, .. } => {
                assert_eq!(state.cursor, Some(Point::new(59.0, 0.0)));
            }
            other => panic!("unexpected packet: {other:?}"),
        }
        // An idle frame broadcasts nothing.
        session.frame_tick();
        assert!(!session.has_outgoing());
    }

    #[test]
    fn test_draft_presence_clears() {
        let mut a = BoardSession::new("b1", participant("a"));
        let mut b = BoardSession::new("b1", participant("b"));
        a.update_drawing_element(Some(rect_element(0.0)));
        a.frame_tick();
        pump(&mut a, &mut b);
        let peer = b.peers().get("a").unwrap();
        assert!(peer.draft.is_some());
        a.update_drawing_element(None);
        a.frame_tick();
        pump(&mut a, &mut b);
        assert!(b.peers().get("a").unwrap().draft.is_none());
    }

    #[test]
    fn test_peer_left_drops_presence() {
        let mut session = BoardSession::new("b1", participant("a"));
        session.handle_packet(ServerPacket::Awareness {
            from: "ghost".to_string(),
            state: PresenceState::default(),
        });
        assert_eq!(session.peers().len(), 1);
        session.handle_packet(ServerPacket::PeerLeft {
            peer: "ghost".to_string(),
        });
        assert!(session.peers().is_empty());
    }

    #[test]
    fn test_expiry_sweep_removes_old_lasers_once() {
        let mut session = BoardSession::new("b1", participant("a"));
        let laser = Element::Laser(Laser::new(
            vec![Point::ZERO, Point::new(10.0, 0.0)],
            1_000,
        ));
        let laser_id = laser.id();
        let keeper = rect_element(0.0);
        session.set_elements(vec![laser, keeper.clone()]);

        // Young laser survives a sweep.
        let removed = session.sweep_expired(1_000 + LASER_TTL_MS / 2);
        assert!(removed.is_empty());

        // Expired laser goes exactly once; the rectangle stays.
        let removed = session.sweep_expired(1_000 + LASER_TTL_MS + SWEEP_INTERVAL_MS);
        assert_eq!(removed, vec![laser_id]);
        assert_eq!(session.elements(), vec![keeper]);

        // Further sweeps find nothing to delete.
        let removed = session.sweep_expired(1_000 + LASER_TTL_MS + SWEEP_INTERVAL_MS * 3);
        assert!(removed.is_empty());
    }

    #[test]
    fn test_sweep_respects_interval() {
        let mut session = BoardSession::new("b1", participant("a"));
        let laser = Element::Laser(Laser::new(vec![Point::ZERO, Point::new(1.0, 0.0)], 0));
        session.set_elements(vec![laser]);
        // First sweep runs (too young to expire), second is inside the
        // interval and skipped even though the laser expired meanwhile.
        assert!(session.sweep_expired(10).is_empty());
        assert!(session.sweep_expired(10 + SWEEP_INTERVAL_MS - 1).is_empty());
        // Past the interval the expired laser is collected.
        assert_eq!(session.sweep_expired(10 + LASER_TTL_MS + SWEEP_INTERVAL_MS).len(), 1);
    }

    #[test]
    fn test_elements_async_applies_catchup() {
        let mut seed = BoardSession::new("b1", participant("seed"));
        let element = rect_element(0.0);
        seed.set_elements(vec![element.clone()]);
        let snapshot = seed.export_snapshot();

        let mut late = BoardSession::new("b1", participant("late"));
        late.queue_catchup(snapshot);
        assert!(late.elements().is_empty());
        let elements = crate::test_util::block_on(late.elements_async());
        assert_eq!(elements, vec![element]);
    }

    #[test]
    fn test_intents_drive_document() {
        let mut session = BoardSession::new("b1", participant("a"));
        let element = rect_element(0.0);
        let id = element.id();
        session.apply_intents(&[MutationIntent::Create(element)]);
        assert_eq!(session.elements().len(), 1);
        session.apply_intents(&[MutationIntent::Delete(vec![id])]);
        assert!(session.elements().is_empty());
    }
}
