//! Local patch queue with debounced, version-checked flushing.
//!
//! The bridge holds the board-data document, records per-field patch ops
//! for every update, and flushes them to the remote authority with an
//! optimistic-concurrency token. A version conflict keeps the queue intact
//! and surfaces as an error state so the caller can re-fetch the
//! authoritative version and retry; the only user-visible failure is a
//! stale "unsaved" indicator.

use crate::BoxFuture;
use crate::patch::{PatchOp, apply_patches, diff_shallow};
use crate::transport::{PatchTransport, TransportError};
use serde_json::{Map, Value};

/// Persistence status of the board data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// Everything acknowledged by the authority.
    Saved,
    /// Local changes queued for the next flush.
    QueuedRemote,
    /// A flush is in flight.
    Flushing,
    /// The last flush failed; queued ops are retained for retry.
    Error,
}

/// Why a flush is being scheduled; determines the debounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// A gesture ended; flush soon.
    PointerRelease,
    /// Passive edits; batch more aggressively.
    Edit,
    /// The page is going away; flush immediately, fire-and-forget.
    PageHide,
}

impl FlushReason {
    fn debounce_ms(&self) -> u64 {
        match self {
            FlushReason::PointerRelease => 300,
            FlushReason::Edit => 1_200,
            FlushReason::PageHide => 0,
        }
    }
}

/// Queues board-data patches and flushes them with version checking.
pub struct PatchBridge {
    board_id: String,
    data: Value,
    version: u64,
    queue: Vec<PatchOp>,
    state: SaveState,
    flush_due_ms: Option<u64>,
}

impl PatchBridge {
    /// Start from the authoritative board data and its version, as fetched.
    pub fn new(board_id: impl Into<String>, data: Value, version: u64) -> Self {
        Self {
            board_id: board_id.into(),
            data,
            version,
            queue: Vec::new(),
            state: SaveState::Saved,
            flush_due_ms: None,
        }
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn save_state(&self) -> SaveState {
        self.state
    }

    pub fn pending_ops(&self) -> usize {
        self.queue.len()
    }

    /// Apply a shallow partial update, recording per-field ops into the
    /// outgoing queue. Unchanged fields record nothing.
    pub fn update(&mut self, partial: Map<String, Value>) {
        let ops = diff_shallow(&self.data, &partial);
        if ops.is_empty() {
            return;
        }
        apply_patches(&mut self.data, &ops);
        self.queue.extend(ops);
        self.state = SaveState::QueuedRemote;
    }

    /// Debounce a flush. Multiple schedules collapse to the earliest due
    /// time.
    pub fn schedule_flush(&mut self, reason: FlushReason, now_ms: u64) {
        if self.queue.is_empty() {
            return;
        }
        let due = now_ms + reason.debounce_ms();
        self.flush_due_ms = Some(self.flush_due_ms.map_or(due, |d| d.min(due)));
    }

    pub fn is_flush_due(&self, now_ms: u64) -> bool {
        !self.queue.is_empty() && self.flush_due_ms.is_some_and(|due| now_ms >= due)
    }

    /// Send the queued ops with the expected version. On success the
    /// version advances and sent ops leave the queue (ops queued during the
    /// flight stay). On failure — including a version conflict — the queue
    /// is retained so a retry can follow `acknowledge_version`.
    pub fn flush_now<'a>(
        &'a mut self,
        transport: &'a dyn PatchTransport,
    ) -> BoxFuture<'a, Result<u64, TransportError>> {
        Box::pin(async move {
            self.flush_due_ms = None;
            if self.queue.is_empty() {
                return Ok(self.version);
            }
            let in_flight = self.queue.len();
            self.state = SaveState::Flushing;
            let sent = transport
                .send_patch(&self.board_id, self.version, &self.queue[..in_flight])
                .await;
            match sent {
                Ok(version) => {
                    self.version = version;
                    self.queue.drain(..in_flight);
                    self.state = if self.queue.is_empty() {
                        SaveState::Saved
                    } else {
                        SaveState::QueuedRemote
                    };
                    Ok(version)
                }
                Err(err) => {
                    log::warn!("board {} flush failed: {err}", self.board_id);
                    self.state = SaveState::Error;
                    Err(err)
                }
            }
        })
    }

    /// Adopt a re-fetched authoritative version after a conflict, making
    /// the retained queue eligible for retry.
    pub fn acknowledge_version(&mut self, version: u64) {
        self.version = version;
        if self.state == SaveState::Error && !self.queue.is_empty() {
            self.state = SaveState::QueuedRemote;
        }
    }

    /// Page-hide flush: post the queue without waiting. The queue is kept;
    /// if the page survives, a normal flush confirms.
    pub fn flush_on_hide(&mut self, transport: &dyn PatchTransport) {
        if self.queue.is_empty() {
            return;
        }
        transport.send_final(&self.board_id, self.version, &self.queue);
    }
}
