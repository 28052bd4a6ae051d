//! Wire envelope for the sync transport.
//!
//! JSON packets addressed by a shared board id, with binary document
//! payloads carried as base64. The transport itself (socket, relay) is
//! outside this crate; packets are handed to and taken from the session.

use crate::awareness::PresenceState;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Packets sent by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientPacket {
    /// Join a board session.
    Join { board: String },
    /// Leave the current board.
    Leave,
    /// Incremental document update (base64 payload).
    DocUpdate { data: String },
    /// Ephemeral presence update.
    Awareness { peer: String, state: PresenceState },
}

/// Packets received from the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerPacket {
    /// Join confirmation, optionally carrying catch-up state.
    Joined {
        board: String,
        peer_count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial: Option<String>,
    },
    PeerJoined {
        peer: String,
    },
    PeerLeft {
        peer: String,
    },
    DocUpdate {
        from: String,
        data: String,
    },
    Awareness {
        from: String,
        state: PresenceState,
    },
    Error {
        message: String,
    },
}

/// Encode a binary document payload for the wire.
pub fn encode_payload(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a wire payload; `None` on malformed input.
pub fn decode_payload(data: &str) -> Option<Vec<u8>> {
    STANDARD.decode(data).ok()
}
