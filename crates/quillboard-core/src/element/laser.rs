//! Ephemeral laser-pointer trails.

use super::{ElementId, ElementStyle};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// How long a laser trail stays visible after creation.
pub const LASER_TTL_MS: u64 = 4_000;

/// A laser-pointer trail. Self-expires `LASER_TTL_MS` after creation; the
/// expiry sweep in the sync layer removes it from the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Laser {
    pub(crate) id: ElementId,
    pub points: Vec<Point>,
    /// Creation time in unix milliseconds, stamped by the creating peer.
    pub created_at_ms: u64,
    pub style: ElementStyle,
}

impl Laser {
    pub fn new(points: Vec<Point>, created_at_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            points,
            created_at_ms,
            style: ElementStyle::default(),
        }
    }

    pub fn is_renderable(&self) -> bool {
        self.points.len() >= 2
    }

    /// Whether the trail has outlived its TTL at the given instant.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at_ms) >= LASER_TTL_MS
    }
}

/// Current unix time in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
