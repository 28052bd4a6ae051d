//! Quillboard sync
//!
//! Collaboration layer for the Quillboard canvas: the conflict-resolved
//! shared document, ephemeral awareness broadcast, per-frame presence
//! coalescing, and the JSON-Patch persistence bridge with
//! optimistic-concurrency flushing and a durable local mirror.

pub mod awareness;
pub mod bridge;
pub mod crdt;
pub mod mirror;
pub mod patch;
pub mod protocol;
pub mod scheduler;
pub mod session;
pub mod transport;

use std::future::Future;
use std::pin::Pin;

/// Boxed future used across the async seams (transport, storage); keeps
/// the crate runtime-agnostic.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

pub use awareness::{Participant, PresenceState, Viewport};
pub use bridge::{FlushReason, PatchBridge, SaveState};
pub use crdt::BoardDoc;
pub use mirror::{KeyValueStore, MemoryKeyValueStore, MirrorError, load_mirror, mirror_blob};
pub use patch::{PatchOp, PatchOpKind, apply_patch, apply_patches, diff_shallow};
pub use protocol::{ClientPacket, ServerPacket, decode_payload, encode_payload};
pub use scheduler::FrameSlot;
pub use session::{BoardSession, ChangeOrigin, SWEEP_INTERVAL_MS};
pub use transport::{HttpPatchTransport, MemoryAuthority, PatchTransport, TransportError};

#[cfg(test)]
pub(crate) mod test_util {
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    /// Minimal pin-and-poll executor for tests; the crate's futures never
    /// need a reactor.
    pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
        fn raw_waker() -> RawWaker {
            fn no_op(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(raw_waker()) };
        let mut context = Context::from_waker(&waker);
        let mut future = std::pin::pin!(future);
        loop {
            match future.as_mut().poll(&mut context) {
                Poll::Ready(result) => return result,
                Poll::Pending => {}
            }
        }
    }
}
