//! Remote patch transport.
//!
//! The authority accepts `PATCH /boards/{id}` with an `If-Match` version
//! header and an ordered op array, returning the new version. A stale
//! version is a conflict carrying the authority's current version so the
//! caller can re-fetch and retry.

use crate::BoxFuture;
use crate::patch::{PatchOp, apply_patches};
use serde::Deserialize;
use serde_json::Value;
use std::sync::RwLock;
use thiserror::Error;

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The authority's version moved past the expected one.
    #[error("version conflict: authority is at {current}")]
    Conflict { current: u64 },
    #[error("transport failure: {0}")]
    Failed(String),
}

/// A remote authority accepting versioned patch batches.
pub trait PatchTransport: Send + Sync {
    /// Send ops with the expected current version; resolves to the new
    /// version on success.
    fn send_patch(
        &self,
        board_id: &str,
        expected_version: u64,
        ops: &[PatchOp],
    ) -> BoxFuture<'_, Result<u64, TransportError>>;

    /// Best-effort unload-time variant: posts the same payload without
    /// waiting for a response. Failures are invisible by design.
    fn send_final(&self, board_id: &str, expected_version: u64, ops: &[PatchOp]);
}

#[derive(Deserialize)]
struct VersionBody {
    version: u64,
}

/// HTTP transport against a real patch endpoint.
pub struct HttpPatchTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPatchTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn board_url(&self, board_id: &str) -> String {
        format!("{}/boards/{}", self.base_url.trim_end_matches('/'), board_id)
    }
}

impl PatchTransport for HttpPatchTransport {
    fn send_patch(
        &self,
        board_id: &str,
        expected_version: u64,
        ops: &[PatchOp],
    ) -> BoxFuture<'_, Result<u64, TransportError>> {
        let url = self.board_url(board_id);
        let ops = ops.to_vec();
        Box::pin(async move {
            let response = self
                .client
                .patch(&url)
                .header(reqwest::header::IF_MATCH, expected_version.to_string())
                .json(&ops)
                .send()
                .await
                .map_err(|err| TransportError::Failed(err.to_string()))?;
            let status = response.status();
            if status == reqwest::StatusCode::CONFLICT
                || status == reqwest::StatusCode::PRECONDITION_FAILED
            {
                let current = response
                    .json::<VersionBody>()
                    .await
                    .map(|body| body.version)
                    .unwrap_or(expected_version);
                return Err(TransportError::Conflict { current });
            }
            if !status.is_success() {
                return Err(TransportError::Failed(format!("status {status}")));
            }
            let body: VersionBody = response
                .json()
                .await
                .map_err(|err| TransportError::Failed(err.to_string()))?;
            Ok(body.version)
        })
    }

    fn send_final(&self, board_id: &str, expected_version: u64, ops: &[PatchOp]) {
        let client = self.client.clone();
        let url = self.board_url(board_id);
        let ops = ops.to_vec();
        // Detached one-shot runtime: the page is going away, nobody awaits.
        std::thread::spawn(move || {
            let Ok(runtime) = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            else {
                return;
            };
            let _ = runtime.block_on(
                client
                    .patch(&url)
                    .header(reqwest::header::IF_MATCH, expected_version.to_string())
                    .json(&ops)
                    .send(),
            );
        });
    }
}

struct AuthorityState {
    version: u64,
    data: Value,
}

/// In-process authority for tests and offline use. Applies patches to its
/// own board data and enforces the version check.
pub struct MemoryAuthority {
    state: RwLock<AuthorityState>,
}

impl MemoryAuthority {
    pub fn new(data: Value) -> Self {
        Self {
            state: RwLock::new(AuthorityState { version: 1, data }),
        }
    }

    pub fn version(&self) -> u64 {
        self.state.read().map(|s| s.version).unwrap_or(0)
    }

    pub fn data(&self) -> Value {
        self.state
            .read()
            .map(|s| s.data.clone())
            .unwrap_or(Value::Null)
    }

    /// Advance the version without a payload, simulating a concurrent
    /// writer.
    pub fn bump_version(&self) {
        if let Ok(mut state) = self.state.write() {
            state.version += 1;
        }
    }

    fn apply(&self, expected_version: u64, ops: &[PatchOp]) -> Result<u64, TransportError> {
        let mut state = self
            .state
            .write()
            .map_err(|err| TransportError::Failed(err.to_string()))?;
        if state.version != expected_version {
            return Err(TransportError::Conflict {
                current: state.version,
            });
        }
        let mut data = state.data.take();
        apply_patches(&mut data, ops);
        state.data = data;
        state.version += 1;
        Ok(state.version)
    }
}

impl PatchTransport for MemoryAuthority {
    fn send_patch(
        &self,
        _board_id: &str,
        expected_version: u64,
        ops: &[PatchOp],
    ) -> BoxFuture<'_, Result<u64, TransportError>> {
        let result = self.apply(expected_version, ops);
        Box::pin(async move { result })
    }

    fn send_final(&self, _board_id: &str, expected_version: u64, ops: &[PatchOp]) {
        let _ = self.apply(expected_version, ops);
    }
}
