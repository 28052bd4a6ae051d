//! Durable local mirror of board state.
//!
//! A key-value contract over opaque serialized blobs. Mirroring is a
//! best-effort side channel: it must never block or fail an interactive
//! flow, so write errors are logged and swallowed.

use crate::BoxFuture;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("storage error: {0}")]
    Storage(String),
}

pub type MirrorResult<T> = Result<T, MirrorError>;

/// Key-value storage for opaque versioned blobs.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, name: &str) -> BoxFuture<'_, MirrorResult<Option<Vec<u8>>>>;
    fn set(&self, name: &str, value: Vec<u8>) -> BoxFuture<'_, MirrorResult<()>>;
    fn remove(&self, name: &str) -> BoxFuture<'_, MirrorResult<()>>;
}

/// In-memory store for tests and ephemeral use.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, name: &str) -> BoxFuture<'_, MirrorResult<Option<Vec<u8>>>> {
        let name = name.to_string();
        Box::pin(async move {
            let entries = self
                .entries
                .read()
                .map_err(|err| MirrorError::Storage(err.to_string()))?;
            Ok(entries.get(&name).cloned())
        })
    }

    fn set(&self, name: &str, value: Vec<u8>) -> BoxFuture<'_, MirrorResult<()>> {
        let name = name.to_string();
        Box::pin(async move {
            let mut entries = self
                .entries
                .write()
                .map_err(|err| MirrorError::Storage(err.to_string()))?;
            entries.insert(name, value);
            Ok(())
        })
    }

    fn remove(&self, name: &str) -> BoxFuture<'_, MirrorResult<()>> {
        let name = name.to_string();
        Box::pin(async move {
            let mut entries = self
                .entries
                .write()
                .map_err(|err| MirrorError::Storage(err.to_string()))?;
            entries.remove(&name);
            Ok(())
        })
    }
}

/// Write a board blob to the mirror. Errors are logged, never surfaced.
pub fn mirror_blob<'a>(
    store: &'a dyn KeyValueStore,
    name: &'a str,
    blob: Vec<u8>,
) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        if let Err(err) = store.set(name, blob).await {
            log::warn!("board mirror write for {name} failed: {err}");
        }
    })
}

/// Read a board blob back, `None` when absent or unreadable.
pub fn load_mirror<'a>(store: &'a dyn KeyValueStore, name: &'a str) -> BoxFuture<'a, Option<Vec<u8>>> {
    Box::pin(async move {
        match store.get(name).await {
            Ok(blob) => blob,
            Err(err) => {
                log::warn!("board mirror read for {name} failed: {err}");
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::block_on;

    #[test]
    fn test_set_get_remove_roundtrip() {
        let store = MemoryKeyValueStore::new();
        block_on(store.set("board:1", b"blob".to_vec())).unwrap();
        assert_eq!(
            block_on(store.get("board:1")).unwrap(),
            Some(b"blob".to_vec())
        );
        block_on(store.remove("board:1")).unwrap();
        assert_eq!(block_on(store.get("board:1")).unwrap(), None);
    }

    #[test]
    fn test_mirror_roundtrip_is_best_effort() {
        let store = MemoryKeyValueStore::new();
        block_on(mirror_blob(&store, "board:2", b"snapshot".to_vec()));
        assert_eq!(
            block_on(load_mirror(&store, "board:2")),
            Some(b"snapshot".to_vec())
        );
        assert_eq!(block_on(load_mirror(&store, "missing")), None);
    }
}
