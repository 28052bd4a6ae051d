//! JSON-Patch-style operations over a board-data root.
//!
//! Used for both local durable persistence and remote synchronization with
//! an optimistic-concurrency token. Application is idempotent: replaying a
//! `replace` or `remove` yields the same state, and removing a missing path
//! is a no-op rather than an error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Patch operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOpKind {
    Add,
    Replace,
    Remove,
}

/// One patch operation against the board-data root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: PatchOpKind,
    /// Slash-separated path from the root, e.g. `/meta/title`.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOp {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOpKind::Add,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOpKind::Replace,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOpKind::Remove,
            path: path.into(),
            value: None,
        }
    }

    fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }
}

/// Apply one operation in place.
pub fn apply_patch(root: &mut Value, op: &PatchOp) {
    let segments = op.segments();
    let Some((leaf, parents)) = segments.split_last() else {
        // Whole-root patch: only add/replace make sense.
        if let Some(value) = &op.value {
            if op.op != PatchOpKind::Remove {
                *root = value.clone();
            }
        }
        return;
    };

    // Walk to the parent object, creating intermediate objects for add.
    let mut target = root;
    for segment in parents {
        let create = op.op == PatchOpKind::Add;
        let object = match target {
            Value::Object(map) => map,
            _ => return,
        };
        if !object.contains_key(*segment) {
            if !create {
                // Replace/remove of a missing path is a no-op.
                return;
            }
            object.insert((*segment).to_string(), Value::Object(Map::new()));
        }
        target = match object.get_mut(*segment) {
            Some(value) => value,
            None => return,
        };
    }

    let Value::Object(parent) = target else {
        return;
    };
    match op.op {
        PatchOpKind::Add => {
            if let Some(value) = &op.value {
                parent.insert((*leaf).to_string(), value.clone());
            }
        }
        PatchOpKind::Replace => {
            if let Some(value) = &op.value {
                // Replace degrades to add when the key is new; the remote
                // authority treats them alike.
                parent.insert((*leaf).to_string(), value.clone());
            }
        }
        PatchOpKind::Remove => {
            parent.remove(*leaf);
        }
    }
}

/// Apply an ordered batch.
pub fn apply_patches(root: &mut Value, ops: &[PatchOp]) {
    for op in ops {
        apply_patch(root, op);
    }
}

/// Per-field ops turning `current` into `current` shallow-merged with
/// `partial`. A `null` in the partial removes the field.
pub fn diff_shallow(current: &Value, partial: &Map<String, Value>) -> Vec<PatchOp> {
    let empty = Map::new();
    let existing = current.as_object().unwrap_or(&empty);
    let mut ops = Vec::new();
    for (key, value) in partial {
        let path = format!("/{key}");
        if value.is_null() {
            if existing.contains_key(key) {
                ops.push(PatchOp::remove(path));
            }
        } else if let Some(old) = existing.get(key) {
            if old != value {
                ops.push(PatchOp::replace(path, value.clone()));
            }
        } else {
            ops.push(PatchOp::add(path, value.clone()));
        }
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_creates_nested_path() {
        let mut root = json!({});
        apply_patch(&mut root, &PatchOp::add("/meta/title", json!("board")));
        assert_eq!(root, json!({"meta": {"title": "board"}}));
    }

    #[test]
    fn test_replace_is_idempotent() {
        let mut root = json!({"title": "old"});
        let op = PatchOp::replace("/title", json!("new"));
        apply_patch(&mut root, &op);
        let once = root.clone();
        apply_patch(&mut root, &op);
        assert_eq!(root, once);
        assert_eq!(root, json!({"title": "new"}));
    }

    #[test]
    fn test_remove_is_idempotent_and_tolerates_missing_paths() {
        let mut root = json!({"a": 1, "b": 2});
        let op = PatchOp::remove("/a");
        apply_patch(&mut root, &op);
        let once = root.clone();
        // Second application: no-op, not an error.
        apply_patch(&mut root, &op);
        assert_eq!(root, once);
        // Remove of a never-existing nested path is also a no-op.
        apply_patch(&mut root, &PatchOp::remove("/x/y/z"));
        assert_eq!(root, json!({"b": 2}));
    }

    #[test]
    fn test_replace_missing_parent_is_noop() {
        let mut root = json!({"a": 1});
        apply_patch(&mut root, &PatchOp::replace("/missing/field", json!(1)));
        assert_eq!(root, json!({"a": 1}));
    }

    #[test]
    fn test_diff_shallow_produces_minimal_ops() {
        let current = json!({"title": "t", "zoom": 1.0, "stale": true});
        let mut partial = Map::new();
        partial.insert("title".to_string(), json!("t")); // unchanged
        partial.insert("zoom".to_string(), json!(2.0)); // changed
        partial.insert("fresh".to_string(), json!("x")); // new
        partial.insert("stale".to_string(), Value::Null); // removed
        let mut ops = diff_shallow(&current, &partial);
        ops.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(
            ops,
            vec![
                PatchOp::add("/fresh", json!("x")),
                PatchOp::remove("/stale"),
                PatchOp::replace("/zoom", json!(2.0)),
            ]
        );
    }

    #[test]
    fn test_diff_then_apply_reaches_target() {
        let current = json!({"a": 1, "b": 2});
        let mut partial = Map::new();
        partial.insert("b".to_string(), json!(3));
        partial.insert("c".to_string(), json!([1, 2]));
        let ops = diff_shallow(&current, &partial);
        let mut next = current.clone();
        apply_patches(&mut next, &ops);
        assert_eq!(next, json!({"a": 1, "b": 3, "c": [1, 2]}));
    }

    #[test]
    fn test_op_wire_shape() {
        let op = PatchOp::replace("/zoom", json!(2.0));
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"op\":\"replace\""));
        assert!(json.contains("\"path\":\"/zoom\""));
        let remove = serde_json::to_string(&PatchOp::remove("/a")).unwrap();
        assert!(!remove.contains("value"));
    }
}
