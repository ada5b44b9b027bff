//! In-memory document store.
//!
//! Reference implementation of [`DocumentStore`] backing the test suite:
//! documents live in a process-local map, subscriptions are fed through a
//! per-owner broadcast channel, and a snapshot is pushed after every
//! successful write. Writes can be forced to fail per owner so tests can
//! exercise the partial-failure paths of the fan-out workflows.

use crate::store::{Document, DocumentStore, FieldOp, SnapshotStream, StoreError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use gather_engine::UserId;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

const SNAPSHOT_BUFFER: usize = 64;

#[derive(Default)]
struct Inner {
    docs: HashMap<UserId, Document>,
    senders: HashMap<UserId, broadcast::Sender<Document>>,
    failing_owners: HashSet<UserId>,
}

/// Process-local [`DocumentStore`] with snapshot subscriptions.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force every subsequent write for `owner` to fail with
    /// [`StoreError::Unavailable`]. Reads and subscriptions are unaffected.
    pub fn fail_writes_for(&self, owner: &UserId) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.failing_owners.insert(owner.clone());
    }

    /// Let writes for `owner` succeed again.
    pub fn heal_writes_for(&self, owner: &UserId) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.failing_owners.remove(owner);
    }

    /// Current document of `owner`, empty if never written.
    pub fn document(&self, owner: &UserId) -> Document {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.docs.get(owner).cloned().unwrap_or_default()
    }
}

/// Apply one field op to a document in place. Array ops treat a missing or
/// non-array field as an empty array; union is idempotent, remove deletes
/// every structurally equal element.
fn apply_op(doc: &mut Document, op: FieldOp) {
    match op {
        FieldOp::Set { field, value } => {
            doc.insert(field.to_string(), value);
        }
        FieldOp::ArrayUnion { field, value } => {
            let entry = doc
                .entry(field.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if !entry.is_array() {
                *entry = Value::Array(Vec::new());
            }
            if let Value::Array(items) = entry {
                if !items.contains(&value) {
                    items.push(value);
                }
            }
        }
        FieldOp::ArrayRemove { field, value } => {
            if let Some(Value::Array(items)) = doc.get_mut(field) {
                items.retain(|item| *item != value);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, owner: &UserId) -> Result<Document, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.docs.get(owner).cloned().unwrap_or_default())
    }

    async fn update_fields(&self, owner: &UserId, ops: Vec<FieldOp>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.failing_owners.contains(owner) {
            return Err(StoreError::Unavailable(format!("write to {owner} rejected")));
        }
        let doc = inner.docs.entry(owner.clone()).or_default();
        for op in ops {
            apply_op(doc, op);
        }
        let snapshot = doc.clone();
        if let Some(sender) = inner.senders.get(owner) {
            // Receivers may have gone away; that is not a write failure.
            let _ = sender.send(snapshot);
        }
        Ok(())
    }

    async fn subscribe(&self, owner: &UserId) -> Result<SnapshotStream, StoreError> {
        let (current, receiver) = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let sender = inner
                .senders
                .entry(owner.clone())
                .or_insert_with(|| broadcast::channel(SNAPSHOT_BUFFER).0);
            let receiver = sender.subscribe();
            let current = inner.docs.get(owner).cloned().unwrap_or_default();
            (current, receiver)
        };

        // Initial snapshot first, then live changes. Lagged receivers skip
        // ahead rather than erroring out — every snapshot is a full document,
        // so missing an intermediate one is harmless.
        let live = BroadcastStream::new(receiver).filter_map(|item| async move { item.ok() });
        Ok(stream::iter([current]).chain(live).boxed())
    }
}
