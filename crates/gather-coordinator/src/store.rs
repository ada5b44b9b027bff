//! Collaborator boundary: the remote document store, identity provider, and
//! calendar source the coordinator is written against.
//!
//! The store contract mirrors a per-user document database: one schemaless
//! document per user, atomic per-document field operations (array union /
//! array remove / set), and a subscription that delivers a full-document
//! snapshot on every change. Crucially there is **no** cross-document
//! primitive — the coordinator's fan-out logic is built on that absence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use gather_engine::availability::CalendarInterval;
use gather_engine::UserId;
use serde_json::{Map, Value};
use thiserror::Error;

/// Array field holding a user's own and accepted events.
pub const FIELD_MY_EVENTS: &str = "userEvents";
/// Array field holding events the user has been invited to but not answered.
pub const FIELD_PENDING_EVENTS: &str = "pendingEvents";
/// Array field holding the user's friend edges.
pub const FIELD_FRIENDS: &str = "friends";
/// String field holding the user's last published availability label.
pub const FIELD_STATUS: &str = "status";

/// A user document: a flat, schemaless field map.
pub type Document = Map<String, Value>;

/// Stream of full-document snapshots, one per observed change.
pub type SnapshotStream = BoxStream<'static, Document>;

/// Transport-level failure of a single store call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The remote side could not be reached or rejected the call.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The owner has no document.
    #[error("no document for user {0}")]
    NoSuchDocument(UserId),
}

/// An atomic, per-document, per-field mutation.
///
/// `ArrayUnion` is a no-op when an equal value is already present;
/// `ArrayRemove` removes every element equal to the value. Both treat a
/// missing field as an empty array. Equality is structural over the JSON
/// value, which is why replica updates must remove the *stale* fields before
/// inserting the updated ones.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    ArrayUnion { field: &'static str, value: Value },
    ArrayRemove { field: &'static str, value: Value },
    Set { field: &'static str, value: Value },
}

/// The remote per-user document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the current document of `owner`.
    async fn get_document(&self, owner: &UserId) -> Result<Document, StoreError>;

    /// Apply `ops` to `owner`'s document. All ops in one call land atomically
    /// on that single document; atomicity never spans documents.
    async fn update_fields(&self, owner: &UserId, ops: Vec<FieldOp>) -> Result<(), StoreError>;

    /// Subscribe to `owner`'s document. Delivers a full snapshot after every
    /// change; delivery order across changes is the store's, not the
    /// coordinator's.
    async fn subscribe(&self, owner: &UserId) -> Result<SnapshotStream, StoreError>;
}

/// The authentication collaborator: who is operating right now.
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;
}

/// A fixed identity, for tests and single-user tools.
#[derive(Debug, Clone)]
pub struct StaticIdentity(pub Option<UserId>);

impl StaticIdentity {
    pub fn signed_in(user: impl Into<String>) -> Self {
        Self(Some(UserId::new(user)))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.0.clone()
    }
}

/// The device-calendar collaborator: busy intervals for a user in a window.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn busy_intervals(
        &self,
        user: &UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarInterval>, StoreError>;
}
