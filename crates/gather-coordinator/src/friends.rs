//! Friend-edge maintenance and friend status reads.
//!
//! Friend edges gate invite eligibility only — adding or removing an edge
//! never touches existing event records.
//!
//! Edges are one-directional: `add_friend` writes only the caller's own
//! `friends` array, so A befriending B does not make B see A unless B adds
//! the edge too. That asymmetry is preserved deployed behavior, not a design
//! endorsement; a symmetric model would need either a second write (with the
//! usual fan-out exposure) or an edge document of its own.

use crate::store::{
    DocumentStore, FieldOp, IdentityProvider, StoreError, FIELD_FRIENDS, FIELD_STATUS,
};
use gather_engine::availability::StatusKind;
use gather_engine::{AvailabilityStatus, UserId};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FriendError {
    /// A user cannot befriend themselves.
    #[error("cannot add yourself as a friend")]
    SelfEdgeRejected,

    /// The operation needs a signed-in user and there is none.
    #[error("no authenticated user")]
    NotAuthenticated,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Friend-edge operations for the signed-in user.
pub struct FriendRoster {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl FriendRoster {
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    fn require_user(&self) -> Result<UserId, FriendError> {
        self.identity
            .current_user_id()
            .ok_or(FriendError::NotAuthenticated)
    }

    /// Add `other` to the caller's own friend list. One-directional; see the
    /// module docs.
    ///
    /// # Errors
    /// [`FriendError::SelfEdgeRejected`] when `other` is the caller.
    pub async fn add_friend(&self, other: &UserId) -> Result<(), FriendError> {
        let user = self.require_user()?;
        if user == *other {
            return Err(FriendError::SelfEdgeRejected);
        }
        self.store
            .update_fields(
                &user,
                vec![FieldOp::ArrayUnion {
                    field: FIELD_FRIENDS,
                    value: Value::String(other.0.clone()),
                }],
            )
            .await?;
        Ok(())
    }

    /// Remove `other` from the caller's own friend list. Removing an edge
    /// that does not exist is a no-op. Past events are untouched.
    pub async fn remove_friend(&self, other: &UserId) -> Result<(), FriendError> {
        let user = self.require_user()?;
        self.store
            .update_fields(
                &user,
                vec![FieldOp::ArrayRemove {
                    field: FIELD_FRIENDS,
                    value: Value::String(other.0.clone()),
                }],
            )
            .await?;
        Ok(())
    }

    /// The caller's friend list. Malformed entries are dropped, not fatal.
    pub async fn friends(&self) -> Result<Vec<UserId>, FriendError> {
        let user = self.require_user()?;
        let doc = self.store.get_document(&user).await?;
        let Some(Value::Array(items)) = doc.get(FIELD_FRIENDS) else {
            return Ok(Vec::new());
        };
        let friends = items
            .iter()
            .filter_map(|item| match item {
                Value::String(id) => Some(UserId::new(id.clone())),
                other => {
                    warn!(?other, "dropping non-string entry from friends array");
                    None
                }
            })
            .collect();
        Ok(friends)
    }

    /// Each friend's last published availability, read from their documents.
    ///
    /// The stored label carries no transition timestamp; a missing or
    /// unknown label reads as free. Friends whose documents cannot be
    /// fetched are skipped rather than failing the whole read.
    pub async fn friend_statuses(&self) -> Result<Vec<(UserId, StatusKind)>, FriendError> {
        let friends = self.friends().await?;
        let mut statuses = Vec::with_capacity(friends.len());
        for friend in friends {
            let kind = match self.store.get_document(&friend).await {
                Ok(doc) => doc
                    .get(FIELD_STATUS)
                    .and_then(Value::as_str)
                    .and_then(AvailabilityStatus::from_label)
                    .unwrap_or(StatusKind::Free),
                Err(error) => {
                    warn!(friend = %friend, %error, "skipping unreachable friend document");
                    continue;
                }
            };
            statuses.push((friend, kind));
        }
        Ok(statuses)
    }
}
