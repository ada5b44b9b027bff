//! Participant response rosters — the pending/accepted/denied partition.
//!
//! The source of truth is a single `BTreeMap<UserId, ResponseState>` rather
//! than three parallel arrays, so an invitee structurally cannot appear in
//! two response sets or in none. The three set views are derived on demand;
//! the wire format (three arrays) is produced only at the codec boundary in
//! [`crate::record`].

use crate::error::RosterError;
use crate::ids::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Response state of a single invitee. `Pending` transitions exactly once,
/// to `Accepted` or `Denied`; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseState {
    Pending,
    Accepted,
    Denied,
}

/// The partition of an event's invitee set by response state.
///
/// Membership is fixed at construction — invitations cannot be added or
/// revoked after the fact. Only response states change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRoster {
    states: BTreeMap<UserId, ResponseState>,
}

impl ParticipantRoster {
    /// Build a roster with every invitee pending. Duplicate ids collapse.
    pub fn new(participant_ids: impl IntoIterator<Item = UserId>) -> Self {
        let states = participant_ids
            .into_iter()
            .map(|id| (id, ResponseState::Pending))
            .collect();
        Self { states }
    }

    /// Rebuild a roster from the three wire arrays. Used by the codec; does
    /// not check disjointness (later arrays win on duplicates) — the codec
    /// validates the partition before calling this.
    pub(crate) fn from_parts(
        pending: impl IntoIterator<Item = UserId>,
        accepted: impl IntoIterator<Item = UserId>,
        denied: impl IntoIterator<Item = UserId>,
    ) -> Self {
        let mut states = BTreeMap::new();
        for id in pending {
            states.insert(id, ResponseState::Pending);
        }
        for id in accepted {
            states.insert(id, ResponseState::Accepted);
        }
        for id in denied {
            states.insert(id, ResponseState::Denied);
        }
        Self { states }
    }

    /// Record a participant's response, moving them out of pending.
    ///
    /// # Errors
    /// - [`RosterError::NotAParticipant`] if `user` was never invited.
    /// - [`RosterError::AlreadyResponded`] if `user` is no longer pending.
    ///
    /// The roster is unchanged on every error path.
    pub fn respond(&mut self, user: &UserId, accept: bool) -> Result<(), RosterError> {
        match self.states.get_mut(user) {
            None => Err(RosterError::NotAParticipant(user.clone())),
            Some(state) => match state {
                ResponseState::Pending => {
                    *state = if accept {
                        ResponseState::Accepted
                    } else {
                        ResponseState::Denied
                    };
                    Ok(())
                }
                _ => Err(RosterError::AlreadyResponded(user.clone())),
            },
        }
    }

    /// True once no invitee is pending.
    pub fn is_fully_resolved(&self) -> bool {
        !self
            .states
            .values()
            .any(|s| *s == ResponseState::Pending)
    }

    /// Response state of a single user, if they are a participant at all.
    pub fn state_of(&self, user: &UserId) -> Option<ResponseState> {
        self.states.get(user).copied()
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.states.contains_key(user)
    }

    /// All invitees, sorted.
    pub fn participants(&self) -> Vec<UserId> {
        self.states.keys().cloned().collect()
    }

    /// Invitees currently in the given state, sorted.
    pub fn in_state(&self, state: ResponseState) -> Vec<UserId> {
        self.states
            .iter()
            .filter(|(_, s)| **s == state)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn pending(&self) -> Vec<UserId> {
        self.in_state(ResponseState::Pending)
    }

    pub fn accepted(&self) -> Vec<UserId> {
        self.in_state(ResponseState::Accepted)
    }

    pub fn denied(&self) -> Vec<UserId> {
        self.in_state(ResponseState::Denied)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
