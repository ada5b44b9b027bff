//! Create/respond workflows and snapshot reconciliation.
//!
//! Every operation here is a thin state machine over independent per-replica
//! writes. The store offers no cross-document atomicity, so a logical change
//! ("P1 accepted") becomes several single-document writes that may land in
//! any order or partially fail. The coordinator reports each leg's outcome
//! through [`FanOut`] instead of pretending there is a single verdict, and it
//! never retries on its own — retry policy belongs to the caller.
//!
//! The read path is the other half of the bargain: reconciliation re-parses a
//! user's whole document on every snapshot and republishes the event lists
//! wholesale, making observation idempotent and independent of notification
//! order. Records that fail to decode are dropped and logged, never fatal.

use crate::error::CoordinatorError;
use crate::store::{
    CalendarSource, Document, DocumentStore, FieldOp, IdentityProvider, StoreError,
    FIELD_MY_EVENTS, FIELD_PENDING_EVENTS, FIELD_STATUS,
};
use chrono::{DateTime, Utc};
use futures::future;
use gather_engine::availability::derive_status;
use gather_engine::{AvailabilityStatus, EventId, EventRecord, UserId};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Caller-supplied fields of a new event. The id, creation time, and roster
/// are minted by the coordinator.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub title: String,
    pub location: String,
    pub description: String,
    pub duration_seconds: u64,
    /// Users to invite. The creator is filtered out if present.
    pub invitees: Vec<UserId>,
}

/// One failed leg of a fan-out. `field` is the array the leg was inserting
/// into on `owner`'s document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedWrite {
    pub owner: UserId,
    pub field: &'static str,
    pub error: StoreError,
}

/// Outcome of a multi-replica write. A fan-out where every leg failed is
/// still `PartiallyFailed` carrying all legs; callers retry individual legs
/// if they want to — the coordinator never does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanOut {
    AllSucceeded,
    PartiallyFailed(Vec<FailedWrite>),
}

impl FanOut {
    fn from_failures(failures: Vec<FailedWrite>) -> Self {
        if failures.is_empty() {
            FanOut::AllSucceeded
        } else {
            FanOut::PartiallyFailed(failures)
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, FanOut::AllSucceeded)
    }

    pub fn failures(&self) -> &[FailedWrite] {
        match self {
            FanOut::AllSucceeded => &[],
            FanOut::PartiallyFailed(failures) => failures,
        }
    }
}

/// The published view of one user's replicas, sorted newest-first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventLists {
    /// Events the user created or accepted (plus denied ones they responded
    /// to — a response moves the record out of pending either way).
    pub my_events: Vec<EventRecord>,
    /// Invitations awaiting the user's response.
    pub pending_events: Vec<EventRecord>,
}

/// A live feed of one user's reconciled event lists.
///
/// Holds the reconciler task; dropping the feed stops reconciliation. The
/// lists are published through a watch channel: single writer (the
/// reconciler), any number of readers.
pub struct EventFeed {
    receiver: watch::Receiver<EventLists>,
    task: JoinHandle<()>,
}

impl EventFeed {
    /// The most recently published lists.
    pub fn lists(&self) -> EventLists {
        self.receiver.borrow().clone()
    }

    /// A new independent reader of the published lists.
    pub fn subscribe(&self) -> watch::Receiver<EventLists> {
        self.receiver.clone()
    }

    /// Wait until the next publish. Returns `false` once the feed is closed.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }
}

impl Drop for EventFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Source of "now" for freshly created records. Injectable for tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Orchestrates event creation, responses, and reconciliation over the
/// injected store and identity collaborators.
pub struct EventCoordinator {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    clock: Clock,
}

impl EventCoordinator {
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            store,
            identity,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the creation-time source. Tests pin this for deterministic
    /// ordering.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn require_user(&self) -> Result<UserId, CoordinatorError> {
        self.identity
            .current_user_id()
            .ok_or(CoordinatorError::NotAuthenticated)
    }

    /// Create an event and fan it out: the full record goes into the
    /// creator's `userEvents` and into each invitee's `pendingEvents`.
    ///
    /// The legs are independent single-document writes issued concurrently;
    /// there is no ordering between them and no rollback. A participant may
    /// observe the invitation before the creator's own list catches up, or a
    /// leg may fail while the others land — both are reported, not hidden.
    ///
    /// # Errors
    /// [`CoordinatorError::NotAuthenticated`] when no user is signed in.
    /// Individual write failures are returned inside the [`FanOut`], not as
    /// an error.
    pub async fn create_event(
        &self,
        draft: EventDraft,
    ) -> Result<(EventRecord, FanOut), CoordinatorError> {
        let creator = self.require_user()?;
        let record = EventRecord::new(
            EventId::new(Uuid::new_v4().to_string()),
            draft.title,
            draft.location,
            draft.description,
            draft.duration_seconds,
            creator.clone(),
            (self.clock)(),
            draft.invitees,
        );
        let fields = Value::Object(record.to_storage_fields());

        let mut legs = Vec::with_capacity(1 + record.roster.len());
        legs.push(self.write_leg(
            creator,
            FIELD_MY_EVENTS,
            vec![FieldOp::ArrayUnion {
                field: FIELD_MY_EVENTS,
                value: fields.clone(),
            }],
        ));
        for participant in record.roster.pending() {
            legs.push(self.write_leg(
                participant,
                FIELD_PENDING_EVENTS,
                vec![FieldOp::ArrayUnion {
                    field: FIELD_PENDING_EVENTS,
                    value: fields.clone(),
                }],
            ));
        }

        let failures: Vec<FailedWrite> = future::join_all(legs)
            .await
            .into_iter()
            .flatten()
            .collect();
        Ok((record, FanOut::from_failures(failures)))
    }

    /// Respond to a pending invitation as the signed-in user.
    ///
    /// Loads the user's own pending replica of the event, re-reads the
    /// creator's replica for the freshest roster (other participants'
    /// responses land there, never on this user's copy), applies the
    /// transition, then issues two independent writes: the participant's own
    /// pending → responded move, and the remove-stale-insert-updated swap on
    /// the creator's replica. Either leg can fail or land first; see
    /// [`FanOut`].
    ///
    /// # Errors
    /// - [`CoordinatorError::NotAuthenticated`] with no signed-in user.
    /// - [`CoordinatorError::Store`] when the user's own replica cannot be
    ///   loaded at all.
    /// - [`CoordinatorError::UnknownEvent`] when `event_id` is not among the
    ///   user's pending invitations.
    /// - [`CoordinatorError::Roster`] when the transition itself is invalid
    ///   against the freshest roster. Nothing is written on any error.
    pub async fn respond(
        &self,
        event_id: &EventId,
        accept: bool,
    ) -> Result<(EventRecord, FanOut), CoordinatorError> {
        let user = self.require_user()?;

        let doc = self.store.get_document(&user).await?;
        let own_stale = parse_event_array(&doc, FIELD_PENDING_EVENTS)
            .into_iter()
            .find(|record| record.id == *event_id)
            .ok_or_else(|| CoordinatorError::UnknownEvent(event_id.clone()))?;

        // The roster on our own invitation copy is frozen at creation time.
        // The creator's replica accumulates everyone's responses, so base the
        // transition on it when it can be read; fall back to our copy when
        // the creator's side is unreachable or has lost the record.
        let base = match self.store.get_document(&own_stale.creator_id).await {
            Ok(creator_doc) => parse_event_array(&creator_doc, FIELD_MY_EVENTS)
                .into_iter()
                .find(|record| record.id == *event_id)
                .unwrap_or_else(|| own_stale.clone()),
            Err(error) => {
                warn!(
                    creator = %own_stale.creator_id, %error,
                    "creator replica unreadable, responding against own copy"
                );
                own_stale.clone()
            }
        };

        let mut updated = base.clone();
        updated.roster.respond(&user, accept)?;

        let own_stale_fields = Value::Object(own_stale.to_storage_fields());
        let base_fields = Value::Object(base.to_storage_fields());
        let updated_fields = Value::Object(updated.to_storage_fields());

        // Leg 1: the participant's own split — out of pending, into their
        // events list whether accepted or denied (a response is a response).
        let own_leg = self.write_leg(
            user,
            FIELD_MY_EVENTS,
            vec![
                FieldOp::ArrayRemove {
                    field: FIELD_PENDING_EVENTS,
                    value: own_stale_fields,
                },
                FieldOp::ArrayUnion {
                    field: FIELD_MY_EVENTS,
                    value: updated_fields.clone(),
                },
            ],
        );

        // Leg 2: the creator's replica, swapped against the exact value we
        // read. A concurrent response between our read and this write makes
        // the remove miss and leaves two copies until a later response swaps
        // against the winner — the documented cost of no cross-document
        // transactions.
        let creator_leg = self.write_leg(
            updated.creator_id.clone(),
            FIELD_MY_EVENTS,
            vec![
                FieldOp::ArrayRemove {
                    field: FIELD_MY_EVENTS,
                    value: base_fields,
                },
                FieldOp::ArrayUnion {
                    field: FIELD_MY_EVENTS,
                    value: updated_fields,
                },
            ],
        );

        let (own, creator) = future::join(own_leg, creator_leg).await;
        let failures: Vec<FailedWrite> = [own, creator].into_iter().flatten().collect();
        Ok((updated, FanOut::from_failures(failures)))
    }

    /// Start reconciling `user`'s document into a published [`EventFeed`].
    ///
    /// Every delivered snapshot is re-parsed from scratch and replaces the
    /// published lists wholesale — no field-level diffing, so delivery order
    /// and duplicate snapshots cannot corrupt the view.
    pub async fn watch_events(&self, user: &UserId) -> Result<EventFeed, CoordinatorError> {
        let mut snapshots = self.store.subscribe(user).await?;
        let (sender, receiver) = watch::channel(EventLists::default());
        let user = user.clone();

        let task = tokio::spawn(async move {
            while let Some(doc) = snapshots.next().await {
                let lists = reconcile_snapshot(&doc);
                debug!(
                    user = %user,
                    my_events = lists.my_events.len(),
                    pending = lists.pending_events.len(),
                    "published reconciled event lists"
                );
                if sender.send(lists).is_err() {
                    break;
                }
            }
        });

        Ok(EventFeed { receiver, task })
    }

    /// Recompute `user`'s availability from the calendar source and publish
    /// its label into the `status` field of their document.
    ///
    /// The window queried is `now ..= now + lookahead`; sources are expected
    /// to return every interval overlapping the window, including ones that
    /// started before it. A lookahead past the end of representable time
    /// saturates to the maximum instant.
    pub async fn refresh_status(
        &self,
        user: &UserId,
        calendar: &dyn CalendarSource,
        now: DateTime<Utc>,
        lookahead: chrono::Duration,
        lead_seconds: i64,
    ) -> Result<AvailabilityStatus, CoordinatorError> {
        let to = now
            .checked_add_signed(lookahead)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let intervals = calendar.busy_intervals(user, now, to).await?;
        let status = derive_status(&intervals, now, lead_seconds);
        self.store
            .update_fields(
                user,
                vec![FieldOp::Set {
                    field: FIELD_STATUS,
                    value: Value::String(status.label().to_string()),
                }],
            )
            .await?;
        Ok(status)
    }

    /// One fan-out leg: a single-document write, mapped to an optional
    /// [`FailedWrite`] and logged on failure.
    async fn write_leg(
        &self,
        owner: UserId,
        field: &'static str,
        ops: Vec<FieldOp>,
    ) -> Option<FailedWrite> {
        match self.store.update_fields(&owner, ops).await {
            Ok(()) => None,
            Err(error) => {
                warn!(owner = %owner, field, %error, "fan-out leg failed");
                Some(FailedWrite { owner, field, error })
            }
        }
    }
}

/// Reconcile a raw document snapshot into sorted event lists.
///
/// Pure: parses `userEvents` and `pendingEvents` independently, drops every
/// record that fails to decode (logged at warn), and sorts both lists newest
/// first with id as the tiebreak.
pub fn reconcile_snapshot(doc: &Document) -> EventLists {
    let mut my_events = parse_event_array(doc, FIELD_MY_EVENTS);
    let mut pending_events = parse_event_array(doc, FIELD_PENDING_EVENTS);
    my_events.sort_by(EventRecord::list_order);
    pending_events.sort_by(EventRecord::list_order);
    EventLists {
        my_events,
        pending_events,
    }
}

/// Decode one stored event array, defensively: a missing or non-array field
/// is an empty list, and malformed elements are skipped rather than failing
/// the whole snapshot.
fn parse_event_array(doc: &Document, field: &'static str) -> Vec<EventRecord> {
    let Some(Value::Array(items)) = doc.get(field) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let Value::Object(fields) = item else {
                warn!(field, "dropping non-object entry from stored event array");
                return None;
            };
            match EventRecord::from_storage_fields(fields) {
                Ok(record) => Some(record),
                Err(error) => {
                    warn!(field, %error, "dropping unparsable stored event");
                    None
                }
            }
        })
        .collect()
}
