//! Availability derivation — busy intervals + clock → live status.
//!
//! A user's status is never stored authoritatively; it is a snapshot value
//! recomputed from the busy intervals their calendar reports. The derivation
//! is a single scan, deliberately order-insensitive so callers can pass
//! intervals straight from the calendar source without sorting.
//!
//! Boundary semantics are inclusive on both ends: at the exact start or the
//! exact end of an interval the user counts as busy, never almost-busy.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lead time before a busy interval during which the user is reported as
/// almost-busy rather than free. Thirty minutes.
pub const DEFAULT_ALMOST_BUSY_LEAD_SECONDS: i64 = 1800;

/// A busy interval supplied by the external calendar source.
///
/// `start <= end` is assumed; zero-length intervals are valid and count as
/// busy at the single instant they cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Derived live status of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvailabilityStatus {
    /// No current or imminent busy interval.
    Free,
    /// A busy interval starts within the lead window. `changes_at` is the
    /// start of the nearest such interval.
    AlmostBusy { changes_at: DateTime<Utc> },
    /// Inside at least one busy interval. `changes_at` is the latest end
    /// among the intervals containing now — busy until the last one concludes.
    Busy { changes_at: DateTime<Utc> },
}

impl AvailabilityStatus {
    /// The wire label stored in a user document's `status` field.
    pub fn label(&self) -> &'static str {
        match self {
            AvailabilityStatus::Free => "Available",
            AvailabilityStatus::AlmostBusy { .. } => "Free Soon",
            AvailabilityStatus::Busy { .. } => "Busy",
        }
    }

    /// Parse a stored wire label. The `changes_at` component is not stored,
    /// so busy and almost-busy come back without one — callers that need the
    /// transition time must re-derive from intervals.
    pub fn from_label(label: &str) -> Option<StatusKind> {
        match label {
            "Available" => Some(StatusKind::Free),
            "Free Soon" => Some(StatusKind::AlmostBusy),
            "Busy" => Some(StatusKind::Busy),
            _ => None,
        }
    }
}

/// Status discriminant without the transition timestamp, as round-tripped
/// through the stored `status` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    Free,
    AlmostBusy,
    Busy,
}

/// Derive a user's live status from their busy intervals.
///
/// Scans the intervals in any order. Busy wins over almost-busy, which wins
/// over free:
///
/// - Busy when `start <= now <= end` for any interval; `changes_at` is the
///   latest `end` among all intervals containing `now` (overlapping meetings
///   keep the user busy until the last one ends).
/// - Almost-busy when `start - lead <= now < start` for any interval;
///   `changes_at` is the earliest such upcoming `start`.
/// - Free otherwise.
///
/// Pure, deterministic, total — there are no error cases. Lead values too
/// large to represent saturate: the almost-busy window then reaches back to
/// the beginning of time instead of overflowing.
///
/// # Arguments
/// - `intervals` — busy intervals from the calendar source, any order
/// - `now` — the instant to evaluate
/// - `lead_seconds` — almost-busy lead window; see
///   [`DEFAULT_ALMOST_BUSY_LEAD_SECONDS`]
pub fn derive_status(
    intervals: &[CalendarInterval],
    now: DateTime<Utc>,
    lead_seconds: i64,
) -> AvailabilityStatus {
    let lead = Duration::try_seconds(lead_seconds).unwrap_or(Duration::MAX);

    let mut busy_until: Option<DateTime<Utc>> = None;
    let mut next_start: Option<DateTime<Utc>> = None;

    for interval in intervals {
        let lead_window_reaches_now = interval
            .start
            .checked_sub_signed(lead)
            .map_or(true, |from| from <= now);
        if interval.start <= now && now <= interval.end {
            busy_until = Some(match busy_until {
                Some(end) => end.max(interval.end),
                None => interval.end,
            });
        } else if lead_window_reaches_now && now < interval.start {
            next_start = Some(match next_start {
                Some(start) => start.min(interval.start),
                None => interval.start,
            });
        }
    }

    if let Some(changes_at) = busy_until {
        AvailabilityStatus::Busy { changes_at }
    } else if let Some(changes_at) = next_start {
        AvailabilityStatus::AlmostBusy { changes_at }
    } else {
        AvailabilityStatus::Free
    }
}
