//! Structured diagnostics for merge and derivation.
//!
//! The algorithms report what they do through an injected [`Observer`]
//! instead of logging directly. [`TracingObserver`] forwards events to
//! `tracing`; tests plug in a recorder and assert on the events.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{timeline::BugId, version::Interval};

/// Something noteworthy that happened while processing a bug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimelineEvent {
  /// A rebase is starting. Timelines are rendered with their
  /// persistence-state summary.
  RebaseStarted {
    bug_id:   BugId,
    incoming: String,
    existing: String,
  },
  /// The persisted history starts later than the freshly computed one.
  StalePersistedHistory {
    bug_id:             BugId,
    existing_latest_at: DateTime<Utc>,
    incoming_latest_at: DateTime<Utc>,
  },
  /// A freshly computed version was already covered by persisted history.
  DiscardedOverlap {
    bug_id:   BugId,
    #[serde(serialize_with = "serialize_interval")]
    interval: Interval,
  },
  /// The most recent persisted version was cut off at the join point.
  Stitched {
    bug_id:      BugId,
    from:        DateTime<Utc>,
    previous_to: DateTime<Utc>,
    to:          DateTime<Utc>,
  },
  RebaseFinished { bug_id: BugId, result: String },
  /// Metrics were attached to every version.
  Derived { bug_id: BugId, versions: usize },
}

fn serialize_interval<S: serde::Serializer>(
  interval: &Interval,
  serializer: S,
) -> Result<S::Ok, S::Error> {
  serializer.collect_str(interval)
}

/// Receives [`TimelineEvent`]s.
pub trait Observer: Send + Sync {
  fn observe(&self, event: &TimelineEvent);
}

/// Forwards events to `tracing`. Stale history is a warning, everything else
/// is debug output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
  fn observe(&self, event: &TimelineEvent) {
    match event {
      TimelineEvent::RebaseStarted { bug_id, incoming, existing } => {
        tracing::debug!(bug_id, %incoming, %existing, "rebase");
      }
      TimelineEvent::StalePersistedHistory {
        bug_id,
        existing_latest_at,
        incoming_latest_at,
      } => {
        tracing::warn!(
          bug_id,
          %existing_latest_at,
          %incoming_latest_at,
          "persistent version of bug newer than version to import"
        );
      }
      TimelineEvent::DiscardedOverlap { bug_id, interval } => {
        tracing::debug!(bug_id, %interval, "discarding already persisted version");
      }
      TimelineEvent::Stitched { bug_id, from, previous_to, to } => {
        tracing::debug!(bug_id, %from, %previous_to, %to, "stitched boundary");
      }
      TimelineEvent::RebaseFinished { bug_id, result } => {
        tracing::debug!(bug_id, %result, "rebased");
      }
      TimelineEvent::Derived { bug_id, versions } => {
        tracing::debug!(bug_id, versions, "derived metrics");
      }
    }
  }
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl Observer for NullObserver {
  fn observe(&self, _event: &TimelineEvent) {}
}
