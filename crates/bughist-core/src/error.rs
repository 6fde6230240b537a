//! Error types for `bughist-core`.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::timeline::BugId;

#[derive(Debug, Error)]
pub enum Error {
  #[error("empty interval: from {from} is not before to {to}")]
  EmptyInterval {
    from: DateTime<Utc>,
    to:   DateTime<Utc>,
  },

  /// A version would overlap its neighbour in the timeline.
  #[error(
    "bug #{bug_id}: version [{from}, {to}) overlaps neighbour boundary {boundary}"
  )]
  OutOfOrder {
    bug_id:   BugId,
    from:     DateTime<Utc>,
    to:       DateTime<Utc>,
    boundary: DateTime<Utc>,
  },

  #[error("cannot rebase bug #{incoming} upon bug #{existing}")]
  IdMismatch { incoming: BugId, existing: BugId },

  #[error("bug #{0} has no versions")]
  EmptyTimeline(BugId),

  #[error("bug #{bug_id}: version {number} has no status facet")]
  MissingStatus { bug_id: BugId, number: u64 },

  #[error("bug #{bug_id}: status {status:?} has no major status mapping")]
  UnmappedStatus { bug_id: BugId, status: String },

  /// A status or major status appears more than once in a taxonomy.
  #[error("{0:?} is listed more than once in the status taxonomy")]
  DuplicateStatus(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
