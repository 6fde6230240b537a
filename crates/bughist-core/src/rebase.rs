//! Incremental merge of freshly computed history onto persisted history.
//!
//! An incremental update recomputes a bug's history from some cutoff time.
//! The result has to be stitched onto the tail of what was persisted before,
//! without losing persisted versions and without covering any time range
//! twice.

use crate::{
  Error, Result,
  observe::{Observer, TimelineEvent},
  timeline::Timeline,
};

/// Steal all versions of `existing` and put them in front of `incoming`.
///
/// Freshly computed versions that do not start strictly after the most
/// recent persisted version are discarded; this happens when an incremental
/// update is re-run for a start time that an earlier import already covered.
/// The most recent persisted version is then cut off where the surviving
/// fresh history begins.
///
/// Persisted history starting later than the fresh history is reported as
/// [`TimelineEvent::StalePersistedHistory`] and does not stop the merge.
pub fn rebase(
  incoming: &mut Timeline,
  existing: Timeline,
  observer: &dyn Observer,
) -> Result<()> {
  if incoming.id() != existing.id() {
    return Err(Error::IdMismatch {
      incoming: incoming.id(),
      existing: existing.id(),
    });
  }
  let bug_id = incoming.id();
  let Some(existing_latest_at) = existing.last().map(|v| v.from()) else {
    return Err(Error::EmptyTimeline(existing.id()));
  };

  observer.observe(&TimelineEvent::RebaseStarted {
    bug_id,
    incoming: incoming.to_string(),
    existing: existing.to_string(),
  });

  if let Some(incoming_latest_at) = incoming.last().map(|v| v.from())
    && existing_latest_at > incoming_latest_at
  {
    observer.observe(&TimelineEvent::StalePersistedHistory {
      bug_id,
      existing_latest_at,
      incoming_latest_at,
    });
  }

  while let Some(first) = incoming.versions.front()
    && first.from() <= existing_latest_at
  {
    observer.observe(&TimelineEvent::DiscardedOverlap {
      bug_id,
      interval: first.interval(),
    });
    incoming.versions.pop_front();
  }

  let join_at = incoming.first().map(|v| v.from());
  for (i, version) in existing.versions.into_iter().rev().enumerate() {
    let version = match join_at {
      Some(join_at) if i == 0 => {
        let stitched = version.update(join_at)?;
        observer.observe(&TimelineEvent::Stitched {
          bug_id,
          from: version.from(),
          previous_to: version.to(),
          to: join_at,
        });
        stitched
      }
      _ => version,
    };
    incoming.prepend(version)?;
  }

  observer.observe(&TimelineEvent::RebaseFinished {
    bug_id,
    result: incoming.to_string(),
  });
  Ok(())
}
