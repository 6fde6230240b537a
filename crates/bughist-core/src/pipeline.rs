//! Per-bug processing: look up, rebase, derive, save.
//!
//! Bugs are processed one after another. A failure affects only the bug it
//! happened on; the batch carries on and reports it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::{
  Error,
  derive::MetricsDeriver,
  observe::Observer,
  rebase::rebase,
  store::{SaveReport, TimelineLookup, TimelineSink},
  taxonomy::StatusTaxonomy,
  timeline::{BugId, Timeline},
};

/// Why a single bug could not be processed.
#[derive(Debug, Error)]
pub enum ProcessError<L, W> {
  /// Broken invariant or unusable data; retrying will not help.
  #[error(transparent)]
  Core(#[from] Error),

  #[error("lookup failed: {0}")]
  Lookup(#[source] L),

  #[error("save failed: {0}")]
  Save(#[source] W),
}

impl<L, W> ProcessError<L, W> {
  /// Storage failures may go away on their own; data errors will not.
  pub fn is_retryable(&self) -> bool { !matches!(self, Self::Core(_)) }
}

// ─── Batch report ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SavedBug {
  pub bug_id: BugId,
  #[serde(flatten)]
  pub report: SaveReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedBug {
  pub bug_id:    BugId,
  pub error:     String,
  pub retryable: bool,
}

/// Outcome of [`Pipeline::process_batch`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
  pub saved:  Vec<SavedBug>,
  pub failed: Vec<FailedBug>,
}

impl BatchReport {
  pub fn is_success(&self) -> bool { self.failed.is_empty() }
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

pub struct Pipeline<'a, L, W> {
  lookup:   &'a L,
  sink:     &'a W,
  deriver:  MetricsDeriver<'a>,
  observer: &'a dyn Observer,
}

impl<'a, L, W> Pipeline<'a, L, W>
where
  L: TimelineLookup,
  W: TimelineSink,
{
  pub fn new(
    lookup: &'a L,
    sink: &'a W,
    taxonomy: &'a StatusTaxonomy,
    observer: &'a dyn Observer,
  ) -> Self {
    Self { lookup, sink, deriver: MetricsDeriver::new(taxonomy), observer }
  }

  /// Process one freshly extracted timeline.
  ///
  /// If the bug was persisted before, the fresh history is rebased onto the
  /// persisted one. Metrics are derived relative to `now`.
  pub async fn process(
    &self,
    mut incoming: Timeline,
    now: DateTime<Utc>,
  ) -> Result<SaveReport, ProcessError<L::Error, W::Error>> {
    let bug_id = incoming.id();

    let existing = self
      .lookup
      .find_timeline(bug_id)
      .await
      .map_err(ProcessError::Lookup)?;
    if let Some(existing) = existing {
      rebase(&mut incoming, existing, self.observer)?;
    }

    self.deriver.apply(&mut incoming, now, self.observer)?;

    let report = self
      .sink
      .save_timeline(&incoming)
      .await
      .map_err(ProcessError::Save)?;
    tracing::info!(
      bug_id,
      mode = ?report.mode,
      inserted = report.inserted,
      updated = report.updated,
      skipped = report.skipped,
      "saved bug"
    );
    Ok(report)
  }

  /// Process every timeline in `batch`, isolating failures per bug.
  pub async fn process_batch(
    &self,
    batch: impl IntoIterator<Item = Timeline>,
    now: DateTime<Utc>,
  ) -> BatchReport {
    let mut report = BatchReport::default();
    for timeline in batch {
      let bug_id = timeline.id();
      match self.process(timeline, now).await {
        Ok(saved) => report.saved.push(SavedBug { bug_id, report: saved }),
        Err(e) => {
          let retryable = e.is_retryable();
          tracing::error!(bug_id, error = %e, retryable, "failed to process bug");
          report.failed.push(FailedBug {
            bug_id,
            error: e.to_string(),
            retryable,
          });
        }
      }
    }
    report
  }
}
