//! Collaborator traits for loading and persisting timelines.
//!
//! The traits are implemented by storage backends (e.g.
//! `bughist-store-sqlite`). The [`pipeline`](crate::pipeline) depends on
//! this abstraction, not on any concrete backend.

use std::future::Future;

use serde::Serialize;

use crate::timeline::{BugId, Timeline};

// ─── Save report ─────────────────────────────────────────────────────────────

/// Whether a timeline was written fresh or merged into stored history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveMode {
  /// The bug was never saved before; everything was inserted.
  Insert,
  /// New versions were inserted, dirty ones rewritten, saved ones skipped.
  Update,
}

/// What a sink did with a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveReport {
  pub mode:     SaveMode,
  pub inserted: usize,
  pub updated:  usize,
  pub skipped:  usize,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Looks up previously persisted history.
pub trait TimelineLookup: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The persisted timeline for `id`, with every version marked saved.
  ///
  /// `Ok(None)` means the bug was never persisted. `Err` means the lookup
  /// itself failed and may be retried.
  fn find_timeline(
    &self,
    id: BugId,
  ) -> impl Future<Output = Result<Option<Timeline>, Self::Error>> + Send + '_;
}

/// Accepts finalised timelines for write-through.
pub trait TimelineSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist `timeline`.
  ///
  /// Timelines that were [never saved](Timeline::never_saved) are inserted
  /// whole. Otherwise only new and dirty versions are written.
  fn save_timeline<'a>(
    &'a self,
    timeline: &'a Timeline,
  ) -> impl Future<Output = Result<SaveReport, Self::Error>> + Send + 'a;
}
