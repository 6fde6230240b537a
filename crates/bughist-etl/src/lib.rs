//! Configuration and input format for the `bughist` binary.
//!
//! The extractor hands over bugs as JSON arrays of [`ExtractedBug`], each
//! with its versions ordered from oldest to newest.

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
};

use bughist_core::{
  pipeline::FailedBug,
  taxonomy::StatusTaxonomy,
  timeline::{BugId, Timeline},
  version::{Interval, Version},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Settings loaded from `bughist.toml` and `BUGHIST_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct EtlConfig {
  /// SQLite file holding persisted timelines. A leading `~/` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub taxonomy:   StatusTaxonomy,
}

fn default_store_path() -> PathBuf { PathBuf::from("bughist.sqlite") }

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Input format ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedVersion {
  pub from:        DateTime<Utc>,
  pub to:          DateTime<Utc>,
  pub modified_by: String,
  #[serde(default)]
  pub annotation:  Option<String>,
  /// Raw facets; must include `status`.
  #[serde(default)]
  pub facets:      BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedBug {
  pub id:       BugId,
  pub reporter: String,
  pub versions: Vec<ExtractedVersion>,
}

impl ExtractedVersion {
  pub fn into_version(self) -> bughist_core::Result<Version> {
    let interval = Interval::new(self.from, self.to)?;
    let mut version = self
      .facets
      .into_iter()
      .fold(Version::new(interval, self.modified_by), |v, (name, value)| {
        v.with_facet(name, value)
      });
    if let Some(annotation) = self.annotation {
      version = version.with_annotation(annotation);
    }
    Ok(version)
  }
}

impl ExtractedBug {
  /// Build a timeline, appending versions in the given order.
  pub fn into_timeline(self) -> bughist_core::Result<Timeline> {
    let mut timeline = Timeline::new(self.id, self.reporter);
    for version in self.versions {
      timeline.append(version.into_version()?)?;
    }
    Ok(timeline)
  }
}

/// Convert extracted bugs into timelines. Bugs with malformed histories are
/// reported as failures instead of aborting the whole input.
pub fn build_timelines(
  bugs: impl IntoIterator<Item = ExtractedBug>,
) -> (Vec<Timeline>, Vec<FailedBug>) {
  let mut timelines = Vec::new();
  let mut failed = Vec::new();
  for bug in bugs {
    let bug_id = bug.id;
    match bug.into_timeline() {
      Ok(timeline) => timelines.push(timeline),
      Err(e) => {
        tracing::error!(bug_id, error = %e, "rejecting extracted history");
        failed.push(FailedBug { bug_id, error: e.to_string(), retryable: false });
      }
    }
  }
  (timelines, failed)
}
