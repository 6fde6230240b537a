//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings so that text order
//! equals chronological order. Facets and derived attributes are stored as
//! compact JSON.

use std::collections::BTreeMap;

use bughist_core::{
  timeline::BugId,
  version::{DerivedAttributes, Interval, PersistenceState, Version},
};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

// ─── BugId ───────────────────────────────────────────────────────────────────

pub fn encode_bug_id(id: BugId) -> Result<i64> {
  i64::try_from(id).map_err(|_| Error::BugIdOutOfRange(id))
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read from or written to a `versions` row.
pub struct RawVersion {
  pub valid_from:  String,
  pub valid_to:    String,
  pub modified_by: String,
  pub annotation:  Option<String>,
  pub facets:      String,
  pub derived:     Option<String>,
}

impl RawVersion {
  pub fn from_version(version: &Version) -> Result<Self> {
    Ok(Self {
      valid_from:  encode_dt(version.from()),
      valid_to:    encode_dt(version.to()),
      modified_by: version.modified_by().to_owned(),
      annotation:  version.annotation().map(str::to_owned),
      facets:      serde_json::to_string(version.raw_facets())?,
      derived:     version.derived().map(serde_json::to_string).transpose()?,
    })
  }

  /// Rehydrate a stored version. Stored versions are always
  /// [`PersistenceState::Saved`].
  pub fn into_version(self) -> Result<Version> {
    let interval =
      Interval::new(decode_dt(&self.valid_from)?, decode_dt(&self.valid_to)?)?;
    let facets: BTreeMap<String, String> = serde_json::from_str(&self.facets)?;
    let derived: Option<DerivedAttributes> = self
      .derived
      .as_deref()
      .map(serde_json::from_str)
      .transpose()?;

    let mut version = facets
      .into_iter()
      .fold(Version::new(interval, self.modified_by), |v, (name, value)| {
        v.with_facet(name, value)
      })
      .with_state(PersistenceState::Saved);
    if let Some(annotation) = self.annotation {
      version = version.with_annotation(annotation);
    }
    if let Some(derived) = derived {
      version = version.with_derived(derived);
    }
    Ok(version)
  }
}
