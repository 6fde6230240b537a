//! Version types: the time-bounded snapshots that make up a bug's history.
//!
//! A version is immutable once built. The only sanctioned change is
//! [`Version::update`], which produces a copy with a new upper boundary and
//! is used when stitching persisted history to freshly extracted history.
//! Derived metrics live in a separate [`DerivedAttributes`] record attached
//! after the fact.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;

use crate::{Error, Result};

/// Value used for inapplicable measurements in the external representation.
pub const NOT_APPLICABLE: i64 = -1;

// ─── Interval ────────────────────────────────────────────────────────────────

/// A non-empty half-open time range `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
  from: DateTime<Utc>,
  to:   DateTime<Utc>,
}

impl Interval {
  pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
    if from >= to {
      return Err(Error::EmptyInterval { from, to });
    }
    Ok(Self { from, to })
  }

  pub fn from(&self) -> DateTime<Utc> { self.from }

  pub fn to(&self) -> DateTime<Utc> { self.to }

  pub fn duration(&self) -> TimeDelta { self.to - self.from }

  /// Same start, new end. Fails if the result would be empty.
  pub fn with_to(&self, to: DateTime<Utc>) -> Result<Self> {
    Self::new(self.from, to)
  }
}

impl fmt::Display for Interval {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{}, {})", self.from.to_rfc3339(), self.to.to_rfc3339())
  }
}

// ─── Persistence state ───────────────────────────────────────────────────────

/// Whether a version has been written by the persistence layer.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceState {
  /// Computed locally, never persisted.
  #[default]
  New,
  /// Loaded from storage, then modified.
  Dirty,
  /// Loaded from storage and unchanged since.
  Saved,
}

impl PersistenceState {
  /// One-character rendering used in timeline diagnostics.
  pub fn symbol(self) -> char {
    match self {
      Self::Saved => '.',
      Self::Dirty => '#',
      Self::New => '*',
    }
  }

  /// The state a version moves to when its content changes.
  fn modified(self) -> Self {
    match self {
      Self::New => Self::New,
      Self::Dirty | Self::Saved => Self::Dirty,
    }
  }
}

// ─── Field identifiers ───────────────────────────────────────────────────────

/// Categorical fields known to the core. Other facets are carried through
/// untouched under whatever name the extractor gave them.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  strum::AsRefStr,
  strum::Display,
  strum::EnumIter,
  strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Facet {
  /// Raw status, supplied by the extractor.
  Status,
  MajorStatus,
  PreviousStatus,
  PreviousMajorStatus,
}

/// Numeric fields computed by the metrics pass.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  strum::AsRefStr,
  strum::Display,
  strum::EnumIter,
  strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Measurement {
  DaysInPreviousStatus,
  DaysInPreviousMajorStatus,
  DaysInStatus,
  DaysInMajorStatus,
  DaysOpenAccumulated,
  TimesReopened,
  Number,
}

// ─── Derived attributes ──────────────────────────────────────────────────────

/// Everything the metrics pass computes for one version.
///
/// Inapplicable values are `None`; [`DerivedAttributes::measurement`] maps
/// them to [`NOT_APPLICABLE`] for consumers that expect the numeric
/// convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedAttributes {
  /// 1-based position within the timeline.
  pub number:                        u64,
  pub major_status:                  String,
  /// `None` on the first version.
  pub previous_status:               Option<String>,
  /// `None` on the first version.
  pub previous_major_status:         Option<String>,
  /// Only set on versions that change the status.
  pub days_in_previous_status:       Option<i64>,
  /// Only set on versions that change the major status.
  pub days_in_previous_major_status: Option<i64>,
  /// `None` for the latest version.
  pub days_in_status:                Option<i64>,
  /// `None` for the latest version.
  pub days_in_major_status:          Option<i64>,
  pub days_open_accumulated:         i64,
  pub times_reopened:                u32,
}

impl DerivedAttributes {
  pub fn measurement(&self, measurement: Measurement) -> i64 {
    let value = match measurement {
      Measurement::DaysInPreviousStatus => self.days_in_previous_status,
      Measurement::DaysInPreviousMajorStatus => {
        self.days_in_previous_major_status
      }
      Measurement::DaysInStatus => self.days_in_status,
      Measurement::DaysInMajorStatus => self.days_in_major_status,
      Measurement::DaysOpenAccumulated => Some(self.days_open_accumulated),
      Measurement::TimesReopened => Some(i64::from(self.times_reopened)),
      Measurement::Number => i64::try_from(self.number).ok(),
    };
    value.unwrap_or(NOT_APPLICABLE)
  }

  /// All measurements, keyed by identifier.
  pub fn measurements(&self) -> BTreeMap<Measurement, i64> {
    Measurement::iter().map(|m| (m, self.measurement(m))).collect()
  }

  /// The derived facets. Absent previous-status values are omitted.
  pub fn facets(&self) -> BTreeMap<Facet, &str> {
    let mut facets = BTreeMap::new();
    facets.insert(Facet::MajorStatus, self.major_status.as_str());
    if let Some(previous) = &self.previous_status {
      facets.insert(Facet::PreviousStatus, previous.as_str());
    }
    if let Some(previous) = &self.previous_major_status {
      facets.insert(Facet::PreviousMajorStatus, previous.as_str());
    }
    facets
  }
}

// ─── Version ─────────────────────────────────────────────────────────────────

/// The state of a bug during one [`Interval`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
  interval:          Interval,
  persistence_state: PersistenceState,
  /// Who made the change that opened this version.
  modified_by:       String,
  annotation:        Option<String>,
  facets:            BTreeMap<String, String>,
  derived:           Option<DerivedAttributes>,
}

impl Version {
  /// A freshly computed version with no facets.
  pub fn new(interval: Interval, modified_by: impl Into<String>) -> Self {
    Self {
      interval,
      persistence_state: PersistenceState::New,
      modified_by: modified_by.into(),
      annotation: None,
      facets: BTreeMap::new(),
      derived: None,
    }
  }

  pub fn with_state(mut self, state: PersistenceState) -> Self {
    self.persistence_state = state;
    self
  }

  pub fn with_facet(
    mut self,
    name: impl Into<String>,
    value: impl Into<String>,
  ) -> Self {
    self.facets.insert(name.into(), value.into());
    self
  }

  /// Shorthand for `with_facet(Facet::Status, status)`.
  pub fn with_status(self, status: impl Into<String>) -> Self {
    self.with_facet(Facet::Status.as_ref(), status)
  }

  pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
    self.annotation = Some(annotation.into());
    self
  }

  /// Attach previously computed attributes without touching the
  /// persistence state. Used when rehydrating from storage.
  pub fn with_derived(mut self, derived: DerivedAttributes) -> Self {
    self.derived = Some(derived);
    self
  }

  pub fn interval(&self) -> Interval { self.interval }

  pub fn from(&self) -> DateTime<Utc> { self.interval.from() }

  pub fn to(&self) -> DateTime<Utc> { self.interval.to() }

  pub fn duration(&self) -> TimeDelta { self.interval.duration() }

  pub fn persistence_state(&self) -> PersistenceState {
    self.persistence_state
  }

  pub fn modified_by(&self) -> &str { &self.modified_by }

  pub fn annotation(&self) -> Option<&str> { self.annotation.as_deref() }

  /// The raw facets supplied by the extractor.
  pub fn raw_facets(&self) -> &BTreeMap<String, String> { &self.facets }

  pub fn status(&self) -> Option<&str> {
    self.facets.get(Facet::Status.as_ref()).map(String::as_str)
  }

  /// Look up a known facet, raw or derived.
  pub fn facet(&self, facet: Facet) -> Option<&str> {
    match facet {
      Facet::Status => self.status(),
      _ => self.derived.as_ref()?.facets().get(&facet).copied(),
    }
  }

  pub fn derived(&self) -> Option<&DerivedAttributes> { self.derived.as_ref() }

  /// A copy of this version ending at `to`.
  ///
  /// A persisted version whose boundary actually moves becomes
  /// [`PersistenceState::Dirty`].
  pub fn update(&self, to: DateTime<Utc>) -> Result<Self> {
    let mut updated = self.clone();
    if to != self.to() {
      updated.interval = self.interval.with_to(to)?;
      updated.persistence_state = self.persistence_state.modified();
    }
    Ok(updated)
  }

  /// Attach freshly derived attributes, marking a persisted version dirty
  /// if they differ from what it already carries.
  pub(crate) fn attach_derived(&mut self, derived: DerivedAttributes) {
    if self.derived.as_ref() != Some(&derived) {
      self.persistence_state = self.persistence_state.modified();
      self.derived = Some(derived);
    }
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{{version {} {} by={} status={}}}",
      self.persistence_state.symbol(),
      self.interval,
      self.modified_by,
      self.status().unwrap_or("?"),
    )
  }
}
