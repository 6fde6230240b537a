//! Status taxonomy: how raw statuses group into major statuses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Classification of a major status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MajorStatusKind {
  Open,
  Closed,
}

/// Maps raw statuses to major statuses and classifies the latter.
///
/// Every raw status belongs to exactly one group, and every group has a
/// classification, so lookups during derivation can only fail on unknown
/// raw statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaxonomyDef", into = "TaxonomyDef")]
pub struct StatusTaxonomy {
  major_statuses: BTreeMap<String, String>,
  kinds:          BTreeMap<String, MajorStatusKind>,
  reopened:       String,
}

/// Serialised shape of a [`StatusTaxonomy`].
///
/// Status names only ever appear as values, never as keys, so
/// case-normalising configuration loaders leave them intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyDef {
  pub groups:   Vec<MajorStatusGroup>,
  /// The raw status that marks a reopened bug.
  #[serde(default = "default_reopened")]
  pub reopened: String,
}

/// One major status and the raw statuses it covers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MajorStatusGroup {
  pub major:    String,
  pub kind:     MajorStatusKind,
  pub statuses: Vec<String>,
}

fn default_reopened() -> String { "REOPENED".to_owned() }

impl TryFrom<TaxonomyDef> for StatusTaxonomy {
  type Error = Error;

  fn try_from(def: TaxonomyDef) -> Result<Self> {
    let mut major_statuses = BTreeMap::new();
    let mut kinds = BTreeMap::new();
    for group in def.groups {
      if kinds.insert(group.major.clone(), group.kind).is_some() {
        return Err(Error::DuplicateStatus(group.major));
      }
      for status in group.statuses {
        if major_statuses.contains_key(&status) {
          return Err(Error::DuplicateStatus(status));
        }
        major_statuses.insert(status, group.major.clone());
      }
    }
    Ok(Self { major_statuses, kinds, reopened: def.reopened })
  }
}

impl From<StatusTaxonomy> for TaxonomyDef {
  fn from(taxonomy: StatusTaxonomy) -> Self {
    let groups = taxonomy
      .kinds
      .into_iter()
      .map(|(major, kind)| MajorStatusGroup {
        statuses: taxonomy
          .major_statuses
          .iter()
          .filter(|(_, m)| **m == major)
          .map(|(status, _)| status.clone())
          .collect(),
        major,
        kind,
      })
      .collect();
    Self { groups, reopened: taxonomy.reopened }
  }
}

impl StatusTaxonomy {
  /// The stock Bugzilla workflow.
  pub fn bugzilla() -> Self {
    let group = |major: &str, kind, statuses: &[&str]| MajorStatusGroup {
      major: major.to_owned(),
      kind,
      statuses: statuses.iter().map(|s| s.to_string()).collect(),
    };
    let mut major_statuses = BTreeMap::new();
    let mut kinds = BTreeMap::new();
    for g in [
      group("OPEN", MajorStatusKind::Open, &[
        "UNCONFIRMED",
        "NEW",
        "ASSIGNED",
        "REOPENED",
      ]),
      group("CLOSED", MajorStatusKind::Closed, &[
        "RESOLVED", "VERIFIED", "CLOSED",
      ]),
    ] {
      kinds.insert(g.major.clone(), g.kind);
      for status in g.statuses {
        major_statuses.insert(status, g.major.clone());
      }
    }
    Self { major_statuses, kinds, reopened: default_reopened() }
  }

  /// The major status for a raw status, if mapped.
  pub fn major_status(&self, status: &str) -> Option<&str> {
    self.major_statuses.get(status).map(String::as_str)
  }

  pub fn kind(&self, major_status: &str) -> Option<MajorStatusKind> {
    self.kinds.get(major_status).copied()
  }

  pub fn is_open(&self, major_status: &str) -> bool {
    self.kind(major_status) == Some(MajorStatusKind::Open)
  }

  pub fn is_reopened(&self, status: &str) -> bool { status == self.reopened }
}

impl Default for StatusTaxonomy {
  fn default() -> Self { Self::bugzilla() }
}
