//! Timeline: a bug with its invariant properties and all of its versions.
//!
//! Versions are kept in chronological order and never overlap. Adjacent
//! versions may touch (`earlier.to == later.from`), which is the normal shape
//! of a continuous history.

use std::{collections::VecDeque, fmt};

use crate::{Error, Result, version::Version};

/// Bug identifier as assigned by the source tracker.
pub type BugId = u64;

/// The ordered version history of one bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
  id:       BugId,
  reporter: String,
  pub(crate) versions: VecDeque<Version>,
}

impl Timeline {
  /// An empty timeline.
  pub fn new(id: BugId, reporter: impl Into<String>) -> Self {
    Self { id, reporter: reporter.into(), versions: VecDeque::new() }
  }

  pub fn id(&self) -> BugId { self.id }

  pub fn reporter(&self) -> &str { &self.reporter }

  pub fn len(&self) -> usize { self.versions.len() }

  pub fn is_empty(&self) -> bool { self.versions.is_empty() }

  /// Versions from oldest to newest.
  pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Version> + '_ {
    self.versions.iter()
  }

  pub fn first(&self) -> Option<&Version> { self.versions.front() }

  pub fn last(&self) -> Option<&Version> { self.versions.back() }

  /// Add a version after all existing ones.
  ///
  /// Fails with [`Error::OutOfOrder`] if it would start before the current
  /// last version ends.
  pub fn append(&mut self, later: Version) -> Result<()> {
    if let Some(last) = self.versions.back()
      && later.from() < last.to()
    {
      return Err(Error::OutOfOrder {
        bug_id:   self.id,
        from:     later.from(),
        to:       later.to(),
        boundary: last.to(),
      });
    }
    self.versions.push_back(later);
    Ok(())
  }

  /// Add a version before all existing ones.
  ///
  /// Fails with [`Error::OutOfOrder`] if it would end after the current
  /// first version starts.
  pub fn prepend(&mut self, earlier: Version) -> Result<()> {
    if let Some(first) = self.versions.front()
      && earlier.to() > first.from()
    {
      return Err(Error::OutOfOrder {
        bug_id:   self.id,
        from:     earlier.from(),
        to:       earlier.to(),
        boundary: first.from(),
      });
    }
    self.versions.push_front(earlier);
    Ok(())
  }

  /// True if the earliest version was never persisted, i.e. the sink has to
  /// insert this bug rather than update it. An empty timeline has never been
  /// saved either.
  pub fn never_saved(&self) -> bool {
    self.versions.front().is_none_or(|first| {
      first.persistence_state() == crate::version::PersistenceState::New
    })
  }
}

impl<'a> IntoIterator for &'a Timeline {
  type Item = &'a Version;
  type IntoIter = std::collections::vec_deque::Iter<'a, Version>;

  fn into_iter(self) -> Self::IntoIter { self.versions.iter() }
}

impl fmt::Display for Timeline {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let states: String = self
      .versions
      .iter()
      .map(|v| v.persistence_state().symbol())
      .collect();
    write!(
      f,
      "{{bug id={}, reporter={}, versions={} (.saved #dirty *new)}}",
      self.id, self.reporter, states
    )
  }
}

#[cfg(test)]
mod tests {
  use chrono::{DateTime, TimeZone as _, Utc};

  use super::*;
  use crate::version::{Interval, PersistenceState};

  fn at(day: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(day * 86_400, 0).unwrap()
  }

  fn version(from: i64, to: i64) -> Version {
    Version::new(Interval::new(at(from), at(to)).unwrap(), "reporter@example.com")
      .with_status("NEW")
  }

  #[test]
  fn append_accepts_adjacent_and_gapped_versions() {
    let mut bug = Timeline::new(1, "reporter@example.com");
    bug.append(version(0, 1)).unwrap();
    bug.append(version(1, 3)).unwrap();
    bug.append(version(5, 6)).unwrap();
    assert_eq!(bug.len(), 3);
    assert_eq!(bug.first().unwrap().from(), at(0));
    assert_eq!(bug.last().unwrap().to(), at(6));
  }

  #[test]
  fn append_rejects_overlap_and_leaves_timeline_unchanged() {
    let mut bug = Timeline::new(7, "r");
    bug.append(version(0, 4)).unwrap();
    let before = bug.clone();

    let err = bug.append(version(3, 5)).unwrap_err();
    assert!(matches!(err, Error::OutOfOrder { bug_id: 7, .. }));
    assert_eq!(bug, before);

    // Going backwards is an overlap too.
    assert!(bug.append(version(-2, -1)).is_err());
  }

  #[test]
  fn prepend_accepts_earlier_versions() {
    let mut bug = Timeline::new(1, "r");
    bug.prepend(version(4, 5)).unwrap();
    bug.prepend(version(2, 4)).unwrap();
    bug.prepend(version(0, 1)).unwrap();
    let froms: Vec<_> = bug.iter().map(Version::from).collect();
    assert_eq!(froms, vec![at(0), at(2), at(4)]);
  }

  #[test]
  fn prepend_rejects_overlap() {
    let mut bug = Timeline::new(2, "r");
    bug.prepend(version(4, 5)).unwrap();
    let err = bug.prepend(version(3, 6)).unwrap_err();
    assert!(matches!(err, Error::OutOfOrder { bug_id: 2, .. }));
    assert_eq!(bug.len(), 1);
  }

  #[test]
  fn adjacent_versions_never_overlap() {
    let mut bug = Timeline::new(3, "r");
    for day in 0..10 {
      bug.append(version(day * 2, day * 2 + 1)).unwrap();
    }
    let versions: Vec<_> = bug.iter().collect();
    for pair in versions.windows(2) {
      assert!(pair[0].to() <= pair[1].from());
    }
  }

  #[test]
  fn never_saved_looks_at_the_earliest_version() {
    let mut bug = Timeline::new(1, "r");
    assert!(bug.never_saved());

    bug.append(version(0, 1)).unwrap();
    assert!(bug.never_saved());

    bug.prepend(version(-2, -1).with_state(PersistenceState::Saved)).unwrap();
    assert!(!bug.never_saved());
  }

  #[test]
  fn equality_covers_id_reporter_and_versions() {
    let mut a = Timeline::new(1, "r");
    a.append(version(0, 1)).unwrap();
    let mut b = Timeline::new(1, "r");
    b.append(version(0, 1)).unwrap();
    assert_eq!(a, b);

    let mut other_reporter = Timeline::new(1, "s");
    other_reporter.append(version(0, 1)).unwrap();
    assert_ne!(a, other_reporter);

    let mut other_state = Timeline::new(1, "r");
    other_state
      .append(version(0, 1).with_state(PersistenceState::Saved))
      .unwrap();
    assert_ne!(a, other_state);

    b.append(version(1, 2)).unwrap();
    assert_ne!(a, b);
  }

  #[test]
  fn display_renders_persistence_states() {
    let mut bug = Timeline::new(42, "r");
    bug.append(version(0, 1).with_state(PersistenceState::Saved)).unwrap();
    bug.append(version(1, 2).with_state(PersistenceState::Dirty)).unwrap();
    bug.append(version(2, 3)).unwrap();
    assert_eq!(
      bug.to_string(),
      "{bug id=42, reporter=r, versions=.#* (.saved #dirty *new)}"
    );
  }
}
